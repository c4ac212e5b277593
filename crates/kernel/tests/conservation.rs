//! Mass conservation and the global rest state.
//!
//! On a fully periodic lattice streaming only permutes populations and BGK
//! collision conserves density per site, so the total mass is invariant.
//! Bounce-back walls reflect populations instead of absorbing them, so a
//! walled pipe conserves mass as well.

use lbm_kernel::{Lattice, LatticeConfig, Scenario};

fn total_density(lattice: &Lattice) -> f64 {
    let mut total = 0.0;
    for y in 0..lattice.height() {
        for x in 0..lattice.width() {
            total += lattice.density(x, y);
        }
    }
    total
}

#[test]
fn rest_equilibrium_is_a_fixed_point() {
    let mut lattice = Lattice::new(LatticeConfig::new(5, 5)).unwrap();
    let w = *lattice.velocities().weights();
    for y in 0..5 {
        for x in 0..5 {
            assert_eq!(lattice.populations(x, y), w);
        }
    }

    lattice.advance();

    for y in 0..5 {
        for x in 0..5 {
            let rho = lattice.density(x, y);
            assert!((rho - 1.0).abs() < 1e-12, "density at ({x}, {y}) = {rho}");
            let u = lattice.velocity(x, y);
            assert!(u[0].abs() < 1e-14 && u[1].abs() < 1e-14);
        }
    }
}

#[test]
fn periodic_mass_is_conserved() {
    let config = LatticeConfig::new(32, 24)
        .with_workers(4)
        .with_scenario(Scenario::Periodic { initial_velocity: [0.02, -0.01] });
    let mut lattice = Lattice::new(config).unwrap();
    // Off-center density bump so the flow is not trivially uniform
    lattice.set_density(10, 7, 1.5);
    lattice.set_density(11, 7, 1.3);

    let mass0 = total_density(&lattice);
    for _ in 0..200 {
        lattice.advance();
    }
    let mass1 = total_density(&lattice);

    assert!(
        (mass1 - mass0).abs() / mass0 < 1e-10,
        "Density not conserved: {} vs {}",
        mass0,
        mass1
    );
    assert_eq!(lattice.steps(), 200);
}

#[test]
fn pipe_mass_is_conserved() {
    let mut lattice = Lattice::new(
        LatticeConfig::new(16, 9)
            .with_workers(2)
            .with_scenario(Scenario::Pipe),
    )
    .unwrap();
    lattice.set_density(3, 1, 2.0);
    lattice.set_density(8, 4, 1.4);

    let mass0 = lattice.metrics().total_mass;
    for _ in 0..150 {
        lattice.advance();
    }
    let metrics = lattice.metrics();

    assert!(
        (metrics.total_mass - mass0).abs() / mass0 < 1e-10,
        "Pipe mass drifted: {} vs {}",
        mass0,
        metrics.total_mass
    );
    assert!(metrics.is_stable());
}

#[test]
fn density_perturbation_spreads_out() {
    let mut lattice = Lattice::new(LatticeConfig::new(21, 21)).unwrap();
    lattice.set_density(10, 10, 2.0);
    let peak0 = lattice.metrics().max_density;

    for _ in 0..50 {
        lattice.advance();
    }

    let peak1 = lattice.metrics().max_density;
    assert!(peak1 < peak0, "peak should decay: {} -> {}", peak0, peak1);
}
