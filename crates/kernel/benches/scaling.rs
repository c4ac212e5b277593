//! Worker scaling -- steps per second against worker count.
//!
//! Run with: cargo bench -p lbm-kernel --bench scaling

use lbm_kernel::{Lattice, LatticeConfig};
use std::time::Instant;

fn main() {
    println!("=== Lattice Worker Scaling ===\n");

    // (width, height, steps)
    let configs = [(128, 64, 400), (256, 128, 200), (512, 256, 50)];
    let max_workers = std::thread::available_parallelism().map_or(1, |n| n.get()).min(8);

    println!(
        "{:>10} {:>8} {:>8} {:>10} {:>12} {:>12}",
        "Sites", "Workers", "Steps", "Time (s)", "steps/s", "MLUPS"
    );

    for &(width, height, steps) in &configs {
        let mut workers = 1;
        while workers <= max_workers {
            let config = LatticeConfig::new(width, height)
                .with_workers(workers)
                .with_channel_flow(0.05, 100.0);
            let mut lattice = Lattice::new(config).expect("valid lattice");

            // Warmup
            for _ in 0..5 {
                lattice.advance();
            }

            let start = Instant::now();
            for _ in 0..steps {
                lattice.advance();
            }
            let elapsed = start.elapsed().as_secs_f64();
            let sites = width * height;
            let mlups = (sites * steps) as f64 / elapsed / 1.0e6;

            println!(
                "{:>10} {:>8} {:>8} {:>10.3} {:>12.1} {:>12.2}",
                sites,
                workers,
                steps,
                elapsed,
                steps as f64 / elapsed,
                mlups
            );

            workers *= 2;
        }
    }
}
