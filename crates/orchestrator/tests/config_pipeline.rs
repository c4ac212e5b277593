//! Configuration file to running simulation.

use lbm_orchestrator::{create_simulation, RunnerQuery, RunnerState, SimulationConfig};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

fn write_config(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = SimulationConfig::load(path.to_str().unwrap()).unwrap_err();
    assert!(err.contains("Failed to read config file"), "{err}");
}

#[test]
fn load_reports_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "bad.json", "{ \"name\": ");
    let err = SimulationConfig::load(&path).unwrap_err();
    assert!(err.contains("Failed to parse config JSON"), "{err}");
}

#[test]
fn load_runs_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "zero.json",
        r#"{ "name": "zero", "width": 0, "height": 4, "max_timesteps": 1 }"#,
    );
    assert!(SimulationConfig::load(&path).is_err());
}

#[test]
fn created_simulation_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "pipe.json",
        r#"{
            "name": "pipe",
            "width": 20,
            "height": 7,
            "workers": 2,
            "scenario": "Pipe",
            "max_timesteps": 25,
            "output_interval": 10
        }"#,
    );

    let runner = create_simulation(&path).unwrap();
    let initial_mass = runner.metrics().unwrap().total_mass;
    runner.start();

    let deadline = Instant::now() + Duration::from_secs(10);
    while runner.state() == RunnerState::Running && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(runner.state(), RunnerState::Finished);
    assert_eq!(runner.timestep_count(), 25);

    let snapshot = runner.snapshot().unwrap();
    assert_eq!(snapshot.step, 25);
    let final_mass = runner.metrics().unwrap().total_mass;
    assert!(
        (final_mass - initial_mass).abs() < 1e-10,
        "mass drifted from {initial_mass} to {final_mass}"
    );

    let mut text = Vec::new();
    snapshot.write_field(&mut text, lbm_kernel::Field::Density).unwrap();
    assert_eq!(String::from_utf8(text).unwrap().lines().count(), 7);

    runner.join().unwrap();
}

#[test]
fn bundled_configs_are_valid() {
    let configs = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs");
    let mut seen = 0;
    for entry in fs::read_dir(&configs).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|ext| ext == "json") {
            SimulationConfig::load(path.to_str().unwrap())
                .unwrap_or_else(|e| panic!("{}: {e}", path.display()));
            seen += 1;
        }
    }
    assert!(seen > 0, "no configs found in {}", configs.display());
}
