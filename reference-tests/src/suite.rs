//! The reference test cases, resolved against a configuration directory.

use crate::{
    ConservationCheck, ExpectedResult, ProfileCheck, ReferenceTest, StabilityCheck,
    UniformVelocityCheck,
};
use std::path::Path;

fn config(dir: &Path, file: &str) -> String {
    dir.join(file).to_string_lossy().to_string()
}

/// Periodic box at rest: the rest equilibrium is a fixed point.
pub fn rest_state_test(dir: &Path) -> ReferenceTest {
    ReferenceTest {
        name: "Rest State".to_string(),
        config_path: config(dir, "periodic-rest.json"),
        timesteps: 200,
        expected: ExpectedResult {
            conservation: Some(ConservationCheck { max_mass_error: 1e-12 }),
            uniform_velocity: Some(UniformVelocityCheck {
                velocity: [0.0, 0.0],
                tolerance: 1e-12,
            }),
            ..Default::default()
        },
    }
}

/// Uniform drift in a periodic box keeps its velocity and mass.
pub fn uniform_drift_test(dir: &Path) -> ReferenceTest {
    ReferenceTest {
        name: "Uniform Drift".to_string(),
        config_path: config(dir, "periodic-drift.json"),
        timesteps: 200,
        expected: ExpectedResult {
            conservation: Some(ConservationCheck { max_mass_error: 1e-10 }),
            uniform_velocity: Some(UniformVelocityCheck {
                velocity: [0.05, 0.02],
                tolerance: 1e-10,
            }),
            ..Default::default()
        },
    }
}

/// Pipe at rest: bounce-back walls neither create nor lose mass.
pub fn walled_pipe_test(dir: &Path) -> ReferenceTest {
    ReferenceTest {
        name: "Walled Pipe".to_string(),
        config_path: config(dir, "pipe.json"),
        timesteps: 200,
        expected: ExpectedResult {
            conservation: Some(ConservationCheck { max_mass_error: 1e-12 }),
            uniform_velocity: Some(UniformVelocityCheck {
                velocity: [0.0, 0.0],
                tolerance: 1e-12,
            }),
            ..Default::default()
        },
    }
}

/// Channel with parabolic inlet and outlet settles into Poiseuille flow.
pub fn channel_profile_test(dir: &Path) -> ReferenceTest {
    ReferenceTest {
        name: "Channel Poiseuille Profile".to_string(),
        config_path: config(dir, "channel-poiseuille.json"),
        timesteps: 4000,
        expected: ExpectedResult {
            profile: Some(ProfileCheck {
                column_fraction: 0.5,
                max_rms_error: 0.01,
            }),
            stability: Some(StabilityCheck { max_speed: 0.1 }),
            ..Default::default()
        },
    }
}

/// Get all reference tests
pub fn all_tests(dir: &Path) -> Vec<ReferenceTest> {
    vec![
        rest_state_test(dir),
        uniform_drift_test(dir),
        walled_pipe_test(dir),
        channel_profile_test(dir),
    ]
}
