//! Simulation runner with lifecycle management
//!
//! This module provides the `SimulationRunner` which drives a lattice kernel
//! in a background thread, including start, pause, resume, and status
//! tracking. Field snapshots are published to the control side every
//! `snapshot_interval` steps.

use lbm_kernel::{FieldSnapshot, FlowMetrics, SimulationKernel};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Runner state enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerState {
    /// Simulation created but not yet started
    Created,
    /// Simulation actively running
    Running,
    /// Simulation paused
    Paused,
    /// Simulation finished (reached stopping condition)
    Finished,
    /// Simulation encountered an error
    Error,
}

/// Shared state between the runner thread and control interface
struct SharedState {
    /// Current runner state
    state: RunnerState,
    /// Number of timesteps executed
    timestep_count: u64,
    /// Most recent error message (if state is Error)
    error_message: Option<String>,
    /// Latest published field snapshot
    snapshot: Option<FieldSnapshot>,
    /// Diagnostics taken with the latest snapshot
    metrics: Option<FlowMetrics>,
}

fn lock(shared: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for controlling and querying a running simulation
pub struct SimulationRunner {
    /// Shared state (protected by mutex)
    shared: Arc<Mutex<SharedState>>,
    /// Handle to the background thread
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl SimulationRunner {
    /// Create a new simulation runner with the given kernel
    ///
    /// # Arguments
    /// * `kernel` - The lattice kernel to run
    /// * `max_timesteps` - Optional maximum number of timesteps
    /// * `snapshot_interval` - Publish a snapshot every this many timesteps
    ///
    /// The initial state is published right away, so [`RunnerQuery`] answers
    /// before the first step.
    pub fn new(
        mut kernel: Box<dyn SimulationKernel + Send>,
        max_timesteps: Option<u64>,
        snapshot_interval: u64,
    ) -> Self {
        let shared = Arc::new(Mutex::new(SharedState {
            state: RunnerState::Created,
            timestep_count: kernel.steps(),
            error_message: None,
            snapshot: Some(kernel.snapshot()),
            metrics: Some(kernel.metrics()),
        }));

        let shared_clone = Arc::clone(&shared);
        let snapshot_interval = snapshot_interval.max(1);

        // Spawn background thread
        let thread_handle = thread::spawn(move || {
            run_simulation_loop(kernel.as_mut(), shared_clone, max_timesteps, snapshot_interval);
        });

        Self {
            shared,
            thread_handle: Some(thread_handle),
        }
    }

    /// Get current runner state
    pub fn state(&self) -> RunnerState {
        lock(&self.shared).state.clone()
    }

    /// Get current timestep count
    pub fn timestep_count(&self) -> u64 {
        lock(&self.shared).timestep_count
    }

    /// Get error message if state is Error
    pub fn error_message(&self) -> Option<String> {
        lock(&self.shared).error_message.clone()
    }

    /// Pause the simulation
    pub fn pause(&self) {
        let mut state = lock(&self.shared);
        if state.state == RunnerState::Running {
            state.state = RunnerState::Paused;
        }
    }

    /// Resume the simulation
    pub fn resume(&self) {
        let mut state = lock(&self.shared);
        if state.state == RunnerState::Paused {
            state.state = RunnerState::Running;
        }
    }

    /// Start the simulation (transition from Created to Running)
    pub fn start(&self) {
        let mut state = lock(&self.shared);
        if state.state == RunnerState::Created {
            state.state = RunnerState::Running;
        }
    }

    /// Ask the simulation thread to stop after the current step
    pub fn stop(&self) {
        let mut state = lock(&self.shared);
        if state.state != RunnerState::Error {
            state.state = RunnerState::Finished;
        }
    }

    /// Wait for the simulation thread to complete
    pub fn join(mut self) -> Result<(), String> {
        if let Some(handle) = self.thread_handle.take() {
            handle.join().map_err(|_| "Thread panicked".to_string())?;
        }
        Ok(())
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        // Set state to Finished to signal thread to exit
        {
            let mut state = lock(&self.shared);
            if matches!(
                state.state,
                RunnerState::Created | RunnerState::Running | RunnerState::Paused
            ) {
                state.state = RunnerState::Finished;
            }
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Main simulation loop executed in background thread
fn run_simulation_loop(
    kernel: &mut dyn SimulationKernel,
    shared: Arc<Mutex<SharedState>>,
    max_timesteps: Option<u64>,
    snapshot_interval: u64,
) {
    // Wait for start signal
    loop {
        let state = lock(&shared).state.clone();

        match state {
            RunnerState::Created => {
                // Wait a bit and check again
                thread::sleep(Duration::from_millis(10));
            }
            RunnerState::Running => break,
            _ => return, // Exit if finished or error
        }
    }

    let (width, height) = kernel.dimensions();
    tracing::info!("Simulation thread started: {}x{} lattice", width, height);

    let start_wall_time = Instant::now();
    let mut timestep_count = kernel.steps();

    loop {
        let current_state = lock(&shared).state.clone();

        match current_state {
            RunnerState::Running => {
                // Execute one timestep
                kernel.advance();
                timestep_count = kernel.steps();

                let reached_max = max_timesteps.is_some_and(|max| timestep_count >= max);
                let publish = reached_max || timestep_count % snapshot_interval == 0;

                let mut guard = lock(&shared);
                guard.timestep_count = timestep_count;

                if publish {
                    let metrics = kernel.metrics();
                    guard.snapshot = Some(kernel.snapshot());
                    guard.metrics = Some(metrics);

                    if !metrics.is_stable() {
                        tracing::warn!(
                            "Simulation diverged at step {}: min_density={:.4e}, total_mass={:.4e}",
                            timestep_count,
                            metrics.min_density,
                            metrics.total_mass
                        );
                        guard.state = RunnerState::Error;
                        guard.error_message = Some(format!(
                            "flow diverged at step {} (min density {:.4e})",
                            timestep_count, metrics.min_density
                        ));
                        break;
                    }

                    let wall_time = start_wall_time.elapsed().as_secs_f64();
                    tracing::debug!(
                        "Step {}: mass={:.6}, max_speed={:.4e}, wall_time={:.2}s",
                        timestep_count,
                        metrics.total_mass,
                        metrics.max_speed,
                        wall_time
                    );
                }

                // Check stopping condition
                if reached_max {
                    tracing::info!(
                        "Simulation finished: reached max_timesteps = {}",
                        timestep_count
                    );
                    guard.state = RunnerState::Finished;
                    break;
                }
            }
            RunnerState::Paused => {
                // Wait while paused
                thread::sleep(Duration::from_millis(50));
            }
            RunnerState::Finished | RunnerState::Error | RunnerState::Created => {
                break;
            }
        }
    }

    // Last state seen by queries matches where the thread stopped
    {
        let mut guard = lock(&shared);
        if guard.snapshot.as_ref().map(|s| s.step) != Some(timestep_count) {
            guard.snapshot = Some(kernel.snapshot());
            guard.metrics = Some(kernel.metrics());
        }
    }

    tracing::info!(
        "Simulation thread exiting: {} timesteps, {:.2}s wall time",
        timestep_count,
        start_wall_time.elapsed().as_secs_f64()
    );
}

/// Read access to the state published by the runner thread
pub trait RunnerQuery {
    /// Latest published field snapshot
    fn snapshot(&self) -> Option<FieldSnapshot>;

    /// Diagnostics taken with the latest snapshot
    fn metrics(&self) -> Option<FlowMetrics>;
}

impl RunnerQuery for SimulationRunner {
    fn snapshot(&self) -> Option<FieldSnapshot> {
        lock(&self.shared).snapshot.clone()
    }

    fn metrics(&self) -> Option<FlowMetrics> {
        lock(&self.shared).metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lbm_kernel::{Lattice, LatticeConfig};

    fn small_kernel(workers: usize) -> Box<dyn SimulationKernel + Send> {
        let config = LatticeConfig::new(16, 8)
            .with_workers(workers)
            .with_channel_flow(0.05, 10.0);
        Box::new(Lattice::new(config).unwrap())
    }

    #[test]
    fn test_runner_lifecycle() {
        let runner = SimulationRunner::new(small_kernel(2), Some(10), 4);

        // Initially Created, with the initial state already published
        assert_eq!(runner.state(), RunnerState::Created);
        assert_eq!(runner.snapshot().unwrap().step, 0);

        // Start
        runner.start();

        // Wait for completion
        let deadline = Instant::now() + Duration::from_secs(10);
        while runner.state() == RunnerState::Running && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(runner.state(), RunnerState::Finished);
        assert_eq!(runner.timestep_count(), 10);
        let snapshot = runner.snapshot().unwrap();
        assert_eq!(snapshot.step, 10);
        assert_eq!((snapshot.width, snapshot.height), (16, 8));
        assert!(runner.metrics().unwrap().is_stable());

        runner.join().unwrap();
    }

    #[test]
    fn test_runner_pause_resume() {
        let runner = SimulationRunner::new(small_kernel(1), Some(2_000_000), 100);

        runner.start();
        thread::sleep(Duration::from_millis(50));

        // Pause
        runner.pause();

        // Wait for pause to take effect
        thread::sleep(Duration::from_millis(100));
        assert_eq!(runner.state(), RunnerState::Paused);

        let steps_paused = runner.timestep_count();
        thread::sleep(Duration::from_millis(100));

        // Should not advance significantly while paused (allow for 1 step race condition)
        let steps_after_pause = runner.timestep_count();
        assert!(
            steps_after_pause <= steps_paused + 1,
            "Steps should not advance while paused: before={}, after={}",
            steps_paused,
            steps_after_pause
        );

        // Resume
        runner.resume();
        assert_eq!(runner.state(), RunnerState::Running);

        runner.stop();
        runner.join().unwrap();
    }

    #[test]
    fn test_runner_reports_divergence() {
        let mut lattice = Lattice::new(LatticeConfig::new(8, 8)).unwrap();
        lattice.set_density(3, 3, -50.0);

        let runner = SimulationRunner::new(Box::new(lattice), Some(100), 1);
        runner.start();

        let deadline = Instant::now() + Duration::from_secs(10);
        while runner.state() == RunnerState::Running && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(runner.state(), RunnerState::Error);
        assert!(runner.error_message().unwrap().contains("diverged"));
        assert!(!runner.metrics().unwrap().is_stable());
        runner.join().unwrap();
    }

    #[test]
    fn test_drop_stops_thread() {
        let runner = SimulationRunner::new(small_kernel(3), None, 50);
        runner.start();
        thread::sleep(Duration::from_millis(20));
        drop(runner);
    }
}
