//! Fixed worker pool and the reusable phase barrier.
//!
//! A lattice with `K` workers spawns `K - 1` threads; the calling thread
//! processes partition 0 itself. Partitions are contiguous index ranges
//! `[i * N / K, (i + 1) * N / K)` assigned once at construction.
//!
//! Every phase goes through the same two-sided rendezvous:
//!
//! 1. the caller publishes the phase ([`PhaseBarrier::dispatch`]),
//! 2. every party runs the phase over its own partition,
//! 3. the caller blocks until every worker has reported back
//!    ([`PhaseBarrier::wait_drained`]).
//!
//! Nothing of phase N+1 starts before phase N has fully drained. A panic in
//! any partition is caught, the phase still drains, and the panic is raised
//! on the caller; the workers stay alive for the next phase.

use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::engine::{Engine, Phase};

/// Command published to the workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Nothing published yet.
    Idle,
    /// Run a phase over the worker's partition.
    Run(Phase),
    /// Leave the worker loop.
    Stop,
}

#[derive(Debug)]
struct BarrierState {
    /// Bumped on every dispatch so workers can tell a new command apart.
    generation: u64,
    command: Command,
    /// Workers that have not yet finished the current phase.
    pending: usize,
    /// Set when a worker unwound while running the current phase.
    failed: bool,
}

/// Reusable dispatch/drain barrier shared by the caller and its workers.
#[derive(Debug)]
pub struct PhaseBarrier {
    state: Mutex<BarrierState>,
    dispatched: Condvar,
    drained: Condvar,
}

impl PhaseBarrier {
    /// Create an idle barrier.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BarrierState {
                generation: 0,
                command: Command::Idle,
                pending: 0,
                failed: false,
            }),
            dispatched: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish `command` to `workers` waiting workers.
    pub fn dispatch(&self, command: Command, workers: usize) {
        let mut state = self.lock();
        state.generation += 1;
        state.command = command;
        state.failed = false;
        state.pending = match command {
            Command::Run(_) => workers,
            Command::Idle | Command::Stop => 0,
        };
        self.dispatched.notify_all();
    }

    /// Block until a command newer than `seen` is published.
    ///
    /// Returns the new generation and its command.
    pub fn next(&self, seen: u64) -> (u64, Command) {
        let mut state = self.lock();
        while state.generation == seen {
            state = self
                .dispatched
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        (state.generation, state.command)
    }

    /// Report the current phase as finished by one worker.
    pub fn done(&self, panicked: bool) {
        let mut state = self.lock();
        state.failed |= panicked;
        state.pending = state.pending.saturating_sub(1);
        if state.pending == 0 {
            self.drained.notify_all();
        }
    }

    /// Block until every worker has finished the current phase.
    ///
    /// Returns `false` if a worker panicked while running it.
    pub fn wait_drained(&self) -> bool {
        let mut state = self.lock();
        while state.pending > 0 {
            state = self
                .drained
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        !state.failed
    }
}

impl Default for PhaseBarrier {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `n` sites into `parts` contiguous ranges by integer division.
pub fn partitions(n: usize, parts: usize) -> Vec<Range<usize>> {
    (0..parts)
        .map(|i| (i * n) / parts..((i + 1) * n) / parts)
        .collect()
}

/// Worker threads plus the caller's own partition.
#[derive(Debug)]
pub struct WorkerPool {
    barrier: Arc<PhaseBarrier>,
    handles: Vec<JoinHandle<()>>,
    local: Range<usize>,
}

impl WorkerPool {
    /// Spawn `workers - 1` threads over `engine`.
    ///
    /// With `workers == 1` no thread is spawned and every phase runs inline.
    pub fn spawn(engine: &Arc<Engine>, workers: usize) -> std::io::Result<Self> {
        let workers = workers.max(1);
        let mut ranges = partitions(engine.sites().len(), workers).into_iter();
        let local = ranges.next().unwrap_or(0..0);
        let barrier = Arc::new(PhaseBarrier::new());

        let mut pool = Self {
            barrier,
            handles: Vec::with_capacity(workers - 1),
            local,
        };

        for (id, range) in ranges.enumerate() {
            let engine = Arc::clone(engine);
            let barrier = Arc::clone(&pool.barrier);
            tracing::debug!("Spawning lattice worker {} for sites {:?}", id + 1, range);
            let handle = thread::Builder::new()
                .name(format!("lbm-worker-{}", id + 1))
                .spawn(move || worker_loop(&engine, &barrier, range))?;
            // on error, `pool` drops here and stops the threads spawned so far
            pool.handles.push(handle);
        }

        Ok(pool)
    }

    /// Total concurrency, caller included.
    pub fn workers(&self) -> usize {
        self.handles.len() + 1
    }

    /// Run one phase across every partition and wait for it to drain.
    ///
    /// # Panics
    /// If any partition panicked while running the phase. The phase has
    /// drained by then, so the pool can keep running later phases.
    pub fn run(&self, engine: &Engine, phase: Phase) {
        let remote = self.handles.len();
        if remote > 0 {
            self.barrier.dispatch(Command::Run(phase), remote);
        }
        let local = panic::catch_unwind(AssertUnwindSafe(|| {
            engine.run(phase, self.local.clone());
        }));
        let drained = remote == 0 || self.barrier.wait_drained();
        if let Err(payload) = local {
            panic::resume_unwind(payload);
        }
        if !drained {
            panic!("lattice worker panicked during {phase:?} phase");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        self.barrier.dispatch(Command::Stop, 0);
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("Lattice worker exited with a panic");
            }
        }
        tracing::debug!("Lattice worker pool joined");
    }
}

fn worker_loop(engine: &Engine, barrier: &PhaseBarrier, range: Range<usize>) {
    let mut seen = 0;
    loop {
        let (generation, command) = barrier.next(seen);
        seen = generation;
        match command {
            Command::Run(phase) => {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    engine.run(phase, range.clone());
                }));
                if result.is_err() {
                    tracing::error!("Lattice worker panicked during {:?} phase", phase);
                }
                barrier.done(result.is_err());
            }
            Command::Stop => break,
            Command::Idle => {}
        }
    }
}
