//! Background-thread step timer

use super::StepTimer;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

#[derive(Debug)]
struct TimerState {
    armed: bool,
    delay: Duration,
    /// Bumped on every arm / disarm / delay change so a pending wait restarts
    generation: u64,
    shutdown: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

/// Timer that calls a tick callback from its own thread
///
/// While armed, the worker waits `delay` and then invokes the callback, over
/// and over. A zero delay re-invokes as soon as the previous tick returns.
/// The callback runs without the timer's lock held, so it may call back into
/// `arm` / `disarm` (for instance through a scenario step honouring a stop).
///
/// The worker runs one tick at a time, so ticks never overlap.
pub struct ThreadTimer {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl ThreadTimer {
    /// Spawn the worker thread, initially disarmed
    pub fn spawn<F>(tick: F) -> std::io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(TimerState {
                armed: false,
                delay: Duration::ZERO,
                generation: 0,
                shutdown: false,
            }),
            wake: Condvar::new(),
        });

        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("scenario-auto-step".to_string())
            .spawn(move || run(&worker_shared, tick))?;
        let worker_id = worker.thread().id();

        Ok(Self {
            shared,
            worker: Some(worker),
            worker_id,
        })
    }

    /// Current delay
    pub fn delay(&self) -> Duration {
        self.shared.state.lock().delay
    }

    fn update(&self, apply: impl FnOnce(&mut TimerState)) {
        let mut state = self.shared.state.lock();
        apply(&mut state);
        state.generation = state.generation.wrapping_add(1);
        self.shared.wake.notify_all();
    }
}

fn run<F: Fn()>(shared: &Shared, tick: F) {
    loop {
        let mut state = shared.state.lock();
        while !state.armed && !state.shutdown {
            shared.wake.wait(&mut state);
        }
        if state.shutdown {
            return;
        }

        let generation = state.generation;
        if !state.delay.is_zero() {
            let deadline = Instant::now() + state.delay;
            while state.armed && !state.shutdown && state.generation == generation {
                if shared.wake.wait_until(&mut state, deadline).timed_out() {
                    break;
                }
            }
            if state.shutdown {
                return;
            }
            if !state.armed || state.generation != generation {
                // re-armed, retuned or disarmed while waiting
                continue;
            }
        }
        drop(state);

        trace!("auto-step tick");
        tick();
    }
}

impl StepTimer for ThreadTimer {
    fn arm(&mut self, delay: Duration) {
        debug!(delay_ms = delay.as_millis() as u64, "auto-step timer armed");
        self.update(|state| {
            state.delay = delay;
            state.armed = true;
        });
    }

    fn disarm(&mut self) {
        debug!("auto-step timer disarmed");
        self.update(|state| state.armed = false);
    }

    fn set_delay(&mut self, delay: Duration) {
        self.update(|state| state.delay = delay);
    }

    fn is_armed(&self) -> bool {
        self.shared.state.lock().armed
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.update(|state| {
            state.armed = false;
            state.shutdown = true;
        });
        if let Some(worker) = self.worker.take() {
            // dropped from inside a tick: the worker exits once the tick returns
            if thread::current().id() != self.worker_id {
                let _ = worker.join();
            }
        }
    }
}

impl std::fmt::Debug for ThreadTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ThreadTimer")
            .field("armed", &state.armed)
            .field("delay", &state.delay)
            .finish()
    }
}
