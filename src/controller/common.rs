//! Shared loop machinery.
//!
//! Both entity controllers and the reflector are [`PeriodicTask`]s driven by
//! a [`PeriodicLoop`]. The next cycle is scheduled only after the previous
//! one completes, so cycles of one task never overlap; an overrunning cycle
//! just delays the next one.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// One unit of periodic work.
#[async_trait]
pub trait PeriodicTask: Send + 'static {
    /// Name used in lifecycle logs.
    fn name(&self) -> String;

    /// Run one cycle. Failures are handled (logged, recorded) inside.
    async fn tick(&mut self);
}

/// Sleep for `interval`, returning early with `true` if a stop was requested.
pub async fn sleep_or_stop(stop: &mut watch::Receiver<bool>, interval: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(interval) => *stop.borrow(),
        changed = stop.changed() => changed.is_err() || *stop.borrow(),
    }
}

async fn run_loop<T: PeriodicTask>(
    mut task: T,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) -> T {
    loop {
        if *stop.borrow() {
            break;
        }
        task.tick().await;
        if sleep_or_stop(&mut stop, interval).await {
            break;
        }
    }
    task
}

enum LoopState<T> {
    Stopped(T),
    Running {
        stop: watch::Sender<bool>,
        handle: JoinHandle<T>,
    },
    /// The task panicked and cannot be restarted.
    Crashed,
}

/// `Stopped -> Running` on [`start`](Self::start), `Running -> Stopped` on
/// [`stop`](Self::stop).
pub struct PeriodicLoop<T> {
    interval: Duration,
    state: LoopState<T>,
}

impl<T: PeriodicTask> PeriodicLoop<T> {
    pub fn new(task: T, interval: Duration) -> Self {
        Self {
            interval,
            state: LoopState::Stopped(task),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running { .. })
    }

    /// Spawn the loop. The first cycle runs immediately. No-op when already running.
    pub fn start(&mut self) {
        match std::mem::replace(&mut self.state, LoopState::Crashed) {
            LoopState::Stopped(task) => {
                let name = task.name();
                let (stop, receiver) = watch::channel(false);
                let handle = tokio::spawn(run_loop(task, self.interval, receiver));
                info!(task = %name, interval_secs = self.interval.as_secs(), "Started loop");
                self.state = LoopState::Running { stop, handle };
            }
            running @ LoopState::Running { .. } => {
                warn!("Loop already running");
                self.state = running;
            }
            LoopState::Crashed => {
                error!("Loop crashed earlier and cannot be restarted");
            }
        }
    }

    /// Stop scheduling cycles and wait for an in-flight cycle to finish.
    pub async fn stop(&mut self) {
        match std::mem::replace(&mut self.state, LoopState::Crashed) {
            LoopState::Running { stop, handle } => {
                // The receiver may already be gone if the task exited
                let _ = stop.send(true);
                match handle.await {
                    Ok(task) => {
                        info!(task = %task.name(), "Stopped loop");
                        self.state = LoopState::Stopped(task);
                    }
                    Err(e) => {
                        error!(error = %e, "Loop task panicked");
                    }
                }
            }
            other => self.state = other,
        }
    }

    /// Access the task while stopped.
    pub fn task(&self) -> Option<&T> {
        match &self.state {
            LoopState::Stopped(task) => Some(task),
            _ => None,
        }
    }

    /// Mutable access to the task while stopped.
    pub fn task_mut(&mut self) -> Option<&mut T> {
        match &mut self.state {
            LoopState::Stopped(task) => Some(task),
            _ => None,
        }
    }
}
