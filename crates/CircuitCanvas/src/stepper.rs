//! # Timed Stepping Loop
//!
//! A cancellable periodic task: one named background thread that runs a step
//! closure at a fixed frame rate until it is told to stop. At most one loop is
//! alive per `Stepper`; starting again first stops and joins the previous loop.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// What the loop does with the rest of an iteration's budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pace {
    /// Sleep for the remaining budget, already corrected for the last oversleep.
    Sleep(Duration),
    /// The iteration overran its budget. `yield_now` is set once enough
    /// consecutive iterations skipped their sleep.
    Skip { yield_now: bool },
}

/// Frame pacing with oversleep correction.
#[derive(Clone, Debug)]
pub struct FramePacer {
    period: Duration,
    skip_threshold: u32,
    oversleep: Duration,
    skipped: u32,
}

impl FramePacer {
    pub fn new(period: Duration, skip_threshold: u32) -> Self {
        Self {
            period,
            skip_threshold: skip_threshold.max(1),
            oversleep: Duration::ZERO,
            skipped: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Decides how to finish an iteration that took `work`.
    pub fn plan(&mut self, work: Duration) -> Pace {
        let remaining = self
            .period
            .checked_sub(work)
            .and_then(|left| left.checked_sub(self.oversleep))
            .filter(|left| !left.is_zero());

        match remaining {
            Some(sleep) => Pace::Sleep(sleep),
            None => {
                self.oversleep = Duration::ZERO;
                self.skipped += 1;
                let yield_now = self.skipped >= self.skip_threshold;
                if yield_now {
                    self.skipped = 0;
                }
                Pace::Skip { yield_now }
            }
        }
    }

    /// Records how long a planned sleep really took.
    pub fn record_sleep(&mut self, requested: Duration, actual: Duration) {
        self.oversleep = actual.saturating_sub(requested);
        self.skipped = 0;
    }

    pub fn oversleep(&self) -> Duration {
        self.oversleep
    }
}

/// Sub-step counter: counts down from the stepping ratio on every iteration
/// that stepped and wraps back to the ratio at zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
    ratio: u32,
    stepping: u32,
}

impl Cadence {
    pub fn new(ratio: u32) -> Self {
        let ratio = ratio.max(1);
        Self {
            ratio,
            stepping: ratio,
        }
    }

    pub fn ratio(&self) -> u32 {
        self.ratio
    }

    /// True on full-resolution iterations.
    pub fn is_full_step(&self) -> bool {
        self.stepping == self.ratio
    }

    pub fn advance(&mut self) {
        self.stepping -= 1;
        if self.stepping == 0 {
            self.stepping = self.ratio;
        }
    }

    pub fn reset(&mut self) {
        self.stepping = self.ratio;
    }
}

/// Runs `step` until `stop` is raised, pacing iterations with `pacer`.
///
/// The flag is checked before every iteration; a started step always completes.
pub fn run_paced(stop: &AtomicBool, mut pacer: FramePacer, mut step: impl FnMut()) {
    while !stop.load(Ordering::Acquire) {
        let before = Instant::now();
        step();
        match pacer.plan(before.elapsed()) {
            Pace::Sleep(sleep) => {
                let slept_from = Instant::now();
                thread::sleep(sleep);
                pacer.record_sleep(sleep, slept_from.elapsed());
            }
            Pace::Skip { yield_now } => {
                tracing::trace!(yield_now, "Frame overran its budget");
                if yield_now {
                    thread::yield_now();
                }
            }
        }
    }
}

struct ActiveLoop {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Owner of the background stepping thread.
pub struct Stepper {
    name: String,
    active: Option<ActiveLoop>,
}

impl Stepper {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Starts a new loop running `step`, stopping and joining any previous one first.
    pub fn start<F>(&mut self, pacer: FramePacer, step: F) -> io::Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.stop();

        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let period = pacer.period();
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || run_paced(&flag, pacer, step))?;

        tracing::info!(canvas = %self.name, ?period, "Stepping loop started");
        self.active = Some(ActiveLoop { stop, handle });
        Ok(())
    }

    /// Signals the loop and waits for it to finish. Returns false if none was running.
    pub fn stop(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        active.stop.store(true, Ordering::Release);
        if active.handle.join().is_err() {
            tracing::error!(canvas = %self.name, "Stepping loop panicked");
        } else {
            tracing::info!(canvas = %self.name, "Stepping loop stopped");
        }
        true
    }
}

impl Drop for Stepper {
    fn drop(&mut self) {
        self.stop();
    }
}
