//! Owned, cancellable timers for the mission engine.
//!
//! A timer only exists while its owning condition holds: the engine stores
//! each one in an `Option` and cancels it by setting that slot to `None`.
//! A cancelled timer has nowhere left to fire from, so stale callbacks after
//! a reset or completion cannot happen.
//!
//! ELI5:
//! ┌──────────── setInterval / setTimeout vs owned timers ────────────┐
//! │  Browser timer            │  Here                                │
//! ├───────────────────────────┼──────────────────────────────────────┤
//! │  id = setInterval(f, p)   │  slot = Some(Interval::new(p))       │
//! │  clearInterval(id)        │  slot = None                         │
//! │  id = setTimeout(f, d)    │  slot = Some(Timeout::new(d))        │
//! │  callback runs later      │  Schedule::next_due() + fire         │
//! └───────────────────────────┴──────────────────────────────────────┘

use std::time::Duration;

/// Repeating timer, due every `period` of elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period: Duration,
    elapsed: Duration,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Interval {
            period,
            elapsed: Duration::ZERO,
        }
    }

    pub fn until_due(&self) -> Duration {
        self.period.saturating_sub(self.elapsed)
    }

    fn elapse(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    /// Rearm after firing.
    fn rewind(&mut self) {
        self.elapsed = self.elapsed.saturating_sub(self.period);
    }
}

/// One-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    delay: Duration,
    elapsed: Duration,
}

impl Timeout {
    pub fn new(delay: Duration) -> Self {
        Timeout {
            delay,
            elapsed: Duration::ZERO,
        }
    }

    pub fn until_due(&self) -> Duration {
        self.delay.saturating_sub(self.elapsed)
    }

    /// Fraction of the delay already spent, `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.delay.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.delay.as_secs_f64()).min(1.0)
    }

    fn elapse(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }
}

/// Which timer came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Due {
    Dwell,
    Spawn,
    Motion,
}

/// Every timer a mission run may hold.
///
/// Ties are broken in declaration order of [`Due`], so a frame that lands
/// exactly on several deadlines is still replayed deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Schedule {
    pub dwell: Option<Timeout>,
    pub spawn: Option<Interval>,
    pub motion: Option<Interval>,
}

impl Schedule {
    pub fn armed(spawn_delay: Duration, tick_interval: Duration) -> Self {
        Schedule {
            dwell: None,
            spawn: Some(Interval::new(spawn_delay)),
            motion: Some(Interval::new(tick_interval)),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.dwell.is_none() && self.spawn.is_none() && self.motion.is_none()
    }

    pub fn cancel_all(&mut self) {
        *self = Schedule::default();
    }

    /// Earliest armed timer and how long until it fires.
    pub fn next_due(&self) -> Option<(Due, Duration)> {
        [
            self.dwell.map(|t| (Due::Dwell, t.until_due())),
            self.spawn.map(|t| (Due::Spawn, t.until_due())),
            self.motion.map(|t| (Due::Motion, t.until_due())),
        ]
        .into_iter()
        .flatten()
        // min_by_key keeps the first of equal keys
        .min_by_key(|(_, until)| *until)
    }

    /// Let `dt` pass on every armed timer.
    pub fn elapse(&mut self, dt: Duration) {
        if let Some(timer) = self.dwell.as_mut() {
            timer.elapse(dt);
        }
        if let Some(timer) = self.spawn.as_mut() {
            timer.elapse(dt);
        }
        if let Some(timer) = self.motion.as_mut() {
            timer.elapse(dt);
        }
    }

    /// Consume the firing: intervals rearm, the dwell timeout is dropped.
    pub fn acknowledge(&mut self, due: Due) {
        match due {
            Due::Dwell => self.dwell = None,
            Due::Spawn => {
                if let Some(timer) = self.spawn.as_mut() {
                    timer.rewind();
                }
            }
            Due::Motion => {
                if let Some(timer) = self.motion.as_mut() {
                    timer.rewind();
                }
            }
        }
    }
}
