//! Mission Progress Engine.
//!
//! TABLE
//! ┌──────────────────────── Mission Timeline ──────────────────────────────┐
//! │                                                                        │
//! │  spawn   ──●────────●────────●────────●────────●  (every spawn delay)  │
//! │  motion  ──┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼┼  (every tick)   │
//! │  dwell   ──────────[=====]─────────[=====]──── ...  (when reached)     │
//! │                    ▲     ▲                                             │
//! │        current within   dwell elapsed -> current += 1                  │
//! │        threshold        (last target -> complete, fires once)          │
//! │                                                                        │
//! └────────────────────────────────────────────────────────────────────────┘
//!
//! All three timers are owned by the engine ([`timer::Schedule`]) and driven
//! by [`MissionEngine::advance`]; nothing outside can fire them.

pub mod state;
pub mod timer;

use crate::config::MissionConfig;
use crate::error::ConfigError;
use log::{debug, info};
use std::time::Duration;

pub use state::{MissionState, Target};
pub use timer::{Due, Interval, Schedule, Timeout};

type CompletionCallback = Box<dyn FnMut()>;

/// Everything the display collaborator needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionFrame<'a> {
    pub targets: &'a [Target],
    pub current_target: usize,
    pub activated_count: usize,
    pub capturing: bool,
    /// `Some(0.0..=1.0)` while the current target is being held
    pub dwell_progress: Option<f64>,
    pub complete: bool,
}

/// Render sink for the engine. Receives frames, never talks back.
pub trait MissionDisplay {
    fn present(&mut self, frame: &MissionFrame<'_>);
}

pub struct MissionEngine {
    config: MissionConfig,
    state: MissionState,
    schedule: Schedule,
    on_complete: Option<CompletionCallback>,
}

impl MissionEngine {
    /// Build an engine that has not started yet: nothing moves and no timer
    /// is armed until [`MissionEngine::start`].
    pub fn new(config: MissionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = Self::parked_state(&config);
        Ok(MissionEngine {
            config,
            state,
            schedule: Schedule::default(),
            on_complete: None,
        })
    }

    /// Callback run once when the last target's dwell elapses.
    pub fn with_completion(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    fn parked_state(config: &MissionConfig) -> MissionState {
        MissionState::parked(
            |index| config.asset_for(index),
            config.target_count,
            config.initial_distance,
        )
    }

    pub fn start(&mut self) {
        let mut state = Self::parked_state(&self.config);
        state.active = true;
        self.state = state;
        // dropping the old schedule cancels whatever the previous run armed
        self.schedule = Schedule::armed(self.config.spawn_delay(), self.config.tick_interval());
        info!(
            "mission started: {} targets, spawn every {:?}, dwell {:?}",
            self.config.target_count,
            self.config.spawn_delay(),
            self.config.dwell_duration()
        );
    }

    /// Back to the post-`start` state, cancelling a pending dwell if any.
    pub fn reset(&mut self) {
        if self.schedule.dwell.is_some() {
            debug!(
                "reset while capturing target {}, dwell cancelled",
                self.state.current_target
            );
        }
        self.start();
    }

    /// Let `dt` of wall time pass, firing every timer that comes due in
    /// chronological order.
    pub fn advance(&mut self, dt: Duration) {
        let mut remaining = dt;
        loop {
            match self.schedule.next_due() {
                Some((due, until)) if until <= remaining => {
                    self.schedule.elapse(until);
                    remaining -= until;
                    self.schedule.acknowledge(due);
                    self.fire(due);
                }
                _ => {
                    self.schedule.elapse(remaining);
                    break;
                }
            }
        }
    }

    fn fire(&mut self, due: Due) {
        match due {
            Due::Dwell => self.on_dwell_elapsed(),
            Due::Spawn => self.spawn_next(),
            Due::Motion => self.tick(),
        }
    }

    /// One motion step: every spawned target moves by `speed`, then the
    /// current target is checked for arrival.
    ///
    /// Targets queued behind the current one do not keep moving freely: they
    /// stop at the approach line (`-proximity_threshold`). A dwell longer
    /// than the spawn delay would otherwise let them drift past the rocket
    /// before their turn, leaving a target that can never be reached. Once
    /// a held target becomes current, the next tick brings it inside the
    /// threshold.
    pub fn tick(&mut self) {
        if !self.state.active {
            return;
        }
        let current = self.state.current_target;
        let speed = self.config.speed;
        let threshold = self.config.proximity_threshold;

        for target in self.state.targets.iter_mut().filter(|t| t.spawned) {
            // trailing targets queue up at the approach line
            let hold_line = (target.index > current).then_some(-threshold);
            target.advance(speed, hold_line);
        }

        if self.state.capturing {
            return;
        }
        let reached = self
            .state
            .targets
            .get(current)
            .map_or(false, |target| target.spawned && target.is_within(threshold));
        if reached {
            self.state.capturing = true;
            self.schedule.dwell = Some(Timeout::new(self.config.dwell_duration()));
            info!("target {} reached, capturing", current);
        }
    }

    fn spawn_next(&mut self) {
        if !self.state.active {
            return;
        }
        let next = self.state.activated_count;
        if let Some(target) = self.state.targets.get_mut(next) {
            target.spawned = true;
            self.state.activated_count += 1;
            debug!("target {} ({}) spawned", next, target.display_asset);
        }
        if self.state.activated_count >= self.state.target_count() {
            // every target is out, the spawner has nothing left to do
            self.schedule.spawn = None;
        }
    }

    /// Dwell on the current target is over: advance, or finish the mission.
    ///
    /// Inert once the mission is no longer active, which keeps the
    /// completion callback to a single call per run.
    pub fn on_dwell_elapsed(&mut self) {
        if !self.state.active {
            return;
        }
        self.schedule.dwell = None;
        self.state.capturing = false;

        let current = self.state.current_target;
        if self.state.is_last(current) {
            self.state.active = false;
            self.state.complete = true;
            self.schedule.cancel_all();
            info!("target {} captured, mission complete", current);
            if let Some(callback) = self.on_complete.as_mut() {
                callback();
            }
        } else {
            self.state.current_target += 1;
            info!(
                "target {} captured, heading to target {}",
                current, self.state.current_target
            );
        }
    }

    pub fn state(&self) -> &MissionState {
        &self.state
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn frame(&self) -> MissionFrame<'_> {
        MissionFrame {
            targets: self.state.targets(),
            current_target: self.state.current_target,
            activated_count: self.state.activated_count,
            capturing: self.state.capturing,
            dwell_progress: self.schedule.dwell.map(|dwell| dwell.progress()),
            complete: self.state.complete,
        }
    }

    pub fn present(&self, display: &mut impl MissionDisplay) {
        display.present(&self.frame());
    }
}
