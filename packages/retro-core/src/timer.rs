/// Countdown timer for timeboxing retrospective phases.
///
/// Driven by the caller: one `tick` per elapsed second while running.
use std::fmt;

/// Durations offered as presets, in minutes.
pub const PRESET_MINUTES: [u32; 3] = [5, 15, 30];
pub const DEFAULT_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer is paused or already at zero.
    Idle,
    Running { remaining_secs: u32 },
    /// Reached zero on this tick; the timer stops itself.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownTimer {
    duration_minutes: u32,
    remaining_secs: u32,
    running: bool,
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new(DEFAULT_MINUTES)
    }
}

impl CountdownTimer {
    pub fn new(minutes: u32) -> Self {
        Self {
            duration_minutes: minutes,
            remaining_secs: minutes.saturating_mul(60),
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Start or pause. Starting at zero does nothing.
    pub fn toggle(&mut self) {
        self.running = !self.running && self.remaining_secs > 0;
    }

    /// Stop and rewind to the selected duration.
    pub fn reset(&mut self) {
        *self = Self::new(self.duration_minutes);
    }

    /// Select a new duration; stops the timer.
    pub fn set_duration(&mut self, minutes: u32) {
        *self = Self::new(minutes);
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.running || self.remaining_secs == 0 {
            self.running = false;
            return TickOutcome::Idle;
        }
        self.remaining_secs -= 1;
        if self.remaining_secs == 0 {
            self.running = false;
            log::debug!("[retro.timer] Countdown of {} min finished", self.duration_minutes);
            TickOutcome::Finished
        } else {
            TickOutcome::Running {
                remaining_secs: self.remaining_secs,
            }
        }
    }
}

/// `MM:SS`
impl fmt::Display for CountdownTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }
}
