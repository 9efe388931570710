//! Host simulation implementations of the device seams.
//!
//! The original firmware was exercised under a simulator with the RTC
//! preset a few seconds before a scheduled dose; these types reproduce
//! that setup on a development host.  Real hardware bindings implement
//! the same traits instead.

use std::time::Duration;

use tracing::{debug, info};

use super::{AlertOutputs, Clock, ClockReading, ConfirmButton};

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_DAY: u64 = 24 * 60 * 60 * MS_PER_SECOND;

// ── SimClock ──────────────────────────────────────────────────────────────────

/// A simulated wall clock with a configurable start instant.
///
/// `sleep` advances virtual time by the full requested duration and then,
/// when `pace > 0`, really sleeps `dur / pace` so a run can be watched at
/// human speed (`pace = 1.0`) or accelerated.  `pace = 0.0` runs unpaced
/// (virtual time only), which is what the scenario tests rely on.
#[derive(Debug)]
pub struct SimClock {
    day: u8,
    millis_of_day: u64,
    /// Virtual seconds advanced per real second; `0.0` disables real sleeps.
    pace: f64,
}

impl SimClock {
    /// Start the clock at `day` (day of month) and the given time of day.
    /// Out-of-range fields are brought into range modulo their unit, so a
    /// caller-validated CLI value passes through unchanged.
    pub fn new(day: u8, hour: u8, minute: u8, second: u8) -> Self {
        let millis_of_day = (u64::from(hour % 24) * 3600
            + u64::from(minute % 60) * 60
            + u64::from(second % 60))
            * MS_PER_SECOND;
        Self {
            day,
            millis_of_day,
            pace: 0.0,
        }
    }

    /// Enable real-time pacing (virtual seconds per real second).
    pub fn with_pace(mut self, pace: f64) -> Self {
        self.pace = if pace.is_finite() && pace > 0.0 {
            pace
        } else {
            0.0
        };
        self
    }

    fn advance(&mut self, dur: Duration) {
        self.millis_of_day += dur.as_millis() as u64;
        while self.millis_of_day >= MS_PER_DAY {
            self.millis_of_day -= MS_PER_DAY;
            // Day-of-month is only compared for inequality, so a plain
            // 31-day wrap is enough for rollover detection.
            self.day = if self.day >= 31 { 1 } else { self.day + 1 };
            debug!(day = self.day, "simulated midnight rollover");
        }
    }
}

impl Clock for SimClock {
    fn read(&mut self) -> ClockReading {
        let seconds = self.millis_of_day / MS_PER_SECOND;
        ClockReading {
            day: self.day,
            hour: (seconds / 3600) as u8,
            minute: ((seconds / 60) % 60) as u8,
        }
    }

    fn sleep(&mut self, dur: Duration) {
        self.advance(dur);
        if self.pace > 0.0 {
            std::thread::sleep(dur.div_f64(self.pace));
        }
    }
}

// ── LogOutputs ────────────────────────────────────────────────────────────────

/// Indicator outputs that log state transitions instead of driving pins.
#[derive(Debug, Default)]
pub struct LogOutputs {
    visual: bool,
    audible: bool,
}

impl AlertOutputs for LogOutputs {
    fn set_visual(&mut self, on: bool) {
        if self.visual != on {
            debug!(on, "visual indicator");
            self.visual = on;
        }
    }

    fn set_audible(&mut self, on: bool) {
        if self.audible != on {
            debug!(on, "audible indicator");
            self.audible = on;
        }
    }
}

// ── CountdownButton ───────────────────────────────────────────────────────────

/// A scripted confirmation button: reports "not acknowledged" for a fixed
/// number of samples, then acknowledges forever after.
#[derive(Debug)]
pub struct CountdownButton {
    remaining: u32,
}

impl CountdownButton {
    /// Acknowledge after `samples` negative samples (0 = immediately).
    pub fn new(samples: u32) -> Self {
        Self { remaining: samples }
    }
}

impl ConfirmButton for CountdownButton {
    fn is_acknowledged(&mut self) -> bool {
        if self.remaining == 0 {
            info!("simulated confirmation press");
            true
        } else {
            self.remaining -= 1;
            false
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_clock_reads_preset_start() {
        let mut clock = SimClock::new(12, 8, 29, 50);
        assert_eq!(
            clock.read(),
            ClockReading {
                day: 12,
                hour: 8,
                minute: 29
            }
        );
    }

    #[test]
    fn sim_clock_advances_across_minute_boundary() {
        let mut clock = SimClock::new(12, 8, 29, 50);
        clock.sleep(Duration::from_secs(10));
        let reading = clock.read();
        assert_eq!((reading.hour, reading.minute), (8, 30));
    }

    #[test]
    fn sim_clock_rolls_over_at_midnight() {
        let mut clock = SimClock::new(12, 23, 59, 30);
        clock.sleep(Duration::from_secs(60));
        let reading = clock.read();
        assert_eq!(reading.day, 13);
        assert_eq!((reading.hour, reading.minute), (0, 0));
    }

    #[test]
    fn sim_clock_wraps_day_of_month() {
        let mut clock = SimClock::new(31, 23, 59, 59);
        clock.sleep(Duration::from_secs(2));
        assert_eq!(clock.read().day, 1);
    }

    #[test]
    fn countdown_button_acknowledges_after_n_samples() {
        let mut button = CountdownButton::new(3);
        assert!(!button.is_acknowledged());
        assert!(!button.is_acknowledged());
        assert!(!button.is_acknowledged());
        assert!(button.is_acknowledged());
        assert!(button.is_acknowledged(), "stays acknowledged");
    }

    #[test]
    fn countdown_button_zero_acknowledges_immediately() {
        let mut button = CountdownButton::new(0);
        assert!(button.is_acknowledged());
    }
}
