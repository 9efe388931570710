//! Dose schedule bookkeeping.
//!
//! [`DoseSchedule`] owns the configured list of [`DoseTime`]s together with
//! the per-day fired marks ("has this dose already alerted today").  It is
//! pure in-memory state: no clock access, no side effects beyond its own
//! fields.  The [`ReminderController`](crate::controller::ReminderController)
//! decides *when* to consult it and *when* a new day starts.
//!
//! # Design decisions vs the MicroPython implementation
//!
//! | Topic | MicroPython | Rust |
//! |---|---|---|
//! | Dose times | raw `(h, m)` tuples | validated [`DoseTime`] (invalid values unrepresentable) |
//! | Fired marks | module-global dict | field of `DoseSchedule`, owned by the controller |
//! | Scan order | list order | configuration order, preserved in `times` |
//! | Duplicates | dict key collapses them | same: one mark per distinct time, so no double fire |

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

// ── DoseTime ──────────────────────────────────────────────────────────────────

/// A dose time failed range validation.
///
/// Only produced at configuration time; a constructed [`DoseTime`] is always
/// in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimeOfDayError {
    /// Hour outside `0..=23`.
    #[error("hour {0} out of range (0-23)")]
    InvalidHour(u8),

    /// Minute outside `0..=59`.
    #[error("minute {0} out of range (0-59)")]
    InvalidMinute(u8),
}

/// A configured `(hour, minute)` at which an alert should fire.
///
/// Immutable once constructed.  `Ord`/`Hash` allow use as a fired-mark key;
/// ordering is chronological within the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DoseTime {
    hour: u8,
    minute: u8,
}

impl DoseTime {
    /// Validate and construct a dose time.
    ///
    /// # Errors
    /// Returns [`TimeOfDayError`] if `hour > 23` or `minute > 59`.
    pub fn new(hour: u8, minute: u8) -> Result<Self, TimeOfDayError> {
        if hour > 23 {
            return Err(TimeOfDayError::InvalidHour(hour));
        }
        if minute > 59 {
            return Err(TimeOfDayError::InvalidMinute(minute));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Exact wall-clock match: the observed hour *and* minute equal this
    /// dose time.  Seconds are deliberately not part of the model — the
    /// poll loop samples well below minute granularity.
    pub fn matches(&self, hour: u8, minute: u8) -> bool {
        self.hour == hour && self.minute == minute
    }
}

impl fmt::Display for DoseTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

// ── DoseSchedule ──────────────────────────────────────────────────────────────

/// The daily dose schedule and its per-day fired marks.
///
/// `times` keeps the configuration order (the controller's deterministic
/// scan order); `fired` holds one mark per *distinct* dose time, so a
/// duplicated entry can never fire twice in a day.
#[derive(Debug)]
pub struct DoseSchedule {
    times: Vec<DoseTime>,
    fired: BTreeMap<DoseTime, bool>,
}

impl DoseSchedule {
    /// Build a schedule with every fired mark `false`.
    pub fn new(times: Vec<DoseTime>) -> Self {
        let fired = times.iter().map(|&t| (t, false)).collect();
        Self { times, fired }
    }

    /// The configured dose times, in configuration order (duplicates kept).
    pub fn times(&self) -> &[DoseTime] {
        &self.times
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Clear every fired mark.  Called by the controller when a day
    /// rollover is detected.
    pub fn reset_for_day(&mut self) {
        for mark in self.fired.values_mut() {
            *mark = false;
        }
    }

    /// `true` iff `dose` matches the observed hour/minute exactly and has
    /// not fired yet today.
    pub fn is_due(&self, hour: u8, minute: u8, dose: DoseTime) -> bool {
        dose.matches(hour, minute) && !self.has_fired(dose)
    }

    /// First dose time (in configuration order) that is due at the
    /// observed hour/minute, or `None`.
    ///
    /// At most one dose fires per poll tick: a second entry sharing the
    /// same minute is not returned until the first has been marked, and by
    /// then duplicates share the mark and are skipped for the day.
    pub fn first_due(&self, hour: u8, minute: u8) -> Option<DoseTime> {
        self.times
            .iter()
            .copied()
            .find(|&t| self.is_due(hour, minute, t))
    }

    /// Record that `dose` has alerted today.  The controller calls this
    /// exactly once per completed alert cycle.
    pub fn mark_fired(&mut self, dose: DoseTime) {
        if let Some(mark) = self.fired.get_mut(&dose) {
            *mark = true;
        }
    }

    /// Whether `dose` has already alerted today.  Unknown times report
    /// `true` so they can never be considered due.
    pub fn has_fired(&self, dose: DoseTime) -> bool {
        self.fired.get(&dose).copied().unwrap_or(true)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
