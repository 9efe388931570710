//! Reminder configuration loading and validation.
//!
//! The expected YAML structure is:
//! ```yaml
//! schedule:
//!   - hour: 8
//!     minute: 30
//!   - hour: 14
//!     minute: 30
//! topics:
//!   alert: medication/alert
//!   status: medication/status
//! timing:
//!   poll_interval_ms: 500
//!   pulse_ms: 300
//!   confirm_pause_ms: 500
//! ```
//!
//! `schedule` is required and must be non-empty; `topics` and `timing`
//! fall back to the defaults above (the constants of the original
//! firmware).  Out-of-range dose times fail the load — a running
//! controller never sees an invalid [`DoseTime`].

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::schedule::DoseTime;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
///
/// Kept private – callers work with [`ReminderConfig`] instead.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    schedule: Vec<DoseEntry>,
    #[serde(default)]
    topics: TopicsEntry,
    #[serde(default)]
    timing: TimingEntry,
}

/// One dose time as it appears in the YAML file, before range validation.
#[derive(Debug, Deserialize)]
struct DoseEntry {
    hour: u8,
    minute: u8,
}

#[derive(Debug, Deserialize)]
struct TopicsEntry {
    #[serde(default = "default_alert_topic")]
    alert: String,
    #[serde(default = "default_status_topic")]
    status: String,
}

impl Default for TopicsEntry {
    fn default() -> Self {
        Self {
            alert: default_alert_topic(),
            status: default_status_topic(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TimingEntry {
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
    #[serde(default = "default_pulse_ms")]
    pulse_ms: u64,
    #[serde(default = "default_confirm_pause_ms")]
    confirm_pause_ms: u64,
}

impl Default for TimingEntry {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            pulse_ms: default_pulse_ms(),
            confirm_pause_ms: default_confirm_pause_ms(),
        }
    }
}

fn default_alert_topic() -> String {
    "medication/alert".to_string()
}

fn default_status_topic() -> String {
    "medication/status".to_string()
}

/// Main-loop poll cadence (the original's `time.sleep(0.5)`).
fn default_poll_interval_ms() -> u64 {
    500
}

/// On and off half of one alert duty cycle (the original's 0.3 s).
fn default_pulse_ms() -> u64 {
    300
}

/// Pause after a confirmed dose before polling resumes.
fn default_confirm_pause_ms() -> u64 {
    500
}

// ── Public data structures ────────────────────────────────────────────────────

/// The two publish destinations used by the controller.
#[derive(Debug, Clone)]
pub struct Topics {
    /// Receives the raw alert-trigger marker.
    pub alert: String,
    /// Receives the JSON status records.
    pub status: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            alert: default_alert_topic(),
            status: default_status_topic(),
        }
    }
}

/// Fixed cadences of the controller's cooperative loop.
#[derive(Debug, Clone, Copy)]
pub struct CycleTiming {
    /// Sleep between schedule polls.
    pub poll_interval: Duration,
    /// Duration of each on and each off half of an alert pulse.
    pub pulse: Duration,
    /// Pause after the confirmation status is reported.
    pub confirm_pause: Duration,
}

impl Default for CycleTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(default_poll_interval_ms()),
            pulse: Duration::from_millis(default_pulse_ms()),
            confirm_pause: Duration::from_millis(default_confirm_pause_ms()),
        }
    }
}

/// Validated startup configuration: the dose schedule plus loop timing
/// and topic names.  Loaded once; never reloaded.
#[derive(Debug)]
pub struct ReminderConfig {
    /// Dose times in configuration order.
    pub schedule: Vec<DoseTime>,
    pub topics: Topics,
    pub timing: CycleTiming,
}

impl ReminderConfig {
    /// Parse and validate `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is
    /// structurally invalid, the schedule is empty, or any dose time is
    /// out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading reminder configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        if file.schedule.is_empty() {
            bail!(
                "configuration file {} contains no dose times",
                path.display()
            );
        }

        let mut schedule = Vec::with_capacity(file.schedule.len());
        let mut seen = BTreeSet::new();
        for entry in &file.schedule {
            let dose = DoseTime::new(entry.hour, entry.minute).with_context(|| {
                format!(
                    "invalid dose time {:02}:{:02} in {}",
                    entry.hour,
                    entry.minute,
                    path.display()
                )
            })?;
            if !seen.insert(dose) {
                // Known limitation: duplicates share one fired mark, so
                // only the first configured occurrence fires each day.
                warn!(dose = %dose, "duplicate dose time; only its first occurrence fires per day");
            }
            debug!(dose = %dose, "dose time loaded");
            schedule.push(dose);
        }

        let config = Self {
            schedule,
            topics: Topics {
                alert: file.topics.alert,
                status: file.topics.status,
            },
            timing: CycleTiming {
                poll_interval: Duration::from_millis(file.timing.poll_interval_ms),
                pulse: Duration::from_millis(file.timing.pulse_ms),
                confirm_pause: Duration::from_millis(file.timing.confirm_pause_ms),
            },
        };

        info!(
            dose_count = config.schedule.len(),
            alert_topic = %config.topics.alert,
            status_topic = %config.topics.status,
            "Successfully loaded reminder configuration"
        );

        Ok(config)
    }

    /// The built-in fallback used when no configuration file is supplied:
    /// the original firmware's schedule (08:30, 14:30, 20:30) with default
    /// topics and timing.
    pub fn default_config() -> Self {
        let schedule = [(8, 30), (14, 30), (20, 30)]
            .into_iter()
            .map(|(h, m)| DoseTime::new(h, m).expect("built-in dose times are in range"))
            .collect();
        Self {
            schedule,
            topics: Topics::default(),
            timing: CycleTiming::default(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn load_full_config() {
        let yaml = r#"
schedule:
  - hour: 8
    minute: 30
  - hour: 14
    minute: 30
  - hour: 20
    minute: 30
topics:
  alert: meds/alert
  status: meds/status
timing:
  poll_interval_ms: 250
  pulse_ms: 200
  confirm_pause_ms: 100
"#;
        let f = yaml_tempfile(yaml);
        let cfg = ReminderConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.schedule.len(), 3);
        assert_eq!(cfg.schedule[0].to_string(), "08:30");
        assert_eq!(cfg.schedule[2].to_string(), "20:30");
        assert_eq!(cfg.topics.alert, "meds/alert");
        assert_eq!(cfg.topics.status, "meds/status");
        assert_eq!(cfg.timing.poll_interval, Duration::from_millis(250));
        assert_eq!(cfg.timing.pulse, Duration::from_millis(200));
        assert_eq!(cfg.timing.confirm_pause, Duration::from_millis(100));
    }

    #[test]
    fn topics_and_timing_default_when_absent() {
        let yaml = "schedule:\n  - hour: 8\n    minute: 30\n";
        let f = yaml_tempfile(yaml);
        let cfg = ReminderConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.topics.alert, "medication/alert");
        assert_eq!(cfg.topics.status, "medication/status");
        assert_eq!(cfg.timing.poll_interval, Duration::from_millis(500));
        assert_eq!(cfg.timing.pulse, Duration::from_millis(300));
    }

    #[test]
    fn out_of_range_hour_fails_the_load() {
        let yaml = "schedule:\n  - hour: 24\n    minute: 0\n";
        let f = yaml_tempfile(yaml);
        let err = ReminderConfig::load_from_file(f.path()).unwrap_err();
        assert!(format!("{err:#}").contains("24:00"));
    }

    #[test]
    fn empty_schedule_fails_the_load() {
        let f = yaml_tempfile("schedule: []\n");
        assert!(ReminderConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = ReminderConfig::load_from_file(Path::new("/nonexistent/reminder.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml:::");
        assert!(ReminderConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn duplicate_dose_times_are_kept_in_order() {
        // Duplicates load (with a warning); firing semantics are covered
        // by the schedule and controller tests.
        let yaml = "schedule:\n  - hour: 8\n    minute: 30\n  - hour: 8\n    minute: 30\n";
        let f = yaml_tempfile(yaml);
        let cfg = ReminderConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cfg.schedule.len(), 2);
        assert_eq!(cfg.schedule[0], cfg.schedule[1]);
    }

    #[test]
    fn default_config_matches_original_schedule() {
        let cfg = ReminderConfig::default_config();
        let times: Vec<String> = cfg.schedule.iter().map(|t| t.to_string()).collect();
        assert_eq!(times, ["08:30", "14:30", "20:30"]);
        assert_eq!(cfg.topics.alert, "medication/alert");
    }
}
