//! The dose cycle state machine.
//!
//! [`ReminderController`] orchestrates the whole system: it polls the
//! clock, detects day rollovers, scans the schedule, and when a dose is
//! due it drives the indicators through a blocking alert cycle until the
//! user confirms.  One instance owns every collaborator — there is a
//! single thread of control and no ambient mutable state.
//!
//! # Design decisions vs the MicroPython implementation
//!
//! | Topic | MicroPython | Rust |
//! |---|---|---|
//! | State | module globals (`dia_atual`, `disparos_registrados`) | fields of `ReminderController` |
//! | Hardware access | `machine.Pin` / `machine.RTC` directly | [`device`](crate::device) traits |
//! | Network errors | `try/except OSError` around the loop | absorbed inside [`ResilientChannel`], never escape a tick |
//! | Loop body | inline in `while True` | [`poll_once`](ReminderController::poll_once), callable from tests |

use tracing::{debug, info};

use crate::config::{CycleTiming, Topics};
use crate::device::{AlertOutputs, Clock, ConfirmButton};
use crate::link::{DoseStatus, LinkState, ResilientChannel, StatusLink, ALERT_TRIGGER_MARKER};
use crate::schedule::DoseSchedule;

// ── Cycle state ───────────────────────────────────────────────────────────────

/// Phase of the dose cycle.  `Confirmed` is transient: it is reported and
/// the controller returns to `Idle` within the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Polling the clock, no alert active.
    Idle,
    /// Alert active, blocking on acknowledgment.
    Alerting,
    /// Acknowledgment received, confirmation being reported.
    Confirmed,
}

// ── ReminderController ────────────────────────────────────────────────────────

/// The orchestrating state machine.
///
/// Generic over the four seams so tests and the host harness can inject
/// deterministic implementations.
#[derive(Debug)]
pub struct ReminderController<C, O, B, L> {
    clock: C,
    outputs: O,
    button: B,
    channel: ResilientChannel<L>,
    schedule: DoseSchedule,
    topics: Topics,
    timing: CycleTiming,
    /// Last observed day-of-month; `None` until the first tick.
    current_day: Option<u8>,
    state: CycleState,
}

impl<C, O, B, L> ReminderController<C, O, B, L>
where
    C: Clock,
    O: AlertOutputs,
    B: ConfirmButton,
    L: StatusLink,
{
    pub fn new(
        clock: C,
        outputs: O,
        button: B,
        channel: ResilientChannel<L>,
        schedule: DoseSchedule,
        topics: Topics,
        timing: CycleTiming,
    ) -> Self {
        Self {
            clock,
            outputs,
            button,
            channel,
            schedule,
            topics,
            timing,
            current_day: None,
            state: CycleState::Idle,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn schedule(&self) -> &DoseSchedule {
        &self.schedule
    }

    pub fn link_state(&self) -> LinkState {
        self.channel.state()
    }

    /// Run the cooperative poll loop forever.
    ///
    /// The only blocking phases are [`Clock::sleep`] between ticks and the
    /// acknowledgment wait inside an alert cycle; neither has a timeout by
    /// design — an alert must never self-dismiss.
    pub fn run(&mut self) -> ! {
        info!(
            dose_count = self.schedule.times().len(),
            poll_interval = ?self.timing.poll_interval,
            "controller running"
        );
        loop {
            self.poll_once();
            self.clock.sleep(self.timing.poll_interval);
        }
    }

    /// One poll tick: rollover check, then at most one dose cycle.
    ///
    /// Network failures cannot escape: every link operation goes through
    /// the resilient channel, which degrades internally.  In-memory state
    /// (fired marks, current day) survives any link outage.
    pub fn poll_once(&mut self) {
        let now = self.clock.read();

        // Day rollover: fresh fired marks for the new day.
        if self.current_day != Some(now.day) {
            if self.current_day.is_some() {
                info!(day = now.day, "new day detected, resetting dose marks");
                self.schedule.reset_for_day();
            }
            self.current_day = Some(now.day);
        }

        // First due dose in configuration order; at most one per tick.  A
        // second dose sharing the same minute is skipped for the day
        // (known limitation, see the schedule module).
        if let Some(dose) = self.schedule.first_due(now.hour, now.minute) {
            info!(dose = %dose, "dose time reached");
            self.channel
                .publish(&self.topics.alert, ALERT_TRIGGER_MARKER.as_bytes());
            self.state = CycleState::Alerting;
            self.run_alert_cycle();
            self.schedule.mark_fired(dose);
            self.state = CycleState::Idle;
            debug!(dose = %dose, "dose cycle complete");
        }
    }

    /// Blocking alert cycle: pulse both indicators until the button
    /// acknowledges.  The clock and schedule are not re-checked while the
    /// alert is active; the only exit is the acknowledgment signal.
    fn run_alert_cycle(&mut self) {
        info!("alert active, waiting for confirmation");
        self.channel
            .publish_status(&self.topics.status, DoseStatus::AlertActive);

        // One button sample per full on/off duty cycle.
        while !self.button.is_acknowledged() {
            self.outputs.set_visual(true);
            self.outputs.set_audible(true);
            self.clock.sleep(self.timing.pulse);
            self.outputs.set_visual(false);
            self.outputs.set_audible(false);
            self.clock.sleep(self.timing.pulse);
        }

        self.outputs.set_visual(false);
        self.outputs.set_audible(false);
        self.state = CycleState::Confirmed;
        self.channel
            .publish_status(&self.topics.status, DoseStatus::Confirmed);
        info!("dose confirmed");
        self.clock.sleep(self.timing.confirm_pause);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::sim::CountdownButton;
    use crate::device::ClockReading;
    use crate::link::LinkError;
    use crate::schedule::DoseTime;
    use std::time::Duration;

    // ── Test doubles ──────────────────────────────────────────────────────────

    /// Replays a fixed list of readings, one per `read()`; sticks on the
    /// last entry.  `sleep` only accumulates the requested duration.
    struct ScriptClock {
        readings: Vec<ClockReading>,
        next: usize,
        slept: Duration,
    }

    impl ScriptClock {
        fn new(readings: &[(u8, u8, u8)]) -> Self {
            Self {
                readings: readings
                    .iter()
                    .map(|&(day, hour, minute)| ClockReading { day, hour, minute })
                    .collect(),
                next: 0,
                slept: Duration::ZERO,
            }
        }
    }

    impl Clock for ScriptClock {
        fn read(&mut self) -> ClockReading {
            let idx = self.next.min(self.readings.len() - 1);
            self.next += 1;
            self.readings[idx]
        }

        fn sleep(&mut self, dur: Duration) {
            self.slept += dur;
        }
    }

    /// Records every indicator transition as `(output, on)`.
    #[derive(Default)]
    struct RecordingOutputs {
        events: Vec<(&'static str, bool)>,
    }

    impl RecordingOutputs {
        fn pulses(&self) -> usize {
            self.events
                .iter()
                .filter(|&&(out, on)| out == "visual" && on)
                .count()
        }
    }

    impl AlertOutputs for RecordingOutputs {
        fn set_visual(&mut self, on: bool) {
            self.events.push(("visual", on));
        }

        fn set_audible(&mut self, on: bool) {
            self.events.push(("audible", on));
        }
    }

    /// Captures published messages; optionally fails every operation.
    #[derive(Default)]
    struct RecordingLink {
        dead: bool,
        published: Vec<(String, Vec<u8>)>,
        reconnect_calls: u32,
    }

    impl StatusLink for RecordingLink {
        fn connect(&mut self) -> Result<(), LinkError> {
            Ok(())
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError> {
            if self.dead {
                return Err(LinkError::Publish {
                    topic: topic.to_string(),
                    reason: "link down".to_string(),
                });
            }
            self.published.push((topic.to_string(), payload.to_vec()));
            Ok(())
        }

        fn reconnect(&mut self) -> Result<(), LinkError> {
            self.reconnect_calls += 1;
            if self.dead {
                return Err(LinkError::Association("link down".to_string()));
            }
            Ok(())
        }
    }

    type TestController =
        ReminderController<ScriptClock, RecordingOutputs, CountdownButton, RecordingLink>;

    fn controller(
        readings: &[(u8, u8, u8)],
        times: &[(u8, u8)],
        ack_after: u32,
        dead_link: bool,
    ) -> TestController {
        let schedule = DoseSchedule::new(
            times
                .iter()
                .map(|&(h, m)| DoseTime::new(h, m).unwrap())
                .collect(),
        );
        let mut channel = ResilientChannel::new(RecordingLink {
            dead: dead_link,
            ..RecordingLink::default()
        });
        channel.connect().unwrap();
        ReminderController::new(
            ScriptClock::new(readings),
            RecordingOutputs::default(),
            CountdownButton::new(ack_after),
            channel,
            schedule,
            Topics::default(),
            CycleTiming::default(),
        )
    }

    fn published_on<'a>(ctl: &'a TestController, topic: &str) -> Vec<&'a [u8]> {
        ctl.channel
            .get_ref()
            .published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_slice())
            .collect()
    }

    // ── Scenario tests ────────────────────────────────────────────────────────

    #[test]
    fn fires_once_at_the_exact_minute() {
        // Polls at 08:29, 08:30, 08:30 (the 29:59 / 30:00 / 30:01 scenario
        // at minute granularity); ack on the first sample.
        let mut ctl = controller(&[(12, 8, 29), (12, 8, 30), (12, 8, 30)], &[(8, 30)], 0, false);

        ctl.poll_once();
        assert!(published_on(&ctl, "medication/alert").is_empty(), "too early");

        ctl.poll_once();
        assert_eq!(
            published_on(&ctl, "medication/alert"),
            [b"ALARM_TRIGGERED".as_slice()]
        );
        assert!(ctl.schedule().has_fired(DoseTime::new(8, 30).unwrap()));

        ctl.poll_once();
        assert_eq!(
            published_on(&ctl, "medication/alert").len(),
            1,
            "no second firing within the same minute"
        );
    }

    #[test]
    fn reports_alert_then_confirmation_on_the_status_topic() {
        let mut ctl = controller(&[(12, 8, 30)], &[(8, 30)], 0, false);
        ctl.poll_once();

        let status = published_on(&ctl, "medication/status");
        assert_eq!(status.len(), 2);
        assert_eq!(status[0], br#"{"status":"alert active - awaiting confirmation"}"#);
        assert_eq!(status[1], br#"{"status":"dose confirmed"}"#);
    }

    #[test]
    fn three_negative_samples_mean_three_duty_cycles() {
        let mut ctl = controller(&[(12, 8, 30)], &[(8, 30)], 3, false);
        ctl.poll_once();

        assert_eq!(ctl.outputs.pulses(), 3, "one on-pulse per negative sample");
        // Final transitions leave both indicators off.
        assert_eq!(ctl.outputs.events.last(), Some(&("audible", false)));
        assert_eq!(ctl.state(), CycleState::Idle);
    }

    #[test]
    fn alert_cycle_sleeps_both_pulse_halves() {
        let mut ctl = controller(&[(12, 8, 30)], &[(8, 30)], 2, false);
        ctl.poll_once();
        // 2 duty cycles x (300ms on + 300ms off) + 500ms confirm pause.
        assert_eq!(ctl.clock.slept, Duration::from_millis(2 * 600 + 500));
    }

    #[test]
    fn day_rollover_resets_marks_and_refires() {
        let mut ctl = controller(
            &[(12, 8, 30), (12, 8, 30), (13, 8, 30)],
            &[(8, 30)],
            0,
            false,
        );
        ctl.poll_once(); // fires on day 12
        ctl.poll_once(); // same day, same minute: suppressed
        ctl.poll_once(); // day 13: marks reset, fires again
        assert_eq!(published_on(&ctl, "medication/alert").len(), 2);
    }

    #[test]
    fn first_observed_day_does_not_reset() {
        let mut ctl = controller(&[(12, 8, 30)], &[(8, 30)], 0, false);
        // The first tick both latches the day and fires the due dose.
        ctl.poll_once();
        assert_eq!(published_on(&ctl, "medication/alert").len(), 1);
    }

    #[test]
    fn duplicate_dose_times_fire_once() {
        // Two identical entries: exactly the first fires; the second is
        // lost for the day (documented limitation).
        let mut ctl = controller(
            &[(12, 8, 30), (12, 8, 30)],
            &[(8, 30), (8, 30)],
            0,
            false,
        );
        ctl.poll_once();
        ctl.poll_once();
        assert_eq!(published_on(&ctl, "medication/alert").len(), 1);
    }

    #[test]
    fn later_dose_in_a_different_minute_still_fires() {
        let mut ctl = controller(
            &[(12, 8, 30), (12, 8, 31)],
            &[(8, 30), (8, 31)],
            0,
            false,
        );
        ctl.poll_once();
        ctl.poll_once();
        assert_eq!(published_on(&ctl, "medication/alert").len(), 2);
        assert!(ctl.schedule().has_fired(DoseTime::new(8, 31).unwrap()));
    }

    #[test]
    fn alert_cycle_completes_with_the_link_down() {
        // Every publish and reconnect fails; the physical alert and the
        // fired bookkeeping must be unaffected.
        let mut ctl = controller(&[(12, 8, 30)], &[(8, 30)], 2, true);
        ctl.poll_once();

        assert_eq!(ctl.outputs.pulses(), 2);
        assert!(ctl.schedule().has_fired(DoseTime::new(8, 30).unwrap()));
        assert_eq!(ctl.state(), CycleState::Idle);
        assert_eq!(ctl.link_state(), LinkState::Disconnected);
        // Reconnect was attempted once per swallowed publish (marker + 2 statuses).
        assert_eq!(ctl.channel.get_ref().reconnect_calls, 3);
    }

    #[test]
    fn idle_tick_publishes_nothing() {
        let mut ctl = controller(&[(12, 12, 0)], &[(8, 30)], 0, false);
        ctl.poll_once();
        assert!(ctl.channel.get_ref().published.is_empty());
        assert_eq!(ctl.state(), CycleState::Idle);
    }
}
