//! Hardware-facing seams of the controller.
//!
//! The original firmware talks to an RTC, a LED, a buzzer, and a pull-up
//! button directly.  Here each of those roles is a narrow trait so the
//! controller can be driven identically by real bindings, by the host
//! simulation in [`sim`], or by deterministic fakes in tests.
//!
//! `Clock::sleep` is the controller's only suspension point.  Keeping it on
//! the clock (rather than calling `std::thread::sleep` inline) lets a fake
//! clock advance virtual time deterministically per call.

use std::time::Duration;

pub mod sim;

/// One sample of the wall clock.  Only the fields the controller consumes:
/// day-of-month for rollover detection, hour/minute for schedule matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

/// Supplies the current date/time on demand.  Reads never fail.
pub trait Clock {
    fn read(&mut self) -> ClockReading;

    /// Suspend the (single) thread of control for `dur`.
    fn sleep(&mut self, dur: Duration);
}

/// Drives the visual and audible indicators independently.
pub trait AlertOutputs {
    fn set_visual(&mut self, on: bool);
    fn set_audible(&mut self, on: bool);
}

/// Reports the physical acknowledgment signal, sampled on demand.
pub trait ConfirmButton {
    fn is_acknowledged(&mut self) -> bool;
}
