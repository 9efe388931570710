//! Connectivity channel: best-effort status publishing over a lossy link.
//!
//! [`StatusLink`] is the narrow seam the platform implements (Wi-Fi
//! association, broker session, wire encoding all live behind it).
//! [`ResilientChannel`] wraps any link with the degradation policy the
//! controller depends on:
//!
//! 1. try the publish;
//! 2. on failure, one [`StatusLink::reconnect`] and exactly one retry;
//! 3. a second failure (or a failed reconnect) is logged and swallowed.
//!
//! Delivery is never load-bearing: the dose-tracking and alert logic
//! proceed identically whether a message went out or was dropped, so
//! [`ResilientChannel::publish`] returns an informational
//! [`PublishOutcome`] rather than an error.

pub mod error;

pub use error::LinkError;

use serde::Serialize;
use tracing::{debug, info, warn};

// ── Wire vocabulary ───────────────────────────────────────────────────────────

/// Raw marker published on the alert topic the instant a dose fires.
pub const ALERT_TRIGGER_MARKER: &str = "ALARM_TRIGGERED";

/// The two reportable phases of a dose cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseStatus {
    /// Alert started, awaiting physical confirmation.
    AlertActive,
    /// Dose confirmed by the user.
    Confirmed,
}

impl DoseStatus {
    /// The literal `status` field value for this phase.
    pub fn text(self) -> &'static str {
        match self {
            DoseStatus::AlertActive => "alert active - awaiting confirmation",
            DoseStatus::Confirmed => "dose confirmed",
        }
    }
}

/// Shape of every status-topic payload: one `status` field.
#[derive(Serialize)]
struct StatusRecord<'a> {
    status: &'a str,
}

/// Encode a status as its JSON record.
pub fn encode_status(status: DoseStatus) -> Vec<u8> {
    serde_json::to_vec(&StatusRecord {
        status: status.text(),
    })
    .expect("a one-field string record always serializes")
}

// ── StatusLink seam ───────────────────────────────────────────────────────────

/// Publish-capable, reconnectable link implemented by the platform layer.
pub trait StatusLink {
    /// Establish the initial network association and broker session.
    fn connect(&mut self) -> Result<(), LinkError>;

    /// Send `payload` on `topic`.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError>;

    /// Re-establish the association (idempotent if already associated)
    /// and a fresh broker session.  May block for an unbounded time while
    /// the platform retries; the channel only calls it reactively.
    fn reconnect(&mut self) -> Result<(), LinkError>;
}

/// Last known link health, inferred from operation outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Disconnected,
}

/// What became of one best-effort publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// First attempt succeeded.
    Delivered,
    /// First attempt failed; the reconnect-and-retry succeeded.
    DeliveredAfterReconnect,
    /// Both attempts (or the reconnect itself) failed; message discarded.
    Dropped,
}

// ── ResilientChannel ──────────────────────────────────────────────────────────

/// Wraps a [`StatusLink`] with the reconnect-then-retry-once policy.
#[derive(Debug)]
pub struct ResilientChannel<L> {
    link: L,
    state: LinkState,
}

impl<L: StatusLink> ResilientChannel<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            state: LinkState::Disconnected,
        }
    }

    /// Startup connect.  Unlike [`publish`](Self::publish) this surfaces
    /// the error: a link that cannot come up at boot is an operator
    /// problem, not a runtime degradation.
    pub fn connect(&mut self) -> Result<(), LinkError> {
        self.link.connect()?;
        self.state = LinkState::Connected;
        info!("status link connected");
        Ok(())
    }

    /// Last observed link health.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Borrow the wrapped link.
    pub fn get_ref(&self) -> &L {
        &self.link
    }

    /// Best-effort publish with the single-retry policy.  Never fails from
    /// the caller's point of view; the outcome is informational.
    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> PublishOutcome {
        match self.link.publish(topic, payload) {
            Ok(()) => {
                self.state = LinkState::Connected;
                debug!(topic, len = payload.len(), "published");
                PublishOutcome::Delivered
            }
            Err(e) => {
                warn!(topic, error = %e, "publish failed, attempting reconnect");
                self.state = LinkState::Disconnected;
                self.reconnect_and_retry(topic, payload)
            }
        }
    }

    /// Encode `status` and publish it on `topic`.
    pub fn publish_status(&mut self, topic: &str, status: DoseStatus) -> PublishOutcome {
        info!(topic, status = status.text(), "reporting status");
        self.publish(topic, &encode_status(status))
    }

    fn reconnect_and_retry(&mut self, topic: &str, payload: &[u8]) -> PublishOutcome {
        if let Err(e) = self.link.reconnect() {
            warn!(topic, error = %e, "reconnect failed, message dropped");
            return PublishOutcome::Dropped;
        }
        match self.link.publish(topic, payload) {
            Ok(()) => {
                self.state = LinkState::Connected;
                info!(topic, "delivered after reconnect");
                PublishOutcome::DeliveredAfterReconnect
            }
            Err(e) => {
                warn!(topic, error = %e, "publish failed even after reconnect, message dropped");
                PublishOutcome::Dropped
            }
        }
    }
}

// ── LogOnlyLink ───────────────────────────────────────────────────────────────

/// A link that logs every operation and never fails.
///
/// Default backend of the host simulation harness; lets the whole dose
/// cycle be exercised without a broker.
#[derive(Debug, Default)]
pub struct LogOnlyLink;

impl StatusLink for LogOnlyLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        info!("link(LOG): connect");
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError> {
        info!(
            topic,
            payload = %String::from_utf8_lossy(payload),
            "link(LOG): publish"
        );
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), LinkError> {
        info!("link(LOG): reconnect");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
