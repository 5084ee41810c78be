//! Scan gate
//!
//! Turns the noisy, per-frame stream of decode events into at most one
//! accepted payload per physical scan. An event is accepted only when, in
//! order:
//!
//! 1. the gate is armed (`Scanning`),
//! 2. the symbology is EAN-13,
//! 3. the code sits in the upper half of the frame (books print the ISBN
//!    above a second, price barcode),
//! 4. the payload differs from the last accepted one.
//!
//! The gate does no I/O and owns no timers. Time is passed in explicitly and
//! expiry happens in [`ScanGate::tick`]; [`ScanGate::next_deadline`] tells the
//! driver when to call it.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::decode::{BoundingBox, DecodeEvent};

/// Gate timing and geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateOptions {
    /// Armed gate disarms itself after this long without an accept
    pub arm_timeout: Duration,
    /// Refractory period starting at acceptance
    pub cool_down: Duration,
    /// Frame height in pixels, needed to place pixel bounding boxes
    pub frame_height: Option<f64>,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            arm_timeout: Duration::from_secs(3),
            cool_down: Duration::from_secs(2),
            frame_height: None,
        }
    }
}

/// Gate state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    /// Not armed; events are ignored
    Idle,
    /// Armed and waiting for a barcode
    Scanning { armed_at: Instant },
    /// A payload was accepted and not yet handed off
    Accepted { payload: String, accepted_at: Instant },
    /// Handed off; waiting out the cool-down
    CoolingDown { until: Instant },
}

impl ScanState {
    pub fn is_armed(&self) -> bool {
        matches!(self, ScanState::Scanning { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::Scanning { .. } => "scanning",
            ScanState::Accepted { .. } => "accepted",
            ScanState::CoolingDown { .. } => "cooling_down",
        }
    }
}

/// Why an event was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotArmed,
    WrongSymbology,
    LowerHalf,
    Duplicate,
}

/// Outcome of feeding one event to the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Ignore(IgnoreReason),
    Accept(String),
}

impl GateDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, GateDecision::Accept(_))
    }
}

/// Scan gate state machine
#[derive(Debug, Clone)]
pub struct ScanGate {
    options: GateOptions,
    state: ScanState,
    last_accepted: Option<String>,
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::new(GateOptions::default())
    }
}

impl ScanGate {
    pub fn new(options: GateOptions) -> Self {
        Self {
            options,
            state: ScanState::Idle,
            last_accepted: None,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Most recently accepted payload
    pub fn last_accepted(&self) -> Option<&str> {
        self.last_accepted.as_deref()
    }

    /// Arm the gate
    ///
    /// Allowed from `Idle`, and from `Scanning` (restarts the timeout).
    /// Returns `false` while an accepted scan is pending or cooling down.
    pub fn arm(&mut self, now: Instant) -> bool {
        self.tick(now);
        match self.state {
            ScanState::Idle | ScanState::Scanning { .. } => {
                self.state = ScanState::Scanning { armed_at: now };
                debug!("Scan gate armed");
                true
            }
            _ => false,
        }
    }

    /// Decide on an event without changing state
    ///
    /// Timers are not consulted; call [`tick`](Self::tick) first (as
    /// [`process`](Self::process) does) for time-accurate decisions.
    pub fn decide(&self, event: &DecodeEvent) -> GateDecision {
        if !self.state.is_armed() {
            return GateDecision::Ignore(IgnoreReason::NotArmed);
        }
        if !event.symbology.is_book_barcode() {
            return GateDecision::Ignore(IgnoreReason::WrongSymbology);
        }
        if in_lower_half(event.bounding_box.as_ref(), self.options.frame_height) {
            return GateDecision::Ignore(IgnoreReason::LowerHalf);
        }
        if self.last_accepted.as_deref() == Some(event.payload.as_str()) {
            return GateDecision::Ignore(IgnoreReason::Duplicate);
        }
        GateDecision::Accept(event.payload.clone())
    }

    /// Feed one event, applying any resulting transition
    pub fn process(&mut self, event: &DecodeEvent, now: Instant) -> GateDecision {
        self.tick(now);

        let decision = self.decide(event);
        match &decision {
            GateDecision::Accept(payload) => {
                debug!(payload = %payload, "Scan gate accepted barcode");
                self.last_accepted = Some(payload.clone());
                self.state = ScanState::Accepted {
                    payload: payload.clone(),
                    accepted_at: now,
                };
            }
            GateDecision::Ignore(reason) => {
                trace!(?reason, symbology = %event.symbology, "Scan gate ignored barcode");
            }
        }
        decision
    }

    /// Hand off the accepted payload and start cooling down
    ///
    /// The cool-down is measured from acceptance, not from hand-off.
    pub fn acknowledge(&mut self, now: Instant) -> bool {
        self.tick(now);
        if let ScanState::Accepted { accepted_at, .. } = self.state {
            self.state = ScanState::CoolingDown {
                until: accepted_at + self.options.cool_down,
            };
            true
        } else {
            false
        }
    }

    /// Drop an accepted payload the caller could not use and re-arm
    ///
    /// The payload is still remembered, so the same code will not be
    /// accepted again while it stays in view.
    pub fn reject_accepted(&mut self, now: Instant) -> bool {
        if matches!(self.state, ScanState::Accepted { .. }) {
            self.state = ScanState::Scanning { armed_at: now };
            true
        } else {
            false
        }
    }

    /// Forget the last accepted payload
    pub fn forget_last(&mut self) {
        self.last_accepted = None;
    }

    /// Return to `Idle` with no memory
    pub fn reset(&mut self) {
        self.state = ScanState::Idle;
        self.last_accepted = None;
    }

    /// When the current state expires, if it does
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            ScanState::Idle => None,
            ScanState::Scanning { armed_at } => Some(armed_at + self.options.arm_timeout),
            ScanState::Accepted { accepted_at, .. } => Some(accepted_at + self.options.cool_down),
            ScanState::CoolingDown { until } => Some(until),
        }
    }

    /// Expire timers; returns `true` if the state changed
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.next_deadline() {
            Some(deadline) if now >= deadline => {
                debug!(from = self.state.name(), "Scan gate timer elapsed");
                self.state = ScanState::Idle;
                true
            }
            _ => false,
        }
    }
}

/// Whether a code sits in the lower half of the frame
///
/// Uses the box's `origin_y`. A value above 1 means pixel coordinates,
/// compared against half of `frame_height`; anything else is a normalized
/// fraction compared against 0.5. Missing or unusable geometry (and pixels
/// without a known frame height) never counts as lower half.
pub fn in_lower_half(bbox: Option<&BoundingBox>, frame_height: Option<f64>) -> bool {
    let Some(bbox) = bbox else {
        return false;
    };
    let y = bbox.origin_y;
    if !y.is_finite() || y < 0.0 {
        return false;
    }

    if y > 1.0 {
        match frame_height {
            Some(height) if height.is_finite() && height > 0.0 => y > height / 2.0,
            _ => false,
        }
    } else {
        y > 0.5
    }
}
