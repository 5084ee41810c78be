//! Scan screen controller
//!
//! Combines the gate, the ISBN check and the lookup result into the state a
//! scan screen renders. The controller is synchronous: it hands out a
//! [`LookupTicket`] when a lookup should start and is told the result through
//! [`ScanController::settle`]. Running the lookup is the caller's job (see
//! `session`).

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::decode::DecodeEvent;
use super::gate::{GateDecision, GateOptions, ScanGate, ScanState};
use crate::catalog::{LookupError, LookupOutcome};
use crate::isbn::{self, Isbn, IsbnCheck};
use crate::models::BookRecord;

/// What the scan screen shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScreenState {
    Idle,
    Scanning,
    Resolving { isbn: Isbn },
    Resolved { isbn: Isbn, outcome: LookupOutcome },
    LookupFailed { isbn: Isbn, error: String },
}

impl ScreenState {
    pub fn name(&self) -> &'static str {
        match self {
            ScreenState::Idle => "idle",
            ScreenState::Scanning => "scanning",
            ScreenState::Resolving { .. } => "resolving",
            ScreenState::Resolved { .. } => "resolved",
            ScreenState::LookupFailed { .. } => "lookup_failed",
        }
    }

    /// A lookup finished, successfully or not
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ScreenState::Resolved { .. } | ScreenState::LookupFailed { .. }
        )
    }

    pub fn is_resolving(&self) -> bool {
        matches!(self, ScreenState::Resolving { .. })
    }
}

/// Events for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    /// The screen state changed
    StateChanged { state: ScreenState },
    /// A barcode was accepted and a lookup started
    Accepted { isbn: Isbn },
    /// The lookup found a book
    Resolved { book: BookRecord },
    /// The catalog has no match
    NotFound { isbn: Isbn },
    /// The lookup failed
    LookupFailed { isbn: Isbn, error: String },
}

/// Permission to run exactly one lookup
///
/// Results carrying an outdated ticket are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    generation: u64,
    isbn: Isbn,
}

impl LookupTicket {
    pub fn isbn(&self) -> &Isbn {
        &self.isbn
    }
}

/// Result of an arming request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// Scanning now
    Armed,
    /// The gate is cooling down; scanning starts when it is ready
    Deferred,
    /// A scan is being resolved or awaits "scan again"
    Busy,
}

/// Scan screen state machine
#[derive(Debug)]
pub struct ScanController {
    gate: ScanGate,
    state: ScreenState,
    generation: u64,
    arm_pending: bool,
    events: Vec<ScanEvent>,
}

impl Default for ScanController {
    fn default() -> Self {
        Self::new(GateOptions::default())
    }
}

impl ScanController {
    pub fn new(options: GateOptions) -> Self {
        Self {
            gate: ScanGate::new(options),
            state: ScreenState::Idle,
            generation: 0,
            arm_pending: false,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    pub fn gate(&self) -> &ScanGate {
        &self.gate
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<ScanEvent> {
        std::mem::take(&mut self.events)
    }

    /// User asked to scan
    pub fn arm(&mut self, now: Instant) -> ArmOutcome {
        self.tick(now);
        match self.state {
            ScreenState::Idle | ScreenState::Scanning => {
                if self.gate.arm(now) {
                    self.arm_pending = false;
                    self.set_state(ScreenState::Scanning);
                    ArmOutcome::Armed
                } else {
                    debug!("Gate cooling down, arming deferred");
                    self.arm_pending = true;
                    ArmOutcome::Deferred
                }
            }
            _ => ArmOutcome::Busy,
        }
    }

    /// Feed a camera event
    ///
    /// Returns a ticket when a valid ISBN was accepted and a lookup should
    /// start. Payloads that pass the gate but are not ISBNs (e.g. other
    /// EAN-13 product codes) are dropped silently and scanning continues.
    pub fn on_decode(&mut self, event: &DecodeEvent, now: Instant) -> Option<LookupTicket> {
        self.tick(now);
        if self.state != ScreenState::Scanning {
            return None;
        }

        let GateDecision::Accept(payload) = self.gate.process(event, now) else {
            return None;
        };

        match isbn::check(&payload) {
            IsbnCheck::Invalid => {
                debug!(payload = %payload, "Accepted barcode is not an ISBN, still scanning");
                self.gate.reject_accepted(now);
                None
            }
            IsbnCheck::Valid(isbn) => {
                self.gate.acknowledge(now);
                self.generation += 1;
                info!(%isbn, "Barcode accepted");
                self.events.push(ScanEvent::Accepted { isbn: isbn.clone() });
                self.set_state(ScreenState::Resolving { isbn: isbn.clone() });
                Some(LookupTicket {
                    generation: self.generation,
                    isbn,
                })
            }
        }
    }

    /// Apply a lookup result
    ///
    /// Returns `false` when the ticket is stale (teardown or a newer scan)
    /// and the result was discarded.
    pub fn settle(
        &mut self,
        ticket: LookupTicket,
        result: Result<LookupOutcome, LookupError>,
    ) -> bool {
        if ticket.generation != self.generation || !self.state.is_resolving() {
            debug!(isbn = %ticket.isbn, "Discarding stale lookup result");
            return false;
        }

        let isbn = ticket.isbn;
        match result {
            Ok(outcome) => {
                match &outcome {
                    LookupOutcome::Found(book) => {
                        self.events.push(ScanEvent::Resolved { book: book.clone() })
                    }
                    LookupOutcome::NotFound => {
                        self.events.push(ScanEvent::NotFound { isbn: isbn.clone() })
                    }
                }
                self.set_state(ScreenState::Resolved { isbn, outcome });
            }
            Err(e) => {
                warn!(%isbn, "Lookup failed: {}", e);
                let error = e.to_string();
                self.events.push(ScanEvent::LookupFailed {
                    isbn: isbn.clone(),
                    error: error.clone(),
                });
                self.set_state(ScreenState::LookupFailed { isbn, error });
            }
        }
        true
    }

    /// Leave a settled result and return to `Idle`
    ///
    /// The last accepted code is forgotten so the same book can be retried.
    pub fn scan_again(&mut self) -> bool {
        if !self.state.is_settled() {
            return false;
        }
        self.gate.forget_last();
        self.set_state(ScreenState::Idle);
        true
    }

    /// Drive gate timers; returns `true` if anything changed
    pub fn tick(&mut self, now: Instant) -> bool {
        let before = self.state.clone();
        self.gate.tick(now);

        if self.state == ScreenState::Scanning && !self.gate.state().is_armed() {
            debug!("Nothing scanned before timeout, disarming");
            self.set_state(ScreenState::Idle);
        }

        if self.arm_pending
            && self.state == ScreenState::Idle
            && *self.gate.state() == ScanState::Idle
        {
            self.arm_pending = false;
            if self.gate.arm(now) {
                self.set_state(ScreenState::Scanning);
            }
        }

        self.state != before
    }

    /// Next instant at which [`tick`](Self::tick) has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.gate.next_deadline()
    }

    /// Screen went away: reset and invalidate any pending lookup
    pub fn teardown(&mut self) {
        self.gate.reset();
        self.generation += 1;
        self.arm_pending = false;
        self.set_state(ScreenState::Idle);
    }

    fn set_state(&mut self, state: ScreenState) {
        if self.state != state {
            debug!(from = self.state.name(), to = state.name(), "Scan screen state changed");
            self.state = state.clone();
            self.events.push(ScanEvent::StateChanged { state });
        }
    }
}
