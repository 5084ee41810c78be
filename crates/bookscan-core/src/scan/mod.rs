//! Barcode scanning pipeline
//!
//! Camera decode events flow through the [`ScanGate`], the ISBN check and a
//! catalog lookup, orchestrated by the [`ScanController`]. A [`ScanSession`]
//! runs the controller on a tokio task for the lifetime of a scan screen.
//!
//! ```text
//! camera -> DecodeEvent -> ScanGate -> isbn::check -> BookCatalog -> ScreenState
//! ```

mod controller;
mod decode;
mod gate;
mod session;

pub use controller::{ArmOutcome, LookupTicket, ScanController, ScanEvent, ScreenState};
pub use decode::{
    decode_channel, BoundingBox, DecodeEvent, DecodeSender, DecodeSubscription, DeliveryError,
    Symbology,
};
pub use gate::{in_lower_half, GateDecision, GateOptions, IgnoreReason, ScanGate, ScanState};
pub use session::{ScanSession, SessionHandle, SessionSummary};
