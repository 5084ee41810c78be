//! Barcode decode events and the camera subscription
//!
//! The camera pushes a [`DecodeEvent`] for every frame in which a code is
//! visible. Delivery goes through a bounded channel with a single consumer;
//! dropping or unsubscribing the [`DecodeSubscription`] stops delivery.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Barcode encoding scheme
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Symbology {
    /// EAN-13, the symbology used for ISBN-13
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code39,
    Code128,
    Qr,
    /// Anything else, as reported by the camera
    Other(String),
}

impl Symbology {
    /// Parse the name a camera API reports ("ean13", "EAN-13", "org.gs1.EAN-13", ...)
    pub fn from_name(name: &str) -> Self {
        let folded: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let key = folded
            .strip_prefix("orggs1")
            .or_else(|| folded.strip_prefix("orgiso"))
            .unwrap_or(folded.as_str());

        match key {
            "ean13" => Symbology::Ean13,
            "ean8" => Symbology::Ean8,
            "upca" => Symbology::UpcA,
            "upce" => Symbology::UpcE,
            "code39" => Symbology::Code39,
            "code128" => Symbology::Code128,
            "qr" | "qrcode" => Symbology::Qr,
            _ => Symbology::Other(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Symbology::Ean13 => "ean13",
            Symbology::Ean8 => "ean8",
            Symbology::UpcA => "upc_a",
            Symbology::UpcE => "upc_e",
            Symbology::Code39 => "code39",
            Symbology::Code128 => "code128",
            Symbology::Qr => "qr",
            Symbology::Other(name) => name,
        }
    }

    /// Whether this is the symbology printed as a book's ISBN barcode
    pub fn is_book_barcode(&self) -> bool {
        matches!(self, Symbology::Ean13)
    }
}

impl From<String> for Symbology {
    fn from(name: String) -> Self {
        Symbology::from_name(&name)
    }
}

impl From<Symbology> for String {
    fn from(symbology: Symbology) -> Self {
        symbology.as_str().to_string()
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vertical extent of a detected code
///
/// Either a normalized fraction of the frame (0..1) or raw pixels; see
/// `gate::in_lower_half` for how the two are told apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub origin_y: f64,
    #[serde(default)]
    pub height: f64,
}

impl BoundingBox {
    pub fn new(origin_y: f64, height: f64) -> Self {
        Self { origin_y, height }
    }
}

/// One barcode detection from the camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeEvent {
    pub symbology: Symbology,
    pub payload: String,
    /// Unreadable geometry deserializes as `None`
    #[serde(
        default,
        deserialize_with = "lenient_bounding_box",
        skip_serializing_if = "Option::is_none"
    )]
    pub bounding_box: Option<BoundingBox>,
}

/// Missing or malformed geometry means "unknown position", never a bad event
fn lenient_bounding_box<'de, D>(deserializer: D) -> Result<Option<BoundingBox>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Valid(BoundingBox),
        Other(IgnoredAny),
    }

    Ok(match Option::<Lenient>::deserialize(deserializer)? {
        Some(Lenient::Valid(bbox)) => Some(bbox),
        Some(Lenient::Other(_)) | None => None,
    })
}

impl DecodeEvent {
    pub fn new(symbology: Symbology, payload: impl Into<String>) -> Self {
        Self {
            symbology,
            payload: payload.into(),
            bounding_box: None,
        }
    }

    /// An EAN-13 detection, the common case
    pub fn ean13(payload: impl Into<String>) -> Self {
        Self::new(Symbology::Ean13, payload)
    }

    pub fn with_bounding_box(mut self, origin_y: f64, height: f64) -> Self {
        self.bounding_box = Some(BoundingBox::new(origin_y, height));
        self
    }
}

/// Why a decode event could not be delivered
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The subscriber is gone
    #[error("decode subscription closed")]
    Unsubscribed,
    /// The subscriber is behind; the frame was dropped
    #[error("decode subscription is full, frame dropped")]
    Full,
}

/// Create a camera decode channel
pub fn decode_channel(capacity: usize) -> (DecodeSender, DecodeSubscription) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (DecodeSender { tx }, DecodeSubscription { rx })
}

/// Producer side, held by the camera
#[derive(Debug, Clone)]
pub struct DecodeSender {
    tx: mpsc::Sender<DecodeEvent>,
}

impl DecodeSender {
    /// Deliver an event, waiting for room
    pub async fn send(&self, event: DecodeEvent) -> Result<(), DeliveryError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| DeliveryError::Unsubscribed)
    }

    /// Deliver an event from a synchronous frame callback
    ///
    /// Frames are redundant, so a full channel drops the event.
    pub fn try_send(&self, event: DecodeEvent) -> Result<(), DeliveryError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Unsubscribed,
        })
    }

    pub fn is_subscribed(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Consumer side, owned by the active scan session
#[derive(Debug)]
pub struct DecodeSubscription {
    rx: mpsc::Receiver<DecodeEvent>,
}

impl DecodeSubscription {
    /// Next event in arrival order; `None` once every sender is gone
    pub async fn next_event(&mut self) -> Option<DecodeEvent> {
        self.rx.recv().await
    }

    /// Stop delivery; pending events are discarded
    pub fn unsubscribe(mut self) {
        self.rx.close();
    }
}

impl Stream for DecodeSubscription {
    type Item = DecodeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
