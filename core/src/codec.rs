//! Event codec.
//!
//! Events travel as JSON (`application/json`). Decoding is total: any input
//! either yields a structurally valid [`OrderEvent`] or a [`CodecError`].

use crate::event::OrderEvent;
use thiserror::Error;

/// Content type of encoded events.
pub const CONTENT_TYPE: &str = "application/json";

/// Error types for codec operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to serialize an event to bytes.
    #[error("Failed to encode event: {0}")]
    Encode(String),

    /// Bytes are not an order event.
    #[error("Failed to decode event: {0}")]
    Decode(String),

    /// The envelope parsed but violates an invariant.
    #[error("Invalid event: {0}")]
    Invalid(&'static str),
}

/// Encode an event to bytes.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode(event: &OrderEvent) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(event).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode an event from bytes.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for bytes that are not an order event and
/// [`CodecError::Invalid`] for an envelope without identifier or items.
pub fn decode(bytes: &[u8]) -> Result<OrderEvent, CodecError> {
    let event: OrderEvent =
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;

    if event.event_id.is_empty() {
        return Err(CodecError::Invalid("event_id is empty"));
    }
    if event.order.items().is_empty() {
        return Err(CodecError::Invalid("order has no items"));
    }

    Ok(event)
}
