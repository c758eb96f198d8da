//! Stream frame decoding
//!
//! The backend frames its stream as one event per line. Two framings are in
//! the wild: a fixed `data: ` prefix followed by one JSON envelope, and bare
//! lines carrying one or more concatenated JSON envelopes. Both are handled
//! here; each envelope's `data` field is dispatched to a typed
//! [`StreamEvent`].

use serde_json::Deserializer;

use crate::error::{Error, Result};
use crate::types::{Envelope, StreamEvent};

/// Fixed-width line prefix used by the prefixed framing
const DATA_PREFIX: &str = "data: ";

/// Decode one framed line into stream events
///
/// Tries a whole-line decode first (the common single-envelope case), then
/// falls back to pulling JSON values off the front of the line until it is
/// exhausted. A trailing undecodable remainder is reported as a final error
/// after the events that did decode; it never retracts them.
pub(crate) fn decode_frame(line: &str) -> Vec<Result<StreamEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line);

    if let Ok(envelope) = serde_json::from_str::<Envelope>(payload) {
        return vec![StreamEvent::from_value(envelope.data)];
    }

    let mut events = Vec::new();
    let mut stream = Deserializer::from_str(payload).into_iter::<Envelope>();
    let mut consumed = 0;
    while let Some(item) = stream.next() {
        match item {
            Ok(envelope) => {
                events.push(StreamEvent::from_value(envelope.data));
                consumed = stream.byte_offset();
            }
            Err(err) => {
                if events.is_empty() {
                    events.push(Err(Error::Json(err)));
                } else {
                    let rest = payload[consumed..].trim_start();
                    events.push(Err(Error::TrailingData(rest.to_string())));
                }
                break;
            }
        }
    }
    events
}
