//! Incremental decoder for the chat event stream.
//!
//! The stream is UTF-8 text made of newline-terminated lines. Event lines look
//! like `data: {"type": "...", "payload": {...}}`; every other line (blank
//! separators, comments, other SSE fields) carries no event.
//!
//! Bytes are fed as they arrive; only complete lines are ever parsed, so the
//! decoded sequence does not depend on where chunk boundaries fall.

use crate::wire::{ErrorPayload, StreamEvent};
use serde::Deserialize;

/// Prefix of an event line.
pub const DATA_MARKER: &str = "data:";

/// A well-framed line whose content could not be turned into an event.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeFault {
    #[error("event line is not valid UTF-8")]
    InvalidUtf8,
    #[error("malformed event JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("malformed {kind} payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Framing state: only the bytes of a not-yet-terminated line.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    partial: Vec<u8>,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every event completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.partial.extend_from_slice(chunk);

        let Some(last_newline) = self.partial.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let rest = self.partial.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial, rest);

        complete
            .split(|b| *b == b'\n')
            .filter_map(decode_line)
            .collect()
    }

    /// Bytes buffered for a line that has not been terminated yet.
    pub fn buffered_len(&self) -> usize {
        self.partial.len()
    }

    /// End of stream. An unterminated trailing line is not an event and is
    /// dropped; the number of dropped bytes is returned.
    pub fn finish(self) -> usize {
        self.partial.len()
    }
}

/// Decode one complete line (without its `\n`).
///
/// Returns `None` for lines that carry no event and for event types this
/// client does not know. A malformed event line yields a synthetic
/// [`StreamEvent::Error`] built from the [`DecodeFault`].
pub fn decode_line(line: &[u8]) -> Option<StreamEvent> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let data = line.strip_prefix(DATA_MARKER.as_bytes())?;
    let data = data.strip_prefix(b" ").unwrap_or(data);

    match parse_event(data) {
        Ok(event) => event,
        Err(fault) => Some(StreamEvent::Error(ErrorPayload::decode_fault(fault.to_string()))),
    }
}

fn parse_event(data: &[u8]) -> Result<Option<StreamEvent>, DecodeFault> {
    let text = std::str::from_utf8(data).map_err(|_| DecodeFault::InvalidUtf8)?;
    let envelope: Envelope = serde_json::from_str(text).map_err(DecodeFault::Json)?;

    let event = match envelope.kind.as_str() {
        "checklist_update" => {
            StreamEvent::ChecklistUpdate(payload("checklist_update", envelope.payload)?)
        }
        "message" => StreamEvent::Message(payload("message", envelope.payload)?),
        "done" => StreamEvent::Done(payload("done", envelope.payload)?),
        "error" => StreamEvent::Error(payload("error", envelope.payload)?),
        _ => return Ok(None),
    };
    Ok(Some(event))
}

fn payload<T: serde::de::DeserializeOwned>(
    kind: &'static str,
    value: serde_json::Value,
) -> Result<T, DecodeFault> {
    // A missing payload is read as an empty object so that all-default
    // payloads (e.g. `done`) still decode.
    let value = if value.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        value
    };
    serde_json::from_value(value).map_err(|source| DecodeFault::Payload { kind, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{DonePayload, ErrorOrigin};

    const TURN: &str = concat!(
        "data: {\"type\":\"checklist_update\",\"payload\":{\"detected_issues\":[\"wage_arrears\"],",
        "\"issue_progress\":{\"wage_arrears\":40},",
        "\"issue_checklist\":{\"wage_arrears\":[{\"requirement\":\"근무 기록\",\"status\":\"YES\"}]}}}\n\n",
        "data: {\"type\":\"message\",\"payload\":{\"text\":\"임금 체불로 보입니다.\",\"session_id\":\"s-1\"}}\n\n",
        "data: {\"type\":\"done\",\"payload\":{\"is_terminal\":false,\"title\":\"임금 문의\"}}\n\n",
    );

    fn decode_in_chunks(bytes: &[u8], size: usize) -> Vec<StreamEvent> {
        let mut decoder = EventStreamDecoder::new();
        let mut events = Vec::new();
        for chunk in bytes.chunks(size) {
            events.extend(decoder.feed(chunk));
        }
        assert_eq!(decoder.finish(), 0);
        events
    }

    #[test]
    fn decodes_a_full_turn_in_order() {
        let events = decode_in_chunks(TURN.as_bytes(), TURN.len());
        let kinds: Vec<_> = events.iter().map(StreamEvent::kind).collect();
        assert_eq!(kinds, vec!["checklist_update", "message", "done"]);
    }

    #[test]
    fn chunk_boundaries_do_not_change_the_result() {
        let whole = decode_in_chunks(TURN.as_bytes(), TURN.len());
        // Sizes 1..=7 split the multi-byte Korean characters too.
        for size in 1..=7 {
            assert_eq!(decode_in_chunks(TURN.as_bytes(), size), whole, "chunk size {size}");
        }
    }

    #[test]
    fn partial_line_waits_for_its_newline() {
        let mut decoder = EventStreamDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"done\",").is_empty());
        assert!(decoder.buffered_len() > 0);
        let events = decoder.feed(b"\"payload\":{\"is_terminal\":true}}\n");
        assert_eq!(
            events,
            vec![StreamEvent::Done(DonePayload {
                is_terminal: true,
                title: None
            })]
        );
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn split_line_with_bad_payload_becomes_one_decode_fault() {
        let mut decoder = EventStreamDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"erro").is_empty());
        let events = decoder.feed(b"r\",\"payload\":{}}\n");
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Error(err) => assert_eq!(err.origin, ErrorOrigin::Decoder),
            other => panic!("expected decode fault, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_does_not_stop_later_events() {
        let mut decoder = EventStreamDecoder::new();
        let events = decoder.feed(
            b"data: {not json\ndata: {\"type\":\"error\",\"payload\":{\"message\":\"boom\"}}\n",
        );
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::Error(e) if e.origin == ErrorOrigin::Decoder));
        assert_eq!(events[1], StreamEvent::Error(ErrorPayload::server("boom")));
    }

    #[test]
    fn trailing_partial_line_is_discarded_at_end() {
        let mut decoder = EventStreamDecoder::new();
        let events = decoder.feed(b"data: {\"type\":\"done\",\"payload\":{}}\ndata: {\"type\":\"mess");
        assert_eq!(events.len(), 1);
        assert_eq!(decoder.finish(), "data: {\"type\":\"mess".len());
    }

    #[test]
    fn non_event_lines_and_unknown_types_are_skipped() {
        let mut decoder = EventStreamDecoder::new();
        let events = decoder.feed(
            b": keep-alive\r\nevent: ping\r\n\r\ndata:{\"type\":\"heartbeat\",\"payload\":{}}\r\ndata:{\"type\":\"done\"}\r\n",
        );
        assert_eq!(events, vec![StreamEvent::Done(DonePayload::default())]);
    }

    #[test]
    fn invalid_utf8_on_event_line_is_a_fault() {
        let mut decoder = EventStreamDecoder::new();
        let events = decoder.feed(b"data: {\"type\":\"message\",\"payload\":{\"text\":\"\xff\"}}\n");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::Error(e) if e.origin == ErrorOrigin::Decoder));
    }
}
