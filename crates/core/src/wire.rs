//! Request/response bodies exchanged with the advisory service.
//!
//! Server payloads are read leniently: `null` and missing collections are
//! treated as empty, and unknown fields are ignored.

use crate::ids::{ClientId, SessionId};
use crate::issue::{ChecklistItem, IssueRef};
use crate::state::Role;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub type ProgressMap = BTreeMap<String, u8>;
pub type ChecklistMap = BTreeMap<String, Vec<ChecklistItem>>;

/// Body of `POST /api/chat` (and `POST /api/reset`, which reuses the shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub client_id: ClientId,
    pub session_id: Option<SessionId>,
}

/// One roster entry from `GET /api/history/{client_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issues: Vec<IssueRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_terminal: bool,
}

impl SessionSummary {
    pub fn new(session_id: impl Into<SessionId>, title: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            title: Some(title.into()),
            issues: Vec::new(),
            is_terminal: false,
        }
    }

    /// Title for display, or `untitled` when the server has none yet.
    pub fn display_title<'a>(&'a self, untitled: &'a str) -> &'a str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(untitled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

/// Full snapshot from `GET /api/chat-history/{client_id}/{session_id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<TranscriptMessage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub detected_issues: Vec<IssueRef>,
    #[serde(default, deserialize_with = "percent_map")]
    pub issue_progress: ProgressMap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issue_checklist: ChecklistMap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_terminal: bool,
}

/// Payload of a `checklist_update` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub detected_issues: Vec<IssueRef>,
    #[serde(default, deserialize_with = "percent_map")]
    pub issue_progress: ProgressMap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issue_checklist: ChecklistMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub text: String,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonePayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_terminal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Where an `error` event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorOrigin {
    /// Sent by the server as an explicit `error` event.
    #[default]
    Server,
    /// Synthesized locally because a stream line could not be decoded.
    Decoder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(skip)]
    pub origin: ErrorOrigin,
}

impl ErrorPayload {
    pub fn server(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin: ErrorOrigin::Server,
        }
    }

    pub fn decode_fault(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin: ErrorOrigin::Decoder,
        }
    }
}

/// One decoded server event of a chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    ChecklistUpdate(ChecklistPayload),
    Message(MessagePayload),
    Done(DonePayload),
    Error(ErrorPayload),
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChecklistUpdate(_) => "checklist_update",
            Self::Message(_) => "message",
            Self::Done(_) => "done",
            Self::Error(_) => "error",
        }
    }

    /// Render back to the `{"type", "payload"}` envelope used on the wire.
    pub fn to_json(&self) -> serde_json::Value {
        let payload = match self {
            Self::ChecklistUpdate(p) => serde_json::to_value(p),
            Self::Message(p) => serde_json::to_value(p),
            Self::Done(p) => serde_json::to_value(p),
            Self::Error(p) => serde_json::to_value(p),
        }
        .unwrap_or(serde_json::Value::Null);
        serde_json::json!({ "type": self.kind(), "payload": payload })
    }
}

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Percentages arrive as JSON numbers (int or float); store them clamped to 0..=100.
fn percent_map<'de, D>(deserializer: D) -> Result<ProgressMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<f64>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v.round().clamp(0.0, 100.0) as u8)))
        .collect())
}
