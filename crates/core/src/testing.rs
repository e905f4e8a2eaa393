use crate::issue::{ChecklistItem, ChecklistStatus, IssueRef};
use crate::wire::{
    ChecklistPayload, DonePayload, ErrorPayload, MessagePayload, SessionSummary, StreamEvent,
    TranscriptMessage, TranscriptSnapshot,
};
use crate::state::Role;

/// `checklist_update` with one bare-key issue, its percent and checklist.
pub fn checklist(key: &str, percent: u8, items: &[(&str, ChecklistStatus)]) -> StreamEvent {
    StreamEvent::ChecklistUpdate(ChecklistPayload {
        detected_issues: vec![IssueRef::Key(key.to_string())],
        issue_progress: [(key.to_string(), percent)].into_iter().collect(),
        issue_checklist: [(
            key.to_string(),
            items
                .iter()
                .map(|(text, status)| ChecklistItem::new(*text, *status))
                .collect(),
        )]
        .into_iter()
        .collect(),
        current_step: None,
    })
}

/// `message` event, optionally carrying the server-assigned session id.
pub fn message(text: &str, session_id: Option<&str>) -> StreamEvent {
    StreamEvent::Message(MessagePayload {
        text: text.to_string(),
        session_id: session_id.map(Into::into),
    })
}

pub fn done(is_terminal: bool) -> StreamEvent {
    StreamEvent::Done(DonePayload {
        is_terminal,
        title: None,
    })
}

pub fn server_error(message: &str) -> StreamEvent {
    StreamEvent::Error(ErrorPayload::server(message))
}

/// Frame events the way the server does: one `data:` line each, blank-line separated.
pub fn frame(events: &[StreamEvent]) -> Vec<u8> {
    let mut out = Vec::new();
    for event in events {
        out.extend_from_slice(b"data: ");
        out.extend_from_slice(event.to_json().to_string().as_bytes());
        out.extend_from_slice(b"\n\n");
    }
    out
}

pub fn summary(session_id: &str, title: &str) -> SessionSummary {
    SessionSummary::new(session_id, title)
}

/// Transcript of alternating user/AI turns with no issues.
pub fn transcript(turns: &[(&str, &str)]) -> TranscriptSnapshot {
    TranscriptSnapshot {
        messages: turns
            .iter()
            .flat_map(|(user, ai)| {
                [
                    TranscriptMessage {
                        role: Role::User,
                        content: user.to_string(),
                    },
                    TranscriptMessage {
                        role: Role::Ai,
                        content: ai.to_string(),
                    },
                ]
            })
            .collect(),
        ..TranscriptSnapshot::default()
    }
}
