pub mod ids;
pub mod issue;
pub mod sse;
pub mod state;
pub mod wire;

pub use ids::{ClientId, SessionId};
pub use issue::{ChecklistItem, ChecklistStatus, IssueRef};
pub use sse::EventStreamDecoder;
pub use state::{ChatState, Message, MessageKind, Role};
pub use wire::{
    ChatRequest, ChecklistPayload, DonePayload, ErrorOrigin, ErrorPayload, MessagePayload,
    SessionSummary, StreamEvent, TranscriptMessage, TranscriptSnapshot,
};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
