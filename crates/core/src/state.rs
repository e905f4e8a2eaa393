//! Render-ready view model of the active advisory session.

use crate::issue::{ChecklistItem, IssueRef};
use crate::wire::{ChecklistMap, ChecklistPayload, ProgressMap, TranscriptSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "assistant")]
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    /// A real transcript entry: user input or an AI reply.
    #[default]
    Reply,
    /// Ephemeral "working on it" placeholder of an in-flight turn or load.
    Pending,
    /// Client-side notice: failures, greetings.
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub kind: MessageKind,
    pub is_terminal_conclusion: bool,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            kind: MessageKind::Reply,
            is_terminal_conclusion: false,
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            text: text.into(),
            kind: MessageKind::Reply,
            is_terminal_conclusion: false,
        }
    }

    pub fn pending(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Pending,
            ..Self::ai(text)
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Notice,
            ..Self::ai(text)
        }
    }

    pub fn is_pending(&self) -> bool {
        self.kind == MessageKind::Pending
    }

    pub fn is_ai_reply(&self) -> bool {
        self.role == Role::Ai && self.kind == MessageKind::Reply
    }
}

/// Transcript plus issue tracking for one session.
///
/// `progress` and `checklist` never hold keys that are absent from `issues`;
/// all three are only ever replaced together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    messages: Vec<Message>,
    issues: Vec<IssueRef>,
    progress: ProgressMap,
    checklist: ChecklistMap,
    current_step: Option<String>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh state for a new conversation, opened by a greeting notice.
    pub fn greeting(text: &str) -> Self {
        let mut state = Self::new();
        state.messages.push(Message::notice(text));
        state
    }

    /// Placeholder state shown while a transcript is being fetched.
    pub fn loading(text: &str) -> Self {
        let mut state = Self::new();
        state.messages.push(Message::pending(text));
        state
    }

    /// Rebuild state from a server transcript snapshot.
    pub fn from_transcript(snapshot: TranscriptSnapshot) -> Self {
        let TranscriptSnapshot {
            messages,
            detected_issues,
            issue_progress,
            issue_checklist,
            is_terminal,
        } = snapshot;

        let mut state = Self::new();
        state.messages = messages
            .into_iter()
            .map(|m| Message {
                role: m.role,
                text: m.content,
                kind: MessageKind::Reply,
                is_terminal_conclusion: false,
            })
            .collect();
        state.replace_issues(detected_issues, issue_progress, issue_checklist, None);
        if is_terminal {
            state.mark_last_reply_conclusion();
        }
        state
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn issues(&self) -> &[IssueRef] {
        &self.issues
    }

    pub fn progress(&self) -> &ProgressMap {
        &self.progress
    }

    pub fn checklist(&self) -> &ChecklistMap {
        &self.checklist
    }

    pub fn current_step(&self) -> Option<&str> {
        self.current_step.as_deref()
    }

    pub fn checklist_for(&self, issue_key: &str) -> &[ChecklistItem] {
        self.checklist
            .get(issue_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Server label of the issue, or a label derived from its key.
    pub fn display_label(&self, issue_key: &str) -> String {
        match self.issues.iter().find(|issue| issue.key() == issue_key) {
            Some(issue) => issue.display_label(),
            None => crate::issue::derive_label(issue_key),
        }
    }

    /// Stored progress for the issue, 0 when unknown.
    pub fn effective_percent(&self, issue_key: &str) -> u8 {
        self.progress.get(issue_key).copied().unwrap_or(0)
    }

    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(Message::is_pending)
    }

    // ── Mutation (crate users: turn controller and session store) ──────

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace issues, progress and checklist in one step. Entries keyed by
    /// an issue that is not in `issues` are dropped.
    pub fn replace_issues(
        &mut self,
        issues: Vec<IssueRef>,
        mut progress: ProgressMap,
        mut checklist: ChecklistMap,
        current_step: Option<String>,
    ) {
        progress.retain(|key, _| issues.iter().any(|issue| issue.key() == key));
        checklist.retain(|key, _| issues.iter().any(|issue| issue.key() == key));
        self.issues = issues;
        self.progress = progress;
        self.checklist = checklist;
        self.current_step = current_step;
    }

    pub fn apply_checklist(&mut self, payload: ChecklistPayload) {
        self.replace_issues(
            payload.detected_issues,
            payload.issue_progress,
            payload.issue_checklist,
            payload.current_step,
        );
    }

    /// Remove the newest pending placeholder. Returns whether one existed.
    pub fn remove_pending(&mut self) -> bool {
        match self.messages.iter().rposition(Message::is_pending) {
            Some(idx) => {
                self.messages.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Turn the newest pending placeholder into a notice, or append a new
    /// notice when no placeholder is left.
    pub fn resolve_pending_as_notice(&mut self, text: impl Into<String>) {
        let text = text.into();
        match self.messages.iter_mut().rev().find(|m| m.is_pending()) {
            Some(message) => {
                message.text = text;
                message.kind = MessageKind::Notice;
            }
            None => self.messages.push(Message::notice(text)),
        }
    }

    /// Flag the newest message as terminal conclusion if it is an AI reply.
    /// Returns whether a message was (or already was) flagged.
    pub fn mark_last_reply_conclusion(&mut self) -> bool {
        match self.messages.last_mut() {
            Some(message) if message.is_ai_reply() => {
                message.is_terminal_conclusion = true;
                true
            }
            _ => false,
        }
    }
}
