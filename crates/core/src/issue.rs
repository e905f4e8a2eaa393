//! Detected legal topics ("issues") and their completion checklists.
//!
//! On the wire an issue is either a bare key (`"wage_arrears"`) or an object
//! carrying a localized label (`{"key": "wage_arrears", "korean": "임금 체불"}`).
//! Both forms deserialize into [`IssueRef`]; callers only ever go through
//! [`IssueRef::key`] and [`IssueRef::label`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssueRef {
    Key(String),
    Labeled {
        key: String,
        #[serde(rename = "korean", alias = "label", default)]
        label: Option<String>,
    },
}

impl IssueRef {
    pub fn key(&self) -> &str {
        match self {
            Self::Key(key) => key,
            Self::Labeled { key, .. } => key,
        }
    }

    /// Server-supplied label, if any. Blank labels count as absent.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Key(_) => None,
            Self::Labeled { label, .. } => label
                .as_deref()
                .map(str::trim)
                .filter(|label| !label.is_empty()),
        }
    }

    /// Label for display: the server label, or one derived from the key.
    pub fn display_label(&self) -> String {
        match self.label() {
            Some(label) => label.to_string(),
            None => derive_label(self.key()),
        }
    }
}

/// Turn a machine key into a readable label: separators become spaces and
/// every word starts with an uppercase letter (`wage_arrears` -> `Wage Arrears`).
pub fn derive_label(key: &str) -> String {
    let spaced: String = key
        .chars()
        .map(|c| if matches!(c, '_' | '-') { ' ' } else { c })
        .collect();

    let mut out = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for c in spaced.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "StatusRepr", into = "&'static str")]
pub enum ChecklistStatus {
    #[default]
    Pending,
    Yes,
    No,
}

impl ChecklistStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }

    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl From<ChecklistStatus> for &'static str {
    fn from(status: ChecklistStatus) -> Self {
        status.as_str()
    }
}

/// Every status shape the server has been seen to emit. Anything that is not
/// a clear yes/no (`UNKNOWN`, `INSUFFICIENT`, null, ...) is still pending.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusRepr {
    Text(String),
    Flag(bool),
    Other(serde::de::IgnoredAny),
}

impl From<StatusRepr> for ChecklistStatus {
    fn from(repr: StatusRepr) -> Self {
        match repr {
            StatusRepr::Text(text) => match text.trim().to_ascii_uppercase().as_str() {
                "YES" => Self::Yes,
                "NO" => Self::No,
                _ => Self::Pending,
            },
            StatusRepr::Flag(true) => Self::Yes,
            StatusRepr::Flag(false) => Self::No,
            StatusRepr::Other(_) => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    #[serde(rename = "requirement")]
    pub requirement_text: String,
    #[serde(default)]
    pub status: ChecklistStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ChecklistItem {
    pub fn new(requirement_text: impl Into<String>, status: ChecklistStatus) -> Self {
        Self {
            requirement_text: requirement_text.into(),
            status,
            reason: None,
        }
    }
}
