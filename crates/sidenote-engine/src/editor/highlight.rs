use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::anchoring::TextAnchor;

/// Conversation attached to a highlight.
///
/// Stored and round-tripped as-is; messages are never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Record of a quote being replaced after drift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorRevision {
    pub previous_exact: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub replaced_at: DateTime<Utc>,
}

/// A stored highlight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub anchor: TextAnchor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Audit trail of replaced quotes, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revisions: Vec<AnchorRevision>,
}

impl Highlight {
    pub fn new(id: impl Into<String>, anchor: TextAnchor) -> Self {
        Self {
            id: id.into(),
            anchor,
            thread: None,
            created_at: Utc::now(),
            revisions: Vec::new(),
        }
    }

    pub fn with_thread(mut self, thread: Thread) -> Self {
        self.thread = Some(thread);
        self
    }

    /// Replace the quoted text, keeping context. Returns false if unchanged.
    pub fn replace_exact(&mut self, new_exact: &str, at: DateTime<Utc>) -> bool {
        let anchor = TextAnchor {
            exact: new_exact.to_string(),
            ..self.anchor.clone()
        };
        self.replace_anchor(anchor, at)
    }

    /// Swap in a new anchor, recording a revision when the quote changes.
    pub fn replace_anchor(&mut self, anchor: TextAnchor, at: DateTime<Utc>) -> bool {
        if anchor == self.anchor {
            return false;
        }
        if anchor.exact != self.anchor.exact {
            self.revisions.push(AnchorRevision {
                previous_exact: std::mem::take(&mut self.anchor.exact),
                replaced_at: at,
            });
        }
        self.anchor = anchor;
        true
    }
}

/// Partial update for [`Highlight`]; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightPatch {
    pub anchor: Option<TextAnchor>,
    /// `Some(None)` detaches the thread
    pub thread: Option<Option<Thread>>,
}

impl HighlightPatch {
    pub fn anchor(anchor: TextAnchor) -> Self {
        Self {
            anchor: Some(anchor),
            ..Self::default()
        }
    }

    pub fn thread(thread: Thread) -> Self {
        Self {
            thread: Some(Some(thread)),
            ..Self::default()
        }
    }

    pub fn detach_thread() -> Self {
        Self {
            thread: Some(None),
            ..Self::default()
        }
    }
}

/// Where a stored highlight stands after the latest recalculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightState {
    /// Resolved and rendered
    Active,
    /// Rendered, but the text found differs from the stored quote
    Drifted,
    /// The quote cannot be found; nothing is rendered
    Orphaned,
}
