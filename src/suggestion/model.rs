// SPDX-License-Identifier: MIT
// Suggestion pipeline — data model.

use serde::{Deserialize, Serialize};

/// One named suggestion operation, immutable once constructed.
///
/// All variants share a single pipeline slot: a newer operation of any kind
/// supersedes an older one of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SuggestionOperation {
    Get,
    Next,
    Previous,
    Accept,
    Reject,
    AcceptPromptToCode,
    PromptToCode,
    Custom {
        #[serde(rename = "commandId")]
        command_id: String,
    },
    Realtime,
    Prefetch,
}

impl SuggestionOperation {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::AcceptPromptToCode => "acceptPromptToCode",
            Self::PromptToCode => "promptToCode",
            Self::Custom { .. } => "custom",
            Self::Realtime => "realtime",
            Self::Prefetch => "prefetch",
        }
    }
}

/// Cursor position in the editor buffer (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

/// A selection range in the editor buffer (start inclusive, end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// Snapshot of the editor state accompanying a suggestion operation.
///
/// Decoded at the RPC boundary, then treated as an opaque input to the
/// engine — the coordinator never interprets the buffer text itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorContent {
    /// Absolute path of the file being edited.
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// Full buffer text.
    pub content: String,
    /// Cursor position.
    pub cursor: Position,
    /// Active selection, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Range>,
    /// Opaque editor metadata forwarded to the engine untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Result of a suggestion operation.
///
/// `None` at the engine seam means "no suggestion available", which is a
/// normal outcome and not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatedContent {
    /// Replacement buffer text.
    pub content: String,
    /// Selection to apply after the edit, if the engine requests one.
    #[serde(
        rename = "newSelection",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub new_selection: Option<Range>,
}
