//! Per-folder selection state.

use serde::Serialize;

/// What a successful SELECT reported about a folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderState {
    /// Number of messages (`EXISTS`).
    pub message_count: u32,
    /// Number of recent messages (`RECENT`).
    pub recent_count: u32,
    /// Every untagged line of the reply, verbatim.
    pub info: Vec<String>,
}
