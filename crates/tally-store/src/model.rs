//! Execution record model persisted in the store document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Aggregated state for one `{hardware_id}-{session_id}` composite key.
///
/// Field names keep the camelCase wire format of the persisted document so
/// existing store files load unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    #[serde(default)]
    pub executions: u64,
    /// Distinct origins in insertion order. A list rather than a set: the
    /// document is plain JSON and order is part of the observable output.
    #[serde(default)]
    pub origins: Vec<String>,
    /// `"{game_name}, {game_id}"` -> invocation count.
    #[serde(default)]
    pub games: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_message_id: Option<String>,
}

/// Fields decoded from the info header of one check-in request.
///
/// Absent or malformed pairs stay `None`; the endpoint applies no schema
/// validation beyond header presence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionFields {
    pub origin: Option<String>,
    pub user: Option<String>,
    pub display_name: Option<String>,
    pub created_timestamp: Option<String>,
    pub game_name: Option<String>,
    pub game_id: Option<String>,
}

impl ExecutionFields {
    /// Composite `games` map key for this request.
    pub fn game_key(&self) -> String {
        format!(
            "{}, {}",
            self.game_name.as_deref().unwrap_or("unknown"),
            self.game_id.as_deref().unwrap_or("unknown")
        )
    }
}
