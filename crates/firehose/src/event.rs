//! Decoded change events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// URI scheme used for record locations
pub const LOCATION_SCHEME: &str = "coop";

/// The kind of change a record underwent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    /// Parse the wire form of an action
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "create" => Some(ChangeAction::Create),
            "update" => Some(ChangeAction::Update),
            "delete" => Some(ChangeAction::Delete),
            _ => None,
        }
    }
}

/// One record change decoded from a commit frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Monotonically increasing sequence number per source
    pub seq: i64,

    /// Identifier of the actor that authored the change
    pub author: String,

    /// The kind of change
    pub action: ChangeAction,

    /// Record location, `coop://<did>/<collection>/<rkey>`
    pub location: String,

    /// Content hash of the record, absent for deletes
    pub content_hash: Option<String>,

    /// Full record payload, present only when the caller requested
    /// content resolution and the block decoded as a record
    pub record: Option<serde_json::Value>,

    /// Commit timestamp as reported by the source
    pub time: DateTime<Utc>,
}

impl ChangeEvent {
    /// The collection segment of the location URI
    pub fn collection(&self) -> Option<&str> {
        self.location
            .strip_prefix("coop://")?
            .split('/')
            .nth(1)
            .filter(|c| !c.is_empty())
    }

    /// The record key segment of the location URI
    pub fn record_key(&self) -> Option<&str> {
        self.location
            .strip_prefix("coop://")?
            .split('/')
            .nth(2)
            .filter(|k| !k.is_empty())
    }
}

/// Build a location URI from its parts
pub fn location_uri(author: &str, path: &str) -> String {
    format!("{}://{}/{}", LOCATION_SCHEME, author, path)
}
