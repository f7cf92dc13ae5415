use serde::{Deserialize, Serialize};
use serde_json::json;

/// Realtime channel topic scoped to the `guests` table.
pub const GUESTS_CHANGES_TOPIC: &str = "realtime:public:guests";
/// Topic used for socket-level heartbeat frames.
pub const HEARTBEAT_TOPIC: &str = "phoenix";

pub const JOIN_EVENT: &str = "phx_join";
pub const REPLY_EVENT: &str = "phx_reply";
pub const HEARTBEAT_EVENT: &str = "heartbeat";
pub const POSTGRES_CHANGES_EVENT: &str = "postgres_changes";

/// Response body of the password-grant auth endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Request body of the password-grant auth endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordGrantRequest {
    pub email: String,
    pub password: String,
}

/// Row-change classification carried by a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change notification consumed from the guest-table feed.
///
/// Carries no row payload on purpose: consumers react by re-fetching the
/// full ordered listing, never by interpreting the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotice {
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeData {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
}

/// Payload of a `postgres_changes` frame; only the change kind is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePayload {
    pub data: ChangeData,
}

/// One websocket frame on the realtime channel (phoenix wire shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeFrame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl RealtimeFrame {
    /// Join frame subscribing to every insert/update/delete on `guests`.
    pub fn join_guest_changes(reference: u64) -> Self {
        Self {
            topic: GUESTS_CHANGES_TOPIC.to_string(),
            event: JOIN_EVENT.to_string(),
            payload: json!({
                "config": {
                    "postgres_changes": [
                        { "event": "*", "schema": "public", "table": "guests" }
                    ]
                }
            }),
            reference: Some(reference.to_string()),
        }
    }

    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: HEARTBEAT_TOPIC.to_string(),
            event: HEARTBEAT_EVENT.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    /// Change notice carried by this frame, if it is a guest-table change.
    pub fn guest_change(&self) -> Option<ChangeNotice> {
        if self.topic != GUESTS_CHANGES_TOPIC || self.event != POSTGRES_CHANGES_EVENT {
            return None;
        }
        let payload: ChangePayload = serde_json::from_value(self.payload.clone()).ok()?;
        Some(ChangeNotice {
            kind: payload.data.kind,
        })
    }
}
