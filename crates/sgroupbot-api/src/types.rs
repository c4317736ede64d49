//! Request and response bodies

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 消息审核中的返回码，消息并未失败，审核通过后才会送达
pub const MESSAGE_AUDIT_CODE: i64 = 304023;

/// `GET /gateway`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub url: String,
    #[serde(default = "default_shards")]
    pub shards: u32,
    #[serde(default)]
    pub session_start_limit: Option<SessionStartLimit>,
}

fn default_shards() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartLimit {
    pub total: u32,
    pub remaining: u32,
    pub reset_after: u64,
    pub max_concurrency: u32,
}

/// Outgoing text message. `msg_id` marks it as a passive reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRequest {
    pub content: String,
    pub msg_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
}

impl MessageRequest {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            msg_type: 0,
            msg_id: None,
        }
    }

    pub fn reply_to(mut self, msg_id: impl Into<String>) -> Self {
        self.msg_id = Some(msg_id.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl MessageResponse {
    /// Audit ticket carried by a 304023 response.
    pub fn audit_id(&self) -> Option<&str> {
        self.data
            .as_ref()?
            .get("message_audit")?
            .get("audit_id")?
            .as_str()
    }
}

/// Result of a send that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Delivered { id: Option<String> },
    /// Held for review; delivered later if approved.
    AuditPending(String),
}

/// Where a reply goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReplyTarget {
    /// `group_openid`
    Group(String),
    /// `user_openid`
    User(String),
    /// `channel_id`
    Channel(String),
    /// `guild_id` of the direct message session
    DirectMessage(String),
}

impl ReplyTarget {
    pub fn path(&self) -> String {
        match self {
            ReplyTarget::Group(id) => format!("/v2/groups/{}/messages", id),
            ReplyTarget::User(id) => format!("/v2/users/{}/messages", id),
            ReplyTarget::Channel(id) => format!("/channels/{}/messages", id),
            ReplyTarget::DirectMessage(id) => format!("/dms/{}/messages", id),
        }
    }
}
