//! OpenAPI collaborator: gateway endpoint lookup and the message-send
//! endpoints used for replies.

mod client;
mod error;
mod types;

pub use client::{ApiClient, ReplySender};
pub use error::{ApiError, ApiResult};
pub use types::{
    GatewayInfo, MessageRequest, MessageResponse, ReplyOutcome, ReplyTarget, SessionStartLimit,
    MESSAGE_AUDIT_CODE,
};
