//! 成语接龙机器人
//!
//! 把网关推送的消息事件交给成语接龙引擎处理，再通过 OpenAPI 回复。

pub mod app;
pub mod bot;
pub mod logging;
pub mod pool;
pub mod reply;

pub use bot::{Conversation, MessageEvent, Responder, SolitaireBot, MESSAGE_EVENTS};
pub use pool::{Dispatch, WorkerPool};
