//! 网关消息 → 成语接龙 → 回复

use async_trait::async_trait;
use serde::Deserialize;
use sgroupbot_api::{ReplyOutcome, ReplySender, ReplyTarget};
use sgroupbot_gateway::{
    Envelope, EventHandler, HandlerTable, AT_MESSAGE_CREATE, C2C_MESSAGE_CREATE,
    DIRECT_MESSAGE_CREATE, GROUP_AT_MESSAGE_CREATE,
};
use sgroupbot_solitaire::SolitaireEngine;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::pool::{Dispatch, WorkerPool};
use crate::reply::{self, Command};

/// 机器人处理的事件类型
pub const MESSAGE_EVENTS: [&str; 4] = [
    GROUP_AT_MESSAGE_CREATE,
    C2C_MESSAGE_CREATE,
    AT_MESSAGE_CREATE,
    DIRECT_MESSAGE_CREATE,
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub member_openid: Option<String>,
    #[serde(default)]
    pub user_openid: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// 消息事件中用到的字段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub group_openid: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
}

/// 一条消息所属的会话、作答人和回复位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub key: String,
    pub participant: String,
    pub target: ReplyTarget,
}

impl Conversation {
    /// 按事件类型路由，缺少必要字段时返回 `None`
    pub fn route(event_type: &str, event: &MessageEvent) -> Option<Self> {
        let author = &event.author;
        let (key, participant, target) = match event_type {
            GROUP_AT_MESSAGE_CREATE => {
                let group = event.group_openid.clone()?;
                (
                    group.clone(),
                    author.member_openid.clone()?,
                    ReplyTarget::Group(group),
                )
            }
            C2C_MESSAGE_CREATE => {
                let user = author.user_openid.clone()?;
                (user.clone(), user.clone(), ReplyTarget::User(user))
            }
            AT_MESSAGE_CREATE => {
                let channel = event.channel_id.clone()?;
                (
                    channel.clone(),
                    author.username.clone()?,
                    ReplyTarget::Channel(channel),
                )
            }
            DIRECT_MESSAGE_CREATE => (
                author.id.clone()?,
                author.username.clone()?,
                ReplyTarget::DirectMessage(event.guild_id.clone()?),
            ),
            _ => return None,
        };

        (!key.is_empty()).then_some(Self {
            key,
            participant,
            target,
        })
    }
}

/// 根据消息内容推进游戏并生成回复文案
#[derive(Clone)]
pub struct Responder {
    engine: Arc<SolitaireEngine>,
    echo_unmatched: bool,
}

impl Responder {
    pub fn new(engine: Arc<SolitaireEngine>, echo_unmatched: bool) -> Self {
        Self {
            engine,
            echo_unmatched,
        }
    }

    /// 返回 `None` 表示不需要回复
    pub fn respond(&self, conversation: &Conversation, content: &str) -> Option<String> {
        let key = conversation.key.as_str();

        match Command::parse(content) {
            Command::Start => match self.engine.start(key) {
                Ok(started) => {
                    if !started.resumed {
                        info!(key, phrase = %started.phrase, "Game started");
                    }
                    return Some(reply::started(&started));
                }
                Err(e) => {
                    warn!(key, "Failed to start game: {}", e);
                    return None;
                }
            },
            Command::Exit => {
                if let Some(ranking) = self.engine.exit(key) {
                    return Some(reply::exited(&ranking));
                }
            }
            Command::Answer(answer) => {
                if let Some(verdict) =
                    self.engine
                        .answer(key, answer, &conversation.participant)
                {
                    info!(
                        key,
                        answer,
                        participant = %conversation.participant,
                        outcome = ?verdict.outcome,
                        "Game answer"
                    );
                    return Some(reply::verdict(&verdict));
                }
            }
        }

        self.echo_unmatched.then(|| content.to_string())
    }
}

/// 注册到网关的消息处理器
pub struct SolitaireBot {
    responder: Responder,
    sender: Arc<dyn ReplySender>,
    pool: WorkerPool,
}

impl SolitaireBot {
    pub fn new(responder: Responder, sender: Arc<dyn ReplySender>, pool: WorkerPool) -> Self {
        Self {
            responder,
            sender,
            pool,
        }
    }

    /// 为所有消息事件注册本处理器
    pub fn handler_table(self: &Arc<Self>) -> HandlerTable {
        let handler: Arc<dyn EventHandler> = Arc::clone(self) as Arc<dyn EventHandler>;
        MESSAGE_EVENTS
            .iter()
            .fold(HandlerTable::new(), |table, event_type| {
                table.with(*event_type, Arc::clone(&handler))
            })
    }

    /// 处理一条消息，池满时在当前任务内执行
    pub async fn process(&self, event_type: &str, event: MessageEvent) -> Option<Dispatch> {
        let Some(conversation) = Conversation::route(event_type, &event) else {
            debug!(event_type, msg_id = %event.id, "Message without conversation, dropped");
            return None;
        };

        let responder = self.responder.clone();
        let sender = Arc::clone(&self.sender);
        let dispatch = self
            .pool
            .execute(async move {
                let Some(content) = responder.respond(&conversation, &event.content) else {
                    return;
                };

                match sender
                    .send_reply(&conversation.target, &content, Some(&event.id))
                    .await
                {
                    Ok(ReplyOutcome::Delivered { .. }) => {}
                    Ok(ReplyOutcome::AuditPending(audit_id)) => {
                        info!(key = %conversation.key, %audit_id, "Reply held for audit")
                    }
                    Err(e) => warn!(key = %conversation.key, "Failed to send reply: {}", e),
                }
            })
            .await;
        Some(dispatch)
    }
}

#[async_trait]
impl EventHandler for SolitaireBot {
    async fn handle(&self, envelope: Envelope) {
        let event_type = envelope.t.clone().unwrap_or_default();
        let event: MessageEvent = match serde_json::from_value(envelope.d) {
            Ok(event) => event,
            Err(e) => {
                warn!(%event_type, "Failed to decode message event: {}", e);
                return;
            }
        };
        self.process(&event_type, event).await;
    }
}
