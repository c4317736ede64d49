//! Gateway wire protocol
//!
//! Every frame is a JSON envelope `{op, s, t, d}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::BitOr;

use crate::error::{GatewayError, GatewayResult};

/// 群聊中 @ 机器人的消息
pub const GROUP_AT_MESSAGE_CREATE: &str = "GROUP_AT_MESSAGE_CREATE";
/// 单聊消息
pub const C2C_MESSAGE_CREATE: &str = "C2C_MESSAGE_CREATE";
/// 子频道中 @ 机器人的消息
pub const AT_MESSAGE_CREATE: &str = "AT_MESSAGE_CREATE";
/// 频道私信
pub const DIRECT_MESSAGE_CREATE: &str = "DIRECT_MESSAGE_CREATE";

/// Frame opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    Resume = 6,
    Reconnect = 7,
    InvalidSession = 9,
    Hello = 10,
    HeartbeatAck = 11,
    HttpCallbackAck = 12,
}

impl OpCode {
    /// `None` for opcodes this client does not know.
    pub fn from_code(op: i64) -> Option<Self> {
        let op = match op {
            0 => OpCode::Dispatch,
            1 => OpCode::Heartbeat,
            2 => OpCode::Identify,
            6 => OpCode::Resume,
            7 => OpCode::Reconnect,
            9 => OpCode::InvalidSession,
            10 => OpCode::Hello,
            11 => OpCode::HeartbeatAck,
            12 => OpCode::HttpCallbackAck,
            _ => return None,
        };
        Some(op)
    }

    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Event categories requested at identify time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Intents(u32);

impl Intents {
    pub const GUILDS: Intents = Intents(1 << 0);
    pub const GUILD_MEMBERS: Intents = Intents(1 << 1);
    pub const GUILD_MESSAGES: Intents = Intents(1 << 9);
    pub const GUILD_MESSAGE_REACTIONS: Intents = Intents(1 << 10);
    pub const DIRECT_MESSAGE: Intents = Intents(1 << 12);
    pub const GROUP_AND_C2C_EVENT: Intents = Intents(1 << 25);
    pub const INTERACTION: Intents = Intents(1 << 26);
    pub const MESSAGE_AUDIT: Intents = Intents(1 << 27);
    pub const FORUMS_EVENT: Intents = Intents(1 << 28);
    pub const AUDIO_ACTION: Intents = Intents(1 << 29);
    pub const PUBLIC_GUILD_MESSAGES: Intents = Intents(1 << 30);

    const NAMED: [(&'static str, Intents); 11] = [
        ("guilds", Intents::GUILDS),
        ("guild_members", Intents::GUILD_MEMBERS),
        ("guild_messages", Intents::GUILD_MESSAGES),
        ("guild_message_reactions", Intents::GUILD_MESSAGE_REACTIONS),
        ("direct_message", Intents::DIRECT_MESSAGE),
        ("group_and_c2c_event", Intents::GROUP_AND_C2C_EVENT),
        ("interaction", Intents::INTERACTION),
        ("message_audit", Intents::MESSAGE_AUDIT),
        ("forums_event", Intents::FORUMS_EVENT),
        ("audio_action", Intents::AUDIO_ACTION),
        ("public_guild_messages", Intents::PUBLIC_GUILD_MESSAGES),
    ];

    pub const fn empty() -> Self {
        Intents(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Intents(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Intents) -> bool {
        self.0 & other.0 == other.0
    }

    /// Look up a single intent by its config name (case-insensitive).
    pub fn from_name(name: &str) -> GatewayResult<Self> {
        let wanted = name.trim().to_ascii_lowercase();
        Self::NAMED
            .iter()
            .find(|(known, _)| *known == wanted)
            .map(|(_, intent)| *intent)
            .ok_or_else(|| GatewayError::UnknownIntent(name.to_string()))
    }

    /// Combine the intents named in the config.
    pub fn from_names<I, S>(names: I) -> GatewayResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .try_fold(Intents::empty(), |acc, name| Ok(acc | Self::from_name(name.as_ref())?))
    }

    /// Names of the intents set in this mask.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(_, intent)| self.contains(*intent))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl BitOr for Intents {
    type Output = Intents;

    fn bitor(self, rhs: Intents) -> Intents {
        Intents(self.0 | rhs.0)
    }
}

impl fmt::Display for Intents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join("|"))
    }
}

/// Identify token, `Bot {app_id}.{token}`.
pub fn bot_token(app_id: u64, token: &str) -> String {
    format!("Bot {}.{}", app_id, token)
}

/// A single gateway frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub op: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub d: Value,
}

/// op 2 payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identify {
    pub token: String,
    pub intents: Intents,
    pub shard: [u32; 2],
}

/// op 10 payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    pub heartbeat_interval: u64,
}

impl Envelope {
    pub fn new(op: OpCode, d: Value) -> Self {
        Self {
            op: op.code(),
            s: None,
            t: None,
            d,
        }
    }

    pub fn dispatch(seq: u32, event_type: &str, d: Value) -> Self {
        Self {
            op: OpCode::Dispatch.code(),
            s: Some(seq),
            t: Some(event_type.to_string()),
            d,
        }
    }

    pub fn identify(identify: &Identify) -> GatewayResult<Self> {
        Ok(Self::new(OpCode::Identify, serde_json::to_value(identify)?))
    }

    /// Heartbeat carrying the last seen sequence; `d` is omitted before any.
    pub fn heartbeat(last_seq: Option<u32>) -> Self {
        Self::new(OpCode::Heartbeat, last_seq.map(Value::from).unwrap_or(Value::Null))
    }

    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::from_code(self.op)
    }

    pub fn event_type(&self) -> Option<&str> {
        self.t.as_deref()
    }

    pub fn decode(text: &str) -> GatewayResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> GatewayResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
