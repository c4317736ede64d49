use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 沙箱环境 API 地址
pub const SANDBOX_API_BASE: &str = "https://sandbox.api.sgroup.qq.com";

/// 正式环境 API 地址
pub const PRODUCTION_API_BASE: &str = "https://api.sgroup.qq.com";

/// 主配置结构体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: String,
    pub api: ApiConfig,
    pub gateway: GatewayConfig,
    pub game: GameConfig,
    pub pool: PoolConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            api: ApiConfig::default(),
            gateway: GatewayConfig::default(),
            game: GameConfig::default(),
            pool: PoolConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// 获取配置值的快捷方法
    pub fn get_value(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["version"] => Some(self.version.clone()),
            ["api", "base_url"] => Some(self.api.base_url.clone()),
            ["api", "app_id"] => Some(self.api.app_id.to_string()),
            ["api", "timeout_seconds"] => Some(self.api.timeout_seconds.to_string()),
            ["gateway", "intents"] => Some(self.gateway.intents.join(",")),
            ["gateway", "shard_index"] => Some(self.gateway.shard_index.to_string()),
            ["gateway", "shard_total"] => Some(self.gateway.shard_total.to_string()),
            ["gateway", "heartbeat_interval_ms"] => {
                Some(self.gateway.heartbeat_interval_ms.to_string())
            }
            ["gateway", "strict_decode"] => Some(self.gateway.strict_decode.to_string()),
            ["game", "dictionary_path"] => Some(self.game.dictionary_path.clone()),
            ["game", "max_turn"] => Some(self.game.max_turn.to_string()),
            ["game", "max_miss"] => Some(self.game.max_miss.to_string()),
            ["game", "session_ttl_secs"] => Some(self.game.session_ttl_secs.to_string()),
            ["game", "sweep_interval_secs"] => Some(self.game.sweep_interval_secs.to_string()),
            ["game", "echo_unmatched"] => Some(self.game.echo_unmatched.to_string()),
            ["pool", "size"] => Some(self.pool.size.to_string()),
            ["logging", "level"] => Some(self.logging.level.to_string()),
            ["logging", "file"] => self.logging.file.clone(),
            ["logging", "json_format"] => Some(self.logging.json_format.to_string()),
            // token 不通过 get 暴露
            _ => None,
        }
    }

    /// 设置配置值
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["api", "base_url"] => {
                self.api.base_url = value.to_string();
            }
            ["api", "app_id"] => {
                self.api.app_id = parse_number(value)?;
            }
            ["api", "token"] => {
                self.api.token = value.to_string();
            }
            ["api", "timeout_seconds"] => {
                self.api.timeout_seconds = parse_number(value)?;
            }
            ["gateway", "intents"] => {
                self.gateway.intents = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            ["gateway", "shard_index"] => {
                self.gateway.shard_index = parse_number(value)?;
            }
            ["gateway", "shard_total"] => {
                self.gateway.shard_total = parse_number(value)?;
            }
            ["gateway", "heartbeat_interval_ms"] => {
                self.gateway.heartbeat_interval_ms = parse_number(value)?;
            }
            ["gateway", "strict_decode"] => {
                self.gateway.strict_decode = parse_bool(value)?;
            }
            ["game", "dictionary_path"] => {
                self.game.dictionary_path = value.to_string();
            }
            ["game", "max_turn"] => {
                self.game.max_turn = parse_number(value)?;
            }
            ["game", "max_miss"] => {
                self.game.max_miss = parse_number(value)?;
            }
            ["game", "session_ttl_secs"] => {
                self.game.session_ttl_secs = parse_number(value)?;
            }
            ["game", "sweep_interval_secs"] => {
                self.game.sweep_interval_secs = parse_number(value)?;
            }
            ["game", "echo_unmatched"] => {
                self.game.echo_unmatched = parse_bool(value)?;
            }
            ["pool", "size"] => {
                self.pool.size = parse_number(value)?;
            }
            ["logging", "level"] => {
                self.logging.level = value.parse()?;
            }
            ["logging", "file"] => {
                self.logging.file = Some(value.to_string());
            }
            ["logging", "json_format"] => {
                self.logging.json_format = parse_bool(value)?;
            }
            _ => return Err(ConfigError::KeyNotFound(key.to_string())),
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> ConfigResult<T> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("Invalid number: {}", value)))
}

fn parse_bool(value: &str) -> ConfigResult<bool> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("Invalid boolean: {}", value)))
}

/// 开放平台 REST API 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// API 地址，默认沙箱环境
    pub base_url: String,
    /// 机器人 AppID
    pub app_id: u64,
    /// 机器人令牌，支持 `${SGROUPBOT_TOKEN}` 形式的环境变量
    pub token: String,
    /// 请求超时（秒）
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: PRODUCTION_API_BASE.to_string(),
            app_id: 0,
            token: String::new(),
            timeout_seconds: 10,
        }
    }
}

/// Gateway 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    /// 订阅的事件类别（intent 名称）
    pub intents: Vec<String>,
    /// 分片序号
    pub shard_index: u32,
    /// 分片总数
    pub shard_total: u32,
    /// 心跳间隔（毫秒）
    pub heartbeat_interval_ms: u64,
    /// 解析失败时是否直接断开（默认跳过该帧）
    #[serde(default)]
    pub strict_decode: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            intents: vec![
                "group_and_c2c_event".to_string(),
                "public_guild_messages".to_string(),
                "direct_message".to_string(),
            ],
            shard_index: 0,
            shard_total: 1,
            heartbeat_interval_ms: 30_000,
            strict_decode: false,
        }
    }
}

/// 成语接龙配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    /// 成语词库文件（JSON）
    pub dictionary_path: String,
    /// 单局最大轮数
    pub max_turn: u32,
    /// 每轮最多答错次数，0 表示不限制
    pub max_miss: u32,
    /// 会话过期时间（秒）
    pub session_ttl_secs: u64,
    /// 过期会话清理间隔（秒）
    pub sweep_interval_secs: u64,
    /// 没有进行中的游戏时是否原样回复
    #[serde(default = "default_echo_unmatched")]
    pub echo_unmatched: bool,
}

fn default_echo_unmatched() -> bool {
    true
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            dictionary_path: "~/.sgroupbot/idiom.json".to_string(),
            max_turn: 5,
            max_miss: 3,
            session_ttl_secs: 300,
            sweep_interval_secs: 60,
            echo_unmatched: true,
        }
    }
}

/// 消息处理线程池配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolConfig {
    pub size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { size: 128 }
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

/// Logging 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// 日志目录下的文件名前缀，按天滚动
    pub file: Option<String>,
    #[serde(default)]
    pub json_format: bool,
    /// 模块级别过滤，例如 `{"tokio_tungstenite": "warn"}`
    #[serde(default)]
    pub module_levels: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            json_format: false,
            module_levels: HashMap::from([
                ("tungstenite".to_string(), "warn".to_string()),
                ("tokio_tungstenite".to_string(), "warn".to_string()),
            ]),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
