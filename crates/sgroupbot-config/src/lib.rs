pub mod config;
pub mod manager;

pub use config::{
    ApiConfig, Config, ConfigError, ConfigResult, GameConfig, GatewayConfig, LogLevel,
    LoggingConfig, PoolConfig, PRODUCTION_API_BASE, SANDBOX_API_BASE,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// 获取 sgroupbot 配置目录路径
pub fn sgroupbot_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sgroupbot"))
}

/// 获取默认日志目录
pub fn default_log_dir() -> Option<PathBuf> {
    sgroupbot_dir().map(|dir| dir.join("logs"))
}

/// 展开路径中的 ~ 为用户主目录
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}
