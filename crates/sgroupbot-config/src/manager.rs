use crate::config::{Config, ConfigError, ConfigResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::info;

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
    config: Arc<RwLock<Config>>,
}

impl ConfigManager {
    /// 加载配置文件，不存在时写入默认配置
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let config = if path.exists() {
            info!("Loading config from {:?}", path);
            let content = tokio::fs::read_to_string(path).await?;
            let content = Self::expand_env_vars(&content)?;
            serde_json::from_str(&content)?
        } else {
            info!("Config file not found, creating default config at {:?}", path);
            let default_config = Config::default();
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let content = serde_json::to_string_pretty(&default_config)?;
            tokio::fs::write(path, &content).await?;
            default_config
        };

        Ok(Self {
            path: path.to_path_buf(),
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// 创建一个新的配置管理器（用于测试）
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// 当前配置的快照
    pub async fn snapshot(&self) -> Config {
        self.config.read().await.clone()
    }

    /// 保存配置到文件
    pub async fn save(&self) -> ConfigResult<()> {
        let config = self.config.read().await;
        let content = serde_json::to_string_pretty(&*config)?;
        drop(config);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await?;
        info!("Config saved to {:?}", self.path);
        Ok(())
    }

    /// 更新配置并保存
    pub async fn update<F>(&self, f: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config) -> ConfigResult<()>,
    {
        let mut config = self.config.write().await;
        f(&mut config)?;
        Self::validate(&config)?;
        drop(config);
        self.save().await
    }

    /// 验证配置
    pub fn validate(config: &Config) -> ConfigResult<()> {
        if config.api.base_url.is_empty() {
            return Err(ConfigError::Validation(
                "api.base_url cannot be empty".to_string(),
            ));
        }

        if config.gateway.shard_total == 0 {
            return Err(ConfigError::Validation(
                "gateway.shard_total must be greater than 0".to_string(),
            ));
        }

        if config.gateway.shard_index >= config.gateway.shard_total {
            return Err(ConfigError::Validation(format!(
                "gateway.shard_index {} out of range for {} shards",
                config.gateway.shard_index, config.gateway.shard_total
            )));
        }

        if config.gateway.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "gateway.heartbeat_interval_ms must be greater than 0".to_string(),
            ));
        }

        if config.game.max_turn == 0 {
            return Err(ConfigError::Validation(
                "game.max_turn must be greater than 0".to_string(),
            ));
        }

        if config.game.session_ttl_secs == 0 || config.game.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "game.session_ttl_secs and game.sweep_interval_secs must be greater than 0"
                    .to_string(),
            ));
        }

        if config.pool.size == 0 {
            return Err(ConfigError::Validation(
                "pool.size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// 展开环境变量 ${VAR} 或 ${VAR:-default}
    pub fn expand_env_vars(content: &str) -> ConfigResult<String> {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex")
        });

        let mut missing = None;
        let expanded = re.replace_all(content, |cap: &regex::Captures<'_>| {
            let var_expr = &cap[1];
            let (var_name, default_value) = match var_expr.split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (var_expr, None),
            };

            match (std::env::var(var_name), default_value) {
                (Ok(val), _) => val,
                (Err(_), Some(default)) => default.to_string(),
                (Err(_), None) => {
                    missing.get_or_insert_with(|| var_name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(var_name) => Err(ConfigError::EnvVarNotFound(var_name)),
            None => Ok(expanded.into_owned()),
        }
    }

    /// 获取配置文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_creates_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let manager = ConfigManager::load(&config_path).await.unwrap();
        let config = manager.snapshot().await;

        assert!(config_path.exists());
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_load_expands_env_vars() {
        std::env::set_var("SGROUPBOT_TEST_TOKEN", "expanded-token");

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let mut value = serde_json::to_value(Config::default()).unwrap();
        value["api"]["token"] = serde_json::json!("${SGROUPBOT_TEST_TOKEN}");
        value["api"]["base_url"] = serde_json::json!("${SGROUPBOT_TEST_UNSET:-https://example.test}");
        tokio::fs::write(&config_path, serde_json::to_string(&value).unwrap())
            .await
            .unwrap();

        let manager = ConfigManager::load(&config_path).await.unwrap();
        let config = manager.snapshot().await;
        assert_eq!(config.api.token, "expanded-token");
        assert_eq!(config.api.base_url, "https://example.test");
    }

    #[test]
    fn test_missing_env_var_is_an_error() {
        let err = ConfigManager::expand_env_vars(r#"{"token": "${SGROUPBOT_SURELY_UNSET_VAR}"}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound(name) if name == "SGROUPBOT_SURELY_UNSET_VAR"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(ConfigManager::validate(&config).is_ok());

        config.gateway.shard_index = 1;
        assert!(ConfigManager::validate(&config).is_err());

        config.gateway.shard_index = 0;
        config.pool.size = 0;
        assert!(ConfigManager::validate(&config).is_err());

        config.pool.size = 4;
        config.game.max_turn = 0;
        assert!(ConfigManager::validate(&config).is_err());
    }

    #[tokio::test]
    async fn test_update_persists_changes() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let manager = ConfigManager::load(&config_path).await.unwrap();

        manager
            .update(|config| config.set_value("game.max_miss", "5"))
            .await
            .unwrap();

        let reloaded = ConfigManager::load(&config_path).await.unwrap();
        assert_eq!(reloaded.snapshot().await.game.max_miss, 5);
    }
}
