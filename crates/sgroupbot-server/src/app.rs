//! 进程装配：配置 → 词库 → 引擎 → 网关

use anyhow::Context;
use sgroupbot_api::ApiClient;
use sgroupbot_config::{Config, GameConfig, SANDBOX_API_BASE};
use sgroupbot_gateway::{ClientConfig, GatewayClient, Intents};
use sgroupbot_solitaire::{EngineConfig, IdiomDictionary, SessionStore, SolitaireEngine};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bot::{Responder, SolitaireBot};
use crate::pool::WorkerPool;

/// 命令行对配置文件的覆盖
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub app_id: Option<u64>,
    pub token: Option<String>,
    /// 改用沙箱环境 API
    pub sandbox: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(app_id) = self.app_id {
            config.api.app_id = app_id;
        }
        if let Some(token) = &self.token {
            config.api.token = token.clone();
        }
        if self.sandbox {
            config.api.base_url = SANDBOX_API_BASE.to_string();
        }
    }
}

pub fn engine_config(game: &GameConfig) -> EngineConfig {
    EngineConfig {
        max_turn: game.max_turn,
        max_miss: game.max_miss,
        ttl: Duration::from_secs(game.session_ttl_secs),
    }
}

pub fn client_config(config: &Config, token: String) -> anyhow::Result<ClientConfig> {
    let intents = Intents::from_names(&config.gateway.intents).context("Invalid gateway.intents")?;
    Ok(ClientConfig {
        token,
        intents,
        shard: [config.gateway.shard_index, config.gateway.shard_total],
        heartbeat_interval: Duration::from_millis(config.gateway.heartbeat_interval_ms),
        strict_decode: config.gateway.strict_decode,
    })
}

pub fn dictionary_path(game: &GameConfig) -> PathBuf {
    sgroupbot_config::expand_tilde(&game.dictionary_path)
        .unwrap_or_else(|| PathBuf::from(&game.dictionary_path))
}

/// 运行机器人直到 `cancel` 触发或网关连接失败
pub async fn run(config: Config, cancel: CancellationToken) -> anyhow::Result<()> {
    if config.api.app_id == 0 || config.api.token.is_empty() {
        anyhow::bail!("api.app_id and api.token must be configured");
    }

    let path = dictionary_path(&config.game);
    let dictionary = IdiomDictionary::load(&path)
        .await
        .with_context(|| format!("Failed to load idiom dictionary from {:?}", path))?;
    if dictionary.starter_count() == 0 {
        warn!("Idiom dictionary has no continuable phrase, games cannot start");
    }

    let store = Arc::new(SessionStore::new(Arc::new(dictionary)));
    let engine = Arc::new(SolitaireEngine::new(store, engine_config(&config.game)));

    let api = Arc::new(
        ApiClient::new(
            &config.api.base_url,
            config.api.app_id,
            &config.api.token,
            Duration::from_secs(config.api.timeout_seconds),
        )
        .context("Failed to create API client")?,
    );

    let bot = Arc::new(SolitaireBot::new(
        Responder::new(Arc::clone(&engine), config.game.echo_unmatched),
        api.clone(),
        WorkerPool::new(config.pool.size),
    ));
    let handlers = Arc::new(bot.handler_table());

    let client = GatewayClient::new(
        client_config(&config, api.authorization().to_string())?,
        api,
        handlers,
    );

    let sweeper = engine.spawn_sweeper(
        Duration::from_secs(config.game.sweep_interval_secs),
        cancel.child_token(),
    );

    info!(
        base_url = %config.api.base_url,
        app_id = config.api.app_id,
        pool = config.pool.size,
        "Starting idiom solitaire bot"
    );
    let result = client.run(cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = sweeper.await {
        warn!("Session sweeper failed: {}", e);
    }

    result.context("Gateway session ended")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_credentials_and_host() {
        let mut config = Config::default();
        Overrides::default().apply(&mut config);
        assert_eq!(config.api.base_url, sgroupbot_config::PRODUCTION_API_BASE);
        assert_eq!(config.api.app_id, 0);

        Overrides {
            app_id: Some(1024),
            token: Some("secret".to_string()),
            sandbox: true,
        }
        .apply(&mut config);
        assert_eq!(config.api.base_url, SANDBOX_API_BASE);
        assert_eq!(config.api.app_id, 1024);
        assert_eq!(config.api.token, "secret");
    }

    #[test]
    fn test_engine_config_from_game_section() {
        let game = GameConfig {
            max_turn: 7,
            max_miss: 0,
            session_ttl_secs: 90,
            ..GameConfig::default()
        };
        assert_eq!(
            engine_config(&game),
            EngineConfig {
                max_turn: 7,
                max_miss: 0,
                ttl: Duration::from_secs(90),
            }
        );
    }

    #[test]
    fn test_client_config_from_gateway_section() {
        let mut config = Config::default();
        config.gateway.shard_index = 1;
        config.gateway.shard_total = 4;
        config.gateway.heartbeat_interval_ms = 45_000;

        let client = client_config(&config, "Bot 1.t".to_string()).unwrap();
        assert_eq!(client.shard, [1, 4]);
        assert_eq!(client.heartbeat_interval, Duration::from_secs(45));
        assert!(client.intents.contains(Intents::GROUP_AND_C2C_EVENT));
        assert!(client.intents.contains(Intents::DIRECT_MESSAGE));

        config.gateway.intents.push("everything".to_string());
        assert!(client_config(&config, String::new()).is_err());
    }

    #[tokio::test]
    async fn test_run_requires_credentials() {
        let err = run(Config::default(), CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("api.app_id"));
    }

    #[tokio::test]
    async fn test_run_reports_missing_dictionary() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.api.app_id = 1;
        config.api.token = "t".to_string();
        config.game.dictionary_path = dir.path().join("missing.json").display().to_string();

        let err = run(config, CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("idiom dictionary"));
    }
}
