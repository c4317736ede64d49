use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sgroupbot_config::{Config, ConfigManager};
use sgroupbot_server::{app, logging};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sgroupbot")]
#[command(about = "成语接龙机器人")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, env = "SGROUPBOT_CONFIG", default_value = "~/.sgroupbot/config.json")]
    config: String,

    /// Enable debug logging
    #[arg(long, short, env = "DEBUG", default_value = "false")]
    debug: bool,

    /// Log level or filter directives (overrides config)
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Bot AppID (overrides config)
    #[arg(long, env = "SGROUPBOT_APP_ID")]
    app_id: Option<u64>,

    /// Bot token (overrides config)
    #[arg(long, env = "SGROUPBOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Use the sandbox API endpoint instead of production
    #[arg(long, default_value = "false")]
    sandbox: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 连接网关并运行机器人（默认）
    Run,
    /// 配置管理命令
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// 显示当前配置
    Show,
    /// 初始化默认配置
    Init {
        /// 强制覆盖已有配置
        #[arg(long, default_value = "false")]
        force: bool,
    },
    /// 获取配置值
    Get {
        /// 配置键 (如: game.max_turn, api.base_url)
        key: String,
    },
    /// 设置配置值
    Set {
        /// 配置键 (如: game.max_turn, api.base_url)
        key: String,
        /// 配置值
        value: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 展开配置文件路径
    let config_path =
        sgroupbot_config::expand_tilde(&cli.config).unwrap_or_else(|| PathBuf::from(&cli.config));

    match &cli.command {
        None | Some(Commands::Run) => run(&cli, &config_path).await,
        Some(Commands::Config(args)) => handle_config(args, &config_path).await,
    }
}

async fn run(cli: &Cli, config_path: &Path) -> anyhow::Result<()> {
    let manager = ConfigManager::load(config_path)
        .await
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    let mut config = manager.snapshot().await;

    // 命令行参数覆盖配置文件
    app::Overrides {
        app_id: cli.app_id,
        token: cli.token.clone(),
        sandbox: cli.sandbox,
    }
    .apply(&mut config);
    ConfigManager::validate(&config)?;

    let _guard = logging::init_logging(&config.logging, cli.log_level.as_deref(), cli.debug)?;
    info!("Config loaded from {:?}", config_path);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down");
            shutdown.cancel();
        }
    });

    app::run(config, cancel).await
}

async fn handle_config(args: &ConfigArgs, config_path: &Path) -> anyhow::Result<()> {
    match &args.command {
        ConfigCommands::Show => {
            let manager = ConfigManager::load(config_path).await?;
            let mut config = manager.snapshot().await;
            if !config.api.token.is_empty() {
                config.api.token = "******".to_string();
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                println!("Config already exists at {:?}", config_path);
                println!("Use --force to overwrite");
                return Ok(());
            }
            let manager = ConfigManager::new(Config::default(), config_path.to_path_buf());
            manager.save().await?;
            println!("Config initialized at {:?}", config_path);
        }
        ConfigCommands::Get { key } => {
            let manager = ConfigManager::load(config_path).await?;
            let config = manager.snapshot().await;
            match config.get_value(key) {
                Some(value) => println!("{} = {}", key, value),
                None => anyhow::bail!("Key not found: {}", key),
            }
        }
        ConfigCommands::Set { key, value } => {
            let manager = ConfigManager::load(config_path).await?;
            manager.update(|config| config.set_value(key, value)).await?;
            println!("Set {} = {}", key, value);
        }
    }
    Ok(())
}
