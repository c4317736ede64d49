//! 结构化日志初始化
//!
//! 控制台输出文本或 JSON，配置了 `logging.file` 时再按天滚动写入日志目录。

use anyhow::Context;
use sgroupbot_config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 最终生效的日志级别：命令行/环境变量 > `--debug` > 配置文件
pub fn effective_level(config: &LoggingConfig, level_override: Option<&str>, debug: bool) -> String {
    match level_override {
        Some(level) => level.to_string(),
        None if debug => "debug".to_string(),
        None => config.level.to_string(),
    }
}

/// 构建环境过滤器，附加模块级别
pub fn build_filter(level: &str, config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(level).context("Invalid log level")?;

    for (module, module_level) in &config.module_levels {
        let directive: Directive = format!("{}={}", module, module_level)
            .parse()
            .with_context(|| format!("Invalid log directive for {}", module))?;
        filter = filter.add_directive(directive);
    }

    Ok(filter)
}

/// 初始化全局 subscriber，返回的 guard 需要在进程结束前一直持有
pub fn init_logging(
    config: &LoggingConfig,
    level_override: Option<&str>,
    debug: bool,
) -> anyhow::Result<Option<WorkerGuard>> {
    let level = effective_level(config, level_override, debug);
    let filter = build_filter(&level, config)?;

    let (file_writer, guard) = match &config.file {
        Some(prefix) => {
            let dir = sgroupbot_config::default_log_dir()
                .context("Could not determine log directory")?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {:?}", dir))?;
            let appender = tracing_appender::rolling::daily(&dir, prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_format {
        let file_layer = file_writer.map(|writer| {
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
        });
        registry
            .with(fmt::layer().json().with_target(true).with_line_number(true))
            .with(file_layer)
            .try_init()
            .context("Failed to install log subscriber")?;
    } else {
        let file_layer = file_writer.map(|writer| fmt::layer().with_writer(writer).with_ansi(false));
        registry
            .with(fmt::layer().with_target(true))
            .with(file_layer)
            .try_init()
            .context("Failed to install log subscriber")?;
    }

    tracing::info!(%level, "Logging initialized");
    Ok(guard)
}
