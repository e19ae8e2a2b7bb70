//! 日志初始化

use anyhow::{anyhow, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// 根据配置构造过滤器；`RUST_LOG` 存在时优先使用
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.level)
        .with_context(|| format!("Invalid log level: {}", config.level))
}

/// 初始化全局 tracing 订阅者，只能调用一次
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Full => builder.try_init(),
    };

    result.map_err(|e| anyhow!("Failed to initialize tracing: {}", e))?;

    info!(
        "Logging initialized (level {}, format {:?})",
        config.level, config.format
    );
    Ok(())
}
