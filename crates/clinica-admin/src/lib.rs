//! Clinica 管理模块
//!
//! 配置加载、校验与日志初始化。

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, ClassifierConfig, ClassifierKind, ConfigManager, ConfigValidator, DatabaseConfig,
    LogFormat, LoggingConfig, ServerConfig, UploadConfig,
};
pub use logging::init_tracing;
