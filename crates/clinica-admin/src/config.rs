//! 配置管理
//!
//! 配置来源按优先级从低到高：内置默认值、TOML 配置文件、`CLINICA__` 前缀的环境变量。
//! 命令行参数由服务端程序在加载之后再覆盖。

use anyhow::{Context, Result};
use clinica_integration::AuthenticationConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "CLINICA";

/// 系统完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 上传配置
    pub upload: UploadConfig,
    /// 分类服务配置
    pub classifier: ClassifierConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// 数据库配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 连接字符串
    pub url: String,
    /// 最大连接数
    pub max_connections: u32,
}

/// 上传配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// 请求体最大字节数
    pub max_bytes: usize,
}

/// 分类器实现
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    Http,
    Fixed,
}

/// 分类服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,
    /// 分类服务地址，`kind = "http"` 时必填
    pub endpoint: Option<String>,
    /// 请求超时秒数
    pub timeout_secs: u64,
    /// `kind = "fixed"` 时返回的标签
    pub fixed_label: u8,
    /// `kind = "fixed"` 时返回的置信度
    pub fixed_score: f64,
    pub auth: AuthenticationConfig,
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Full,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别或 EnvFilter 指令
    pub level: String,
    /// 日志格式
    pub format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://clinica.db".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::Http,
            endpoint: Some("http://localhost:5000/predict".to_string()),
            timeout_secs: 30,
            fixed_label: 0,
            fixed_score: 1.0,
            auth: AuthenticationConfig::None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl AppConfig {
    /// 序列化为 TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 配置来源说明，日志系统初始化后用于记录
    pub fn describe_source(path: Option<&Path>) -> String {
        match path {
            Some(path) => format!("{} + {}__* environment", path.display(), ENV_PREFIX),
            None => format!("defaults + {}__* environment", ENV_PREFIX),
        }
    }

    /// 加载并校验配置；`path` 为 `None` 时只使用默认值与环境变量
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);
        Self::load_with_env(path, env)
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<AppConfig> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration sources")?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        ConfigValidator::new().validate(&config)?;
        Ok(config)
    }
}

/// 配置验证器
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&AppConfig) -> Result<()>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "server.port",
                validator: |config| {
                    if config.server.port == 0 {
                        Err(anyhow::anyhow!("Server port cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "database.max_connections",
                validator: |config| {
                    if config.database.max_connections == 0 {
                        Err(anyhow::anyhow!("Database max connections cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "upload.max_bytes",
                validator: |config| {
                    if config.upload.max_bytes == 0 {
                        Err(anyhow::anyhow!("Upload limit cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "classifier.endpoint",
                validator: |config| {
                    let missing = config
                        .classifier
                        .endpoint
                        .as_deref()
                        .map_or(true, |e| e.trim().is_empty());
                    if config.classifier.kind == ClassifierKind::Http && missing {
                        Err(anyhow::anyhow!("HTTP classifier requires an endpoint"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "classifier.fixed_label",
                validator: |config| {
                    if config.classifier.kind == ClassifierKind::Fixed
                        && config.classifier.fixed_label > 1
                    {
                        Err(anyhow::anyhow!(
                            "Fixed classifier label must be 0 or 1, got {}",
                            config.classifier.fixed_label
                        ))
                    } else {
                        Ok(())
                    }
                },
            },
        ];

        Self { validation_rules }
    }

    pub fn validate(&self, config: &AppConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                return Err(e.context(format!("Invalid {}", rule.field_path)));
            }
        }

        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
