//! Clinica 服务器主程序

use anyhow::{Context, Result};
use clap::Parser;
use clinica_admin::{
    init_tracing, AppConfig, ClassifierConfig, ClassifierKind, ConfigManager, ConfigValidator,
};
use clinica_database::{DatabasePool, DatabaseQueries};
use clinica_integration::{Classifier, FixedClassifier, HttpClassifier};
use clinica_web::{AppState, WebServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Clinica服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "clinica-server")]
#[command(about = "医生、患者、影像与诊断报告管理服务")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 监听主机
    #[arg(long)]
    host: Option<String>,

    /// 监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 数据库连接字符串
    #[arg(long)]
    database_url: Option<String>,

    /// 日志级别
    #[arg(short, long)]
    log_level: Option<String>,

    /// 输出生效的配置后退出
    #[arg(long)]
    print_config: bool,
}

impl Args {
    /// 命令行参数覆盖文件与环境变量
    fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

fn build_classifier(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>> {
    match config.kind {
        ClassifierKind::Fixed => Ok(Arc::new(FixedClassifier::new(
            config.fixed_label,
            config.fixed_score,
        ))),
        ClassifierKind::Http => {
            let endpoint = config
                .endpoint
                .clone()
                .context("classifier.endpoint is required for the http classifier")?;
            let classifier = HttpClassifier::new(endpoint, config.timeout(), config.auth.clone())?;
            Ok(Arc::new(classifier))
        }
    }
}

/// 解析监听地址，主机部分可以是IP或主机名
async fn resolve_listen_addr(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("Failed to resolve listen address {}:{}", host, port))?
        .next()
        .with_context(|| format!("No address found for {}:{}", host, port))
}

async fn run(config: AppConfig) -> Result<()> {
    let addr = resolve_listen_addr(&config.server.host, config.server.port).await?;

    let db = DatabasePool::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    DatabaseQueries::new(&db)
        .create_tables()
        .await
        .context("Failed to create database schema")?;

    let classifier = build_classifier(&config.classifier)?;

    info!("Clinica服务器配置:");
    info!("  监听地址: {}", addr);
    info!("  数据库: {}", config.database.url);
    info!("  分类器: {}", classifier.name());
    info!("  上传上限: {} 字节", config.upload.max_bytes);

    let state = AppState::new(db.clone(), classifier);
    let server = WebServer::new(addr, state, config.upload.max_bytes);

    let result = server.run().await;
    db.close().await;
    result.context("Web server failed")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ConfigManager::load(args.config.as_deref())?;
    args.apply(&mut config);
    ConfigValidator::new().validate(&config)?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_tracing(&config.logging)?;

    info!("启动Clinica服务器...");
    info!(
        "Configuration loaded from {}",
        ConfigManager::describe_source(args.config.as_deref())
    );

    if let Err(e) = run(config).await {
        error!("服务器运行失败: {:#}", e);
        return Err(e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "clinica-server",
            "--port",
            "9100",
            "--database-url",
            "sqlite::memory:",
            "--log-level",
            "debug",
        ]);

        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.logging.level, "debug");
        assert!(!args.print_config);
    }

    #[tokio::test]
    async fn test_build_fixed_classifier() {
        let config = ClassifierConfig {
            kind: ClassifierKind::Fixed,
            fixed_label: 1,
            fixed_score: 0.6412607431411743,
            ..ClassifierConfig::default()
        };

        let classifier = build_classifier(&config).unwrap();
        let result = classifier.classify(b"png").await.unwrap();
        assert_eq!(result.label, 1);
    }

    #[tokio::test]
    async fn test_listen_address_accepts_hostnames() {
        let addr = resolve_listen_addr("127.0.0.1", 8080).await.unwrap();
        assert_eq!(addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());

        let addr = resolve_listen_addr("localhost", 9100).await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 9100);
    }

    #[test]
    fn test_http_classifier_requires_endpoint() {
        let config = ClassifierConfig {
            endpoint: None,
            ..ClassifierConfig::default()
        };
        assert!(build_classifier(&config).is_err());
    }
}
