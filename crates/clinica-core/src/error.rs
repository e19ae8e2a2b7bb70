//! 错误定义模块

use thiserror::Error;

/// 系统统一错误类型
#[derive(Error, Debug)]
pub enum ClinicaError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 引用的医生/患者/影像不存在，或记录仍被引用
    #[error("外键约束错误: {0}")]
    ForeignKey(String),

    /// 外部分类服务不可用或返回了无法解析的结果
    #[error("分类服务错误: {0}")]
    Classifier(String),

    #[error("网络错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClinicaError {
    /// 是否属于客户端错误（请求本身有问题）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ClinicaError::NotFound(_) | ClinicaError::Validation(_) | ClinicaError::ForeignKey(_)
        )
    }

    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ClinicaError::NotFound(format!("{} {} not found", entity, id))
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for ClinicaError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => ClinicaError::NotFound(e.to_string()),
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ClinicaError::ForeignKey(db.message().to_string())
            }
            _ => ClinicaError::Database(e.to_string()),
        }
    }
}

/// 系统统一结果类型
pub type Result<T> = std::result::Result<T, ClinicaError>;
