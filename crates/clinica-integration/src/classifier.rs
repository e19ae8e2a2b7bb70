//! 影像分类能力
//!
//! 预测接口只依赖 [`Classifier`] trait，具体模型运行在外部服务中，
//! 测试和本地开发可以换成 [`FixedClassifier`]。

use async_trait::async_trait;
use clinica_core::{Classification, Result};
use tracing::debug;

/// 分类器接口：输入影像字节，输出标签与置信度
#[async_trait]
pub trait Classifier: Send + Sync {
    /// 分类器名称，用于日志
    fn name(&self) -> &str;

    async fn classify(&self, image: &[u8]) -> Result<Classification>;
}

/// 返回固定结果的分类器
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    classification: Classification,
}

impl FixedClassifier {
    pub fn new(label: u8, score: f64) -> Self {
        Self {
            classification: Classification::new(label, score),
        }
    }
}

#[async_trait]
impl Classifier for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn classify(&self, image: &[u8]) -> Result<Classification> {
        debug!(
            "Fixed classifier answering for {} bytes: label {}",
            image.len(),
            self.classification.label
        );
        Ok(self.classification)
    }
}
