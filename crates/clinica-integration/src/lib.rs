//! # Clinica集成模块
//!
//! 提供与外部系统的集成功能，目前包括：
//! - 影像分类器接口 [`Classifier`]
//! - 基于HTTP的分类服务连接器 [`HttpClassifier`]
//! - 用于开发和测试的固定结果分类器 [`FixedClassifier`]

pub mod classifier;
pub mod http;

pub use classifier::{Classifier, FixedClassifier};
pub use http::{AuthenticationConfig, HttpClassifier};
