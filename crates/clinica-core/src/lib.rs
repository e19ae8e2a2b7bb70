//! # Clinica Core
//!
//! 医疗记录服务的核心模块，提供领域模型、请求载荷、错误定义和通用工具。

pub mod error;
pub mod models;
pub mod payloads;
pub mod utils;

pub use error::{ClinicaError, Result};
pub use models::*;
pub use payloads::*;
