//! Clinica Web API
//!
//! 提供医生、患者、影像与诊断报告的 REST 接口。

pub mod doctors;
pub mod error;
pub mod handlers;
pub mod images;
pub mod patients;
pub mod reports;
pub mod server;
pub mod state;

#[cfg(test)]
mod test_support;

pub use error::{ApiError, ApiResult};
pub use server::{create_app, WebServer};
pub use state::AppState;
