//! 错误到HTTP响应的映射

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use clinica_core::ClinicaError;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{error, warn};

/// 处理器统一错误
#[derive(Debug)]
pub struct ApiError(pub ClinicaError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<ClinicaError> for ApiError {
    fn from(e: ClinicaError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ClinicaError::NotFound(_) => StatusCode::NOT_FOUND,
            ClinicaError::Validation(_) => StatusCode::BAD_REQUEST,
            ClinicaError::ForeignKey(_) => StatusCode::CONFLICT,
            ClinicaError::Classifier(_) => StatusCode::BAD_GATEWAY,
            ClinicaError::Config(_)
            | ClinicaError::Database(_)
            | ClinicaError::Io(_)
            | ClinicaError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if self.0.is_client_error() {
            warn!("Request rejected with {}: {}", status, self.0);
        } else {
            error!("Request failed with {}: {}", status, self.0);
        }

        // 资源不存在时不返回响应体
        if matches!(self.0, ClinicaError::NotFound(_)) {
            return status.into_response();
        }

        let body = Json(json!({
            "error": true,
            "message": self.0.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// JSON 提取器：格式错误或字段类型不符时返回 400，而不是框架默认的 422
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(ClinicaError::Validation(rejection.body_text()))),
        }
    }
}
