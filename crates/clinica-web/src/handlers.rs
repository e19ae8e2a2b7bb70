//! 通用HTTP处理器

use axum::{extract::State, response::IntoResponse, response::Json};
use clinica_database::DatabaseQueries;
use serde_json::json;

use crate::error::ApiResult;
use crate::state::AppState;

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "Clinica API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "medico": "/medico",
            "paciente": "/paciente",
            "imagen": "/imagen",
            "informe": "/informe"
        }
    }))
}

/// 健康检查处理器，同时确认数据库可用
pub async fn health(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let counts = DatabaseQueries::new(&state.db).table_counts().await?;

    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "classifier": state.classifier.name(),
        "records": counts
    })))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_health_reports_counts() {
        let app = app().await;
        create_doctor_and_patient(&app).await;

        let (status, body) = send_json(&app, empty_request(Method::GET, "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["classifier"], "fixed");
        assert_eq!(body["records"]["doctors"], 1);
        assert_eq!(body["records"]["patients"], 1);
        assert_eq!(body["records"]["images"], 0);
    }

    #[tokio::test]
    async fn test_api_root() {
        let app = app().await;
        let (status, body) = send_json(&app, empty_request(Method::GET, "/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["endpoints"]["informe"], "/informe");
    }
}
