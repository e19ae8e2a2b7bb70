//! Web服务器

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clinica_core::Result;
use std::future::Future;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::doctors::{create_doctor, delete_doctor, get_doctor, get_doctor_by_dni, update_doctor};
use crate::handlers::{api_root, health};
use crate::images::{
    delete_image, download_image, image_info, list_images_by_patient, predict_image, upload_image,
};
use crate::patients::{
    create_patient, delete_patient, get_patient, list_patients_by_doctor, update_patient,
};
use crate::reports::{
    create_report, delete_report, get_report, list_reports_by_image, update_report,
};
use crate::state::AppState;

/// 构建完整路由
pub fn create_app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        // 根路径
        .route("/", get(api_root))
        // 健康检查
        .route("/health", get(health))
        // 医生
        .route("/medico", post(create_doctor).put(update_doctor))
        .route("/medico/:id", get(get_doctor).delete(delete_doctor))
        .route("/medico/dni/:dni", get(get_doctor_by_dni))
        // 患者
        .route("/paciente", post(create_patient).put(update_patient))
        .route("/paciente/:id", get(get_patient).delete(delete_patient))
        .route("/paciente/medico/:id", get(list_patients_by_doctor))
        // 影像
        .route("/imagen", post(upload_image))
        .route("/imagen/:id", get(download_image).delete(delete_image))
        .route("/imagen/info/:id", get(image_info))
        .route("/imagen/paciente/:id", get(list_images_by_patient))
        .route("/imagen/predict/:id", get(predict_image))
        // 报告
        .route("/informe", post(create_report).put(update_report))
        .route("/informe/:id", get(get_report).delete(delete_report))
        .route("/informe/imagen/:id", get(list_reports_by_image))
        // 全局中间件
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState, max_upload_bytes: usize) -> Self {
        let app = create_app(state, max_upload_bytes);
        Self { addr, app }
    }

    /// 运行直到收到 Ctrl-C
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// 运行直到 `shutdown` 完成
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!("Starting web server on {}", listener.local_addr()?);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Web server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinica_database::{DatabasePool, DatabaseQueries};
    use clinica_integration::FixedClassifier;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_server_stops_on_shutdown_signal() {
        let db = DatabasePool::in_memory().await.unwrap();
        DatabaseQueries::new(&db).create_tables().await.unwrap();
        let state = AppState::new(db, Arc::new(FixedClassifier::new(0, 0.5)));

        let server = WebServer::new("127.0.0.1:0".parse().unwrap(), state, 1024);
        server.run_until(async {}).await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        use crate::test_support::*;
        use axum::http::StatusCode;

        let db = DatabasePool::in_memory().await.unwrap();
        DatabaseQueries::new(&db).create_tables().await.unwrap();
        let app = create_app(
            AppState::new(db, Arc::new(FixedClassifier::new(0, 0.5))),
            1024,
        );
        create_doctor_and_patient(&app).await;

        let (status, _) = send(
            &app,
            upload_request("big.png", &[7u8; 4096], Some(serde_json::json!({ "id": 1 }))),
        )
        .await;
        assert!(status.is_client_error());
        assert_ne!(status, StatusCode::CREATED);
    }
}
