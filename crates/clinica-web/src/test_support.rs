//! 处理器测试共用的辅助函数

use axum::{
    async_trait,
    body::{Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use clinica_core::{Classification, ClinicaError, Result};
use clinica_database::{DatabasePool, DatabaseQueries};
use clinica_integration::{Classifier, FixedClassifier};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::server::create_app;
use crate::state::AppState;

const BOUNDARY: &str = "clinica-test-boundary";

/// 总是失败的分类器，模拟外部服务不可用
pub struct UnavailableClassifier;

#[async_trait]
impl Classifier for UnavailableClassifier {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn classify(&self, _image: &[u8]) -> Result<Classification> {
        Err(ClinicaError::Classifier("connection refused".to_string()))
    }
}

pub async fn app_with(classifier: impl Classifier + 'static) -> Router {
    let db = DatabasePool::in_memory().await.unwrap();
    DatabaseQueries::new(&db).create_tables().await.unwrap();
    create_app(AppState::new(db, Arc::new(classifier)), 1024 * 1024)
}

pub async fn app() -> Router {
    app_with(FixedClassifier::new(0, 0.984481368213892)).await
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body)
}

pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

pub fn json_request(method: Method, uri: &str, value: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// 构造 multipart 上传请求；`paciente` 为 `None` 时省略该部分
pub fn upload_request(file_name: &str, bytes: &[u8], paciente: Option<Value>) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");

    if let Some(paciente) = paciente {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"paciente\"\r\nContent-Type: application/json\r\n\r\n{paciente}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/imagen")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn medico_json(id: i64, dni: &str, nombre: &str, especialidad: Option<&str>) -> Value {
    json!({ "id": id, "dni": dni, "nombre": nombre, "especialidad": especialidad })
}

pub fn paciente_json(id: i64, medico: Value) -> Value {
    json!({
        "id": id,
        "nombre": "Rosa",
        "edad": 30,
        "especialidad": "trauma",
        "dni": "84392821B",
        "medico": medico
    })
}

/// 创建一名医生和其患者（两者ID均为1）
pub async fn create_doctor_and_patient(app: &Router) -> Value {
    let medico = medico_json(1, "11111111A", "Mari", Some("trauma"));
    let (status, _) = send(app, json_request(Method::POST, "/medico", medico.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let paciente = paciente_json(1, medico);
    let (status, _) = send(app, json_request(Method::POST, "/paciente", paciente.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    paciente
}

/// 上传影像并返回预测文本
pub async fn upload_and_predict(app: &Router, paciente: Value) -> String {
    let (status, _) = send(app, upload_request("healthy.png", b"\x89PNG fake", Some(paciente))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_json(app, empty_request(Method::GET, "/imagen/predict/1")).await;
    assert_eq!(status, StatusCode::OK);
    body["prediction"].as_str().unwrap().to_string()
}
