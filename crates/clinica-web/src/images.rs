//! 影像存储与预测处理器

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::Utc;
use clinica_core::{ClinicaError, EntityId, EntityRef, Image};
use clinica_database::{DatabaseQueries, NewImage};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// 预测接口返回体
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: String,
}

fn multipart_error(e: MultipartError) -> ClinicaError {
    ClinicaError::Validation(format!("invalid multipart body: {}", e.body_text()))
}

/// `paciente` 部分既可以是完整的患者JSON，也可以只是ID
fn parse_patient_reference(raw: &[u8]) -> Result<EntityId, ClinicaError> {
    if let Ok(reference) = serde_json::from_slice::<EntityRef>(raw) {
        if let Some(id) = reference.id {
            return Ok(id);
        }
    }

    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<EntityId>().ok())
        .ok_or_else(|| ClinicaError::Validation("paciente part must carry an id".to_string()))
}

/// POST /imagen：multipart 请求，包含 `image` 文件与 `paciente` JSON
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut upload: Option<(String, String, Vec<u8>)> = None;
    let mut patient_id: Option<EntityId> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_string);

        match field_name.as_deref() {
            Some("image") => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some((file_name, content_type, bytes.to_vec()));
            }
            Some("paciente") => {
                let bytes = field.bytes().await.map_err(multipart_error)?;
                patient_id = Some(parse_patient_reference(&bytes)?);
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let (name, content_type, content) = upload
        .ok_or_else(|| ClinicaError::Validation("missing image part".to_string()))?;
    let patient_id =
        patient_id.ok_or_else(|| ClinicaError::Validation("missing paciente part".to_string()))?;

    if content.is_empty() {
        return Err(ClinicaError::Validation("image part is empty".to_string()).into());
    }

    let new_image = NewImage {
        name,
        content_type,
        content,
        uploaded_at: Utc::now(),
        patient_id,
    };
    let image = DatabaseQueries::new(&state.db)
        .create_image(&new_image)
        .await?;

    info!(
        "Uploaded imagen {} ({}) for paciente {}",
        image.id, image.name, patient_id
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "response": format!("file uploaded successfully : {}", image.name),
            "id": image.id
        })),
    ))
}

/// GET /imagen/:id：原始字节
pub async fn download_image(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<impl IntoResponse> {
    let content = DatabaseQueries::new(&state.db)
        .get_image_content(id)
        .await?;

    Ok(([(header::CONTENT_TYPE, content.content_type)], content.bytes))
}

/// GET /imagen/info/:id
pub async fn image_info(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<Image>> {
    let image = DatabaseQueries::new(&state.db)
        .get_image_by_id(id)
        .await?
        .ok_or_else(|| ClinicaError::not_found("imagen", id))?;

    Ok(Json(image))
}

/// GET /imagen/paciente/:id
pub async fn list_images_by_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<EntityId>,
) -> ApiResult<Json<Vec<Image>>> {
    let images = DatabaseQueries::new(&state.db)
        .get_images_by_patient_id(patient_id)
        .await?;

    Ok(Json(images))
}

/// GET /imagen/predict/:id：调用分类器并记录结果
pub async fn predict_image(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<PredictionResponse>> {
    let queries = DatabaseQueries::new(&state.db);
    let content = queries.get_image_content(id).await?;

    debug!(
        "Classifying imagen {} ({} bytes) with {}",
        id,
        content.bytes.len(),
        state.classifier.name()
    );
    let classification = state.classifier.classify(&content.bytes).await?;
    let prediction = classification.prediction_text()?;

    queries.update_image_prediction(id, &prediction).await?;

    info!("Prediction for imagen {}: {}", id, prediction);
    Ok(Json(PredictionResponse { prediction }))
}

/// DELETE /imagen/:id
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<StatusCode> {
    let removed = DatabaseQueries::new(&state.db).delete_image(id).await?;

    info!("Deleted imagen {} ({} rows)", id, removed);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::parse_patient_reference;
    use crate::test_support::*;
    use axum::http::{header, Method, StatusCode};
    use clinica_integration::FixedClassifier;
    use serde_json::json;

    #[test]
    fn test_parse_patient_reference() {
        assert_eq!(parse_patient_reference(br#"{"id": 3, "nombre": "Rosa"}"#).unwrap(), 3);
        assert_eq!(parse_patient_reference(b" 4 ").unwrap(), 4);
        assert!(parse_patient_reference(br#"{"nombre": "Rosa"}"#).is_err());
    }

    #[tokio::test]
    async fn test_upload_image() {
        let app = app().await;
        let paciente = create_doctor_and_patient(&app).await;

        let (status, body) =
            send_json(&app, upload_request("healthy.png", b"\x89PNG data", Some(paciente))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 1);
        assert_eq!(body["response"], "file uploaded successfully : healthy.png");
    }

    #[tokio::test]
    async fn test_prediction_healthy_image() {
        let app = app_with(FixedClassifier::new(0, 0.984481368213892)).await;
        let paciente = create_doctor_and_patient(&app).await;

        let prediction = upload_and_predict(&app, paciente).await;
        assert_eq!(prediction, "Not cancer (label 0),  score: 0.984481368213892");
    }

    #[tokio::test]
    async fn test_prediction_with_whole_score() {
        let app = app_with(FixedClassifier::new(0, 1.0)).await;
        let paciente = create_doctor_and_patient(&app).await;

        let prediction = upload_and_predict(&app, paciente).await;
        assert_eq!(prediction, "Not cancer (label 0),  score: 1.0");
    }

    #[tokio::test]
    async fn test_prediction_cancer_image() {
        let app = app_with(FixedClassifier::new(1, 0.6412607431411743)).await;
        let paciente = create_doctor_and_patient(&app).await;

        send(&app, upload_request("no_healthty.png", b"\x89PNG other", Some(paciente))).await;
        let (status, body) = send_json(&app, empty_request(Method::GET, "/imagen/predict/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "Cancer (label 1), score: 0.6412607431411743");

        // 预测结果随影像信息一起返回
        let (_, info) = send_json(&app, empty_request(Method::GET, "/imagen/info/1")).await;
        assert_eq!(info["prediccion"], "Cancer (label 1), score: 0.6412607431411743");
    }

    #[tokio::test]
    async fn test_predict_missing_image() {
        let app = app().await;
        let (status, _) = send(&app, empty_request(Method::GET, "/imagen/predict/5")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_classifier_failure_is_bad_gateway() {
        let app = app_with(UnavailableClassifier).await;
        let paciente = create_doctor_and_patient(&app).await;
        send(&app, upload_request("healthy.png", b"\x89PNG", Some(paciente))).await;

        let (status, body) = send_json(&app, empty_request(Method::GET, "/imagen/predict/1")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["status"], 502);

        let (_, info) = send_json(&app, empty_request(Method::GET, "/imagen/info/1")).await;
        assert!(info.get("prediccion").is_none());
    }

    #[tokio::test]
    async fn test_upload_requires_both_parts() {
        let app = app().await;
        create_doctor_and_patient(&app).await;

        let (status, _) = send(&app, upload_request("healthy.png", b"\x89PNG", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_for_missing_patient_conflicts() {
        let app = app().await;

        let (status, _) =
            send(&app, upload_request("healthy.png", b"\x89PNG", Some(json!({ "id": 3 })))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_download_info_list_and_delete() {
        let app = app().await;
        let paciente = create_doctor_and_patient(&app).await;
        send(&app, upload_request("healthy.png", b"\x89PNG bytes", Some(paciente))).await;

        let response = {
            use tower::ServiceExt;
            app.clone()
                .oneshot(empty_request(Method::GET, "/imagen/1"))
                .await
                .unwrap()
        };
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"\x89PNG bytes");

        let (status, info) = send_json(&app, empty_request(Method::GET, "/imagen/info/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(info["nombre"], "healthy.png");
        assert_eq!(info["paciente"]["id"], 1);
        assert!(info["fecha"].is_string());

        let (_, list) = send_json(&app, empty_request(Method::GET, "/imagen/paciente/1")).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, empty_request(Method::DELETE, "/imagen/1")).await;
        assert!(status.is_success());
        let (status, _) = send(&app, empty_request(Method::GET, "/imagen/info/1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
