//! 诊断报告处理器

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use clinica_core::{ClinicaError, EntityId, Report, ReportPayload};
use clinica_database::DatabaseQueries;
use tracing::info;

use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

/// POST /informe：影像必须已有预测结果
pub async fn create_report(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ReportPayload>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    let record = payload.into_record()?;
    let report = DatabaseQueries::new(&state.db)
        .create_report(&record)
        .await?;

    info!("Created informe {} for imagen {}", report.id, report.image.id);
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /informe/:id
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<Report>> {
    let report = DatabaseQueries::new(&state.db)
        .get_report_by_id(id)
        .await?
        .ok_or_else(|| ClinicaError::not_found("informe", id))?;

    Ok(Json(report))
}

/// GET /informe/imagen/:id
pub async fn list_reports_by_image(
    State(state): State<AppState>,
    Path(image_id): Path<EntityId>,
) -> ApiResult<Json<Vec<Report>>> {
    let reports = DatabaseQueries::new(&state.db)
        .get_reports_by_image_id(image_id)
        .await?;

    Ok(Json(reports))
}

/// PUT /informe
pub async fn update_report(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ReportPayload>,
) -> ApiResult<StatusCode> {
    let (id, record) = payload.into_replacement()?;
    DatabaseQueries::new(&state.db)
        .replace_report(id, &record)
        .await?;

    info!("Updated informe {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /informe/:id
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<StatusCode> {
    let removed = DatabaseQueries::new(&state.db).delete_report(id).await?;

    info!("Deleted informe {} ({} rows)", id, removed);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    fn informe_json(prediction: &str) -> Value {
        json!({
            "id": 1,
            "prediccion": prediction,
            "contenido": "Paciente sano",
            "imagen": { "id": 1, "nombre": "healthy.png" }
        })
    }

    #[tokio::test]
    async fn test_create_report_after_prediction() {
        let app = app().await;
        let paciente = create_doctor_and_patient(&app).await;
        let prediction = upload_and_predict(&app, paciente).await;

        let (status, body) =
            send_json(&app, json_request(Method::POST, "/informe", informe_json(&prediction))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 1);
        assert_eq!(body["prediccion"], prediction);
        assert_eq!(body["imagen"]["id"], 1);

        let (status, body) = send_json(&app, empty_request(Method::GET, "/informe/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["contenido"], "Paciente sano");
        assert_eq!(body["imagen"]["paciente"]["medico"]["id"], 1);
    }

    #[tokio::test]
    async fn test_report_requires_prediction() {
        let app = app().await;
        let paciente = create_doctor_and_patient(&app).await;
        send(&app, upload_request("healthy.png", b"\x89PNG", Some(paciente))).await;

        let (status, _) = send(
            &app,
            json_request(Method::POST, "/informe", informe_json("Not cancer")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_report_for_missing_image_conflicts() {
        let app = app().await;

        let (status, _) = send(
            &app,
            json_request(Method::POST, "/informe", informe_json("Not cancer")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_update_list_and_delete_report() {
        let app = app().await;
        let paciente = create_doctor_and_patient(&app).await;
        let prediction = upload_and_predict(&app, paciente).await;
        send(&app, json_request(Method::POST, "/informe", informe_json(&prediction))).await;

        let mut updated = informe_json(&prediction);
        updated["contenido"] = json!("Revisar en seis meses");
        let (status, _) = send(&app, json_request(Method::PUT, "/informe", updated)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, list) = send_json(&app, empty_request(Method::GET, "/informe/imagen/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["contenido"], "Revisar en seis meses");

        // 影像仍有报告时不能删除
        let (status, _) = send(&app, empty_request(Method::DELETE, "/imagen/1")).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, empty_request(Method::DELETE, "/informe/1")).await;
        assert!(status.is_success());
        let (status, _) = send(&app, empty_request(Method::GET, "/informe/1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
