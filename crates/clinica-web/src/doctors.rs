//! 医生登记处理器

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use clinica_core::{ClinicaError, Doctor, DoctorPayload, EntityId};
use clinica_database::DatabaseQueries;
use tracing::info;

use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

/// POST /medico：客户端提供的ID会被忽略
pub async fn create_doctor(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<DoctorPayload>,
) -> ApiResult<(StatusCode, Json<Doctor>)> {
    let record = payload.into_record()?;
    let doctor = DatabaseQueries::new(&state.db).create_doctor(&record).await?;

    info!("Created medico {}", doctor.id);
    Ok((StatusCode::CREATED, Json(doctor)))
}

/// GET /medico/:id
pub async fn get_doctor(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<Doctor>> {
    let doctor = DatabaseQueries::new(&state.db)
        .get_doctor_by_id(id)
        .await?
        .ok_or_else(|| ClinicaError::not_found("medico", id))?;

    Ok(Json(doctor))
}

/// GET /medico/dni/:dni
pub async fn get_doctor_by_dni(
    State(state): State<AppState>,
    Path(dni): Path<String>,
) -> ApiResult<Json<Doctor>> {
    let doctor = DatabaseQueries::new(&state.db)
        .get_doctor_by_dni(&dni)
        .await?
        .ok_or_else(|| ClinicaError::not_found("medico con dni", &dni))?;

    Ok(Json(doctor))
}

/// PUT /medico：整体替换
pub async fn update_doctor(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<DoctorPayload>,
) -> ApiResult<StatusCode> {
    let (id, record) = payload.into_replacement()?;
    DatabaseQueries::new(&state.db)
        .replace_doctor(id, &record)
        .await?;

    info!("Updated medico {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /medico/:id
pub async fn delete_doctor(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<StatusCode> {
    let removed = DatabaseQueries::new(&state.db).delete_doctor(id).await?;

    info!("Deleted medico {} ({} rows)", id, removed);
    Ok(StatusCode::NO_CONTENT)
}
