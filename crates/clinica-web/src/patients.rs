//! 患者登记处理器

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use clinica_core::{ClinicaError, EntityId, Patient, PatientPayload};
use clinica_database::DatabaseQueries;
use tracing::info;

use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

/// POST /paciente
pub async fn create_patient(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<PatientPayload>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    let record = payload.into_record()?;
    let patient = DatabaseQueries::new(&state.db)
        .create_patient(&record)
        .await?;

    info!("Created paciente {} for medico {}", patient.id, patient.doctor.id);
    Ok((StatusCode::CREATED, Json(patient)))
}

/// GET /paciente/:id
pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<Patient>> {
    let patient = DatabaseQueries::new(&state.db)
        .get_patient_by_id(id)
        .await?
        .ok_or_else(|| ClinicaError::not_found("paciente", id))?;

    Ok(Json(patient))
}

/// GET /paciente/medico/:id
pub async fn list_patients_by_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<EntityId>,
) -> ApiResult<Json<Vec<Patient>>> {
    let patients = DatabaseQueries::new(&state.db)
        .get_patients_by_doctor_id(doctor_id)
        .await?;

    Ok(Json(patients))
}

/// PUT /paciente：整体替换，可同时更换所属医生
pub async fn update_patient(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<PatientPayload>,
) -> ApiResult<StatusCode> {
    let (id, record) = payload.into_replacement()?;
    DatabaseQueries::new(&state.db)
        .replace_patient(id, &record)
        .await?;

    info!("Updated paciente {} (medico {})", id, record.doctor_id);
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /paciente/:id
pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<StatusCode> {
    let removed = DatabaseQueries::new(&state.db).delete_patient(id).await?;

    info!("Deleted paciente {} ({} rows)", id, removed);
    Ok(StatusCode::NO_CONTENT)
}
