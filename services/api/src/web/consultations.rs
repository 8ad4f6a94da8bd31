//! services/api/src/web/consultations.rs
//!
//! Consultation record endpoints. Creation, editing, and deletion belong
//! to doctors; reads are split by role so each side only ever lists its
//! own records.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use portal_core::consultations;
use portal_core::domain::{Caller, ConsultationUpdate, NewConsultation, PageRequest};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::envelope;
use crate::web::state::AppState;

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    fn into_request(self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// POST /api/v1/consultations - Doctor records a consultation outcome.
#[utoipa::path(
    post,
    path = "/api/v1/consultations",
    responses(
        (status = 201, description = "Consultation recorded"),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Caller is not a doctor"),
        (status = 404, description = "Patient not found or inactive")
    )
)]
pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<NewConsultation>,
) -> Result<impl IntoResponse, ApiError> {
    let consultation = consultations::create(
        state.identities.as_ref(),
        state.consultations.as_ref(),
        caller,
        payload,
    )
    .await?;
    Ok(envelope::created(consultation))
}

/// GET /api/v1/consultations/patient - The calling patient's records.
#[utoipa::path(
    get,
    path = "/api/v1/consultations/patient",
    params(
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("limit" = Option<u64>, Query, description = "Page size, clamped to 1..=100")
    ),
    responses(
        (status = 200, description = "One page of the patient's consultations"),
        (status = 403, description = "Caller is not a patient")
    )
)]
pub async fn list_for_patient_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = consultations::list_for_patient(
        state.consultations.as_ref(),
        caller,
        query.into_request(),
    )
    .await?;
    Ok(envelope::ok(page))
}

/// GET /api/v1/consultations/patient/latest - The patient's most recent
/// active record.
#[utoipa::path(
    get,
    path = "/api/v1/consultations/patient/latest",
    responses(
        (status = 200, description = "The most recent consultation"),
        (status = 403, description = "Caller is not a patient"),
        (status = 404, description = "No consultations on record")
    )
)]
pub async fn latest_for_patient_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let consultation =
        consultations::latest_for_patient(state.consultations.as_ref(), caller).await?;
    Ok(envelope::ok(consultation))
}

/// GET /api/v1/consultations/doctor - The calling doctor's records.
#[utoipa::path(
    get,
    path = "/api/v1/consultations/doctor",
    params(
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("limit" = Option<u64>, Query, description = "Page size, clamped to 1..=100")
    ),
    responses(
        (status = 200, description = "One page of the doctor's consultations"),
        (status = 403, description = "Caller is not a doctor")
    )
)]
pub async fn list_for_doctor_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = consultations::list_for_doctor(
        state.consultations.as_ref(),
        caller,
        query.into_request(),
    )
    .await?;
    Ok(envelope::ok(page))
}

/// GET /api/v1/consultations/{id}
#[utoipa::path(
    get,
    path = "/api/v1/consultations/{id}",
    params(("id" = Uuid, Path, description = "Consultation id")),
    responses(
        (status = 200, description = "The consultation"),
        (status = 403, description = "Caller does not own this record"),
        (status = 404, description = "No such consultation")
    )
)]
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let consultation = consultations::get(state.consultations.as_ref(), id, caller).await?;
    Ok(envelope::ok(consultation))
}

/// PUT /api/v1/consultations/{id} - Partial update by the owning doctor.
#[utoipa::path(
    put,
    path = "/api/v1/consultations/{id}",
    params(("id" = Uuid, Path, description = "Consultation id")),
    responses(
        (status = 200, description = "Consultation updated"),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Caller is not the owning doctor"),
        (status = 404, description = "No such consultation")
    )
)]
pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(changes): Json<ConsultationUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let consultation =
        consultations::update(state.consultations.as_ref(), id, caller, changes).await?;
    Ok(envelope::ok(consultation))
}

/// DELETE /api/v1/consultations/{id} - Soft delete by the owning doctor.
#[utoipa::path(
    delete,
    path = "/api/v1/consultations/{id}",
    params(("id" = Uuid, Path, description = "Consultation id")),
    responses(
        (status = 200, description = "Consultation deactivated"),
        (status = 403, description = "Caller is not the owning doctor"),
        (status = 404, description = "No such consultation")
    )
)]
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    consultations::soft_delete(state.consultations.as_ref(), id, caller).await?;
    Ok(envelope::message("Consultation deleted"))
}
