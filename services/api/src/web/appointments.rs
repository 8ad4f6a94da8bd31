//! services/api/src/web/appointments.rs
//!
//! Appointment endpoints. The booking rules themselves live in
//! `portal_core::appointments`; these handlers parse the wire shapes,
//! thread the caller through, and wrap results in the envelope.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use portal_core::appointments;
use portal_core::domain::{AppointmentStatus, BookingRequest, Caller};
use portal_core::ports::PortError;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::envelope;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    #[schema(value_type = String, format = Date)]
    pub date: chrono::NaiveDate,
    pub time: String,
    pub reason: String,
}

impl From<BookAppointmentRequest> for BookingRequest {
    fn from(req: BookAppointmentRequest) -> Self {
        Self {
            doctor_id: req.doctor_id,
            date: req.date,
            time: req.time,
            reason: req.reason,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct AddReasonRequest {
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

/// POST /api/v1/appointments - Book a visit with a doctor.
///
/// A repeat booking against a doctor the patient already has a live
/// appointment with extends that record instead of creating a second one.
#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    request_body = BookAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked or extended"),
        (status = 403, description = "Caller is not a patient"),
        (status = 404, description = "Doctor not found or inactive"),
        (status = 409, description = "Slot already scheduled")
    )
)]
pub async fn book_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if caller.role != portal_core::domain::Role::Patient {
        return Err(ApiError::Port(PortError::Forbidden(
            "only patients may book appointments".to_string(),
        )));
    }
    let view = appointments::book_or_extend(
        state.identities.as_ref(),
        state.appointments.as_ref(),
        caller.id,
        request.into(),
    )
    .await?;
    Ok(envelope::created(view))
}

/// GET /api/v1/appointments - The caller's appointments, date ascending.
#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    responses(
        (status = 200, description = "The caller's appointments"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let views = appointments::list_for_caller(
        state.identities.as_ref(),
        state.appointments.as_ref(),
        caller,
    )
    .await?;
    Ok(envelope::ok(views))
}

/// GET /api/v1/appointments/{id}
#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "The appointment"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "No such appointment")
    )
)]
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = appointments::get(
        state.identities.as_ref(),
        state.appointments.as_ref(),
        id,
        caller,
    )
    .await?;
    Ok(envelope::ok(view))
}

/// POST /api/v1/appointments/{id}/reasons - Append to the reason history.
#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/reasons",
    request_body = AddReasonRequest,
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Reason appended"),
        (status = 403, description = "Caller is not the appointment's patient"),
        (status = 404, description = "No such appointment")
    )
)]
pub async fn add_reason_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddReasonRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = appointments::add_reason(
        state.identities.as_ref(),
        state.appointments.as_ref(),
        id,
        caller,
        req.reason,
    )
    .await?;
    Ok(envelope::ok(view))
}

/// PUT /api/v1/appointments/{id}/status - Doctor sets the status and,
/// optionally, clinical notes.
#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}/status",
    request_body = UpdateStatusRequest,
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Unknown status value"),
        (status = 403, description = "Caller is not the appointment's doctor"),
        (status = 404, description = "No such appointment")
    )
)]
pub async fn update_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = AppointmentStatus::parse(&req.status).ok_or_else(|| {
        ApiError::Port(PortError::invalid(
            "status",
            "expected one of scheduled, completed, cancelled",
        ))
    })?;
    let view = appointments::update_status(
        state.identities.as_ref(),
        state.appointments.as_ref(),
        id,
        caller,
        status,
        req.notes,
    )
    .await?;
    Ok(envelope::ok(view))
}
