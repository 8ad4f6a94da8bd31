//! services/api/src/web/docs.rs
//!
//! The master OpenAPI definition, assembled from the per-handler
//! `utoipa::path` annotations across the web modules.

use utoipa::OpenApi;

use crate::web::{appointments, auth, consultations, messages};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_patient_handler,
        auth::register_doctor_handler,
        auth::login_patient_handler,
        auth::login_doctor_handler,
        auth::logout_handler,
        auth::patient_me_handler,
        auth::doctor_me_handler,
        auth::forgot_patient_password_handler,
        auth::forgot_doctor_password_handler,
        auth::reset_patient_password_handler,
        auth::reset_doctor_password_handler,
        appointments::book_handler,
        appointments::list_handler,
        appointments::get_handler,
        appointments::add_reason_handler,
        appointments::update_status_handler,
        consultations::create_handler,
        consultations::list_for_patient_handler,
        consultations::latest_for_patient_handler,
        consultations::list_for_doctor_handler,
        consultations::get_handler,
        consultations::update_handler,
        consultations::delete_handler,
        messages::inbox_handler,
        messages::send_handler,
        messages::get_handler,
        messages::reply_handler,
        messages::mark_read_handler,
        messages::mark_many_read_handler,
        messages::delete_handler,
        messages::thread_handler,
    ),
    components(schemas(
        auth::RegisterPatientRequest,
        auth::RegisterDoctorRequest,
        auth::LoginRequest,
        auth::UpdatePasswordRequest,
        auth::ForgotPasswordRequest,
        auth::ResetPasswordRequest,
        auth::AuthResponse,
        auth::PatientProfile,
        auth::DoctorProfile,
        appointments::BookAppointmentRequest,
        appointments::AddReasonRequest,
        appointments::UpdateStatusRequest,
        messages::SendMessageRequest,
        messages::ReplyRequest,
        messages::MarkManyReadRequest,
        messages::MarkManyReadResponse,
    )),
    tags(
        (name = "Hospital Portal API", description = "Patient and doctor accounts, appointments, consultations, and messaging.")
    )
)]
pub struct ApiDoc;
