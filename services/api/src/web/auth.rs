//! services/api/src/web/auth.rs
//!
//! Account endpoints for both identity variants: register, login, logout,
//! profile reads and updates, password changes, and the password-reset
//! round trip. Password hashing happens here, at the edge; the reset-token
//! lifecycle itself lives in `portal_core::identity`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use portal_core::domain::{
    AvailabilitySlot, Caller, Doctor, DoctorUpdate, Education, EmergencyContact, Gender,
    HospitalInfo, Identity, Patient, PatientUpdate, Role, Specialization,
};
use portal_core::ports::PortError;
use portal_core::identity::{finish_password_reset, start_password_reset, validate_credentials};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::envelope::{self, ApiResponse};
use crate::web::middleware::{session_id_from_cookies, SESSION_COOKIE};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterPatientRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    #[schema(value_type = String)]
    pub gender: Gender,
    pub address: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub medical_history: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RegisterDoctorRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    #[schema(value_type = String)]
    pub gender: Gender,
    #[schema(value_type = String)]
    pub specialization: Specialization,
    pub license_number: String,
    pub years_of_experience: i32,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub education: Vec<Education>,
    #[schema(value_type = Option<Object>)]
    pub hospital: Option<HospitalInfo>,
    pub consultation_fee: i32,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub availability: Vec<AvailabilitySlot>,
    pub biography: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub awards: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub id: Uuid,
    #[schema(value_type = String)]
    pub role: Role,
    pub email: String,
    pub name: String,
}

/// A patient record as exposed to its owner; credential and reset-token
/// fields never appear here.
#[derive(Serialize, ToSchema)]
pub struct PatientProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    #[schema(value_type = String)]
    pub gender: Gender,
    pub address: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_history: Vec<String>,
    pub allergies: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Patient> for PatientProfile {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            email: p.email,
            first_name: p.first_name,
            last_name: p.last_name,
            phone: p.phone,
            date_of_birth: p.date_of_birth,
            gender: p.gender,
            address: p.address,
            emergency_contact: p.emergency_contact,
            medical_history: p.medical_history,
            allergies: p.allergies,
            is_active: p.is_active,
            created_at: p.created_at,
        }
    }
}

/// A doctor record as exposed to its owner.
#[derive(Serialize, ToSchema)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    #[schema(value_type = String)]
    pub gender: Gender,
    #[schema(value_type = String)]
    pub specialization: Specialization,
    pub license_number: String,
    pub years_of_experience: i32,
    #[schema(value_type = Vec<Object>)]
    pub education: Vec<Education>,
    #[schema(value_type = Option<Object>)]
    pub hospital: Option<HospitalInfo>,
    pub consultation_fee: i32,
    #[schema(value_type = Vec<Object>)]
    pub availability: Vec<AvailabilitySlot>,
    pub biography: Option<String>,
    pub languages: Vec<String>,
    pub awards: Vec<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Doctor> for DoctorProfile {
    fn from(d: Doctor) -> Self {
        Self {
            id: d.id,
            email: d.email,
            first_name: d.first_name,
            last_name: d.last_name,
            phone: d.phone,
            date_of_birth: d.date_of_birth,
            gender: d.gender,
            specialization: d.specialization,
            license_number: d.license_number,
            years_of_experience: d.years_of_experience,
            education: d.education,
            hospital: d.hospital,
            consultation_fee: d.consultation_fee,
            availability: d.availability,
            biography: d.biography,
            languages: d.languages,
            awards: d.awards,
            is_verified: d.is_verified,
            is_active: d.is_active,
            created_at: d.created_at,
        }
    }
}

//=========================================================================================
// Password hashing and session helpers
//=========================================================================================

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn password_matches(password: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Failed to parse stored password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Creates a session row and returns the Set-Cookie value carrying its id.
async fn open_session(state: &AppState, caller: Caller) -> Result<String, ApiError> {
    let session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);
    state
        .identities
        .create_session(&session_id, caller, Utc::now() + ttl)
        .await?;
    Ok(format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        ttl.num_seconds()
    ))
}

fn ensure_role(caller: Caller, role: Role) -> Result<(), ApiError> {
    if caller.role == role {
        Ok(())
    } else {
        Err(ApiError::Port(PortError::Forbidden(format!(
            "this endpoint is for {} accounts",
            role.as_str()
        ))))
    }
}

async fn login_response(
    state: &AppState,
    role: Role,
    req: LoginRequest,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<ApiResponse<AuthResponse>>), ApiError>
{
    let identity = state
        .identities
        .find_by_email(role, &req.email)
        .await?
        .ok_or(ApiError::Port(PortError::Unauthorized))?;

    if !identity.is_active() {
        return Err(ApiError::Port(PortError::Unauthorized));
    }

    let stored_hash = match &identity {
        Identity::Patient(p) => p.password_hash.clone(),
        Identity::Doctor(d) => d.password_hash.clone(),
    };
    if !password_matches(&req.password, &stored_hash)? {
        return Err(ApiError::Port(PortError::Unauthorized));
    }

    let caller = Caller { id: identity.id(), role };
    let cookie = open_session(state, caller).await?;
    info!("{} {} logged in", role.as_str(), identity.id());

    let body = envelope::ok(AuthResponse {
        id: identity.id(),
        role,
        email: identity.email().to_string(),
        name: identity.full_name(),
    });
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], body))
}

//=========================================================================================
// Registration and login handlers
//=========================================================================================

/// POST /api/v1/patients/register - Create a patient account.
#[utoipa::path(
    post,
    path = "/api/v1/patients/register",
    request_body = RegisterPatientRequest,
    responses(
        (status = 201, description = "Patient registered", body = AuthResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_patient_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterPatientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_credentials(&req.email, &req.password)?;
    let password_hash = hash_password(&req.password)?;

    let patient = state
        .identities
        .create_patient(Patient {
            id: Uuid::new_v4(),
            email: req.email.trim().to_lowercase(),
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            date_of_birth: req.date_of_birth,
            gender: req.gender,
            address: req.address,
            emergency_contact: req.emergency_contact,
            medical_history: req.medical_history,
            allergies: req.allergies,
            is_active: true,
            reset_token: None,
            reset_token_expires: None,
            created_at: Utc::now(),
        })
        .await?;

    let caller = Caller { id: patient.id, role: Role::Patient };
    let cookie = open_session(&state, caller).await?;
    info!("patient {} registered", patient.id);

    let body = envelope::ok(AuthResponse {
        id: patient.id,
        role: Role::Patient,
        email: patient.email,
        name: format!("{} {}", patient.first_name, patient.last_name),
    });
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], body))
}

/// POST /api/v1/doctors/register - Create a doctor account.
#[utoipa::path(
    post,
    path = "/api/v1/doctors/register",
    request_body = RegisterDoctorRequest,
    responses(
        (status = 201, description = "Doctor registered", body = AuthResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email or license number already registered")
    )
)]
pub async fn register_doctor_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterDoctorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_credentials(&req.email, &req.password)?;
    if req.license_number.trim().is_empty() {
        return Err(ApiError::Port(PortError::invalid(
            "license_number",
            "license number is required",
        )));
    }
    let password_hash = hash_password(&req.password)?;

    let doctor = state
        .identities
        .create_doctor(Doctor {
            id: Uuid::new_v4(),
            email: req.email.trim().to_lowercase(),
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            date_of_birth: req.date_of_birth,
            gender: req.gender,
            specialization: req.specialization,
            license_number: req.license_number,
            years_of_experience: req.years_of_experience,
            education: req.education,
            hospital: req.hospital,
            consultation_fee: req.consultation_fee,
            availability: req.availability,
            biography: req.biography,
            languages: req.languages,
            awards: req.awards,
            is_verified: false,
            is_active: true,
            reset_token: None,
            reset_token_expires: None,
            created_at: Utc::now(),
        })
        .await?;

    let caller = Caller { id: doctor.id, role: Role::Doctor };
    let cookie = open_session(&state, caller).await?;
    info!("doctor {} registered", doctor.id);

    let body = envelope::ok(AuthResponse {
        id: doctor.id,
        role: Role::Doctor,
        email: doctor.email,
        name: format!("{} {}", doctor.first_name, doctor.last_name),
    });
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], body))
}

/// POST /api/v1/patients/login
#[utoipa::path(
    post,
    path = "/api/v1/patients/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_patient_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    login_response(&state, Role::Patient, req).await
}

/// POST /api/v1/doctors/login
#[utoipa::path(
    post,
    path = "/api/v1/doctors/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_doctor_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    login_response(&state, Role::Doctor, req).await
}

/// POST /api/v1/{patients,doctors}/logout - Invalidate the session.
#[utoipa::path(
    post,
    path = "/api/v1/patients/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Port(PortError::Unauthorized))?;
    let session_id =
        session_id_from_cookies(cookie_header).ok_or(ApiError::Port(PortError::Unauthorized))?;

    state.identities.delete_session(session_id).await?;

    let cookie =
        format!("{SESSION_COOKIE}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0");
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        envelope::message("Logged out"),
    ))
}

//=========================================================================================
// Profile handlers
//=========================================================================================

/// GET /api/v1/patients/me
#[utoipa::path(
    get,
    path = "/api/v1/patients/me",
    responses(
        (status = 200, description = "The caller's patient record", body = PatientProfile),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn patient_me_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_role(caller, Role::Patient)?;
    let patient = state.identities.get_patient(caller.id).await?;
    Ok(envelope::ok(PatientProfile::from(patient)))
}

/// GET /api/v1/doctors/me
#[utoipa::path(
    get,
    path = "/api/v1/doctors/me",
    responses(
        (status = 200, description = "The caller's doctor record", body = DoctorProfile),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn doctor_me_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_role(caller, Role::Doctor)?;
    let doctor = state.identities.get_doctor(caller.id).await?;
    Ok(envelope::ok(DoctorProfile::from(doctor)))
}

/// PUT /api/v1/patients/updatedetails - Partial profile update; unset
/// fields are untouched, credentials are not updatable here.
pub async fn update_patient_details_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(changes): Json<PatientUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_role(caller, Role::Patient)?;
    let patient = state.identities.update_patient(caller.id, changes).await?;
    Ok(envelope::ok(PatientProfile::from(patient)))
}

/// PUT /api/v1/doctors/updatedetails
pub async fn update_doctor_details_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(changes): Json<DoctorUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_role(caller, Role::Doctor)?;
    let doctor = state.identities.update_doctor(caller.id, changes).await?;
    Ok(envelope::ok(DoctorProfile::from(doctor)))
}

//=========================================================================================
// Password handlers
//=========================================================================================

async fn update_password(
    state: &AppState,
    caller: Caller,
    req: UpdatePasswordRequest,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let (email, stored_hash) = match caller.role {
        Role::Patient => {
            let p = state.identities.get_patient(caller.id).await?;
            (p.email, p.password_hash)
        }
        Role::Doctor => {
            let d = state.identities.get_doctor(caller.id).await?;
            (d.email, d.password_hash)
        }
    };

    if !password_matches(&req.current_password, &stored_hash)? {
        return Err(ApiError::Port(PortError::Unauthorized));
    }
    validate_credentials(&email, &req.new_password)?;

    let new_hash = hash_password(&req.new_password)?;
    state
        .identities
        .set_password_hash(caller.role, caller.id, &new_hash)
        .await?;
    Ok(envelope::message("Password updated"))
}

/// PUT /api/v1/patients/updatepassword
pub async fn update_patient_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_role(caller, Role::Patient)?;
    update_password(&state, caller, req).await
}

/// PUT /api/v1/doctors/updatepassword
pub async fn update_doctor_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_role(caller, Role::Doctor)?;
    update_password(&state, caller, req).await
}

async fn forgot_password(
    state: &AppState,
    role: Role,
    req: ForgotPasswordRequest,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    start_password_reset(
        state.identities.as_ref(),
        state.mailer.as_ref(),
        role,
        &req.email,
        Duration::minutes(state.config.reset_token_ttl_minutes),
        &state.config.reset_url_base,
    )
    .await?;
    Ok(envelope::message("Password reset email sent"))
}

/// POST /api/v1/patients/forgotpassword
#[utoipa::path(
    post,
    path = "/api/v1/patients/forgotpassword",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent"),
        (status = 404, description = "No account for that email"),
        (status = 502, description = "Mail delivery failed; token cleared")
    )
)]
pub async fn forgot_patient_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    forgot_password(&state, Role::Patient, req).await
}

/// POST /api/v1/doctors/forgotpassword
#[utoipa::path(
    post,
    path = "/api/v1/doctors/forgotpassword",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent"),
        (status = 404, description = "No account for that email"),
        (status = 502, description = "Mail delivery failed; token cleared")
    )
)]
pub async fn forgot_doctor_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    forgot_password(&state, Role::Doctor, req).await
}

async fn reset_password(
    state: &AppState,
    role: Role,
    token: String,
    req: ResetPasswordRequest,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    // The email half of the credential check does not apply here; the token
    // is the proof. Validate only the new password's shape.
    if req.password.len() < portal_core::identity::MIN_PASSWORD_LEN {
        return Err(ApiError::Port(PortError::invalid(
            "password",
            "password must be at least 8 characters",
        )));
    }
    let new_hash = hash_password(&req.password)?;
    finish_password_reset(state.identities.as_ref(), role, &token, &new_hash).await?;
    Ok(envelope::message("Password has been reset"))
}

/// PUT /api/v1/patients/resetpassword/{token}
#[utoipa::path(
    put,
    path = "/api/v1/patients/resetpassword/{token}",
    request_body = ResetPasswordRequest,
    params(("token" = String, Path, description = "The reset token from the email link")),
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Invalid or expired token")
    )
)]
pub async fn reset_patient_password_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    reset_password(&state, Role::Patient, token, req).await
}

/// PUT /api/v1/doctors/resetpassword/{token}
#[utoipa::path(
    put,
    path = "/api/v1/doctors/resetpassword/{token}",
    request_body = ResetPasswordRequest,
    params(("token" = String, Path, description = "The reset token from the email link")),
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Invalid or expired token")
    )
)]
pub async fn reset_doctor_password_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    reset_password(&state, Role::Doctor, token, req).await
}
