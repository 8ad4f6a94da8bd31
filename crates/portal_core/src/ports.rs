//! crates/portal_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like the
//! database or the outbound mail transport.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    Appointment, Caller, Consultation, Doctor, DoctorUpdate, Identity, Message, MessageFilters,
    PartyRef, Patient, PatientUpdate, Role,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A single field-level validation failure, reported back through the API
/// envelope's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// The failure taxonomy every domain operation converts into at its
/// boundary. Nothing below this layer is allowed to propagate as an
/// unhandled fault.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Malformed or missing input, with field-level messages.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// No credential, or a credential that does not resolve.
    #[error("unauthorized")]
    Unauthorized,

    /// A valid identity that is not the owner required by the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A referenced entity is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// The write collides with existing state (slot taken, duplicate email,
    /// duplicate live booking pair).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An external collaborator (the notification sender) failed.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// A catch-all for unexpected infrastructure failures.
    #[error("an unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: &str, message: &str) -> Self {
        PortError::Validation(vec![FieldError::new(field, message)])
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Identity store
//=========================================================================================

#[async_trait]
pub trait IdentityStore: Send + Sync {
    // --- Accounts ---
    async fn create_patient(&self, patient: Patient) -> PortResult<Patient>;
    async fn create_doctor(&self, doctor: Doctor) -> PortResult<Doctor>;

    async fn get_patient(&self, id: Uuid) -> PortResult<Patient>;
    async fn get_doctor(&self, id: Uuid) -> PortResult<Doctor>;

    /// Case-insensitive email lookup under one identity variant.
    async fn find_by_email(&self, role: Role, email: &str) -> PortResult<Option<Identity>>;

    async fn update_patient(&self, id: Uuid, changes: PatientUpdate) -> PortResult<Patient>;
    async fn update_doctor(&self, id: Uuid, changes: DoctorUpdate) -> PortResult<Doctor>;

    async fn set_password_hash(&self, role: Role, id: Uuid, hash: &str) -> PortResult<()>;

    // --- Password reset tokens ---
    async fn set_reset_token(
        &self,
        role: Role,
        id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn clear_reset_token(&self, role: Role, id: Uuid) -> PortResult<()>;

    async fn find_by_reset_token(&self, role: Role, token: &str) -> PortResult<Option<Identity>>;

    // --- Auth sessions (the opaque bearer credential) ---
    async fn create_session(
        &self,
        session_id: &str,
        caller: Caller,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a session id to its caller; `Unauthorized` if absent or
    /// expired.
    async fn resolve_session(&self, session_id: &str) -> PortResult<Caller>;

    async fn delete_session(&self, session_id: &str) -> PortResult<()>;
}

//=========================================================================================
// Appointment ledger store
//=========================================================================================

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Inserts a brand-new appointment. Must reject with `Conflict` if a
    /// non-cancelled appointment already exists for the same
    /// (patient, doctor) pair, so a lost booking race is detected rather
    /// than silently producing a duplicate.
    async fn insert(&self, appointment: Appointment) -> PortResult<Appointment>;

    async fn get(&self, id: Uuid) -> PortResult<Appointment>;

    /// The most recent appointment for the pair whose status is scheduled or
    /// completed, if any.
    async fn find_live_for_pair(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
    ) -> PortResult<Option<Appointment>>;

    /// Whether another scheduled appointment already holds the exact
    /// (doctor, date, time) slot.
    async fn slot_taken(&self, doctor_id: Uuid, date: NaiveDate, time: &str) -> PortResult<bool>;

    /// Full-document write of a previously loaded appointment.
    async fn update(&self, appointment: &Appointment) -> PortResult<Appointment>;

    /// All appointments for the patient, sorted by `date` ascending.
    async fn list_for_patient(&self, patient_id: Uuid) -> PortResult<Vec<Appointment>>;

    /// All appointments for the doctor, sorted by `date` ascending.
    async fn list_for_doctor(&self, doctor_id: Uuid) -> PortResult<Vec<Appointment>>;
}

//=========================================================================================
// Consultation record store
//=========================================================================================

#[async_trait]
pub trait ConsultationStore: Send + Sync {
    async fn insert(&self, consultation: Consultation) -> PortResult<Consultation>;

    async fn get(&self, id: Uuid) -> PortResult<Consultation>;

    async fn update(&self, consultation: &Consultation) -> PortResult<Consultation>;

    /// Active records for the patient, newest first, with the unpaginated
    /// total.
    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> PortResult<(Vec<Consultation>, u64)>;

    /// Active records authored by the doctor, newest first, with the
    /// unpaginated total.
    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> PortResult<(Vec<Consultation>, u64)>;

    /// The single most recent active record for the patient, if any.
    async fn latest_for_patient(&self, patient_id: Uuid) -> PortResult<Option<Consultation>>;
}

//=========================================================================================
// Message store
//=========================================================================================

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: Message) -> PortResult<Message>;

    async fn get(&self, id: Uuid) -> PortResult<Message>;

    /// Sets the read flag and timestamp on one message.
    async fn mark_read(&self, id: Uuid, read_at: DateTime<Utc>) -> PortResult<()>;

    /// Bulk variant restricted to the recipient's own unread messages;
    /// returns the number actually modified.
    async fn mark_many_read(
        &self,
        ids: &[Uuid],
        recipient: PartyRef,
        read_at: DateTime<Utc>,
    ) -> PortResult<u64>;

    /// All messages sharing the thread id, ordered by creation ascending.
    async fn thread(&self, thread_id: Uuid) -> PortResult<Vec<Message>>;

    async fn delete(&self, id: Uuid) -> PortResult<()>;

    /// The recipient's received messages matching the filters, newest first,
    /// with the unpaginated total.
    async fn list_received(
        &self,
        recipient: PartyRef,
        filters: MessageFilters,
        offset: u64,
        limit: u64,
    ) -> PortResult<(Vec<Message>, u64)>;

    /// Unread received messages for the recipient, independent of filters.
    async fn unread_count(&self, recipient: PartyRef) -> PortResult<u64>;
}

//=========================================================================================
// Outbound notification sender
//=========================================================================================

/// An outbound email. Only used for password-reset delivery.
#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> PortResult<()>;
}
