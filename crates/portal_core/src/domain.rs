//! crates/portal_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport format; the
//! serde derives exist so the adapters can store the nested document fields
//! as JSON and the API can render them without a parallel DTO layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Roles and the resolved caller
//=========================================================================================

/// The two disjoint account kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "patient" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            _ => None,
        }
    }
}

/// An authenticated caller, produced by the access gate and threaded through
/// every domain operation for ownership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

/// A reference to one side of a message, tagged with the identity variant it
/// resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRef {
    pub role: Role,
    pub id: Uuid,
}

impl PartyRef {
    pub fn patient(id: Uuid) -> Self {
        Self { role: Role::Patient, id }
    }

    pub fn doctor(id: Uuid) -> Self {
        Self { role: Role::Doctor, id }
    }
}

impl From<Caller> for PartyRef {
    fn from(caller: Caller) -> Self {
        Self { role: caller.role, id: caller.id }
    }
}

//=========================================================================================
// Identity entities
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Gender> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// The closed set of recognized doctor specializations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    Cardiology,
    Dermatology,
    Dentistry,
    Endocrinology,
    Gastroenterology,
    GeneralMedicine,
    Gynecology,
    Hematology,
    Nephrology,
    Neurology,
    Oncology,
    Ophthalmology,
    Orthopedics,
    Otolaryngology,
    Pediatrics,
    Psychiatry,
    Pulmonology,
    Radiology,
    Urology,
}

impl Specialization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Specialization::Cardiology => "cardiology",
            Specialization::Dermatology => "dermatology",
            Specialization::Dentistry => "dentistry",
            Specialization::Endocrinology => "endocrinology",
            Specialization::Gastroenterology => "gastroenterology",
            Specialization::GeneralMedicine => "general_medicine",
            Specialization::Gynecology => "gynecology",
            Specialization::Hematology => "hematology",
            Specialization::Nephrology => "nephrology",
            Specialization::Neurology => "neurology",
            Specialization::Oncology => "oncology",
            Specialization::Ophthalmology => "ophthalmology",
            Specialization::Orthopedics => "orthopedics",
            Specialization::Otolaryngology => "otolaryngology",
            Specialization::Pediatrics => "pediatrics",
            Specialization::Psychiatry => "psychiatry",
            Specialization::Pulmonology => "pulmonology",
            Specialization::Radiology => "radiology",
            Specialization::Urology => "urology",
        }
    }

    pub fn parse(s: &str) -> Option<Specialization> {
        match s {
            "cardiology" => Some(Specialization::Cardiology),
            "dermatology" => Some(Specialization::Dermatology),
            "dentistry" => Some(Specialization::Dentistry),
            "endocrinology" => Some(Specialization::Endocrinology),
            "gastroenterology" => Some(Specialization::Gastroenterology),
            "general_medicine" => Some(Specialization::GeneralMedicine),
            "gynecology" => Some(Specialization::Gynecology),
            "hematology" => Some(Specialization::Hematology),
            "nephrology" => Some(Specialization::Nephrology),
            "neurology" => Some(Specialization::Neurology),
            "oncology" => Some(Specialization::Oncology),
            "ophthalmology" => Some(Specialization::Ophthalmology),
            "orthopedics" => Some(Specialization::Orthopedics),
            "otolaryngology" => Some(Specialization::Otolaryngology),
            "pediatrics" => Some(Specialization::Pediatrics),
            "psychiatry" => Some(Specialization::Psychiatry),
            "pulmonology" => Some(Specialization::Pulmonology),
            "radiology" => Some(Specialization::Radiology),
            "urology" => Some(Specialization::Urology),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relationship: Option<String>,
}

/// Represents a patient account.
#[derive(Debug, Clone)]
pub struct Patient {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_history: Vec<String>,
    pub allergies: Vec<String>,
    pub is_active: bool,
    pub reset_token: Option<String>,
    pub reset_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalInfo {
    pub name: String,
    pub address: Option<String>,
}

/// One weekly availability window, e.g. `{day: "monday", "09:00".."12:00"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

/// Represents a doctor account.
#[derive(Debug, Clone)]
pub struct Doctor {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub specialization: Specialization,
    pub license_number: String,
    pub years_of_experience: i32,
    pub education: Vec<Education>,
    pub hospital: Option<HospitalInfo>,
    pub consultation_fee: i32,
    pub availability: Vec<AvailabilitySlot>,
    pub biography: Option<String>,
    pub languages: Vec<String>,
    pub awards: Vec<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub reset_token: Option<String>,
    pub reset_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Either account kind; used where a lookup is polymorphic over the two
/// identity variants (reset tokens, message endpoints).
#[derive(Debug, Clone)]
pub enum Identity {
    Patient(Patient),
    Doctor(Doctor),
}

impl Identity {
    pub fn id(&self) -> Uuid {
        match self {
            Identity::Patient(p) => p.id,
            Identity::Doctor(d) => d.id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Patient(_) => Role::Patient,
            Identity::Doctor(_) => Role::Doctor,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Identity::Patient(p) => &p.email,
            Identity::Doctor(d) => &d.email,
        }
    }

    pub fn full_name(&self) -> String {
        match self {
            Identity::Patient(p) => p.full_name(),
            Identity::Doctor(d) => d.full_name(),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Identity::Patient(p) => p.is_active,
            Identity::Doctor(d) => d.is_active,
        }
    }

    pub fn reset_token_expires(&self) -> Option<DateTime<Utc>> {
        match self {
            Identity::Patient(p) => p.reset_token_expires,
            Identity::Doctor(d) => d.reset_token_expires,
        }
    }
}

/// Partial self-service profile update for a patient. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_history: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
}

/// Partial self-service profile update for a doctor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub specialization: Option<Specialization>,
    pub years_of_experience: Option<i32>,
    pub education: Option<Vec<Education>>,
    pub hospital: Option<HospitalInfo>,
    pub consultation_fee: Option<i32>,
    pub availability: Option<Vec<AvailabilitySlot>>,
    pub biography: Option<String>,
    pub languages: Option<Vec<String>>,
    pub awards: Option<Vec<String>>,
}

//=========================================================================================
// Appointment ledger
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<AppointmentStatus> {
        match s {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

/// One entry in an appointment's append-only reason history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub text: String,
    pub date: DateTime<Utc>,
}

/// A booking between one patient and one doctor. The last element of
/// `reasons` is always the current reason; earlier entries are history.
#[derive(Debug, Clone)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub reasons: Vec<Reason>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The current reason is the last entry of the history. An appointment
    /// always holds at least one entry once created.
    pub fn current_reason(&self) -> Option<&Reason> {
        self.reasons.last()
    }
}

/// Identity summary attached to appointment views; never carries credential
/// or reset-token fields.
#[derive(Debug, Clone, Serialize)]
pub struct PartySummary {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<Specialization>,
}

impl PartySummary {
    pub fn of_patient(patient: &Patient) -> Self {
        Self {
            id: patient.id,
            name: patient.full_name(),
            specialization: None,
        }
    }

    pub fn of_doctor(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id,
            name: doctor.full_name(),
            specialization: Some(doctor.specialization),
        }
    }
}

/// Read-time projection of an appointment: the stored record plus the party
/// summaries and the derived current/previous reason split. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    pub id: Uuid,
    pub patient: PartySummary,
    pub doctor: PartySummary,
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub reasons: Vec<Reason>,
    pub current_reason: String,
    pub previous_reasons: Vec<Reason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentView {
    pub fn project(appointment: Appointment, patient: &Patient, doctor: &Doctor) -> Self {
        let current_reason = appointment
            .current_reason()
            .map(|r| r.text.clone())
            .unwrap_or_default();
        let previous_reasons = if appointment.reasons.is_empty() {
            Vec::new()
        } else {
            appointment.reasons[..appointment.reasons.len() - 1].to_vec()
        };
        Self {
            id: appointment.id,
            patient: PartySummary::of_patient(patient),
            doctor: PartySummary::of_doctor(doctor),
            date: appointment.date,
            time: appointment.time,
            status: appointment.status,
            notes: appointment.notes,
            current_reason,
            previous_reasons,
            reasons: appointment.reasons,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}

/// A booking request as issued by a patient.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub reason: String,
}

//=========================================================================================
// Consultation records
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationType {
    Initial,
    FollowUp,
    Emergency,
    Routine,
}

impl ConsultationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationType::Initial => "initial",
            ConsultationType::FollowUp => "follow_up",
            ConsultationType::Emergency => "emergency",
            ConsultationType::Routine => "routine",
        }
    }

    pub fn parse(s: &str) -> Option<ConsultationType> {
        match s {
            "initial" => Some(ConsultationType::Initial),
            "follow_up" => Some(ConsultationType::FollowUp),
            "emergency" => Some(ConsultationType::Emergency),
            "routine" => Some(ConsultationType::Routine),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::InProgress => "in_progress",
            ConsultationStatus::Completed => "completed",
            ConsultationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<ConsultationStatus> {
        match s {
            "in_progress" => Some(ConsultationStatus::InProgress),
            "completed" => Some(ConsultationStatus::Completed),
            "cancelled" => Some(ConsultationStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Symptom {
    pub description: String,
    pub severity: Severity,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Diagnosis {
    pub primary: String,
    pub secondary: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vitals {
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<i32>,
    pub temperature: Option<f32>,
    pub weight: Option<f32>,
    pub height: Option<f32>,
}

/// The clinical outcome of a visit; its lifecycle is independent of any
/// specific appointment.
#[derive(Debug, Clone, Serialize)]
pub struct Consultation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub condition: String,
    pub symptoms: Vec<Symptom>,
    pub diagnosis: Diagnosis,
    pub medications: Vec<Medication>,
    pub vitals: Option<Vitals>,
    pub follow_up_date: Option<NaiveDate>,
    pub fee: i32,
    pub consultation_type: ConsultationType,
    pub status: ConsultationStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a consultation record.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewConsultation {
    pub patient_id: Uuid,
    pub condition: String,
    #[serde(default)]
    pub symptoms: Vec<Symptom>,
    pub diagnosis: Diagnosis,
    #[serde(default)]
    pub medications: Vec<Medication>,
    pub vitals: Option<Vitals>,
    pub follow_up_date: Option<NaiveDate>,
    pub fee: i32,
    pub consultation_type: ConsultationType,
}

/// Field-level partial update of a consultation; `None` leaves a field
/// untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ConsultationUpdate {
    pub condition: Option<String>,
    pub symptoms: Option<Vec<Symptom>>,
    pub diagnosis: Option<Diagnosis>,
    pub medications: Option<Vec<Medication>>,
    pub vitals: Option<Vitals>,
    pub follow_up_date: Option<NaiveDate>,
    pub fee: Option<i32>,
    pub consultation_type: Option<ConsultationType>,
    pub status: Option<ConsultationStatus>,
}

//=========================================================================================
// Messaging
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    AppointmentRequest,
    AppointmentResponse,
    General,
    Prescription,
    FollowUp,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::AppointmentRequest => "appointment_request",
            MessageType::AppointmentResponse => "appointment_response",
            MessageType::General => "general",
            MessageType::Prescription => "prescription",
            MessageType::FollowUp => "follow_up",
        }
    }

    pub fn parse(s: &str) -> Option<MessageType> {
        match s {
            "appointment_request" => Some(MessageType::AppointmentRequest),
            "appointment_response" => Some(MessageType::AppointmentResponse),
            "general" => Some(MessageType::General),
            "prescription" => Some(MessageType::Prescription),
            "follow_up" => Some(MessageType::FollowUp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl MessagePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessagePriority::Low => "low",
            MessagePriority::Normal => "normal",
            MessagePriority::High => "high",
            MessagePriority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<MessagePriority> {
        match s {
            "low" => Some(MessagePriority::Low),
            "normal" => Some(MessagePriority::Normal),
            "high" => Some(MessagePriority::High),
            "urgent" => Some(MessagePriority::Urgent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub file_url: String,
    pub content_type: Option<String>,
}

/// A point-to-point message between a patient and a doctor.
///
/// `thread_id` is assigned once at creation: a reply inherits its parent's
/// thread id, a root message's thread id equals its own id. It is never
/// recomputed afterward.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: PartyRef,
    pub recipient: PartyRef,
    pub subject: String,
    pub content: String,
    pub message_type: MessageType,
    pub priority: MessagePriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub attachments: Vec<Attachment>,
    pub is_archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub thread_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Payload for sending a new (root) message.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub recipient: PartyRef,
    pub subject: String,
    pub content: String,
    pub message_type: Option<MessageType>,
    pub priority: Option<MessagePriority>,
    pub appointment_id: Option<Uuid>,
    pub attachments: Vec<Attachment>,
}

/// Inbox filters. All optional; `unread_count` on the inbox is computed
/// independently of whatever is set here.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFilters {
    pub message_type: Option<MessageType>,
    pub is_read: Option<bool>,
    pub priority: Option<MessagePriority>,
}

/// One page of received messages plus the caller's running unread count.
#[derive(Debug, Clone, Serialize)]
pub struct Inbox {
    pub messages: Vec<Message>,
    pub total: u64,
    pub page_count: u64,
    pub unread_count: u64,
}

//=========================================================================================
// Pagination
//=========================================================================================

/// Normalized page request. `page` is 1-based; `limit` is clamped to 1..=100.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u64 = 10;
    pub const MAX_LIMIT: u64 = 100;

    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        // The page number is caller-supplied and unbounded; saturate so a
        // request far past the end yields an empty page, not an overflow.
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// One page of results with the derived page count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page_count: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, limit: u64) -> Self {
        Self {
            items,
            total,
            page_count: total.div_ceil(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reason(text: &str) -> Reason {
        Reason {
            text: text.to_string(),
            date: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn page_count_is_ceiling_of_total_over_limit() {
        assert_eq!(Page::<u8>::new(vec![], 0, 10).page_count, 0);
        assert_eq!(Page::<u8>::new(vec![], 10, 10).page_count, 1);
        assert_eq!(Page::<u8>::new(vec![], 11, 10).page_count, 2);
        assert_eq!(Page::<u8>::new(vec![], 21, 5).page_count, 5);
    }

    #[test]
    fn page_request_clamps_inputs() {
        let req = PageRequest::new(None, None);
        assert_eq!((req.page, req.limit), (1, PageRequest::DEFAULT_LIMIT));
        let req = PageRequest::new(Some(0), Some(0));
        assert_eq!((req.page, req.limit), (1, 1));
        let req = PageRequest::new(Some(3), Some(1000));
        assert_eq!((req.page, req.limit), (3, PageRequest::MAX_LIMIT));
        assert_eq!(req.offset(), 200);
    }

    #[test]
    fn offset_saturates_for_enormous_page_numbers() {
        let req = PageRequest::new(Some(u64::MAX), Some(100));
        assert_eq!(req.offset(), u64::MAX);
        let req = PageRequest::new(Some(u64::MAX / 2), Some(100));
        assert_eq!(req.offset(), u64::MAX);
    }

    #[test]
    fn appointment_view_splits_current_and_previous_reasons() {
        let patient = crate::memory::fixtures::patient();
        let doctor = crate::memory::fixtures::doctor();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            doctor_id: doctor.id,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: "10:00".to_string(),
            reasons: vec![reason("chest pain"), reason("follow-up")],
            status: AppointmentStatus::Scheduled,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let view = AppointmentView::project(appointment, &patient, &doctor);
        assert_eq!(view.current_reason, "follow-up");
        assert_eq!(view.previous_reasons, vec![reason("chest pain")]);
        assert_eq!(view.reasons.len(), 2);
        assert_eq!(view.doctor.specialization, Some(doctor.specialization));
    }
}
