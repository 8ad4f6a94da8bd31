//! crates/portal_core/src/memory.rs
//!
//! In-memory implementations of the store ports, used by the kernel tests.
//! Each store is a `Mutex<Vec<_>>` with the same ordering, filtering, and
//! uniqueness behavior the SQL adapter provides.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    Appointment, AppointmentStatus, Caller, Consultation, Doctor, DoctorUpdate, Identity, Message,
    MessageFilters, PartyRef, Patient, PatientUpdate, Role,
};
use crate::ports::{
    AppointmentStore, ConsultationStore, Email, IdentityStore, Mailer, MessageStore, PortError,
    PortResult,
};

//=========================================================================================
// Identity store
//=========================================================================================

#[derive(Default)]
pub struct MemoryIdentityStore {
    patients: Mutex<Vec<Patient>>,
    doctors: Mutex<Vec<Doctor>>,
    sessions: Mutex<HashMap<String, (Caller, DateTime<Utc>)>>,
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn create_patient(&self, patient: Patient) -> PortResult<Patient> {
        let mut patients = self.patients.lock().unwrap();
        if patients
            .iter()
            .any(|p| p.email.eq_ignore_ascii_case(&patient.email))
        {
            return Err(PortError::Conflict("email already registered".to_string()));
        }
        patients.push(patient.clone());
        Ok(patient)
    }

    async fn create_doctor(&self, doctor: Doctor) -> PortResult<Doctor> {
        let mut doctors = self.doctors.lock().unwrap();
        if doctors
            .iter()
            .any(|d| d.email.eq_ignore_ascii_case(&doctor.email))
        {
            return Err(PortError::Conflict("email already registered".to_string()));
        }
        if doctors.iter().any(|d| d.license_number == doctor.license_number) {
            return Err(PortError::Conflict(
                "license number already registered".to_string(),
            ));
        }
        doctors.push(doctor.clone());
        Ok(doctor)
    }

    async fn get_patient(&self, id: Uuid) -> PortResult<Patient> {
        self.patients
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("patient {id} not found")))
    }

    async fn get_doctor(&self, id: Uuid) -> PortResult<Doctor> {
        self.doctors
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("doctor {id} not found")))
    }

    async fn find_by_email(&self, role: Role, email: &str) -> PortResult<Option<Identity>> {
        match role {
            Role::Patient => Ok(self
                .patients
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.email.eq_ignore_ascii_case(email))
                .cloned()
                .map(Identity::Patient)),
            Role::Doctor => Ok(self
                .doctors
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.email.eq_ignore_ascii_case(email))
                .cloned()
                .map(Identity::Doctor)),
        }
    }

    async fn update_patient(&self, id: Uuid, changes: PatientUpdate) -> PortResult<Patient> {
        let mut patients = self.patients.lock().unwrap();
        let patient = patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| PortError::NotFound(format!("patient {id} not found")))?;
        if let Some(v) = changes.first_name {
            patient.first_name = v;
        }
        if let Some(v) = changes.last_name {
            patient.last_name = v;
        }
        if let Some(v) = changes.phone {
            patient.phone = v;
        }
        if let Some(v) = changes.date_of_birth {
            patient.date_of_birth = v;
        }
        if let Some(v) = changes.gender {
            patient.gender = v;
        }
        if let Some(v) = changes.address {
            patient.address = Some(v);
        }
        if let Some(v) = changes.emergency_contact {
            patient.emergency_contact = Some(v);
        }
        if let Some(v) = changes.medical_history {
            patient.medical_history = v;
        }
        if let Some(v) = changes.allergies {
            patient.allergies = v;
        }
        Ok(patient.clone())
    }

    async fn update_doctor(&self, id: Uuid, changes: DoctorUpdate) -> PortResult<Doctor> {
        let mut doctors = self.doctors.lock().unwrap();
        let doctor = doctors
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| PortError::NotFound(format!("doctor {id} not found")))?;
        if let Some(v) = changes.first_name {
            doctor.first_name = v;
        }
        if let Some(v) = changes.last_name {
            doctor.last_name = v;
        }
        if let Some(v) = changes.phone {
            doctor.phone = v;
        }
        if let Some(v) = changes.date_of_birth {
            doctor.date_of_birth = v;
        }
        if let Some(v) = changes.gender {
            doctor.gender = v;
        }
        if let Some(v) = changes.specialization {
            doctor.specialization = v;
        }
        if let Some(v) = changes.years_of_experience {
            doctor.years_of_experience = v;
        }
        if let Some(v) = changes.education {
            doctor.education = v;
        }
        if let Some(v) = changes.hospital {
            doctor.hospital = Some(v);
        }
        if let Some(v) = changes.consultation_fee {
            doctor.consultation_fee = v;
        }
        if let Some(v) = changes.availability {
            doctor.availability = v;
        }
        if let Some(v) = changes.biography {
            doctor.biography = Some(v);
        }
        if let Some(v) = changes.languages {
            doctor.languages = v;
        }
        if let Some(v) = changes.awards {
            doctor.awards = v;
        }
        Ok(doctor.clone())
    }

    async fn set_password_hash(&self, role: Role, id: Uuid, hash: &str) -> PortResult<()> {
        match role {
            Role::Patient => {
                let mut patients = self.patients.lock().unwrap();
                let patient = patients
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| PortError::NotFound(format!("patient {id} not found")))?;
                patient.password_hash = hash.to_string();
            }
            Role::Doctor => {
                let mut doctors = self.doctors.lock().unwrap();
                let doctor = doctors
                    .iter_mut()
                    .find(|d| d.id == id)
                    .ok_or_else(|| PortError::NotFound(format!("doctor {id} not found")))?;
                doctor.password_hash = hash.to_string();
            }
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        role: Role,
        id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        match role {
            Role::Patient => {
                let mut patients = self.patients.lock().unwrap();
                let patient = patients
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| PortError::NotFound(format!("patient {id} not found")))?;
                patient.reset_token = Some(token.to_string());
                patient.reset_token_expires = Some(expires_at);
            }
            Role::Doctor => {
                let mut doctors = self.doctors.lock().unwrap();
                let doctor = doctors
                    .iter_mut()
                    .find(|d| d.id == id)
                    .ok_or_else(|| PortError::NotFound(format!("doctor {id} not found")))?;
                doctor.reset_token = Some(token.to_string());
                doctor.reset_token_expires = Some(expires_at);
            }
        }
        Ok(())
    }

    async fn clear_reset_token(&self, role: Role, id: Uuid) -> PortResult<()> {
        match role {
            Role::Patient => {
                if let Some(patient) = self.patients.lock().unwrap().iter_mut().find(|p| p.id == id)
                {
                    patient.reset_token = None;
                    patient.reset_token_expires = None;
                }
            }
            Role::Doctor => {
                if let Some(doctor) = self.doctors.lock().unwrap().iter_mut().find(|d| d.id == id) {
                    doctor.reset_token = None;
                    doctor.reset_token_expires = None;
                }
            }
        }
        Ok(())
    }

    async fn find_by_reset_token(&self, role: Role, token: &str) -> PortResult<Option<Identity>> {
        match role {
            Role::Patient => Ok(self
                .patients
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.reset_token.as_deref() == Some(token))
                .cloned()
                .map(Identity::Patient)),
            Role::Doctor => Ok(self
                .doctors
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.reset_token.as_deref() == Some(token))
                .cloned()
                .map(Identity::Doctor)),
        }
    }

    async fn create_session(
        &self,
        session_id: &str,
        caller: Caller,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string(), (caller, expires_at));
        Ok(())
    }

    async fn resolve_session(&self, session_id: &str) -> PortResult<Caller> {
        let sessions = self.sessions.lock().unwrap();
        match sessions.get(session_id) {
            Some((caller, expires_at)) if *expires_at > Utc::now() => Ok(*caller),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_session(&self, session_id: &str) -> PortResult<()> {
        self.sessions.lock().unwrap().remove(session_id);
        Ok(())
    }
}

//=========================================================================================
// Appointment store
//=========================================================================================

#[derive(Default)]
pub struct MemoryAppointmentStore {
    appointments: Mutex<Vec<Appointment>>,
}

impl MemoryAppointmentStore {
    /// Document count for a pair; only tests need this.
    pub fn count_for_pair(&self, patient_id: Uuid, doctor_id: Uuid) -> usize {
        self.appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.patient_id == patient_id && a.doctor_id == doctor_id)
            .count()
    }
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> PortResult<Appointment> {
        let mut appointments = self.appointments.lock().unwrap();
        // Same uniqueness rule the schema's partial unique index enforces.
        if appointments.iter().any(|a| {
            a.patient_id == appointment.patient_id
                && a.doctor_id == appointment.doctor_id
                && a.status != AppointmentStatus::Cancelled
        }) {
            return Err(PortError::Conflict(
                "a live appointment already exists for this pair".to_string(),
            ));
        }
        appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn get(&self, id: Uuid) -> PortResult<Appointment> {
        self.appointments
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("appointment {id} not found")))
    }

    async fn find_live_for_pair(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
    ) -> PortResult<Option<Appointment>> {
        let appointments = self.appointments.lock().unwrap();
        let mut live: Vec<&Appointment> = appointments
            .iter()
            .filter(|a| {
                a.patient_id == patient_id
                    && a.doctor_id == doctor_id
                    && matches!(
                        a.status,
                        AppointmentStatus::Scheduled | AppointmentStatus::Completed
                    )
            })
            .collect();
        live.sort_by_key(|a| std::cmp::Reverse(a.created_at));
        Ok(live.first().map(|a| (*a).clone()))
    }

    async fn slot_taken(&self, doctor_id: Uuid, date: NaiveDate, time: &str) -> PortResult<bool> {
        Ok(self.appointments.lock().unwrap().iter().any(|a| {
            a.doctor_id == doctor_id
                && a.date == date
                && a.time == time
                && a.status == AppointmentStatus::Scheduled
        }))
    }

    async fn update(&self, appointment: &Appointment) -> PortResult<Appointment> {
        let mut appointments = self.appointments.lock().unwrap();
        let stored = appointments
            .iter_mut()
            .find(|a| a.id == appointment.id)
            .ok_or_else(|| PortError::NotFound(format!("appointment {} not found", appointment.id)))?;
        *stored = appointment.clone();
        Ok(stored.clone())
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> PortResult<Vec<Appointment>> {
        let mut list: Vec<Appointment> = self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        list.sort_by_key(|a| a.date);
        Ok(list)
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> PortResult<Vec<Appointment>> {
        let mut list: Vec<Appointment> = self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect();
        list.sort_by_key(|a| a.date);
        Ok(list)
    }
}

//=========================================================================================
// Consultation store
//=========================================================================================

#[derive(Default)]
pub struct MemoryConsultationStore {
    consultations: Mutex<Vec<Consultation>>,
}

impl MemoryConsultationStore {
    fn active_sorted<F>(&self, pred: F) -> Vec<Consultation>
    where
        F: Fn(&Consultation) -> bool,
    {
        let mut list: Vec<Consultation> = self
            .consultations
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.is_active && pred(c))
            .cloned()
            .collect();
        list.sort_by_key(|c| std::cmp::Reverse(c.created_at));
        list
    }
}

#[async_trait]
impl ConsultationStore for MemoryConsultationStore {
    async fn insert(&self, consultation: Consultation) -> PortResult<Consultation> {
        self.consultations.lock().unwrap().push(consultation.clone());
        Ok(consultation)
    }

    async fn get(&self, id: Uuid) -> PortResult<Consultation> {
        self.consultations
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("consultation {id} not found")))
    }

    async fn update(&self, consultation: &Consultation) -> PortResult<Consultation> {
        let mut consultations = self.consultations.lock().unwrap();
        let stored = consultations
            .iter_mut()
            .find(|c| c.id == consultation.id)
            .ok_or_else(|| {
                PortError::NotFound(format!("consultation {} not found", consultation.id))
            })?;
        *stored = consultation.clone();
        Ok(stored.clone())
    }

    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> PortResult<(Vec<Consultation>, u64)> {
        let list = self.active_sorted(|c| c.patient_id == patient_id);
        let total = list.len() as u64;
        let page = list
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> PortResult<(Vec<Consultation>, u64)> {
        let list = self.active_sorted(|c| c.doctor_id == doctor_id);
        let total = list.len() as u64;
        let page = list
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn latest_for_patient(&self, patient_id: Uuid) -> PortResult<Option<Consultation>> {
        Ok(self
            .active_sorted(|c| c.patient_id == patient_id)
            .into_iter()
            .next())
    }
}

//=========================================================================================
// Message store
//=========================================================================================

#[derive(Default)]
pub struct MemoryMessageStore {
    messages: Mutex<Vec<Message>>,
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert(&self, message: Message) -> PortResult<Message> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn get(&self, id: Uuid) -> PortResult<Message> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("message {id} not found")))
    }

    async fn mark_read(&self, id: Uuid, read_at: DateTime<Utc>) -> PortResult<()> {
        let mut messages = self.messages.lock().unwrap();
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| PortError::NotFound(format!("message {id} not found")))?;
        message.is_read = true;
        message.read_at = Some(read_at);
        Ok(())
    }

    async fn mark_many_read(
        &self,
        ids: &[Uuid],
        recipient: PartyRef,
        read_at: DateTime<Utc>,
    ) -> PortResult<u64> {
        let mut messages = self.messages.lock().unwrap();
        let mut modified = 0;
        for message in messages.iter_mut() {
            if ids.contains(&message.id) && message.recipient == recipient && !message.is_read {
                message.is_read = true;
                message.read_at = Some(read_at);
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn thread(&self, thread_id: Uuid) -> PortResult<Vec<Message>> {
        let mut list: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect();
        list.sort_by_key(|m| m.created_at);
        Ok(list)
    }

    async fn delete(&self, id: Uuid) -> PortResult<()> {
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| m.id != id);
        if messages.len() == before {
            return Err(PortError::NotFound(format!("message {id} not found")));
        }
        Ok(())
    }

    async fn list_received(
        &self,
        recipient: PartyRef,
        filters: MessageFilters,
        offset: u64,
        limit: u64,
    ) -> PortResult<(Vec<Message>, u64)> {
        let mut list: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.recipient == recipient)
            .filter(|m| filters.message_type.map_or(true, |t| m.message_type == t))
            .filter(|m| filters.is_read.map_or(true, |r| m.is_read == r))
            .filter(|m| filters.priority.map_or(true, |p| m.priority == p))
            .cloned()
            .collect();
        list.sort_by_key(|m| std::cmp::Reverse(m.created_at));
        let total = list.len() as u64;
        let page = list
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn unread_count(&self, recipient: PartyRef) -> PortResult<u64> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.recipient == recipient && !m.is_read)
            .count() as u64)
    }
}

//=========================================================================================
// Mailer
//=========================================================================================

/// A scriptable mailer: records every send and fails when told to.
#[derive(Default)]
pub struct MockMailer {
    pub fail: bool,
    pub sent: Mutex<Vec<Email>>,
}

impl MockMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: &Email) -> PortResult<()> {
        if self.fail {
            return Err(PortError::Upstream("smtp connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

//=========================================================================================
// Fixtures
//=========================================================================================

pub mod fixtures {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{Gender, Specialization};

    pub fn patient() -> Patient {
        Patient {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4().simple()),
            password_hash: "$argon2id$stub".to_string(),
            first_name: "Priya".to_string(),
            last_name: "Sharma".to_string(),
            phone: "555-0101".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            gender: Gender::Female,
            address: Some("12 Elm Street".to_string()),
            emergency_contact: None,
            medical_history: vec![],
            allergies: vec![],
            is_active: true,
            reset_token: None,
            reset_token_expires: None,
            created_at: Utc::now(),
        }
    }

    pub fn doctor() -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4().simple()),
            password_hash: "$argon2id$stub".to_string(),
            first_name: "Arjun".to_string(),
            last_name: "Mehta".to_string(),
            phone: "555-0202".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 9, 3).unwrap(),
            gender: Gender::Male,
            specialization: Specialization::Cardiology,
            license_number: format!("LIC-{}", Uuid::new_v4().simple()),
            years_of_experience: 12,
            education: vec![],
            hospital: None,
            consultation_fee: 100,
            availability: vec![],
            biography: None,
            languages: vec!["english".to_string()],
            awards: vec![],
            is_verified: true,
            is_active: true,
            reset_token: None,
            reset_token_expires: None,
            created_at: Utc::now(),
        }
    }
}
