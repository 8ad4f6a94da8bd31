//! crates/portal_core/src/consultations.rs
//!
//! Consultation records: the clinical outcome of a visit, authored and
//! owned by a doctor. Patients may only read their own records. Deletion
//! is a soft flag; inactive records disappear from every list read but
//! remain reachable by direct id for the owning doctor.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Caller, Consultation, ConsultationStatus, ConsultationUpdate, NewConsultation, Page,
    PageRequest, Role,
};
use crate::ports::{ConsultationStore, FieldError, IdentityStore, PortError, PortResult};

const MAX_CONDITION_LEN: usize = 1000;

fn validate_new(payload: &NewConsultation) -> PortResult<()> {
    let mut errors = Vec::new();
    if payload.condition.trim().is_empty() {
        errors.push(FieldError::new("condition", "condition must not be empty"));
    }
    if payload.condition.len() > MAX_CONDITION_LEN {
        errors.push(FieldError::new("condition", "condition is too long"));
    }
    if payload.diagnosis.primary.trim().is_empty() {
        errors.push(FieldError::new(
            "diagnosis.primary",
            "primary diagnosis is required",
        ));
    }
    if payload.fee < 0 {
        errors.push(FieldError::new("fee", "fee must not be negative"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PortError::Validation(errors))
    }
}

/// Creates a consultation record. Doctor-only; the patient must exist and
/// be active.
pub async fn create(
    identities: &dyn IdentityStore,
    consultations: &dyn ConsultationStore,
    caller: Caller,
    payload: NewConsultation,
) -> PortResult<Consultation> {
    if caller.role != Role::Doctor {
        return Err(PortError::Forbidden(
            "only doctors may create consultations".to_string(),
        ));
    }
    validate_new(&payload)?;

    let patient = identities.get_patient(payload.patient_id).await?;
    if !patient.is_active {
        return Err(PortError::NotFound(format!(
            "patient {} not found",
            payload.patient_id
        )));
    }

    consultations
        .insert(Consultation {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            doctor_id: caller.id,
            condition: payload.condition,
            symptoms: payload.symptoms,
            diagnosis: payload.diagnosis,
            medications: payload.medications,
            vitals: payload.vitals,
            follow_up_date: payload.follow_up_date,
            fee: payload.fee,
            consultation_type: payload.consultation_type,
            status: ConsultationStatus::InProgress,
            is_active: true,
            created_at: Utc::now(),
        })
        .await
}

/// Fetches one record by id. The owning doctor may always read it; the
/// patient may read it only while it is active. Anyone else is rejected.
pub async fn get(
    consultations: &dyn ConsultationStore,
    id: Uuid,
    caller: Caller,
) -> PortResult<Consultation> {
    let consultation = consultations.get(id).await?;
    match caller.role {
        Role::Doctor if consultation.doctor_id == caller.id => Ok(consultation),
        Role::Patient if consultation.patient_id == caller.id => {
            if consultation.is_active {
                Ok(consultation)
            } else {
                Err(PortError::NotFound(format!("consultation {id} not found")))
            }
        }
        _ => Err(PortError::Forbidden(
            "caller does not own this consultation".to_string(),
        )),
    }
}

/// The caller's own consultations as a patient: active records only,
/// newest first.
pub async fn list_for_patient(
    consultations: &dyn ConsultationStore,
    caller: Caller,
    page: PageRequest,
) -> PortResult<Page<Consultation>> {
    if caller.role != Role::Patient {
        return Err(PortError::Forbidden(
            "only patients may list their consultations".to_string(),
        ));
    }
    let (items, total) = consultations
        .list_for_patient(caller.id, page.offset(), page.limit)
        .await?;
    Ok(Page::new(items, total, page.limit))
}

/// The caller's own consultations as a doctor: active records only,
/// newest first.
pub async fn list_for_doctor(
    consultations: &dyn ConsultationStore,
    caller: Caller,
    page: PageRequest,
) -> PortResult<Page<Consultation>> {
    if caller.role != Role::Doctor {
        return Err(PortError::Forbidden(
            "only doctors may list their consultations".to_string(),
        ));
    }
    let (items, total) = consultations
        .list_for_doctor(caller.id, page.offset(), page.limit)
        .await?;
    Ok(Page::new(items, total, page.limit))
}

/// The single most recent active record for the calling patient.
pub async fn latest_for_patient(
    consultations: &dyn ConsultationStore,
    caller: Caller,
) -> PortResult<Consultation> {
    if caller.role != Role::Patient {
        return Err(PortError::Forbidden(
            "only patients may read their latest consultation".to_string(),
        ));
    }
    consultations
        .latest_for_patient(caller.id)
        .await?
        .ok_or_else(|| PortError::NotFound("no consultations on record".to_string()))
}

/// Field-level partial update by the doctor who created the record.
/// `None` fields are left untouched.
pub async fn update(
    consultations: &dyn ConsultationStore,
    id: Uuid,
    caller: Caller,
    changes: ConsultationUpdate,
) -> PortResult<Consultation> {
    let mut consultation = owned_by_doctor(consultations, id, caller).await?;

    if let Some(v) = changes.condition {
        if v.trim().is_empty() || v.len() > MAX_CONDITION_LEN {
            return Err(PortError::invalid("condition", "invalid condition"));
        }
        consultation.condition = v;
    }
    if let Some(v) = changes.symptoms {
        consultation.symptoms = v;
    }
    if let Some(v) = changes.diagnosis {
        if v.primary.trim().is_empty() {
            return Err(PortError::invalid(
                "diagnosis.primary",
                "primary diagnosis is required",
            ));
        }
        consultation.diagnosis = v;
    }
    if let Some(v) = changes.medications {
        consultation.medications = v;
    }
    if let Some(v) = changes.vitals {
        consultation.vitals = Some(v);
    }
    if let Some(v) = changes.follow_up_date {
        consultation.follow_up_date = Some(v);
    }
    if let Some(v) = changes.fee {
        if v < 0 {
            return Err(PortError::invalid("fee", "fee must not be negative"));
        }
        consultation.fee = v;
    }
    if let Some(v) = changes.consultation_type {
        consultation.consultation_type = v;
    }
    if let Some(v) = changes.status {
        consultation.status = v;
    }

    consultations.update(&consultation).await
}

/// Soft delete: flips `is_active` off. Doctor-who-created-it only; the row
/// is never removed.
pub async fn soft_delete(
    consultations: &dyn ConsultationStore,
    id: Uuid,
    caller: Caller,
) -> PortResult<()> {
    let mut consultation = owned_by_doctor(consultations, id, caller).await?;
    consultation.is_active = false;
    consultations.update(&consultation).await?;
    Ok(())
}

async fn owned_by_doctor(
    consultations: &dyn ConsultationStore,
    id: Uuid,
    caller: Caller,
) -> PortResult<Consultation> {
    let consultation = consultations.get(id).await?;
    if caller.role != Role::Doctor || consultation.doctor_id != caller.id {
        return Err(PortError::Forbidden(
            "only the doctor who created this consultation may modify it".to_string(),
        ));
    }
    Ok(consultation)
}
