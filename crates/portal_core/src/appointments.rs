//! crates/portal_core/src/appointments.rs
//!
//! The appointment ledger. A (patient, doctor) pair is tracked by at most
//! one live appointment: a repeat booking extends the existing record
//! (reason append, slot overwrite, status reset) instead of creating a
//! second one. The reason history is append-only; the last entry is always
//! the current reason and everything before it is context for the doctor.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Appointment, AppointmentStatus, AppointmentView, BookingRequest, Caller, Reason, Role,
};
use crate::ports::{AppointmentStore, IdentityStore, PortError, PortResult};

fn validate_booking(request: &BookingRequest) -> PortResult<()> {
    if request.reason.trim().is_empty() {
        return Err(PortError::invalid("reason", "reason must not be empty"));
    }
    if request.time.trim().is_empty() {
        return Err(PortError::invalid("time", "time must not be empty"));
    }
    Ok(())
}

/// Books a visit for the caller, either by extending the pair's existing
/// live appointment or by creating the pair's first record.
///
/// The extend branch appends to the reason history, overwrites the slot,
/// and resets the status to scheduled. The create branch first rejects a
/// slot another scheduled appointment already holds. Two racing first-time
/// bookings can both reach the insert; the store's uniqueness rule turns
/// the loser into a `Conflict` instead of a duplicate document.
pub async fn book_or_extend(
    identities: &dyn IdentityStore,
    appointments: &dyn AppointmentStore,
    patient_id: Uuid,
    request: BookingRequest,
) -> PortResult<AppointmentView> {
    validate_booking(&request)?;

    let doctor = identities.get_doctor(request.doctor_id).await?;
    if !doctor.is_active {
        return Err(PortError::NotFound(format!(
            "doctor {} not found",
            request.doctor_id
        )));
    }
    let patient = identities.get_patient(patient_id).await?;

    let now = Utc::now();
    let reason = Reason {
        text: request.reason.clone(),
        date: now,
    };

    let appointment = match appointments
        .find_live_for_pair(patient_id, doctor.id)
        .await?
    {
        Some(mut existing) => {
            existing.reasons.push(reason);
            existing.date = request.date;
            existing.time = request.time;
            existing.status = AppointmentStatus::Scheduled;
            existing.updated_at = now;
            appointments.update(&existing).await?
        }
        None => {
            if appointments
                .slot_taken(doctor.id, request.date, &request.time)
                .await?
            {
                return Err(PortError::Conflict(
                    "the requested slot is already scheduled".to_string(),
                ));
            }
            appointments
                .insert(Appointment {
                    id: Uuid::new_v4(),
                    patient_id,
                    doctor_id: doctor.id,
                    date: request.date,
                    time: request.time,
                    reasons: vec![reason],
                    status: AppointmentStatus::Scheduled,
                    notes: None,
                    created_at: now,
                    updated_at: now,
                })
                .await?
        }
    };

    Ok(AppointmentView::project(appointment, &patient, &doctor))
}

/// Lists the caller's own appointments, sorted by date ascending, each
/// annotated with the derived current/previous reason projection.
pub async fn list_for_caller(
    identities: &dyn IdentityStore,
    appointments: &dyn AppointmentStore,
    caller: Caller,
) -> PortResult<Vec<AppointmentView>> {
    let records = match caller.role {
        Role::Patient => appointments.list_for_patient(caller.id).await?,
        Role::Doctor => appointments.list_for_doctor(caller.id).await?,
    };

    let mut views = Vec::with_capacity(records.len());
    for record in records {
        let patient = identities.get_patient(record.patient_id).await?;
        let doctor = identities.get_doctor(record.doctor_id).await?;
        views.push(AppointmentView::project(record, &patient, &doctor));
    }
    Ok(views)
}

/// Fetches one appointment; the caller must be its patient or its doctor.
pub async fn get(
    identities: &dyn IdentityStore,
    appointments: &dyn AppointmentStore,
    id: Uuid,
    caller: Caller,
) -> PortResult<AppointmentView> {
    let appointment = appointments.get(id).await?;
    ensure_participant(&appointment, caller)?;
    let patient = identities.get_patient(appointment.patient_id).await?;
    let doctor = identities.get_doctor(appointment.doctor_id).await?;
    Ok(AppointmentView::project(appointment, &patient, &doctor))
}

/// Appends a reason to the history without touching slot or status. Only
/// the appointment's patient may do this.
pub async fn add_reason(
    identities: &dyn IdentityStore,
    appointments: &dyn AppointmentStore,
    id: Uuid,
    caller: Caller,
    text: String,
) -> PortResult<AppointmentView> {
    if text.trim().is_empty() {
        return Err(PortError::invalid("reason", "reason must not be empty"));
    }
    let mut appointment = appointments.get(id).await?;
    if caller.role != Role::Patient || appointment.patient_id != caller.id {
        return Err(PortError::Forbidden(
            "only the appointment's patient may add a reason".to_string(),
        ));
    }

    let now = Utc::now();
    appointment.reasons.push(Reason { text, date: now });
    appointment.updated_at = now;
    let appointment = appointments.update(&appointment).await?;

    let patient = identities.get_patient(appointment.patient_id).await?;
    let doctor = identities.get_doctor(appointment.doctor_id).await?;
    Ok(AppointmentView::project(appointment, &patient, &doctor))
}

/// Sets the status (and notes, if supplied). Only the appointment's doctor
/// may do this. No transition table is enforced beyond the closed enum:
/// any status is reachable from any other.
pub async fn update_status(
    identities: &dyn IdentityStore,
    appointments: &dyn AppointmentStore,
    id: Uuid,
    caller: Caller,
    status: AppointmentStatus,
    notes: Option<String>,
) -> PortResult<AppointmentView> {
    let mut appointment = appointments.get(id).await?;
    if caller.role != Role::Doctor || appointment.doctor_id != caller.id {
        return Err(PortError::Forbidden(
            "only the appointment's doctor may update its status".to_string(),
        ));
    }

    appointment.status = status;
    if notes.is_some() {
        appointment.notes = notes;
    }
    appointment.updated_at = Utc::now();
    let appointment = appointments.update(&appointment).await?;

    let patient = identities.get_patient(appointment.patient_id).await?;
    let doctor = identities.get_doctor(appointment.doctor_id).await?;
    Ok(AppointmentView::project(appointment, &patient, &doctor))
}

fn ensure_participant(appointment: &Appointment, caller: Caller) -> PortResult<()> {
    let allowed = match caller.role {
        Role::Patient => appointment.patient_id == caller.id,
        Role::Doctor => appointment.doctor_id == caller.id,
    };
    if allowed {
        Ok(())
    } else {
        Err(PortError::Forbidden(
            "caller is not a participant of this appointment".to_string(),
        ))
    }
}
