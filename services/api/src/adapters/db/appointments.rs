//! services/api/src/adapters/db/appointments.rs
//!
//! `AppointmentStore` implementation. A partial unique index on
//! (patient_id, doctor_id) WHERE status <> 'cancelled' backs the
//! one-live-appointment-per-pair rule, so the loser of a concurrent
//! first-time booking race comes back as `Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use portal_core::domain::{Appointment, AppointmentStatus, Reason};
use portal_core::ports::{AppointmentStore, PortError, PortResult};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::{map_db_err, PgStore};

const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, doctor_id, date, time, reasons, status, notes, created_at, updated_at";

#[derive(FromRow)]
struct AppointmentRecord {
    id: Uuid,
    patient_id: Uuid,
    doctor_id: Uuid,
    date: NaiveDate,
    time: String,
    reasons: Json<Vec<Reason>>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AppointmentRecord {
    fn to_domain(self) -> PortResult<Appointment> {
        let status = AppointmentStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("stored appointment status '{}' is invalid", self.status))
        })?;
        Ok(Appointment {
            id: self.id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            date: self.date,
            time: self.time,
            reasons: self.reasons.0,
            status,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn insert(&self, appointment: Appointment) -> PortResult<Appointment> {
        let sql = format!(
            "INSERT INTO appointments ({APPOINTMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {APPOINTMENT_COLUMNS}"
        );
        sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(appointment.id)
            .bind(appointment.patient_id)
            .bind(appointment.doctor_id)
            .bind(appointment.date)
            .bind(&appointment.time)
            .bind(Json(&appointment.reasons))
            .bind(appointment.status.as_str())
            .bind(&appointment.notes)
            .bind(appointment.created_at)
            .bind(appointment.updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, "a live appointment for this patient and doctor"))?
            .to_domain()
    }

    async fn get(&self, id: Uuid) -> PortResult<Appointment> {
        let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
        sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, &format!("appointment {id}")))?
            .to_domain()
    }

    async fn find_live_for_pair(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
    ) -> PortResult<Option<Appointment>> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE patient_id = $1 AND doctor_id = $2 AND status <> 'cancelled' \
             ORDER BY created_at DESC LIMIT 1"
        );
        let record = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(patient_id)
            .bind(doctor_id)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_db_err(e, "appointment"))?;
        record.map(|r| r.to_domain()).transpose()
    }

    async fn slot_taken(&self, doctor_id: Uuid, date: NaiveDate, time: &str) -> PortResult<bool> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM appointments \
             WHERE doctor_id = $1 AND date = $2 AND time = $3 AND status = 'scheduled'",
        )
        .bind(doctor_id)
        .bind(date)
        .bind(time)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_db_err(e, "appointment"))?;
        Ok(count > 0)
    }

    async fn update(&self, appointment: &Appointment) -> PortResult<Appointment> {
        let sql = format!(
            "UPDATE appointments SET date = $2, time = $3, reasons = $4, status = $5, \
             notes = $6, updated_at = $7 \
             WHERE id = $1 RETURNING {APPOINTMENT_COLUMNS}"
        );
        sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(appointment.id)
            .bind(appointment.date)
            .bind(&appointment.time)
            .bind(Json(&appointment.reasons))
            .bind(appointment.status.as_str())
            .bind(&appointment.notes)
            .bind(appointment.updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, &format!("appointment {}", appointment.id)))?
            .to_domain()
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> PortResult<Vec<Appointment>> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE patient_id = $1 ORDER BY date ASC"
        );
        let records = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(patient_id)
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_db_err(e, "appointments"))?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> PortResult<Vec<Appointment>> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE doctor_id = $1 ORDER BY date ASC"
        );
        let records = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(doctor_id)
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_db_err(e, "appointments"))?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }
}
