//! services/api/src/adapters/db/consultations.rs
//!
//! `ConsultationStore` implementation. List reads exclude soft-deleted
//! rows; direct id reads do not, so the owning doctor can still reach a
//! deactivated record.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use portal_core::domain::{
    Consultation, ConsultationStatus, ConsultationType, Diagnosis, Medication, Symptom, Vitals,
};
use portal_core::ports::{ConsultationStore, PortError, PortResult};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::{map_db_err, PgStore};

const CONSULTATION_COLUMNS: &str = "id, patient_id, doctor_id, condition, symptoms, diagnosis, \
     medications, vitals, follow_up_date, fee, consultation_type, status, is_active, created_at";

#[derive(FromRow)]
struct ConsultationRecord {
    id: Uuid,
    patient_id: Uuid,
    doctor_id: Uuid,
    condition: String,
    symptoms: Json<Vec<Symptom>>,
    diagnosis: Json<Diagnosis>,
    medications: Json<Vec<Medication>>,
    vitals: Option<Json<Vitals>>,
    follow_up_date: Option<NaiveDate>,
    fee: i32,
    consultation_type: String,
    status: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl ConsultationRecord {
    fn to_domain(self) -> PortResult<Consultation> {
        let consultation_type = ConsultationType::parse(&self.consultation_type).ok_or_else(|| {
            PortError::Unexpected(format!(
                "stored consultation type '{}' is invalid",
                self.consultation_type
            ))
        })?;
        let status = ConsultationStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!(
                "stored consultation status '{}' is invalid",
                self.status
            ))
        })?;
        Ok(Consultation {
            id: self.id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            condition: self.condition,
            symptoms: self.symptoms.0,
            diagnosis: self.diagnosis.0,
            medications: self.medications.0,
            vitals: self.vitals.map(|j| j.0),
            follow_up_date: self.follow_up_date,
            fee: self.fee,
            consultation_type,
            status,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

impl PgStore {
    async fn list_consultations(
        &self,
        owner_column: &str,
        owner_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> PortResult<(Vec<Consultation>, u64)> {
        let count_sql = format!(
            "SELECT COUNT(*) FROM consultations WHERE {owner_column} = $1 AND is_active = TRUE"
        );
        let (total,): (i64,) = sqlx::query_as(&count_sql)
            .bind(owner_id)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, "consultations"))?;

        let sql = format!(
            "SELECT {CONSULTATION_COLUMNS} FROM consultations \
             WHERE {owner_column} = $1 AND is_active = TRUE \
             ORDER BY created_at DESC OFFSET $2 LIMIT $3"
        );
        let records = sqlx::query_as::<_, ConsultationRecord>(&sql)
            .bind(owner_id)
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_db_err(e, "consultations"))?;

        let items = records
            .into_iter()
            .map(|r| r.to_domain())
            .collect::<PortResult<Vec<_>>>()?;
        Ok((items, total as u64))
    }
}

#[async_trait]
impl ConsultationStore for PgStore {
    async fn insert(&self, consultation: Consultation) -> PortResult<Consultation> {
        let sql = format!(
            "INSERT INTO consultations ({CONSULTATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {CONSULTATION_COLUMNS}"
        );
        sqlx::query_as::<_, ConsultationRecord>(&sql)
            .bind(consultation.id)
            .bind(consultation.patient_id)
            .bind(consultation.doctor_id)
            .bind(&consultation.condition)
            .bind(Json(&consultation.symptoms))
            .bind(Json(&consultation.diagnosis))
            .bind(Json(&consultation.medications))
            .bind(consultation.vitals.as_ref().map(Json))
            .bind(consultation.follow_up_date)
            .bind(consultation.fee)
            .bind(consultation.consultation_type.as_str())
            .bind(consultation.status.as_str())
            .bind(consultation.is_active)
            .bind(consultation.created_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, "consultation"))?
            .to_domain()
    }

    async fn get(&self, id: Uuid) -> PortResult<Consultation> {
        let sql = format!("SELECT {CONSULTATION_COLUMNS} FROM consultations WHERE id = $1");
        sqlx::query_as::<_, ConsultationRecord>(&sql)
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, &format!("consultation {id}")))?
            .to_domain()
    }

    async fn update(&self, consultation: &Consultation) -> PortResult<Consultation> {
        let sql = format!(
            "UPDATE consultations SET condition = $2, symptoms = $3, diagnosis = $4, \
             medications = $5, vitals = $6, follow_up_date = $7, fee = $8, \
             consultation_type = $9, status = $10, is_active = $11 \
             WHERE id = $1 RETURNING {CONSULTATION_COLUMNS}"
        );
        sqlx::query_as::<_, ConsultationRecord>(&sql)
            .bind(consultation.id)
            .bind(&consultation.condition)
            .bind(Json(&consultation.symptoms))
            .bind(Json(&consultation.diagnosis))
            .bind(Json(&consultation.medications))
            .bind(consultation.vitals.as_ref().map(Json))
            .bind(consultation.follow_up_date)
            .bind(consultation.fee)
            .bind(consultation.consultation_type.as_str())
            .bind(consultation.status.as_str())
            .bind(consultation.is_active)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, &format!("consultation {}", consultation.id)))?
            .to_domain()
    }

    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> PortResult<(Vec<Consultation>, u64)> {
        self.list_consultations("patient_id", patient_id, offset, limit)
            .await
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> PortResult<(Vec<Consultation>, u64)> {
        self.list_consultations("doctor_id", doctor_id, offset, limit)
            .await
    }

    async fn latest_for_patient(&self, patient_id: Uuid) -> PortResult<Option<Consultation>> {
        let sql = format!(
            "SELECT {CONSULTATION_COLUMNS} FROM consultations \
             WHERE patient_id = $1 AND is_active = TRUE \
             ORDER BY created_at DESC LIMIT 1"
        );
        let record = sqlx::query_as::<_, ConsultationRecord>(&sql)
            .bind(patient_id)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_db_err(e, "consultation"))?;
        record.map(|r| r.to_domain()).transpose()
    }
}
