//! services/api/src/adapters/db/identity.rs
//!
//! `IdentityStore` implementation: the `patients`, `doctors`, and
//! `auth_sessions` tables. Enum-valued columns are stored as their
//! snake_case strings; a stored value that no longer parses surfaces as
//! `Unexpected` rather than panicking.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use portal_core::domain::{
    AvailabilitySlot, Caller, Doctor, DoctorUpdate, Education, EmergencyContact, Gender,
    HospitalInfo, Identity, Patient, PatientUpdate, Role, Specialization,
};
use portal_core::ports::{IdentityStore, PortError, PortResult};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::{map_db_err, PgStore};

const PATIENT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, \
     date_of_birth, gender, address, emergency_contact, medical_history, allergies, \
     is_active, reset_token, reset_token_expires, created_at";

const DOCTOR_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, \
     date_of_birth, gender, specialization, license_number, years_of_experience, education, \
     hospital, consultation_fee, availability, biography, languages, awards, is_verified, \
     is_active, reset_token, reset_token_expires, created_at";

fn parse_gender(s: &str) -> PortResult<Gender> {
    Gender::parse(s).ok_or_else(|| PortError::Unexpected(format!("stored gender '{s}' is invalid")))
}

fn parse_specialization(s: &str) -> PortResult<Specialization> {
    Specialization::parse(s)
        .ok_or_else(|| PortError::Unexpected(format!("stored specialization '{s}' is invalid")))
}

fn parse_role(s: &str) -> PortResult<Role> {
    Role::parse(s).ok_or_else(|| PortError::Unexpected(format!("stored role '{s}' is invalid")))
}

#[derive(FromRow)]
struct PatientRecord {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: String,
    date_of_birth: NaiveDate,
    gender: String,
    address: Option<String>,
    emergency_contact: Option<Json<EmergencyContact>>,
    medical_history: Json<Vec<String>>,
    allergies: Json<Vec<String>>,
    is_active: bool,
    reset_token: Option<String>,
    reset_token_expires: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl PatientRecord {
    fn to_domain(self) -> PortResult<Patient> {
        Ok(Patient {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            date_of_birth: self.date_of_birth,
            gender: parse_gender(&self.gender)?,
            address: self.address,
            emergency_contact: self.emergency_contact.map(|j| j.0),
            medical_history: self.medical_history.0,
            allergies: self.allergies.0,
            is_active: self.is_active,
            reset_token: self.reset_token,
            reset_token_expires: self.reset_token_expires,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct DoctorRecord {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: String,
    date_of_birth: NaiveDate,
    gender: String,
    specialization: String,
    license_number: String,
    years_of_experience: i32,
    education: Json<Vec<Education>>,
    hospital: Option<Json<HospitalInfo>>,
    consultation_fee: i32,
    availability: Json<Vec<AvailabilitySlot>>,
    biography: Option<String>,
    languages: Json<Vec<String>>,
    awards: Json<Vec<String>>,
    is_verified: bool,
    is_active: bool,
    reset_token: Option<String>,
    reset_token_expires: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl DoctorRecord {
    fn to_domain(self) -> PortResult<Doctor> {
        Ok(Doctor {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            date_of_birth: self.date_of_birth,
            gender: parse_gender(&self.gender)?,
            specialization: parse_specialization(&self.specialization)?,
            license_number: self.license_number,
            years_of_experience: self.years_of_experience,
            education: self.education.0,
            hospital: self.hospital.map(|j| j.0),
            consultation_fee: self.consultation_fee,
            availability: self.availability.0,
            biography: self.biography,
            languages: self.languages.0,
            awards: self.awards.0,
            is_verified: self.is_verified,
            is_active: self.is_active,
            reset_token: self.reset_token,
            reset_token_expires: self.reset_token_expires,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    account_id: Uuid,
    role: String,
    expires_at: DateTime<Utc>,
}

impl PgStore {
    async fn fetch_patient(&self, id: Uuid) -> PortResult<Patient> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1");
        sqlx::query_as::<_, PatientRecord>(&sql)
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, &format!("patient {id}")))?
            .to_domain()
    }

    async fn fetch_doctor(&self, id: Uuid) -> PortResult<Doctor> {
        let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = $1");
        sqlx::query_as::<_, DoctorRecord>(&sql)
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, &format!("doctor {id}")))?
            .to_domain()
    }

    fn table_for(role: Role) -> &'static str {
        match role {
            Role::Patient => "patients",
            Role::Doctor => "doctors",
        }
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn create_patient(&self, patient: Patient) -> PortResult<Patient> {
        let sql = format!(
            "INSERT INTO patients ({PATIENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {PATIENT_COLUMNS}"
        );
        sqlx::query_as::<_, PatientRecord>(&sql)
            .bind(patient.id)
            .bind(&patient.email)
            .bind(&patient.password_hash)
            .bind(&patient.first_name)
            .bind(&patient.last_name)
            .bind(&patient.phone)
            .bind(patient.date_of_birth)
            .bind(patient.gender.as_str())
            .bind(&patient.address)
            .bind(patient.emergency_contact.as_ref().map(Json))
            .bind(Json(&patient.medical_history))
            .bind(Json(&patient.allergies))
            .bind(patient.is_active)
            .bind(&patient.reset_token)
            .bind(patient.reset_token_expires)
            .bind(patient.created_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, "a patient with this email"))?
            .to_domain()
    }

    async fn create_doctor(&self, doctor: Doctor) -> PortResult<Doctor> {
        let sql = format!(
            "INSERT INTO doctors ({DOCTOR_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18, $19, $20, $21, $22, $23) \
             RETURNING {DOCTOR_COLUMNS}"
        );
        sqlx::query_as::<_, DoctorRecord>(&sql)
            .bind(doctor.id)
            .bind(&doctor.email)
            .bind(&doctor.password_hash)
            .bind(&doctor.first_name)
            .bind(&doctor.last_name)
            .bind(&doctor.phone)
            .bind(doctor.date_of_birth)
            .bind(doctor.gender.as_str())
            .bind(doctor.specialization.as_str())
            .bind(&doctor.license_number)
            .bind(doctor.years_of_experience)
            .bind(Json(&doctor.education))
            .bind(doctor.hospital.as_ref().map(Json))
            .bind(doctor.consultation_fee)
            .bind(Json(&doctor.availability))
            .bind(&doctor.biography)
            .bind(Json(&doctor.languages))
            .bind(Json(&doctor.awards))
            .bind(doctor.is_verified)
            .bind(doctor.is_active)
            .bind(&doctor.reset_token)
            .bind(doctor.reset_token_expires)
            .bind(doctor.created_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, "a doctor with this email or license"))?
            .to_domain()
    }

    async fn get_patient(&self, id: Uuid) -> PortResult<Patient> {
        self.fetch_patient(id).await
    }

    async fn get_doctor(&self, id: Uuid) -> PortResult<Doctor> {
        self.fetch_doctor(id).await
    }

    async fn find_by_email(&self, role: Role, email: &str) -> PortResult<Option<Identity>> {
        match role {
            Role::Patient => {
                let sql = format!(
                    "SELECT {PATIENT_COLUMNS} FROM patients WHERE LOWER(email) = LOWER($1)"
                );
                let record = sqlx::query_as::<_, PatientRecord>(&sql)
                    .bind(email)
                    .fetch_optional(self.pool())
                    .await
                    .map_err(|e| map_db_err(e, "patient"))?;
                record
                    .map(|r| r.to_domain().map(Identity::Patient))
                    .transpose()
            }
            Role::Doctor => {
                let sql = format!(
                    "SELECT {DOCTOR_COLUMNS} FROM doctors WHERE LOWER(email) = LOWER($1)"
                );
                let record = sqlx::query_as::<_, DoctorRecord>(&sql)
                    .bind(email)
                    .fetch_optional(self.pool())
                    .await
                    .map_err(|e| map_db_err(e, "doctor"))?;
                record
                    .map(|r| r.to_domain().map(Identity::Doctor))
                    .transpose()
            }
        }
    }

    async fn update_patient(&self, id: Uuid, changes: PatientUpdate) -> PortResult<Patient> {
        // Load-merge-store keeps the partial-update rules in one place and
        // the SQL free of per-field COALESCE ladders.
        let mut patient = self.fetch_patient(id).await?;
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

        let sql = format!(
            "UPDATE patients SET first_name = $2, last_name = $3, phone = $4, \
             date_of_birth = $5, gender = $6, address = $7, emergency_contact = $8, \
             medical_history = $9, allergies = $10 \
             WHERE id = $1 RETURNING {PATIENT_COLUMNS}"
        );
        sqlx::query_as::<_, PatientRecord>(&sql)
            .bind(id)
            .bind(&patient.first_name)
            .bind(&patient.last_name)
            .bind(&patient.phone)
            .bind(patient.date_of_birth)
            .bind(patient.gender.as_str())
            .bind(&patient.address)
            .bind(patient.emergency_contact.as_ref().map(Json))
            .bind(Json(&patient.medical_history))
            .bind(Json(&patient.allergies))
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, &format!("patient {id}")))?
            .to_domain()
    }

    async fn update_doctor(&self, id: Uuid, changes: DoctorUpdate) -> PortResult<Doctor> {
        let mut doctor = self.fetch_doctor(id).await?;
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

        let sql = format!(
            "UPDATE doctors SET first_name = $2, last_name = $3, phone = $4, \
             date_of_birth = $5, gender = $6, specialization = $7, years_of_experience = $8, \
             education = $9, hospital = $10, consultation_fee = $11, availability = $12, \
             biography = $13, languages = $14, awards = $15 \
             WHERE id = $1 RETURNING {DOCTOR_COLUMNS}"
        );
        sqlx::query_as::<_, DoctorRecord>(&sql)
            .bind(id)
            .bind(&doctor.first_name)
            .bind(&doctor.last_name)
            .bind(&doctor.phone)
            .bind(doctor.date_of_birth)
            .bind(doctor.gender.as_str())
            .bind(doctor.specialization.as_str())
            .bind(doctor.years_of_experience)
            .bind(Json(&doctor.education))
            .bind(doctor.hospital.as_ref().map(Json))
            .bind(doctor.consultation_fee)
            .bind(Json(&doctor.availability))
            .bind(&doctor.biography)
            .bind(Json(&doctor.languages))
            .bind(Json(&doctor.awards))
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, &format!("doctor {id}")))?
            .to_domain()
    }

    async fn set_password_hash(&self, role: Role, id: Uuid, hash: &str) -> PortResult<()> {
        let sql = format!(
            "UPDATE {} SET password_hash = $2 WHERE id = $1",
            Self::table_for(role)
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(hash)
            .execute(self.pool())
            .await
            .map_err(|e| map_db_err(e, "account"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("account {id} not found")));
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
        let sql = format!(
            "UPDATE {} SET reset_token = $2, reset_token_expires = $3 WHERE id = $1",
            Self::table_for(role)
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(token)
            .bind(expires_at)
            .execute(self.pool())
            .await
            .map_err(|e| map_db_err(e, "account"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("account {id} not found")));
        }
        Ok(())
    }

    async fn clear_reset_token(&self, role: Role, id: Uuid) -> PortResult<()> {
        let sql = format!(
            "UPDATE {} SET reset_token = NULL, reset_token_expires = NULL WHERE id = $1",
            Self::table_for(role)
        );
        sqlx::query(&sql)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| map_db_err(e, "account"))?;
        Ok(())
    }

    async fn find_by_reset_token(&self, role: Role, token: &str) -> PortResult<Option<Identity>> {
        match role {
            Role::Patient => {
                let sql =
                    format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE reset_token = $1");
                let record = sqlx::query_as::<_, PatientRecord>(&sql)
                    .bind(token)
                    .fetch_optional(self.pool())
                    .await
                    .map_err(|e| map_db_err(e, "patient"))?;
                record
                    .map(|r| r.to_domain().map(Identity::Patient))
                    .transpose()
            }
            Role::Doctor => {
                let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE reset_token = $1");
                let record = sqlx::query_as::<_, DoctorRecord>(&sql)
                    .bind(token)
                    .fetch_optional(self.pool())
                    .await
                    .map_err(|e| map_db_err(e, "doctor"))?;
                record
                    .map(|r| r.to_domain().map(Identity::Doctor))
                    .transpose()
            }
        }
    }

    async fn create_session(
        &self,
        session_id: &str,
        caller: Caller,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO auth_sessions (session_id, account_id, role, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(session_id)
        .bind(caller.id)
        .bind(caller.role.as_str())
        .bind(expires_at)
        .execute(self.pool())
        .await
        .map_err(|e| map_db_err(e, "session"))?;
        Ok(())
    }

    async fn resolve_session(&self, session_id: &str) -> PortResult<Caller> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT account_id, role, expires_at FROM auth_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_db_err(e, "session"))?
        .ok_or(PortError::Unauthorized)?;

        if record.expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        Ok(Caller {
            id: record.account_id,
            role: parse_role(&record.role)?,
        })
    }

    async fn delete_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(self.pool())
            .await
            .map_err(|e| map_db_err(e, "session"))?;
        Ok(())
    }
}
