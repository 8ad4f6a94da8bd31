//! services/api/src/adapters/db/mod.rs
//!
//! The PostgreSQL adapter: one pool-holding struct that implements all
//! four store ports. Nested document fields (reason history, symptoms,
//! attachments, ...) are stored as JSONB columns and round-tripped
//! through `sqlx::types::Json`. Queries use the runtime API so the crate
//! builds without a live database.

mod appointments;
mod consultations;
mod identity;
mod messages;

use portal_core::ports::PortError;
use sqlx::PgPool;

/// A database adapter serving the `IdentityStore`, `AppointmentStore`,
/// `ConsultationStore`, and `MessageStore` ports.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the embedded migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a database failure into the port taxonomy. Unique-key violations
/// become `Conflict` so the booking race and duplicate registrations are
/// detected at the store boundary.
pub(crate) fn map_db_err(e: sqlx::Error, what: &str) -> PortError {
    match &e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{what} not found")),
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            PortError::Conflict(format!("{what} already exists"))
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}
