//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use portal_core::ports::{
    AppointmentStore, ConsultationStore, IdentityStore, Mailer, MessageStore,
};

use crate::config::Config;

/// The shared application state, created once at startup and passed to all
/// handlers. The four store ports are usually served by one database
/// adapter, but the handlers only ever see the trait objects.
#[derive(Clone)]
pub struct AppState {
    pub identities: Arc<dyn IdentityStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub consultations: Arc<dyn ConsultationStore>,
    pub messages: Arc<dyn MessageStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}
