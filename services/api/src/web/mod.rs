pub mod appointments;
pub mod auth;
pub mod consultations;
pub mod docs;
pub mod envelope;
pub mod messages;
pub mod middleware;
pub mod state;

// Re-export the pieces the server binary needs to build the router.
pub use docs::ApiDoc;
pub use middleware::require_auth;
pub use state::AppState;
