//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{PgStore, TracingMailer},
    config::Config,
    error::ApiError,
    web::{appointments, auth, consultations, messages, require_auth, ApiDoc, AppState},
};
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(db_pool));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Shared AppState ---
    let mailer = Arc::new(TracingMailer::new(config.mail_from.clone()));
    let app_state = Arc::new(AppState {
        identities: store.clone(),
        appointments: store.clone(),
        consultations: store.clone(),
        messages: store,
        mailer,
        config: config.clone(),
    });

    let cors_origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {e}")))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/patients/register", post(auth::register_patient_handler))
        .route("/patients/login", post(auth::login_patient_handler))
        .route(
            "/patients/forgotpassword",
            post(auth::forgot_patient_password_handler),
        )
        .route(
            "/patients/resetpassword/{token}",
            put(auth::reset_patient_password_handler),
        )
        .route("/doctors/register", post(auth::register_doctor_handler))
        .route("/doctors/login", post(auth::login_doctor_handler))
        .route(
            "/doctors/forgotpassword",
            post(auth::forgot_doctor_password_handler),
        )
        .route(
            "/doctors/resetpassword/{token}",
            put(auth::reset_doctor_password_handler),
        )
        .route("/patients/logout", post(auth::logout_handler))
        .route("/doctors/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/patients/me", get(auth::patient_me_handler))
        .route(
            "/patients/updatedetails",
            put(auth::update_patient_details_handler),
        )
        .route(
            "/patients/updatepassword",
            put(auth::update_patient_password_handler),
        )
        .route("/doctors/me", get(auth::doctor_me_handler))
        .route(
            "/doctors/updatedetails",
            put(auth::update_doctor_details_handler),
        )
        .route(
            "/doctors/updatepassword",
            put(auth::update_doctor_password_handler),
        )
        .route(
            "/appointments",
            post(appointments::book_handler).get(appointments::list_handler),
        )
        .route("/appointments/{id}", get(appointments::get_handler))
        .route(
            "/appointments/{id}/reasons",
            post(appointments::add_reason_handler),
        )
        .route(
            "/appointments/{id}/status",
            put(appointments::update_status_handler),
        )
        .route("/consultations", post(consultations::create_handler))
        .route(
            "/consultations/patient",
            get(consultations::list_for_patient_handler),
        )
        .route(
            "/consultations/patient/latest",
            get(consultations::latest_for_patient_handler),
        )
        .route(
            "/consultations/doctor",
            get(consultations::list_for_doctor_handler),
        )
        .route(
            "/consultations/{id}",
            get(consultations::get_handler)
                .put(consultations::update_handler)
                .delete(consultations::delete_handler),
        )
        .route(
            "/messages",
            get(messages::inbox_handler).post(messages::send_handler),
        )
        .route("/messages/read", put(messages::mark_many_read_handler))
        .route(
            "/messages/{id}",
            get(messages::get_handler).delete(messages::delete_handler),
        )
        .route("/messages/{id}/reply", post(messages::reply_handler))
        .route("/messages/{id}/read", put(messages::mark_read_handler))
        .route(
            "/messages/thread/{thread_id}",
            get(messages::thread_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes under the versioned prefix.
    let api_router = Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
