//! Backend for the pension application platform.
//!
//! A single axum service sitting between the React frontend and two
//! external collaborators:
//!
//! - **MongoDB** stores submitted pension applications. One collection,
//!   flat documents, created-then-read lifecycle (no update endpoint).
//! - **OpenAI** answers the chat endpoint through a pre-configured
//!   assistant and holds the files users upload for analysis.
//!
//! Everything is request-per-call on the tokio runtime; the shared state
//! is one `Arc` holding the config, the Mongo collection handle, and the
//! assistant client. The PDF route renders a report for one stored
//! application, with its summary fetched from the assistant on the fly.

use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{delete, get, post},
    Router,
};

use signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod application;
pub mod assistant;
pub mod config;
pub mod database;
pub mod error;
pub mod pdf;
pub mod routes;
pub mod state;

use routes::{
    append_handler, application_pdf_handler, chat_handler, delete_application_handler,
    delete_file_handler, files_handler, get_applications_handler, health_handler,
    post_application_handler, upload_handler,
};
use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/files", get(files_handler))
        .route("/api/files/{id}", delete(delete_file_handler))
        .route("/api/append", post(append_handler))
        .route("/api/post_application", post(post_application_handler))
        .route("/api/get_applications", get(get_applications_handler))
        .route(
            "/api/delete_application/{id}",
            delete(delete_application_handler),
        )
        .route(
            "/api/get_application_pdf/{id}",
            get(application_pdf_handler),
        )
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
