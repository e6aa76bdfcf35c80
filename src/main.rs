use axum::{
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use dotenvy::dotenv;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

mod handlers {
    pub mod mail_handlers;
    pub mod survey_dtos;
    pub mod survey_handlers;
}
mod wizard {
    pub mod answers;
    pub mod session;
    pub mod steps;
}
mod api {
    pub mod sheetdb;
}
mod utils {
    pub mod codes;
    pub mod qr_utils;
}
mod jobs {
    pub mod scheduler;
}

use api::sheetdb::SheetDbClient;
use handlers::{mail_handlers, survey_handlers};
use wizard::session::WizardSession;

pub struct AppState {
    sessions: DashMap<String, WizardSession>,
    sheetdb: SheetDbClient,
}

async fn health_check() -> &'static str {
    "OK"
}

pub fn validate_env() {
    let required_vars = ["SHEETDB_API_URL", "GMAIL_USER", "GMAIL_PASS", "FRONTEND_URL"];
    for var in required_vars.iter() {
        std::env::var(var).expect(&format!("{} must be set", var));
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    use tracing_subscriber::{fmt, EnvFilter};
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,backend=debug"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let state = Arc::new(AppState {
        sessions: DashMap::new(),
        sheetdb: SheetDbClient::from_env(),
    });

    let survey_routes = Router::new()
        .route("/api/survey/start", post(survey_handlers::start_survey))
        .route("/api/survey/{session_id}", get(survey_handlers::get_survey))
        .route("/api/survey/{session_id}/answer", post(survey_handlers::answer_field))
        .route("/api/survey/{session_id}/toggle", post(survey_handlers::toggle_option))
        .route("/api/survey/{session_id}/next", post(survey_handlers::next_step))
        .route("/api/survey/{session_id}/back", post(survey_handlers::back_step))
        .route("/api/survey/{session_id}/submit", post(survey_handlers::submit_survey));

    let app = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/send-code-email", post(mail_handlers::send_code_email))
        .merge(survey_routes)
        // The marketing page itself is static content
        .fallback_service(ServeDir::new("static"))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_origin(AllowOrigin::exact(
                    std::env::var("FRONTEND_URL")
                        .unwrap_or_else(|_| "http://localhost:8080".to_string())
                        .parse()
                        .expect("Invalid FRONTEND_URL"),
                ))
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                    axum::http::header::ORIGIN,
                ]),
        )
        .with_state(state.clone());

    let state_for_sweeper = state.clone();
    tokio::spawn(async move {
        jobs::scheduler::start_scheduler(state_for_sweeper).await;
    });

    use tokio::net::TcpListener;
    let port = match std::env::var("ENVIRONMENT").as_deref() {
        Ok("staging") => 3100,
        _ => 3000,
    };
    validate_env();
    tracing::info!("Starting server on port {}", port);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await.unwrap();
    axum::serve(listener, app.into_make_service()).await.unwrap();
}
