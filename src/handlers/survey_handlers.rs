use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::handlers::survey_dtos::{
    AnswerRequest, SubmitResponse, SurveyStateResponse, ToggleRequest, ToggleResponse,
};
use crate::utils::{codes, qr_utils};
use crate::wizard::session::{WizardError, WizardSession};
use crate::AppState;

type HandlerError = (StatusCode, Json<serde_json::Value>);

fn session_not_found(session_id: &str) -> HandlerError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": format!("Unknown survey session: {}", session_id)})),
    )
}

fn wizard_error(error: WizardError) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": error.to_string()})),
    )
}

pub async fn start_survey(State(state): State<Arc<AppState>>) -> Json<SurveyStateResponse> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let session = WizardSession::new();
    let response = SurveyStateResponse::from_session(&session_id, &session);
    state.sessions.insert(session_id.clone(), session);
    tracing::info!("Started survey session {}", session_id);
    Json(response)
}

pub async fn get_survey(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SurveyStateResponse>, HandlerError> {
    let session = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| session_not_found(&session_id))?;
    Ok(Json(SurveyStateResponse::from_session(&session_id, &session)))
}

pub async fn answer_field(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<SurveyStateResponse>, HandlerError> {
    let mut session = state
        .sessions
        .get_mut(&session_id)
        .ok_or_else(|| session_not_found(&session_id))?;
    session
        .set_field(&request.field, request.value)
        .map_err(wizard_error)?;
    Ok(Json(SurveyStateResponse::from_session(&session_id, &session)))
}

pub async fn toggle_option(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, HandlerError> {
    let mut session = state
        .sessions
        .get_mut(&session_id)
        .ok_or_else(|| session_not_found(&session_id))?;
    let selected = session
        .toggle_option(&request.field, request.value)
        .map_err(wizard_error)?;
    Ok(Json(ToggleResponse {
        field: request.field,
        selected,
    }))
}

pub async fn next_step(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SurveyStateResponse>, HandlerError> {
    let mut session = state
        .sessions
        .get_mut(&session_id)
        .ok_or_else(|| session_not_found(&session_id))?;
    session.advance().map_err(wizard_error)?;
    Ok(Json(SurveyStateResponse::from_session(&session_id, &session)))
}

pub async fn back_step(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SurveyStateResponse>, HandlerError> {
    let mut session = state
        .sessions
        .get_mut(&session_id)
        .ok_or_else(|| session_not_found(&session_id))?;
    session.retreat().map_err(wizard_error)?;
    Ok(Json(SurveyStateResponse::from_session(&session_id, &session)))
}

/// Final submission. The sheet write and the notification email are both
/// best effort: the respondent always reaches the completion screen with a
/// code, and remote failures are only visible in the logs.
pub async fn submit_survey(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SubmitResponse>, HandlerError> {
    let code = codes::generate_redemption_code();
    let answers = {
        let mut session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(&session_id))?;
        session.complete(code.clone()).map_err(wizard_error)?;
        session.answers().clone()
    };
    tracing::info!("Survey session {} submitted with code {}", session_id, code);

    let row = answers.to_row(&code, &Utc::now().to_rfc3339());
    if let Err(e) = state.sheetdb.append_row(&row).await {
        tracing::error!("Failed to persist survey row for {}: {}", code, e);
    }

    // Fire and forget: the email never blocks the reward.
    let recipient = answers.email.trim().to_string();
    if !recipient.is_empty() {
        let mail_code = code.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) =
                crate::handlers::mail_handlers::deliver_code_email(&recipient, &mail_code)
            {
                tracing::error!("Failed to email code {}: {}", mail_code, e);
            }
        });
    }

    let qr_svg = match qr_utils::code_to_svg(&code) {
        Ok(svg) => Some(svg),
        Err(e) => {
            tracing::error!("QR SVG render failed for {}: {}", code, e);
            None
        }
    };
    let qr_png_data_url = match qr_utils::code_to_data_url(&code) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::error!("QR PNG render failed for {}: {}", code, e);
            None
        }
    };
    Ok(Json(SubmitResponse {
        code,
        qr_svg,
        qr_png_data_url,
    }))
}
