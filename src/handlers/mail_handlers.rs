use axum::{http::StatusCode, Json};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::utils::qr_utils::{self, QrRenderError};

const SUBJECT: &str = "Your code for the courtesy cappuccino · Acertijo Café";
const QR_ATTACHMENT_NAME: &str = "acertijo-cafe-qr.png";
const SMTP_SERVER: &str = "smtp.gmail.com";
const SMTP_PORT: u16 = 587;

#[derive(Debug, Deserialize)]
pub struct SendCodeEmailRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("GMAIL_USER / GMAIL_PASS are not configured")]
    MissingCredentials,
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
    #[error("invalid attachment content type: {0}")]
    ContentType(String),
    #[error(transparent)]
    Qr(#[from] QrRenderError),
    #[error("failed to build email message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("failed to send email: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Sends the redemption email: plain text plus HTML body and the QR symbol
/// as a PNG attachment, over the Gmail STARTTLS relay. Blocking; callers on
/// the async path go through `spawn_blocking`.
pub fn deliver_code_email(recipient: &str, code: &str) -> Result<(), MailError> {
    let user = std::env::var("GMAIL_USER").map_err(|_| MailError::MissingCredentials)?;
    let pass = std::env::var("GMAIL_PASS").map_err(|_| MailError::MissingCredentials)?;

    let qr_png = qr_utils::code_to_png(code)?;
    let attachment = Attachment::new(QR_ATTACHMENT_NAME.to_string()).body(
        qr_png,
        ContentType::parse("image/png").map_err(|e| MailError::ContentType(e.to_string()))?,
    );

    let from: Mailbox = format!("Acertijo Café <{}>", user)
        .parse()
        .map_err(|e: lettre::address::AddressError| MailError::InvalidAddress(e.to_string()))?;
    let to: Mailbox = recipient
        .parse()
        .map_err(|e: lettre::address::AddressError| MailError::InvalidAddress(e.to_string()))?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(SUBJECT)
        .multipart(
            MultiPart::mixed()
                .multipart(MultiPart::alternative_plain_html(
                    text_body(code),
                    html_body(code),
                ))
                .singlepart(attachment),
        )?;

    let mailer = SmtpTransport::starttls_relay(SMTP_SERVER)?
        .port(SMTP_PORT)
        .credentials(Credentials::new(user, pass))
        .build();
    mailer.send(&message)?;
    tracing::info!("Redemption email for code {} sent to {}", code, recipient);
    Ok(())
}

fn text_body(code: &str) -> String {
    format!(
        "Hi,\n\n\
         Thanks for being part of Acertijo Café.\n\n\
         Here is your code to claim a courtesy cappuccino at our opening:\n\n\
         Code: {}\n\n\
         Show this email or the code at the counter when you visit.\n\n\
         See you soon, cup in hand.\n\n\
         Acertijo Café\n",
        code
    )
}

fn html_body(code: &str) -> String {
    format!(
        "<div style=\"font-family: system-ui, sans-serif; padding: 24px;\">\
           <p>ACERTIJO CAFÉ · MANIZALES</p>\
           <h1>Thanks for starting the riddle.</h1>\
           <p>This is your code to claim a <strong>courtesy cappuccino</strong> at our opening.</p>\
           <p style=\"font-family: monospace; font-size: 20px;\">{}</p>\
           <p>You can also show the attached QR code when you visit.</p>\
           <p>See you soon, cup in hand.</p>\
           <p>Acertijo Café</p>\
         </div>",
        code
    )
}

pub async fn send_code_email(
    Json(request): Json<SendCodeEmailRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let code = request
        .code
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let (email, code) = match (email, code) {
        (Some(email), Some(code)) => (email.to_string(), code.to_string()),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Missing email or code"})),
            ))
        }
    };

    tracing::info!("Sending redemption code email to {}", email);
    let result = tokio::task::spawn_blocking(move || deliver_code_email(&email, &code)).await;
    match result {
        Ok(Ok(())) => Ok(Json(json!({"ok": true}))),
        Ok(Err(MailError::MissingCredentials)) => {
            tracing::error!("GMAIL_USER / GMAIL_PASS are not set");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Mail is not configured"})),
            ))
        }
        Ok(Err(e)) => {
            tracing::error!("Failed to send code email: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to send email"})),
            ))
        }
        Err(e) => {
            tracing::error!("Mail task panicked: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to send email"})),
            ))
        }
    }
}
