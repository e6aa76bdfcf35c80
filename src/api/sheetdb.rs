use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::wizard::answers::COLUMNS;

const DEFAULT_API_URL: &str = "https://sheetdb.io/api/v1/kvh9rj37zuphl";
const HEADER_RETRY_DELAY: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SheetDbError {
    #[error("request to SheetDB failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("SheetDB rejected the row ({status}): {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Client for the spreadsheet-backed storage API holding the survey
/// responses. SheetDB treats the first row of the sheet as column headers.
pub struct SheetDbClient {
    client: reqwest::Client,
    api_url: String,
}

impl SheetDbClient {
    pub fn new(api_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self { client, api_url }
    }

    pub fn from_env() -> Self {
        let api_url =
            std::env::var("SHEETDB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(api_url)
    }

    /// Appends one flattened survey row. A brand-new sheet has no header
    /// row yet and SheetDB reports it as empty; in that case the header row
    /// is created, SheetDB gets a moment to process it, and the data POST
    /// is retried exactly once. Any other failure propagates to the caller.
    pub async fn append_row(&self, row: &Value) -> Result<(), SheetDbError> {
        match self.post_row(row).await {
            Err(SheetDbError::Rejected { status, body }) if body_reports_empty_sheet(&body) => {
                tracing::warn!(
                    "SheetDB sheet is uninitialized ({}), creating header row first",
                    status
                );
                self.post_row(&header_row()).await?;
                tokio::time::sleep(HEADER_RETRY_DELAY).await;
                self.post_row(row).await
            }
            other => other,
        }
    }

    async fn post_row(&self, row: &Value) -> Result<(), SheetDbError> {
        let response = self
            .client
            .post(&self.api_url)
            .json(&json!({ "data": [row] }))
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!("SheetDB error response ({}): {}", status, body);
        Err(SheetDbError::Rejected { status, body })
    }
}

/// Each column name mapped to itself; posting this as the first row makes
/// SheetDB adopt it as the header row.
pub fn header_row() -> Value {
    let mut row = Map::new();
    for column in COLUMNS {
        row.insert(column.to_string(), Value::String(column.to_string()));
    }
    Value::Object(row)
}

fn body_reports_empty_sheet(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.as_str())
                .map(|message| message.contains("empty"))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use axum::routing::post;
    use axum::{Json as AxumJson, Router};

    async fn spawn_sheet_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        url
    }

    #[tokio::test]
    async fn empty_sheet_gets_a_header_row_then_one_retry() {
        let rows: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = rows.clone();
        // First POST is rejected the way SheetDB reports an uninitialized
        // sheet; everything after that is accepted.
        let app = Router::new().route(
            "/",
            post(move |AxumJson(body): AxumJson<Value>| {
                let seen = seen.clone();
                async move {
                    let mut seen = seen.lock().unwrap();
                    seen.push(body["data"][0].clone());
                    if seen.len() == 1 {
                        (
                            StatusCode::BAD_REQUEST,
                            AxumJson(json!({"error": "the sheet is empty, add headers first"})),
                        )
                    } else {
                        (StatusCode::CREATED, AxumJson(json!({"created": 1})))
                    }
                }
            }),
        );
        let url = spawn_sheet_stub(app).await;

        let client = SheetDbClient::new(url);
        let row = json!({"code": "ACERTIJO-1-abc"});
        client.append_row(&row).await.unwrap();

        let seen = rows.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0]["code"], "ACERTIJO-1-abc");
        assert_eq!(seen[1], header_row());
        assert_eq!(seen[2]["code"], "ACERTIJO-1-abc");
    }

    #[tokio::test]
    async fn other_rejections_are_not_retried() {
        let hits = Arc::new(Mutex::new(0usize));
        let counter = hits.clone();
        let app = Router::new().route(
            "/",
            post(move || {
                let counter = counter.clone();
                async move {
                    *counter.lock().unwrap() += 1;
                    (
                        StatusCode::TOO_MANY_REQUESTS,
                        AxumJson(json!({"error": "quota exceeded"})),
                    )
                }
            }),
        );
        let url = spawn_sheet_stub(app).await;

        let client = SheetDbClient::new(url);
        let err = client
            .append_row(&json!({"code": "ACERTIJO-1-abc"}))
            .await
            .unwrap_err();
        match err {
            SheetDbError::Rejected { status, body } => {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                assert!(body.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn empty_sheet_signature_is_detected() {
        assert!(body_reports_empty_sheet(
            r#"{"error":"the sheet is empty, add headers first"}"#
        ));
        assert!(!body_reports_empty_sheet(r#"{"error":"quota exceeded"}"#));
        assert!(!body_reports_empty_sheet(r#"{"created":1}"#));
        assert!(!body_reports_empty_sheet("not json at all"));
    }

    #[test]
    fn header_row_covers_every_column() {
        let row = header_row();
        for column in COLUMNS {
            assert_eq!(row[column], column);
        }
        assert_eq!(row.as_object().unwrap().len(), COLUMNS.len());
    }
}
