//! Sheet Data Gateway function - spreadsheet operations over REST.
//!
//! Endpoints:
//! - GET  /sheets/{id}/read?range= - Return the raw cell grid
//! - POST /sheets/{id}/update      - Overwrite a cell range
//! - POST /sheets/{id}/append      - Append rows
//! - GET  /sheets/{id}/info        - Spreadsheet/tab metadata

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde::{Deserialize, Serialize};
use shared::google::{ServiceAccountKey, TokenSource};
use shared::http;
use shared::sheets::{Grid, SheetProperties};
use shared::{Config, SheetsClient};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Body for `update` and `append`.
#[derive(Debug, Deserialize)]
struct WriteRequest {
    range: Option<String>,
    values: Option<Vec<Vec<serde_json::Value>>>,
}

#[derive(Debug, Serialize)]
struct ReadResponse {
    success: bool,
    data: Grid,
    range: String,
    rows_count: usize,
}

#[derive(Debug, Serialize)]
struct WriteResponse {
    success: bool,
    updated_cells: u32,
    updated_rows: u32,
    range: String,
}

#[derive(Debug, Serialize)]
struct InfoResponse {
    success: bool,
    spreadsheet_id: Option<String>,
    title: Option<String>,
    sheets: Vec<SheetProperties>,
}

/// Application state shared across requests.
struct AppState {
    http_client: reqwest::Client,
    config: Config,
}

impl AppState {
    fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config: Config::from_env(),
        }
    }

    /// Credentials are checked per request so a misconfigured function
    /// answers 500 instead of failing to start.
    fn sheets_client(&self) -> shared::Result<SheetsClient> {
        let key = ServiceAccountKey::from_json(self.config.google_credentials_json()?)?;
        Ok(SheetsClient::new(
            self.http_client.clone(),
            TokenSource::new(self.http_client.clone(), key),
        ))
    }
}

/// Split `/sheets/{id}/{action}` into its two path parameters.
fn parse_path(path: &str) -> Option<(&str, &str)> {
    let mut segments = path.trim_matches('/').split('/');
    let mut first = segments.next()?;
    if first == "sheets" {
        first = segments.next()?;
    }
    let action = segments.next()?;
    if first.is_empty() || action.is_empty() || segments.next().is_some() {
        return None;
    }
    Some((first, action))
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str().to_string();
    let path = event.uri().path().to_string();

    if method == "OPTIONS" {
        return http::preflight();
    }

    info!("Sheets request: {} {}", method, path);

    let Some((spreadsheet_id, action)) = parse_path(&path) else {
        return http::error_response(400, "Missing spreadsheet id or action");
    };

    match action {
        "read" => {
            let params = event.query_string_parameters();
            let range = params
                .first("range")
                .map(ToString::to_string)
                .unwrap_or_else(|| state.config.full_range());

            let client = match state.sheets_client() {
                Ok(client) => client,
                Err(e) => return http::failure(&e),
            };

            match client.read(spreadsheet_id, &range).await {
                Ok(grid) => http::json_response(
                    200,
                    &ReadResponse {
                        success: true,
                        rows_count: grid.values.len(),
                        data: grid.values,
                        range,
                    },
                ),
                Err(e) => {
                    error!("Read failed: {}", e);
                    http::failure(&e)
                }
            }
        }

        "update" => {
            if method != "POST" {
                return http::error_response(405, "Method not allowed");
            }

            let request: WriteRequest = shared::parse_body!(event.body());
            let (Some(range), Some(values)) = (request.range, request.values) else {
                return http::error_response(400, "range and values are required");
            };

            let client = match state.sheets_client() {
                Ok(client) => client,
                Err(e) => return http::failure(&e),
            };

            match client.update(spreadsheet_id, &range, &values).await {
                Ok(result) => http::json_response(
                    200,
                    &WriteResponse {
                        success: true,
                        updated_cells: result.updated_cells,
                        updated_rows: result.updated_rows,
                        range,
                    },
                ),
                Err(e) => {
                    error!("Update failed: {}", e);
                    http::failure(&e)
                }
            }
        }

        "append" => {
            if method != "POST" {
                return http::error_response(405, "Method not allowed");
            }

            let request: WriteRequest = shared::parse_body!(event.body());
            let Some(values) = request.values else {
                return http::error_response(400, "values is required");
            };
            let range = request.range.unwrap_or_else(|| state.config.full_range());

            let client = match state.sheets_client() {
                Ok(client) => client,
                Err(e) => return http::failure(&e),
            };

            match client.append(spreadsheet_id, &range, &values).await {
                Ok(result) => http::json_response(
                    200,
                    &WriteResponse {
                        success: true,
                        updated_cells: result.updated_cells,
                        updated_rows: result.updated_rows,
                        range: result.updated_range,
                    },
                ),
                Err(e) => {
                    error!("Append failed: {}", e);
                    http::failure(&e)
                }
            }
        }

        "info" => {
            let client = match state.sheets_client() {
                Ok(client) => client,
                Err(e) => return http::failure(&e),
            };

            match client.info(spreadsheet_id).await {
                Ok(metadata) => http::json_response(
                    200,
                    &InfoResponse {
                        success: true,
                        spreadsheet_id: metadata.spreadsheet_id,
                        title: metadata.title,
                        sheets: metadata.sheets,
                    },
                ),
                Err(e) => {
                    error!("Info failed: {}", e);
                    http::failure(&e)
                }
            }
        }

        _ => http::error_response(404, "Unknown action"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new());

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
