//! Image Deletion Gateway function.
//!
//! Endpoint:
//! - POST/DELETE /delete-imagekit - Delete a batch of ImageKit files by
//!   deletion handle, reporting a per-item and aggregate outcome.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::{Deserialize, Serialize};
use shared::http;
use shared::imagekit::DeleteResult;
use shared::{Config, ImageKitClient};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    #[serde(rename = "fileIds", default)]
    file_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    success: bool,
    total: usize,
    deleted: usize,
    failed: usize,
    results: Vec<DeleteResult>,
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
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();

    if method == "OPTIONS" {
        return http::preflight();
    }
    if method != "POST" && method != "DELETE" {
        return http::error_response(405, "Method not allowed");
    }

    let request: DeleteRequest = shared::parse_body!(event.body());
    if request.file_ids.is_empty() {
        return http::error_response(400, "fileIds array is required");
    }

    let private_key = match state.config.imagekit_deletion_key() {
        Ok(key) => key.to_string(),
        Err(e) => return http::failure(&e),
    };

    info!("Deleting {} file(s)", request.file_ids.len());
    let client = ImageKitClient::new(state.http_client.clone(), private_key);
    let summary = client.delete_batch(&request.file_ids).await;

    http::json_response(
        200,
        &DeleteResponse {
            success: true,
            total: summary.total,
            deleted: summary.deleted,
            failed: summary.failed,
            results: summary.results,
        },
    )
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
