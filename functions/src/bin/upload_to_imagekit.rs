//! Image Ingestion Gateway function.
//!
//! Endpoint:
//! - GET/POST /upload-to-imagekit?url= - Download the source image and
//!   re-host it on ImageKit, returning the hosted URL and deletion handle.

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde::Serialize;
use shared::http;
use shared::{Config, ImageKitClient};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    success: bool,
    url: String,
    file_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail_url: Option<String>,
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
    if method != "GET" && method != "POST" {
        return http::error_response(405, "Method not allowed");
    }

    let params = event.query_string_parameters();
    let Some(image_url) = params.first("url").map(ToString::to_string) else {
        return http::error_response(400, "url parameter is required");
    };

    let private_key = match state.config.imagekit_private_key() {
        Ok(key) => key.to_string(),
        Err(e) => return http::failure(&e),
    };

    info!("Ingesting image from {}", image_url);
    let client = ImageKitClient::new(state.http_client.clone(), private_key);

    match client.ingest_from_url(&image_url).await {
        Ok(uploaded) => http::json_response(
            200,
            &UploadResponse {
                success: true,
                url: uploaded.url,
                file_id: uploaded.file_id,
                name: uploaded.name,
                thumbnail_url: uploaded.thumbnail_url,
            },
        ),
        Err(e) => {
            error!("Ingestion failed: {}", e);
            http::failure(&e)
        }
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
