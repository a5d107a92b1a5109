//! Alternate Image Ingestion function (ImgBB).
//!
//! Endpoint:
//! - GET /upload-to-imgbb?url= - Download the source image and re-host it
//!   on ImgBB. ImgBB issues no deletion handle, so the response carries
//!   only the hosted URL.

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde::Serialize;
use shared::http;
use shared::media;
use shared::{Config, ImgBbClient};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    url: String,
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
    if method != "GET" {
        return http::error_response(405, "Method not allowed");
    }

    let params = event.query_string_parameters();
    let Some(image_url) = params.first("url").map(ToString::to_string) else {
        return http::error_response(400, "url parameter is required");
    };

    let api_key = match state.config.imgbb_api_key() {
        Ok(key) => key.to_string(),
        Err(e) => return http::failure(&e),
    };

    info!("Ingesting image from {}", image_url);
    let result = async {
        let bytes = media::fetch_image(&state.http_client, &image_url).await?;
        ImgBbClient::new(state.http_client.clone(), api_key)
            .upload(bytes)
            .await
    }
    .await;

    match result {
        Ok(url) => http::json_response(
            200,
            &UploadResponse { success: true, url },
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
