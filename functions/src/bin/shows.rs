//! Show Listing function.
//!
//! Endpoint:
//! - GET /shows            - Upcoming shows, sorted for public display.
//! - GET /shows?view=admin - Every row, sorted, including past shows.

use chrono::Local;
use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde::Serialize;
use shared::google::{ServiceAccountKey, TokenSource};
use shared::http;
use shared::shows::{self, Show};
use shared::{Config, SheetsClient};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct ListResponse {
    success: bool,
    count: usize,
    data: Vec<Show>,
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

    fn sheets_client(&self) -> shared::Result<SheetsClient> {
        let key = ServiceAccountKey::from_json(self.config.google_credentials_json()?)?;
        Ok(SheetsClient::new(
            self.http_client.clone(),
            TokenSource::new(self.http_client.clone(), key),
        ))
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
    let admin_view = params.first("view") == Some("admin");

    let result = async {
        let spreadsheet_id = state.config.spreadsheet_id()?;
        let client = state.sheets_client()?;
        let range = state.config.full_range();
        let value_range = client.read(spreadsheet_id, &range).await?;
        Ok::<_, shared::Error>(value_range.values)
    }
    .await;

    let grid = match result {
        Ok(grid) => grid,
        Err(e) => {
            error!("Failed to read shows: {}", e);
            return http::failure(&e);
        }
    };

    let mut all = shows::map_rows(&grid);
    shows::sort_shows(&mut all);

    let data = if admin_view {
        all
    } else {
        shows::upcoming(all, Local::now().date_naive())
    };

    info!("Returning {} show(s) (admin view: {})", data.len(), admin_view);
    http::json_response(
        200,
        &ListResponse {
            success: true,
            count: data.len(),
            data,
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
