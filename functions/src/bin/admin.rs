//! Admin Panel function.
//!
//! Endpoints:
//! - POST   /admin/login       - Check panel credentials.
//! - POST   /admin/shows       - Create a show, re-hosting its flyer when needed.
//! - POST   /admin/shows/{row} - Update the show stored at the given sheet row.
//! - DELETE /admin/shows/{row} - Soft-delete the show at the given sheet row.

use chrono::Local;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::{Deserialize, Serialize};
use shared::google::{ServiceAccountKey, TokenSource};
use shared::http;
use shared::imagekit::DeleteOutcome;
use shared::workflow::{
    soft_delete, save_show, EditContext, FlyerHost, HostedFlyer, SheetStore,
};
use shared::{Config, ImageKitClient, SaveReport, SaveRequest, SheetsClient, ShowForm};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    success: bool,
}

#[derive(Debug, Serialize)]
struct SaveResponse {
    success: bool,
    #[serde(flatten)]
    report: SaveReport,
}

#[derive(Debug, Serialize)]
struct SoftDeleteResponse {
    success: bool,
    row: usize,
    data_inicio: String,
}

/// Image host used by the save sequence. Saves that never touch a
/// flyer must keep working without ImageKit credentials, so the
/// missing-key error is deferred to the first call that needs them.
enum AdminHost {
    ImageKit(ImageKitClient),
    Unconfigured,
}

impl FlyerHost for AdminHost {
    async fn rehost(&self, source_url: &str) -> shared::Result<HostedFlyer> {
        match self {
            AdminHost::ImageKit(client) => {
                let uploaded = client.ingest_from_url(source_url).await?;
                Ok(HostedFlyer {
                    url: uploaded.url,
                    file_id: uploaded.file_id,
                })
            }
            AdminHost::Unconfigured => Err(shared::Error::Config(
                "ImageKit credentials not configured".to_string(),
            )),
        }
    }

    async fn delete(&self, file_id: &str) -> DeleteOutcome {
        match self {
            AdminHost::ImageKit(client) => client.delete_file(file_id).await,
            AdminHost::Unconfigured => {
                warn!("Skipping deletion of {}: ImageKit credentials not configured", file_id);
                DeleteOutcome::Failed("ImageKit credentials not configured".to_string())
            }
        }
    }
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

    fn sheet_store(&self) -> shared::Result<SheetStore> {
        let spreadsheet_id = self.config.spreadsheet_id()?.to_string();
        let key = ServiceAccountKey::from_json(self.config.google_credentials_json()?)?;
        let client = SheetsClient::new(
            self.http_client.clone(),
            TokenSource::new(self.http_client.clone(), key),
        );
        Ok(SheetStore::new(
            client,
            spreadsheet_id,
            self.config.sheet_name.clone(),
        ))
    }

    fn flyer_host(&self) -> AdminHost {
        match self.config.imagekit_private_key() {
            Ok(key) => {
                AdminHost::ImageKit(ImageKitClient::new(self.http_client.clone(), key))
            }
            Err(_) => AdminHost::Unconfigured,
        }
    }
}

/// Admin routes, after the optional `/admin` prefix.
#[derive(Debug, PartialEq, Eq)]
enum Route {
    Login,
    Shows,
    Show(usize),
}

fn parse_path(path: &str) -> Option<Route> {
    let mut segments = path.trim_matches('/').split('/');
    let mut first = segments.next()?;
    if first == "admin" {
        first = segments.next()?;
    }
    match (first, segments.next(), segments.next()) {
        ("login", None, None) => Some(Route::Login),
        ("shows", None, None) => Some(Route::Shows),
        ("shows", Some(row), None) => row.parse().ok().map(Route::Show),
        _ => None,
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str().to_string();
    let path = event.uri().path().to_string();

    if method == "OPTIONS" {
        return http::preflight();
    }

    let Some(route) = parse_path(&path) else {
        return http::error_response(404, "Not found");
    };

    match (method.as_str(), route) {
        ("POST", Route::Login) => {
            let request: LoginRequest = shared::parse_body!(event.body());
            if request.username == state.config.admin_username
                && request.password == state.config.admin_password
            {
                info!("Admin login accepted for {}", request.username);
                http::json_response(200, &LoginResponse { success: true })
            } else {
                warn!("Admin login rejected for {}", request.username);
                http::error_response(401, "Invalid credentials")
            }
        }
        ("POST", Route::Shows) => {
            let form: ShowForm = shared::parse_body!(event.body());
            save(state, SaveRequest { editing: None, form }).await
        }
        ("POST", Route::Show(row)) => {
            let form: ShowForm = shared::parse_body!(event.body());
            let editing = match load_edit_context(&state, row).await {
                Ok(context) => context,
                Err(e) => return http::failure(&e),
            };
            save(
                state,
                SaveRequest {
                    editing: Some(editing),
                    form,
                },
            )
            .await
        }
        ("DELETE", Route::Show(row)) => {
            // Same existence check as the update path: a row with no
            // record answers 404 instead of rewriting arbitrary cells.
            if let Err(e) = load_edit_context(&state, row).await {
                return http::failure(&e);
            }
            let store = match state.sheet_store() {
                Ok(store) => store,
                Err(e) => return http::failure(&e),
            };
            match soft_delete(&store, row, Local::now().date_naive()).await {
                Ok(date) => http::json_response(
                    200,
                    &SoftDeleteResponse {
                        success: true,
                        row,
                        data_inicio: date,
                    },
                ),
                Err(e) => {
                    error!("Soft delete of row {} failed: {}", row, e);
                    http::failure(&e)
                }
            }
        }
        _ => http::error_response(405, "Method not allowed"),
    }
}

async fn save(state: Arc<AppState>, request: SaveRequest) -> Result<Response<Body>, Error> {
    let store = match state.sheet_store() {
        Ok(store) => store,
        Err(e) => return http::failure(&e),
    };
    let host = state.flyer_host();

    match save_show(&store, &host, &state.config.rehost_url_prefixes, request).await {
        Ok(report) => http::json_response(
            200,
            &SaveResponse {
                success: true,
                report,
            },
        ),
        Err(e) => {
            error!("Save failed: {}", e);
            http::failure(&e)
        }
    }
}

/// Look up the stored flyer columns for the row about to be updated.
/// The handle on the sheet, not the one echoed back by the client, is
/// what the save sequence deletes against.
async fn load_edit_context(state: &AppState, row: usize) -> shared::Result<EditContext> {
    let spreadsheet_id = state.config.spreadsheet_id()?.to_string();
    let key = ServiceAccountKey::from_json(state.config.google_credentials_json()?)?;
    let client = SheetsClient::new(
        state.http_client.clone(),
        TokenSource::new(state.http_client.clone(), key),
    );

    let value_range = client
        .read(&spreadsheet_id, &state.config.full_range())
        .await?;
    let shows = shared::shows::map_rows(&value_range.values);

    shows
        .into_iter()
        .find(|show| show.linha == row)
        .map(|show| EditContext {
            row,
            stored_flyer: show.flyer,
            stored_file_id: show.file_id,
        })
        .ok_or_else(|| shared::Error::NotFound(format!("No show at row {}", row)))
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
