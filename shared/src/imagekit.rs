//! Image Ingestion and Deletion Gateways - ImageKit client.

use base64::Engine;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::media;

const UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";
const FILES_API_BASE: &str = "https://api.imagekit.io/v1/files";

/// Folder every re-hosted flyer lands in.
const FLYER_FOLDER: &str = "/flyers";

/// Host-assigned handle and URLs for an uploaded file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub url: String,
    pub file_id: String,
    pub name: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// ImageKit error body.
#[derive(Debug, Deserialize)]
struct ImageKitError {
    message: Option<String>,
}

/// Classification of a single deletion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The host confirmed removal.
    Deleted,
    /// The host never had the file; the intent is already achieved.
    AlreadyAbsent,
    /// The deletion failed; carries the upstream message.
    Failed(String),
}

/// Per-item entry in a batch deletion response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub file_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeleteResult {
    pub fn from_outcome(file_id: String, outcome: DeleteOutcome) -> Self {
        match outcome {
            DeleteOutcome::Deleted => Self {
                file_id,
                success: true,
                warning: None,
                error: None,
            },
            DeleteOutcome::AlreadyAbsent => Self {
                file_id,
                success: true,
                warning: Some("File not found".to_string()),
                error: None,
            },
            DeleteOutcome::Failed(message) => Self {
                file_id,
                success: false,
                warning: None,
                error: Some(message),
            },
        }
    }

    pub fn empty_handle(file_id: String) -> Self {
        Self {
            file_id,
            success: false,
            warning: None,
            error: Some("Empty file id".to_string()),
        }
    }
}

/// Aggregate batch deletion report.
#[derive(Debug, Serialize)]
pub struct DeleteSummary {
    pub total: usize,
    pub deleted: usize,
    pub failed: usize,
    pub results: Vec<DeleteResult>,
}

impl DeleteSummary {
    pub fn from_results(results: Vec<DeleteResult>) -> Self {
        let deleted = results.iter().filter(|result| result.success).count();
        Self {
            total: results.len(),
            deleted,
            failed: results.len() - deleted,
            results,
        }
    }
}

/// Client for the ImageKit upload and files APIs.
pub struct ImageKitClient {
    http_client: reqwest::Client,
    private_key: String,
}

impl ImageKitClient {
    pub fn new(http_client: reqwest::Client, private_key: impl Into<String>) -> Self {
        Self {
            http_client,
            private_key: private_key.into(),
        }
    }

    fn auth_header(&self) -> String {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{}:", self.private_key));
        format!("Basic {}", encoded)
    }

    /// Upload image bytes under the flyer folder, returning the hosted
    /// URL and the deletion handle.
    pub async fn upload(&self, bytes: Vec<u8>, file_name: &str) -> Result<UploadedFile> {
        let file_part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("fileName", file_name.to_string())
            .text("folder", FLYER_FOLDER);

        let response = self
            .http_client
            .post(UPLOAD_URL)
            .header("Authorization", self.auth_header())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ImageKitError>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| format!("ImageKit upload returned status {}", status));
            error!("ImageKit upload failed: {}", message);
            return Err(Error::Upstream(message));
        }

        let uploaded: UploadedFile = response.json().await?;
        info!(
            "Uploaded {} to ImageKit as file {}",
            file_name, uploaded.file_id
        );
        Ok(uploaded)
    }

    /// Download a source image and re-host it under a generated filename.
    pub async fn ingest_from_url(&self, source_url: &str) -> Result<UploadedFile> {
        info!("Downloading image from {}", source_url);
        let bytes = media::fetch_image(&self.http_client, source_url).await?;
        let file_name = media::unique_file_name();
        self.upload(bytes, &file_name).await
    }

    /// Delete a single file, classifying the host's answer.
    ///
    /// Never returns an error: transport faults become `Failed` so a
    /// batch can keep going.
    pub async fn delete_file(&self, file_id: &str) -> DeleteOutcome {
        let url = format!("{}/{}", FILES_API_BASE, urlencoding::encode(file_id));

        let response = match self
            .http_client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return DeleteOutcome::Failed(e.to_string()),
        };

        let status = response.status().as_u16();
        match status {
            204 => DeleteOutcome::Deleted,
            404 => {
                warn!("File {} not found on ImageKit (already deleted?)", file_id);
                DeleteOutcome::AlreadyAbsent
            }
            _ => {
                let message = response
                    .json::<ImageKitError>()
                    .await
                    .ok()
                    .and_then(|body| body.message)
                    .unwrap_or_else(|| format!("Status {}", status));
                error!("Failed to delete file {}: {}", file_id, message);
                DeleteOutcome::Failed(message)
            }
        }
    }

    /// Delete a batch of handles one at a time, in order.
    ///
    /// Every handle gets exactly one result; a failing item never
    /// aborts the rest of the batch.
    pub async fn delete_batch(&self, file_ids: &[String]) -> DeleteSummary {
        let mut results = Vec::with_capacity(file_ids.len());

        for file_id in file_ids {
            if file_id.trim().is_empty() {
                results.push(DeleteResult::empty_handle(file_id.clone()));
                continue;
            }

            let outcome = self.delete_file(file_id).await;
            results.push(DeleteResult::from_outcome(file_id.clone(), outcome));
        }

        let summary = DeleteSummary::from_results(results);
        info!(
            "Batch delete: {} deleted, {} failed of {}",
            summary.deleted, summary.failed, summary.total
        );
        summary
    }
}
