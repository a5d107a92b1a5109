//! Alternate ingestion path - ImgBB client.
//!
//! ImgBB accepts base64 payloads and hands back a stable URL, but no
//! deletion handle, so flyers hosted here cannot be cleaned up later.

use base64::Engine;
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

const UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";

#[derive(Debug, Deserialize)]
struct ImgBbResponse {
    success: bool,
    data: Option<ImgBbData>,
}

#[derive(Debug, Deserialize)]
struct ImgBbData {
    url: String,
}

/// Client for the ImgBB upload API.
pub struct ImgBbClient {
    http_client: reqwest::Client,
    api_key: String,
}

impl ImgBbClient {
    pub fn new(http_client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
        }
    }

    /// Upload image bytes, returning the hosted URL.
    pub async fn upload(&self, bytes: Vec<u8>) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);

        let params = [("key", self.api_key.as_str()), ("image", encoded.as_str())];

        let response = self
            .http_client
            .post(UPLOAD_URL)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Upstream(format!(
                "ImgBB upload returned status {}",
                status
            )));
        }

        let body: ImgBbResponse = response.json().await?;
        match body.data {
            Some(data) if body.success => {
                info!("Uploaded image to ImgBB: {}", data.url);
                Ok(data.url)
            }
            _ => Err(Error::Upstream("ImgBB rejected the upload".to_string())),
        }
    }
}
