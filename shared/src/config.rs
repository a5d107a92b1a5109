//! Configuration management for the function binaries.

use std::env;

use crate::error::{Error, Result};

/// Application configuration loaded from environment variables.
///
/// Third-party credentials stay optional here; each function surfaces a
/// configuration error at request time when a key it needs is missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backing spreadsheet id
    pub spreadsheet_id: Option<String>,
    /// Tab holding the show rows
    pub sheet_name: String,
    /// Service-account JSON for the Sheets API
    pub google_credentials_json: Option<String>,
    /// ImageKit private API key
    pub imagekit_private_key: Option<String>,
    /// ImageKit public API key
    pub imagekit_public_key: Option<String>,
    /// ImageKit URL endpoint
    pub imagekit_url_endpoint: Option<String>,
    /// ImgBB API key
    pub imgbb_api_key: Option<String>,
    /// Admin panel username
    pub admin_username: String,
    /// Admin panel password
    pub admin_password: String,
    /// Flyer URL prefixes that must be re-hosted on save
    pub rehost_url_prefixes: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            spreadsheet_id: env::var("SPREADSHEET_ID").ok(),
            sheet_name: env::var("SHEET_NAME").unwrap_or_else(|_| "Página1".to_string()),
            google_credentials_json: env::var("GOOGLE_CREDENTIALS_JSON").ok(),
            imagekit_private_key: env::var("IMAGEKIT_PRIVATE_KEY").ok(),
            imagekit_public_key: env::var("IMAGEKIT_PUBLIC_KEY").ok(),
            imagekit_url_endpoint: env::var("IMAGEKIT_URL_ENDPOINT").ok(),
            imgbb_api_key: env::var("IMGBB_API_KEY").ok(),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string()),
            rehost_url_prefixes: parse_prefix_list(
                &env::var("REHOST_URL_PREFIXES").unwrap_or_default(),
            ),
        }
    }

    /// Default read range covering all populated columns of the sheet tab.
    pub fn full_range(&self) -> String {
        format!("{}!A:Z", self.sheet_name)
    }

    pub fn spreadsheet_id(&self) -> Result<&str> {
        self.spreadsheet_id
            .as_deref()
            .ok_or_else(|| Error::Config("SPREADSHEET_ID not set".to_string()))
    }

    pub fn google_credentials_json(&self) -> Result<&str> {
        self.google_credentials_json
            .as_deref()
            .ok_or_else(|| Error::Config("Google credentials not configured".to_string()))
    }

    /// The ImageKit gateways need the full key set.
    pub fn imagekit_private_key(&self) -> Result<&str> {
        match (
            self.imagekit_private_key.as_deref(),
            self.imagekit_public_key.as_deref(),
            self.imagekit_url_endpoint.as_deref(),
        ) {
            (Some(private_key), Some(_), Some(_)) => Ok(private_key),
            _ => Err(Error::Config("ImageKit credentials not configured".to_string())),
        }
    }

    /// Deletion only needs the private key.
    pub fn imagekit_deletion_key(&self) -> Result<&str> {
        self.imagekit_private_key
            .as_deref()
            .ok_or_else(|| Error::Config("ImageKit credentials not configured".to_string()))
    }

    pub fn imgbb_api_key(&self) -> Result<&str> {
        self.imgbb_api_key
            .as_deref()
            .ok_or_else(|| Error::Config("ImgBB API key not configured".to_string()))
    }
}

/// Split a comma-separated prefix list, trimming entries and dropping blanks.
pub fn parse_prefix_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|prefix| prefix.trim().to_string())
        .filter(|prefix| !prefix.is_empty())
        .collect()
}
