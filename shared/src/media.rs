//! Source image download, shared by both ingestion gateways.

use std::time::Duration;

use crate::error::{Error, Result};

/// Upper bound on the download wait; the only timeout in the system.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Some flyer sources reject requests without a browser-ish agent.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; ImageUploader/1.0)";

/// Fetch the raw bytes of a source image.
///
/// A non-success status from the source is surfaced with that status
/// rather than being folded into a generic server error.
pub async fn fetch_image(http_client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = http_client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(Error::SourceFetch {
            status: response.status().as_u16(),
        });
    }

    Ok(response.bytes().await?.to_vec())
}

/// Generated filename for a re-hosted flyer: timestamp plus random suffix.
pub fn unique_file_name() -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("flyer_{}_{}.jpg", timestamp, &suffix[..8])
}
