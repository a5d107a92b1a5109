//! Sheet Data Gateway - Google Sheets v4 REST client.
//!
//! Translates the `read`/`update`/`append`/`info` actions into
//! spreadsheet API calls. Each call fetches a fresh access token; the
//! gateway holds no state between requests.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::google::TokenSource;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Raw 2-D cell grid as returned by `values.get`.
pub type Grid = Vec<Vec<String>>;

/// `values.get` response.
#[derive(Debug, Deserialize)]
pub struct ValueRange {
    pub range: String,
    #[serde(default)]
    pub values: Grid,
}

/// `values.update` response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    #[serde(default)]
    pub updated_range: String,
    #[serde(default)]
    pub updated_rows: u32,
    #[serde(default)]
    pub updated_cells: u32,
}

/// `values.append` response; the interesting counts live under `updates`.
#[derive(Debug, Deserialize)]
struct AppendResponse {
    #[serde(default)]
    updates: UpdateResult,
}

/// Per-tab properties from `spreadsheets.get`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SheetProperties {
    #[serde(rename(deserialize = "sheetId"))]
    pub sheet_id: Option<i64>,
    pub title: Option<String>,
    pub index: Option<i64>,
    #[serde(rename(deserialize = "sheetType"))]
    pub sheet_type: Option<String>,
    #[serde(rename(deserialize = "gridProperties"))]
    pub grid_properties: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: Option<SheetProperties>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetResponse {
    spreadsheet_id: Option<String>,
    properties: Option<SpreadsheetProperties>,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

/// Spreadsheet metadata returned by [`SheetsClient::info`].
#[derive(Debug)]
pub struct SpreadsheetInfo {
    pub spreadsheet_id: Option<String>,
    pub title: Option<String>,
    pub sheets: Vec<SheetProperties>,
}

/// Error body shape used by Google APIs.
#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: String,
}

/// Client for one spreadsheet store.
pub struct SheetsClient {
    http_client: reqwest::Client,
    token_source: TokenSource,
}

impl SheetsClient {
    pub fn new(http_client: reqwest::Client, token_source: TokenSource) -> Self {
        Self {
            http_client,
            token_source,
        }
    }

    /// Return the raw cell grid for `range`. An empty grid is a valid result.
    pub async fn read(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange> {
        let token = self.token_source.fetch_token().await?;
        let url = format!(
            "{}/{}/values/{}",
            SHEETS_API_BASE,
            spreadsheet_id,
            urlencoding::encode(range)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Overwrite exactly the cells in `range` with `values`.
    pub async fn update(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<serde_json::Value>],
    ) -> Result<UpdateResult> {
        let token = self.token_source.fetch_token().await?;
        let url = format!(
            "{}/{}/values/{}?valueInputOption=RAW",
            SHEETS_API_BASE,
            spreadsheet_id,
            urlencoding::encode(range)
        );

        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&token)
            .json(&serde_json::json!({ "values": values }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let result: UpdateResult = response.json().await?;
        info!(
            "Updated {} cell(s) in {}",
            result.updated_cells, result.updated_range
        );
        Ok(result)
    }

    /// Insert `values` as new rows after the existing data in `range`'s sheet.
    pub async fn append(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<serde_json::Value>],
    ) -> Result<UpdateResult> {
        let token = self.token_source.fetch_token().await?;
        let url = format!(
            "{}/{}/values/{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            SHEETS_API_BASE,
            spreadsheet_id,
            urlencoding::encode(range)
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(&serde_json::json!({ "values": values }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let result: AppendResponse = response.json().await?;
        info!(
            "Appended {} row(s) into {}",
            result.updates.updated_rows, result.updates.updated_range
        );
        Ok(result.updates)
    }

    /// Spreadsheet metadata: id, title and per-tab properties.
    pub async fn info(&self, spreadsheet_id: &str) -> Result<SpreadsheetInfo> {
        let token = self.token_source.fetch_token().await?;
        let url = format!("{}/{}", SHEETS_API_BASE, spreadsheet_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let spreadsheet: SpreadsheetResponse = response.json().await?;
        Ok(SpreadsheetInfo {
            spreadsheet_id: spreadsheet.spreadsheet_id,
            title: spreadsheet.properties.and_then(|p| p.title),
            sheets: spreadsheet
                .sheets
                .into_iter()
                .filter_map(|sheet| sheet.properties)
                .collect(),
        })
    }
}

/// Pull the upstream message out of a Google error body.
async fn upstream_error(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GoogleErrorBody>(&body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| format!("Sheets API returned status {}", status));
    Error::Upstream(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_value_range_is_not_an_error() {
        let parsed: ValueRange =
            serde_json::from_str(r#"{"range":"Página1!A:Z","majorDimension":"ROWS"}"#).unwrap();
        assert!(parsed.values.is_empty());
        assert_eq!(parsed.range, "Página1!A:Z");
    }

    #[test]
    fn test_parse_update_result() {
        let parsed: UpdateResult = serde_json::from_str(
            r#"{"spreadsheetId":"abc","updatedRange":"Página1!A5:G5","updatedRows":1,"updatedColumns":7,"updatedCells":7}"#,
        )
        .unwrap();
        assert_eq!(parsed.updated_rows, 1);
        assert_eq!(parsed.updated_cells, 7);
        assert_eq!(parsed.updated_range, "Página1!A5:G5");
    }

    #[test]
    fn test_parse_append_response() {
        let parsed: AppendResponse = serde_json::from_str(
            r#"{"spreadsheetId":"abc","tableRange":"Página1!A1:G4","updates":{"updatedRange":"Página1!A5:G5","updatedRows":1,"updatedCells":7}}"#,
        )
        .unwrap();
        assert_eq!(parsed.updates.updated_range, "Página1!A5:G5");
    }

    #[test]
    fn test_parse_spreadsheet_metadata() {
        let parsed: SpreadsheetResponse = serde_json::from_str(
            r#"{
                "spreadsheetId": "abc",
                "properties": {"title": "Agenda"},
                "sheets": [
                    {"properties": {"sheetId": 0, "title": "Página1", "index": 0, "sheetType": "GRID", "gridProperties": {"rowCount": 100, "columnCount": 26}}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(parsed.properties.unwrap().title.as_deref(), Some("Agenda"));
        let tab = parsed.sheets[0].properties.as_ref().unwrap();
        assert_eq!(tab.sheet_id, Some(0));
        assert_eq!(tab.title.as_deref(), Some("Página1"));
    }

    #[test]
    fn test_upstream_error_message_extraction() {
        let body =
            r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        let parsed: GoogleErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "The caller does not have permission");
    }
}
