//! Admin Workflow - the create/update/soft-delete state machine.
//!
//! The panel's state is an explicit FSM with a pure transition
//! function. Saving is a compensating-action sequence: the flyer plan
//! is computed up front, the old asset deletion is best-effort (its
//! failure becomes a user-visible notice, never an abort), and there is
//! no rollback if a later step fails.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::imagekit::{DeleteOutcome, ImageKitClient};
use crate::sheets::SheetsClient;
use crate::shows::{self, Show};

/// Admin panel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminState {
    Idle,
    Editing { row: usize },
}

/// Events the panel reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminEvent {
    Edit { row: usize },
    Cancel,
    Submit,
    SoftDelete,
}

/// Pure transition function: current state + event -> next state.
pub fn transition(state: AdminState, event: AdminEvent) -> AdminState {
    match (state, event) {
        (_, AdminEvent::Edit { row }) => AdminState::Editing { row },
        (_, AdminEvent::Cancel) => AdminState::Idle,
        (_, AdminEvent::Submit) => AdminState::Idle,
        (_, AdminEvent::SoftDelete) => AdminState::Idle,
    }
}

/// Editable form values; dates are in `YYYY-MM-DD` form format.
#[derive(Debug, Clone, Deserialize)]
pub struct ShowForm {
    pub artista: String,
    pub data_inicio: String,
    #[serde(default)]
    pub data_fim: String,
    pub local: String,
    #[serde(default)]
    pub cidade: String,
    #[serde(default)]
    pub flyer: String,
    #[serde(default)]
    pub file_id: String,
}

impl ShowForm {
    /// Pre-populate the form from a stored record, converting the
    /// sheet's dates to the editable format.
    pub fn from_show(show: &Show) -> Self {
        Self {
            artista: show.artista.clone(),
            data_inicio: shows::br_to_iso(&show.data_inicio).unwrap_or_default(),
            data_fim: shows::br_to_iso(&show.data_fim).unwrap_or_default(),
            local: show.local.clone(),
            cidade: show.cidade.clone(),
            flyer: show.flyer.clone(),
            file_id: show.file_id.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("artista", &self.artista),
            ("data_inicio", &self.data_inicio),
            ("local", &self.local),
            ("cidade", &self.cidade),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("{} is required", field)));
            }
        }

        if shows::iso_to_br(&self.data_inicio).is_none() {
            return Err(Error::Validation("data_inicio is not a valid date".to_string()));
        }
        if !self.data_fim.trim().is_empty() && shows::iso_to_br(&self.data_fim).is_none() {
            return Err(Error::Validation("data_fim is not a valid date".to_string()));
        }

        Ok(())
    }
}

/// What the sheet currently holds for the record being edited.
#[derive(Debug, Clone)]
pub struct EditContext {
    pub row: usize,
    pub stored_flyer: String,
    pub stored_file_id: String,
}

/// A create (editing = None) or update request.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub editing: Option<EditContext>,
    pub form: ShowForm,
}

/// Outcome of a save, including the notices shown to the user.
#[derive(Debug, Serialize)]
pub struct SaveReport {
    pub updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    pub flyer: String,
    pub file_id: String,
    pub notices: Vec<String>,
}

/// The flyer-handling part of a save, computed before any call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlyerPlan {
    /// Handle of the previous asset to delete, when the flyer changed.
    pub delete_old: Option<String>,
    /// Whether the submitted URL must go through the ingestion gateway.
    pub rehost: bool,
    /// Handle to carry over when the flyer is unchanged.
    pub retain_file_id: Option<String>,
}

/// Does this URL match one of the configured "needs re-hosting" prefixes?
pub fn needs_rehost(url: &str, prefixes: &[String]) -> bool {
    !url.is_empty() && prefixes.iter().any(|prefix| url.starts_with(prefix.as_str()))
}

/// Steps 1-3 of the save algorithm as a pure computation.
pub fn plan_flyer(
    editing: Option<&EditContext>,
    flyer: &str,
    prefixes: &[String],
) -> FlyerPlan {
    let delete_old = editing.and_then(|ctx| {
        let has_handle = !ctx.stored_file_id.trim().is_empty();
        (has_handle && flyer != ctx.stored_flyer).then(|| ctx.stored_file_id.clone())
    });

    let rehost = needs_rehost(flyer, prefixes);

    let retain_file_id = if rehost {
        None
    } else {
        editing.and_then(|ctx| (flyer == ctx.stored_flyer).then(|| ctx.stored_file_id.clone()))
    };

    FlyerPlan {
        delete_old,
        rehost,
        retain_file_id,
    }
}

/// A re-hosted flyer: canonical URL plus deletion handle.
#[derive(Debug, Clone)]
pub struct HostedFlyer {
    pub url: String,
    pub file_id: String,
}

/// Persistence seam for the backing sheet.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    async fn append_row(&self, values: Vec<String>) -> Result<()>;
    async fn update_row(&self, row: usize, values: Vec<String>) -> Result<()>;
    async fn update_start_date(&self, row: usize, date_br: &str) -> Result<()>;
}

/// Image host seam used by the save sequence.
#[allow(async_fn_in_trait)]
pub trait FlyerHost {
    async fn rehost(&self, source_url: &str) -> Result<HostedFlyer>;
    async fn delete(&self, file_id: &str) -> DeleteOutcome;
}

/// Execute a create/update save.
///
/// After a successful save at most one live re-hosted asset is
/// attributed to the record. A crash between the old-asset deletion and
/// the final write can still orphan a fresh upload; that gap is
/// reported, not rolled back.
pub async fn save_show<S: RecordStore, H: FlyerHost>(
    store: &S,
    host: &H,
    prefixes: &[String],
    request: SaveRequest,
) -> Result<SaveReport> {
    request.form.validate()?;

    let mut flyer = request.form.flyer.trim().to_string();
    let mut file_id = request.form.file_id.trim().to_string();
    let mut notices = Vec::new();

    let plan = plan_flyer(request.editing.as_ref(), &flyer, prefixes);

    if let Some(old_id) = &plan.delete_old {
        match host.delete(old_id).await {
            DeleteOutcome::Deleted | DeleteOutcome::AlreadyAbsent => {
                info!("Removed previous flyer asset {}", old_id);
                notices.push("Previous flyer removed from the image host".to_string());
            }
            DeleteOutcome::Failed(message) => {
                warn!("Could not remove previous flyer asset {}: {}", old_id, message);
                notices.push(format!("Could not remove the previous flyer: {}", message));
            }
        }
        // The old handle must never be persisted again, even when the
        // deletion failed.
        file_id.clear();
    }

    if plan.rehost {
        let hosted = host.rehost(&flyer).await?;
        notices.push("Flyer re-hosted on the image host".to_string());
        flyer = hosted.url;
        file_id = hosted.file_id;
    } else if let Some(retained) = plan.retain_file_id {
        file_id = retained;
    }

    let values = row_values(&request.form, &flyer, &file_id)?;

    let (updated, row) = match &request.editing {
        Some(ctx) => {
            store.update_row(ctx.row, values).await?;
            (true, Some(ctx.row))
        }
        None => {
            store.append_row(values).await?;
            (false, None)
        }
    };

    Ok(SaveReport {
        updated,
        row,
        flyer,
        file_id,
        notices,
    })
}

/// Soft delete: rewrite only the start-date cell to yesterday so the
/// public filter hides the record. Other columns, including any
/// re-hosted flyer, are left untouched.
pub async fn soft_delete<S: RecordStore>(
    store: &S,
    row: usize,
    today: NaiveDate,
) -> Result<String> {
    // Row 1 is the header; data rows start at 2.
    if row < 2 {
        return Err(Error::Validation(format!("Row {} is not a data row", row)));
    }

    let date = yesterday_br(today);
    store.update_start_date(row, &date).await?;
    info!("Soft-deleted row {}: start date set to {}", row, date);
    Ok(date)
}

/// Yesterday in the sheet's `DD/MM/YYYY` format.
pub fn yesterday_br(today: NaiveDate) -> String {
    shows::format_date_br(today - Duration::days(1))
}

/// Columns A..G of one sheet row, converting dates back to BR format.
fn row_values(form: &ShowForm, flyer: &str, file_id: &str) -> Result<Vec<String>> {
    let data_inicio = shows::iso_to_br(&form.data_inicio)
        .ok_or_else(|| Error::Validation("data_inicio is not a valid date".to_string()))?;

    let data_fim = if form.data_fim.trim().is_empty() {
        String::new()
    } else {
        shows::iso_to_br(&form.data_fim)
            .ok_or_else(|| Error::Validation("data_fim is not a valid date".to_string()))?
    };

    Ok(vec![
        form.artista.clone(),
        data_inicio,
        data_fim,
        form.local.clone(),
        form.cidade.clone(),
        flyer.to_string(),
        file_id.to_string(),
    ])
}

/// [`RecordStore`] backed by the Sheet Data Gateway.
pub struct SheetStore {
    client: SheetsClient,
    spreadsheet_id: String,
    sheet_name: String,
}

impl SheetStore {
    pub fn new(client: SheetsClient, spreadsheet_id: String, sheet_name: String) -> Self {
        Self {
            client,
            spreadsheet_id,
            sheet_name,
        }
    }

    pub fn client(&self) -> &SheetsClient {
        &self.client
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn data_range(&self) -> String {
        format!("{}!A:G", self.sheet_name)
    }

    fn row_range(&self, row: usize) -> String {
        format!("{}!A{}:G{}", self.sheet_name, row, row)
    }

    // data_inicio lives in column B.
    fn start_date_range(&self, row: usize) -> String {
        format!("{}!B{}:B{}", self.sheet_name, row, row)
    }
}

fn to_json_row(values: Vec<String>) -> Vec<Vec<serde_json::Value>> {
    vec![values.into_iter().map(serde_json::Value::String).collect()]
}

impl RecordStore for SheetStore {
    async fn append_row(&self, values: Vec<String>) -> Result<()> {
        self.client
            .append(&self.spreadsheet_id, &self.data_range(), &to_json_row(values))
            .await?;
        Ok(())
    }

    async fn update_row(&self, row: usize, values: Vec<String>) -> Result<()> {
        self.client
            .update(&self.spreadsheet_id, &self.row_range(row), &to_json_row(values))
            .await?;
        Ok(())
    }

    async fn update_start_date(&self, row: usize, date_br: &str) -> Result<()> {
        self.client
            .update(
                &self.spreadsheet_id,
                &self.start_date_range(row),
                &to_json_row(vec![date_br.to_string()]),
            )
            .await?;
        Ok(())
    }
}

impl FlyerHost for ImageKitClient {
    async fn rehost(&self, source_url: &str) -> Result<HostedFlyer> {
        let uploaded = self.ingest_from_url(source_url).await?;
        Ok(HostedFlyer {
            url: uploaded.url,
            file_id: uploaded.file_id,
        })
    }

    async fn delete(&self, file_id: &str) -> DeleteOutcome {
        self.delete_file(file_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum StoreCall {
        Append(Vec<String>),
        Update(usize, Vec<String>),
        StartDate(usize, String),
    }

    #[derive(Default)]
    struct MockStore {
        calls: Mutex<Vec<StoreCall>>,
    }

    impl MockStore {
        fn calls(&self) -> Vec<StoreCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RecordStore for MockStore {
        async fn append_row(&self, values: Vec<String>) -> Result<()> {
            self.calls.lock().unwrap().push(StoreCall::Append(values));
            Ok(())
        }

        async fn update_row(&self, row: usize, values: Vec<String>) -> Result<()> {
            self.calls.lock().unwrap().push(StoreCall::Update(row, values));
            Ok(())
        }

        async fn update_start_date(&self, row: usize, date_br: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(StoreCall::StartDate(row, date_br.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockHost {
        rehosts: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
        fail_delete: bool,
    }

    impl FlyerHost for MockHost {
        async fn rehost(&self, source_url: &str) -> Result<HostedFlyer> {
            self.rehosts.lock().unwrap().push(source_url.to_string());
            Ok(HostedFlyer {
                url: format!("https://ik.example/flyers/{}", source_url.len()),
                file_id: "new-id".to_string(),
            })
        }

        async fn delete(&self, file_id: &str) -> DeleteOutcome {
            self.deletes.lock().unwrap().push(file_id.to_string());
            if self.fail_delete {
                DeleteOutcome::Failed("Status 500".to_string())
            } else {
                DeleteOutcome::Deleted
            }
        }
    }

    fn form(flyer: &str, file_id: &str) -> ShowForm {
        ShowForm {
            artista: "Ana".to_string(),
            data_inicio: "2030-03-01".to_string(),
            data_fim: String::new(),
            local: "Teatro".to_string(),
            cidade: "Recife".to_string(),
            flyer: flyer.to_string(),
            file_id: file_id.to_string(),
        }
    }

    fn editing(row: usize, flyer: &str, file_id: &str) -> EditContext {
        EditContext {
            row,
            stored_flyer: flyer.to_string(),
            stored_file_id: file_id.to_string(),
        }
    }

    #[test]
    fn test_transitions() {
        assert_eq!(
            transition(AdminState::Idle, AdminEvent::Edit { row: 4 }),
            AdminState::Editing { row: 4 }
        );
        assert_eq!(
            transition(AdminState::Editing { row: 4 }, AdminEvent::Cancel),
            AdminState::Idle
        );
        assert_eq!(
            transition(AdminState::Editing { row: 4 }, AdminEvent::Submit),
            AdminState::Idle
        );
        assert_eq!(transition(AdminState::Idle, AdminEvent::Submit), AdminState::Idle);
        assert_eq!(
            transition(AdminState::Editing { row: 4 }, AdminEvent::SoftDelete),
            AdminState::Idle
        );
    }

    #[test]
    fn test_needs_rehost() {
        let prefixes = vec!["https://redirect.example/".to_string()];
        assert!(needs_rehost("https://redirect.example/img.jpg", &prefixes));
        assert!(!needs_rehost("https://stable.example/img.jpg", &prefixes));
        assert!(!needs_rehost("", &prefixes));
        assert!(!needs_rehost("https://redirect.example/img.jpg", &[]));
    }

    #[test]
    fn test_plan_unchanged_flyer_retains_handle() {
        let ctx = editing(5, "https://stable.example/a.jpg", "abc123");
        let plan = plan_flyer(Some(&ctx), "https://stable.example/a.jpg", &[]);
        assert_eq!(plan.delete_old, None);
        assert!(!plan.rehost);
        assert_eq!(plan.retain_file_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_plan_changed_flyer_deletes_old() {
        let ctx = editing(5, "https://stable.example/a.jpg", "abc123");
        let plan = plan_flyer(Some(&ctx), "https://stable.example/b.jpg", &[]);
        assert_eq!(plan.delete_old.as_deref(), Some("abc123"));
        assert_eq!(plan.retain_file_id, None);
    }

    #[test]
    fn test_plan_no_handle_no_delete() {
        let ctx = editing(5, "https://stable.example/a.jpg", "  ");
        let plan = plan_flyer(Some(&ctx), "https://stable.example/b.jpg", &[]);
        assert_eq!(plan.delete_old, None);
    }

    #[tokio::test]
    async fn test_save_unchanged_flyer_preserves_handle() {
        let store = MockStore::default();
        let host = MockHost::default();

        let request = SaveRequest {
            editing: Some(editing(5, "https://stable.example/a.jpg", "abc123")),
            form: form("https://stable.example/a.jpg", "abc123"),
        };

        let report = save_show(&store, &host, &[], request).await.unwrap();

        // The ingestion gateway is never invoked and the handle survives.
        assert!(host.rehosts.lock().unwrap().is_empty());
        assert!(host.deletes.lock().unwrap().is_empty());
        assert_eq!(report.file_id, "abc123");
        assert!(report.updated);

        let calls = store.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            StoreCall::Update(row, values) => {
                assert_eq!(*row, 5);
                assert_eq!(values[1], "01/03/2030");
                assert_eq!(values[6], "abc123");
            }
            other => panic!("Unexpected call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_rehosts_matching_prefix() {
        let store = MockStore::default();
        let host = MockHost::default();
        let prefixes = vec!["https://redirect.example/".to_string()];

        let request = SaveRequest {
            editing: None,
            form: form("https://redirect.example/img.jpg", ""),
        };

        let report = save_show(&store, &host, &prefixes, request).await.unwrap();

        assert_eq!(host.rehosts.lock().unwrap().len(), 1);
        assert_eq!(report.file_id, "new-id");
        assert!(report.flyer.starts_with("https://ik.example/"));
        assert!(!report.updated);
        assert!(matches!(store.calls()[0], StoreCall::Append(_)));
    }

    #[tokio::test]
    async fn test_save_deletes_old_asset_before_rehost() {
        let store = MockStore::default();
        let host = MockHost::default();
        let prefixes = vec!["https://redirect.example/".to_string()];

        let request = SaveRequest {
            editing: Some(editing(3, "https://ik.example/flyers/old.jpg", "old-id")),
            form: form("https://redirect.example/new.jpg", "old-id"),
        };

        let report = save_show(&store, &host, &prefixes, request).await.unwrap();

        assert_eq!(*host.deletes.lock().unwrap(), vec!["old-id".to_string()]);
        assert_eq!(report.file_id, "new-id");
    }

    #[tokio::test]
    async fn test_delete_failure_is_a_notice_not_an_abort() {
        let store = MockStore::default();
        let host = MockHost {
            fail_delete: true,
            ..Default::default()
        };

        let request = SaveRequest {
            editing: Some(editing(3, "https://ik.example/flyers/old.jpg", "old-id")),
            form: form("https://stable.example/new.jpg", "old-id"),
        };

        let report = save_show(&store, &host, &[], request).await.unwrap();

        // Save went through, the stale handle was cleared anyway.
        assert_eq!(store.calls().len(), 1);
        assert_eq!(report.file_id, "");
        assert!(report
            .notices
            .iter()
            .any(|notice| notice.contains("Could not remove")));
    }

    #[tokio::test]
    async fn test_save_rejects_missing_fields() {
        let store = MockStore::default();
        let host = MockHost::default();

        let mut bad = form("", "");
        bad.artista = "   ".to_string();

        let result = save_show(
            &store,
            &host,
            &[],
            SaveRequest {
                editing: None,
                form: bad,
            },
        )
        .await;

        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_soft_delete_rewrites_only_start_date() {
        let store = MockStore::default();
        let today = NaiveDate::from_ymd_opt(2030, 3, 2).unwrap();

        let date = soft_delete(&store, 5, today).await.unwrap();

        assert_eq!(date, "01/03/2030");
        assert_eq!(
            store.calls(),
            vec![StoreCall::StartDate(5, "01/03/2030".to_string())]
        );
    }

    #[tokio::test]
    async fn test_soft_delete_rejects_header_row() {
        let store = MockStore::default();
        let today = NaiveDate::from_ymd_opt(2030, 3, 2).unwrap();

        // Row 1 holds the header and row 0 is not a valid sheet row;
        // neither may reach the store.
        assert!(matches!(
            soft_delete(&store, 1, today).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            soft_delete(&store, 0, today).await,
            Err(Error::Validation(_))
        ));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_yesterday_crosses_month_and_year() {
        assert_eq!(
            yesterday_br(NaiveDate::from_ymd_opt(2030, 3, 1).unwrap()),
            "28/02/2030"
        );
        assert_eq!(
            yesterday_br(NaiveDate::from_ymd_opt(2031, 1, 1).unwrap()),
            "31/12/2030"
        );
    }

    #[test]
    fn test_sheet_store_ranges() {
        let store = SheetStore {
            client: sheet_client(),
            spreadsheet_id: "abc".to_string(),
            sheet_name: "Página1".to_string(),
        };

        assert_eq!(store.data_range(), "Página1!A:G");
        assert_eq!(store.row_range(5), "Página1!A5:G5");
        assert_eq!(store.start_date_range(5), "Página1!B5:B5");
    }

    #[test]
    fn test_form_round_trip_from_show() {
        let show = Show {
            linha: 5,
            artista: "Ana".to_string(),
            data_inicio: "01/03/2030".to_string(),
            data_fim: "02/03/2030".to_string(),
            local: "Teatro".to_string(),
            cidade: "Recife".to_string(),
            flyer: "https://ik.example/a.jpg".to_string(),
            file_id: "abc123".to_string(),
        };

        let form = ShowForm::from_show(&show);
        assert_eq!(form.data_inicio, "2030-03-01");
        assert_eq!(form.data_fim, "2030-03-02");
        assert_eq!(form.file_id, "abc123");
    }

    fn sheet_client() -> SheetsClient {
        let key = crate::google::ServiceAccountKey::from_json(
            r#"{"client_email":"bot@test","private_key":"key"}"#,
        )
        .unwrap();
        SheetsClient::new(
            reqwest::Client::new(),
            crate::google::TokenSource::new(reqwest::Client::new(), key),
        )
    }
}
