//! Bulk import of registration exports.

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use checkin_core::event::{parse_registration, EventRegistration};
use checkin_core::storage::{BulkResult, TableError};

use crate::state::AppState;

/// Header of the column holding attendee names.
const NAME_HEADER: &str = "Name";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read registration export: {0}")]
    Csv(#[from] csv::Error),
    #[error("Export has no info column; expected a header like 'name/company/email/phone'")]
    MissingInfoColumn,
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Outcome of importing one export.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub event_code: String,
    /// Rows that yielded a registration.
    pub parsed: usize,
    /// Rows dropped for lacking a phone number.
    pub skipped: usize,
    pub written: usize,
    pub superseded: usize,
    pub cancelled: bool,
    pub unwritten: Vec<EventRegistration>,
}

impl ImportSummary {
    fn new(event_code: &str, parsed: usize, skipped: usize, result: BulkResult<EventRegistration>) -> Self {
        Self {
            event_code: event_code.to_string(),
            parsed,
            skipped,
            written: result.written,
            superseded: result.superseded,
            cancelled: result.cancelled,
            unwritten: result.unwritten,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.unwritten.is_empty() && !self.cancelled
    }
}

/// Parses a CSV export into registrations for `event_code`.
///
/// Columns are found by header: `Name` holds the attendee name (optional),
/// and the first header containing `/` holds the `name/company/email/phone`
/// answer. Returns the registrations and the number of rows skipped.
pub fn parse_export(
    event_code: &str,
    content: &str,
) -> Result<(Vec<EventRegistration>, usize), ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?;
    let name_column = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(NAME_HEADER));
    let info_column = headers
        .iter()
        .position(|h| h.contains('/'))
        .ok_or(ImportError::MissingInfoColumn)?;

    let mut registrations = Vec::new();
    let mut skipped = 0;
    for row in reader.records() {
        let row = row?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let name = name_column.and_then(|i| row.get(i));
        let info = row.get(info_column).unwrap_or_default();
        match parse_registration(event_code, name, info) {
            Some(registration) => registrations.push(registration),
            None => skipped += 1,
        }
    }
    Ok((registrations, skipped))
}

/// Imports an export's registrations with the bulk writer.
pub async fn import_registrations(
    state: &AppState,
    event_code: &str,
    content: &str,
    cancel: &CancellationToken,
) -> Result<ImportSummary, ImportError> {
    let (registrations, skipped) = parse_export(event_code, content)?;
    let parsed = registrations.len();
    if skipped > 0 {
        tracing::warn!(event_code = %event_code, skipped, "Skipped rows without a phone number");
    }

    let result = state
        .registrations
        .bulk_insert_with_cancel(registrations, cancel)
        .await?;

    tracing::info!(
        event_code = %event_code,
        parsed,
        written = result.written,
        unwritten = result.unwritten.len(),
        "Processed registration export"
    );
    Ok(ImportSummary::new(event_code, parsed, skipped, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;

    const EXPORT: &str = "\
Name,Contact (name/company/email/phone)
Kim,Kim/Acme/kim@example.com/010-1234-5678
Lee,Lee/Initech/lee@example.com/010-2222-3333

Park,Park/Acme/
Choi,010-4444-5555
";

    #[test]
    fn test_parse_export_skips_header_and_phoneless_rows() {
        let (registrations, skipped) = parse_export("E1", EXPORT).unwrap();

        let phones: Vec<&str> = registrations.iter().map(|r| r.phone.as_str()).collect();
        assert_eq!(phones, vec!["01012345678", "01022223333", "01044445555"]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_parse_header_only() {
        let (registrations, skipped) = parse_export("E1", "Name,Contact (email/phone)\n").unwrap();
        assert!(registrations.is_empty());
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_parse_quoted_cells() {
        let export = "\
\"Name\",\"Contact (name/company/email/phone)\"
\"Kim\",\"Kim/Acme/kim@example.com/010-1234-5678\"
";
        let (registrations, skipped) = parse_export("E1", export).unwrap();

        assert_eq!(skipped, 0);
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].phone, "01012345678");
        assert_eq!(registrations[0].name.as_deref(), Some("Kim"));
        assert_eq!(registrations[0].email.as_deref(), Some("kim@example.com"));
    }

    #[test]
    fn test_parse_name_containing_comma() {
        let export = "\
Name,Contact (name/company/email/phone)
\"Lee, Minji\",Lee/Initech/lee@example.com/010-2222-3333
";
        let (registrations, _) = parse_export("E1", export).unwrap();

        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].name.as_deref(), Some("Lee, Minji"));
        assert_eq!(registrations[0].phone, "01022223333");
        assert_eq!(registrations[0].email.as_deref(), Some("lee@example.com"));
    }

    #[test]
    fn test_columns_are_found_by_header() {
        let export = "\
Timestamp,Contact (name/company/email/phone),Name
2024-06-01,Kim/Acme/kim@example.com/010-1234-5678,Kim
";
        let (registrations, _) = parse_export("E1", export).unwrap();

        assert_eq!(registrations[0].name.as_deref(), Some("Kim"));
        assert_eq!(registrations[0].phone, "01012345678");
    }

    #[test]
    fn test_missing_info_column_is_rejected() {
        let err = parse_export("E1", "Name,Phone\nKim,010-1234-5678\n").unwrap_err();
        assert!(matches!(err, ImportError::MissingInfoColumn));
    }

    #[tokio::test]
    async fn test_import_writes_registrations() {
        let (state, _) = test_support::in_memory();

        let summary = import_registrations(&state, "E1", EXPORT, &CancellationToken::new())
            .await
            .unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.parsed, 3);
        assert_eq!(summary.written, 3);
        let kim = state
            .registrations
            .get("E1", Some("01012345678"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kim.email.as_deref(), Some("kim@example.com"));
        assert_eq!(state.registrations.query("E1", None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_repeated_phone_keeps_last_line() {
        let (state, _) = test_support::in_memory();
        let export = "Name,Contact (email/phone)\nKim,010-1234-5678\nKim Minji,010-1234-5678\n";

        let summary = import_registrations(&state, "E1", export, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.written, 1);
        assert_eq!(summary.superseded, 1);
        let stored = state
            .registrations
            .get("E1", Some("01012345678"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name.as_deref(), Some("Kim Minji"));
    }

    #[tokio::test]
    async fn test_cancelled_import_reports_unwritten() {
        let (state, _) = test_support::in_memory();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = import_registrations(&state, "E1", EXPORT, &cancel).await.unwrap();

        assert!(!summary.is_complete());
        assert!(summary.cancelled);
        assert_eq!(summary.unwritten.len(), 3);
        assert!(state.registrations.query("E1", None).await.unwrap().is_empty());
    }
}
