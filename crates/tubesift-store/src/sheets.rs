//! Remote spreadsheet sink over the Sheets v4 values REST surface.
//!
//! The spreadsheet is treated as an opaque append/read collaborator: rows
//! keyed by url in the fixed column order, a header row created when the
//! sheet is empty, and a batch append that either fully applies or is
//! reported as a failure.

use crate::error::{Result, StoreError};
use crate::sink::{record_columns, RecordSink, COLUMNS};
use std::collections::HashSet;
use std::time::Duration;
use tubesift_core::NormalizedRecord;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Spreadsheet-backed sink.
pub struct SheetsSink {
    client: reqwest::Client,
    sheet_id: String,
    sheet_name: String,
    token: String,
}

impl SheetsSink {
    /// Create a sink over the given spreadsheet and tab.
    ///
    /// # Errors
    /// Returns `StoreError::NotConfigured` when id or token are empty, and
    /// surfaces client construction failures.
    pub fn new(
        sheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let sheet_id = sheet_id.into();
        let token = token.into();
        if sheet_id.is_empty() {
            return Err(StoreError::NotConfigured("empty sheet id".to_string()));
        }
        if token.is_empty() {
            return Err(StoreError::NotConfigured("empty API token".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            sheet_id,
            sheet_name: sheet_name.into(),
            token,
        })
    }

    /// Browser URL of the spreadsheet, for run summaries.
    #[must_use]
    pub fn sheet_url(&self) -> String {
        format!("https://docs.google.com/spreadsheets/d/{}", self.sheet_id)
    }

    fn values_url(&self, suffix: &str) -> String {
        format!(
            "{API_BASE}/{}/values/{}{suffix}",
            self.sheet_id, self.sheet_name
        )
    }

    /// All rows currently in the sheet, header included.
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>> {
        let response = self
            .client
            .get(self.values_url("!A:G"))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::WriteRejected {
                sink: "sheets".to_string(),
                reason: format!("read failed with HTTP {}", response.status()),
            });
        }

        let body: serde_json::Value = response.json().await?;
        let rows = body
            .get("values")
            .and_then(|v| v.as_array())
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| {
                                cells
                                    .iter()
                                    .map(|cell| cell.as_str().unwrap_or_default().to_string())
                                    .collect()
                            })
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    /// Write the header row into an empty sheet.
    async fn create_header(&self) -> Result<()> {
        let header: Vec<String> = COLUMNS.iter().map(ToString::to_string).collect();
        let body = serde_json::json!({ "values": [header] });

        let response = self
            .client
            .put(self.values_url("!A1:G1?valueInputOption=RAW"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            tracing::info!(sheet = %self.sheet_id, "Created spreadsheet header row");
            Ok(())
        } else {
            Err(StoreError::WriteRejected {
                sink: "sheets".to_string(),
                reason: format!("header write failed with HTTP {}", response.status()),
            })
        }
    }
}

#[async_trait::async_trait]
impl RecordSink for SheetsSink {
    fn name(&self) -> &str {
        "sheets"
    }

    async fn existing_keys(&self) -> Result<HashSet<String>> {
        let rows = self.fetch_rows().await?;
        Ok(rows
            .into_iter()
            .skip(1) // header
            .filter_map(|row| row.get(1).cloned())
            .filter(|url| !url.is_empty())
            .collect())
    }

    async fn append(&self, records: &[NormalizedRecord]) -> Result<()> {
        if self.fetch_rows().await?.is_empty() {
            self.create_header().await?;
        }

        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|record| record_columns(record).to_vec())
            .collect();
        let body = serde_json::json!({ "values": rows });

        let response = self
            .client
            .post(self.values_url("!A:G:append?valueInputOption=USER_ENTERED"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::WriteRejected {
                sink: "sheets".to_string(),
                reason: format!("append failed with HTTP {}", response.status()),
            });
        }

        // A short write is a failure, not a partial commit
        let result: serde_json::Value = response.json().await?;
        let updated = result
            .pointer("/updates/updatedRows")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        if updated as usize != records.len() {
            return Err(StoreError::WriteRejected {
                sink: "sheets".to_string(),
                reason: format!("expected {} rows appended, got {updated}", records.len()),
            });
        }

        tracing::info!(count = records.len(), sheet = %self.sheet_id, "Appended rows to spreadsheet");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_id_and_token() {
        assert!(matches!(
            SheetsSink::new("", "Sheet1", "token"),
            Err(StoreError::NotConfigured(_))
        ));
        assert!(matches!(
            SheetsSink::new("sheet123", "Sheet1", ""),
            Err(StoreError::NotConfigured(_))
        ));
        assert!(SheetsSink::new("sheet123", "Sheet1", "token").is_ok());
    }

    #[test]
    fn test_sheet_url() {
        let sink = SheetsSink::new("sheet123", "Sheet1", "token").expect("create sink");
        assert_eq!(
            sink.sheet_url(),
            "https://docs.google.com/spreadsheets/d/sheet123"
        );
    }

    #[test]
    fn test_values_url_shape() {
        let sink = SheetsSink::new("sheet123", "Sheet1", "token").expect("create sink");
        assert_eq!(
            sink.values_url("!A:G"),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet123/values/Sheet1!A:G"
        );
    }
}
