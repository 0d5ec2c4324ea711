//! File-backed sinks: a JSON array store and a CSV mirror.
//!
//! Both hold the same records in the same fixed column order. The JSON sink
//! is the readable source of truth for existing keys; the CSV mirror is an
//! append-only spreadsheet-friendly copy.

use crate::error::{Result, StoreError};
use crate::sink::{record_columns, RecordSink, COLUMNS};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tubesift_core::NormalizedRecord;

/// Append-only JSON array of records.
///
/// Appends rewrite the whole array through a temp file and an atomic rename,
/// so a failed write leaves the previous contents intact and the batch is
/// all-or-nothing.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    /// Create a sink at `path`, creating parent directories as needed.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_parent(&path)?;
        Ok(Self { path })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<NormalizedRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl RecordSink for JsonFileSink {
    fn name(&self) -> &str {
        "json"
    }

    async fn existing_keys(&self) -> Result<HashSet<String>> {
        let records = self.load()?;
        Ok(records
            .into_iter()
            .map(|r| r.url.as_str().to_string())
            .collect())
    }

    async fn append(&self, records: &[NormalizedRecord]) -> Result<()> {
        let mut all = self.load()?;
        all.extend_from_slice(records);

        let contents = serde_json::to_string_pretty(&all)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;

        tracing::info!(
            count = records.len(),
            path = %self.path.display(),
            "Appended records to JSON store"
        );
        Ok(())
    }
}

/// CSV mirror with a fixed column order and a header row on creation.
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    /// Create a sink at `path`, creating parent directories as needed.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_parent(&path)?;
        Ok(Self { path })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl RecordSink for CsvFileSink {
    fn name(&self) -> &str {
        "csv"
    }

    async fn existing_keys(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        let mut keys = HashSet::new();
        for row in parse_csv_rows(&contents).into_iter().skip(1) {
            if let Some(url) = row.into_iter().nth(1) {
                if !url.is_empty() {
                    keys.insert(url);
                }
            }
        }
        Ok(keys)
    }

    async fn append(&self, records: &[NormalizedRecord]) -> Result<()> {
        // Assemble the whole batch before touching the file so a failure
        // never leaves half a batch behind.
        let mut out = String::new();
        if !self.path.exists() {
            out.push_str(&COLUMNS.join(","));
            out.push('\n');
        }
        for record in records {
            let row: Vec<String> = record_columns(record)
                .iter()
                .map(|field| csv_escape(field))
                .collect();
            out.push_str(&row.join(","));
            out.push('\n');
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(out.as_bytes())?;

        tracing::info!(
            count = records.len(),
            path = %self.path.display(),
            "Appended records to CSV mirror"
        );
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Quote a field when it contains a delimiter, quote or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split our own CSV output back into rows of fields.
///
/// Quote state carries across physical lines: a quoted field may contain
/// the delimiter and embedded newlines, so a record boundary is a newline
/// outside quotes, not every `\n` in the file.
fn parse_csv_rows(contents: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = contents.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            '\n' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
                rows.push(std::mem::take(&mut fields));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() || !fields.is_empty() {
        fields.push(current);
        rows.push(fields);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tubesift_core::VideoUrl;

    fn record(id: &str, title: &str) -> NormalizedRecord {
        NormalizedRecord {
            title: title.to_string(),
            url: VideoUrl::new(format!("https://www.youtube.com/watch?v={id}"))
                .expect("valid url"),
            views_text: "1.2M".to_string(),
            views_count: Some(1_200_000),
            channel_name: Some("Channel".to_string()),
            upload_time_text: Some("1日前".to_string()),
            saved_at: None,
        }
    }

    #[tokio::test]
    async fn test_json_sink_round_trip() {
        let tmp = TempDir::new().expect("create temp dir");
        let sink = JsonFileSink::new(tmp.path().join("results.json")).expect("create sink");

        assert!(sink.existing_keys().await.expect("keys").is_empty());

        sink.append(&[record("aaaaaaaaaaa", "first")])
            .await
            .expect("append first batch");
        sink.append(&[record("bbbbbbbbbbb", "second")])
            .await
            .expect("append second batch");

        let keys = sink.existing_keys().await.expect("keys");
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("https://www.youtube.com/watch?v=aaaaaaaaaaa"));

        // Appends accumulate, they never rewrite history
        let contents = fs::read_to_string(sink.path()).expect("read store");
        let all: Vec<NormalizedRecord> = serde_json::from_str(&contents).expect("parse store");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "first");
        assert_eq!(all[1].title, "second");
    }

    #[tokio::test]
    async fn test_json_sink_corrupt_store_is_an_error() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("results.json");
        fs::write(&path, "not json").expect("write garbage");

        let sink = JsonFileSink::new(&path).expect("create sink");
        let err = sink.existing_keys().await.expect_err("corrupt store");
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_csv_sink_header_and_rows() {
        let tmp = TempDir::new().expect("create temp dir");
        let sink = CsvFileSink::new(tmp.path().join("results.csv")).expect("create sink");

        sink.append(&[record("aaaaaaaaaaa", "a title, with comma")])
            .await
            .expect("append");
        sink.append(&[record("bbbbbbbbbbb", "plain")])
            .await
            .expect("append again");

        let contents = fs::read_to_string(sink.path()).expect("read csv");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "title,url,views_text,views_count,channel_name,upload_time,saved_at"
        );
        // Header written once, commas inside fields escaped
        assert!(lines[1].starts_with("\"a title, with comma\","));

        let keys = sink.existing_keys().await.expect("keys");
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("https://www.youtube.com/watch?v=bbbbbbbbbbb"));
    }

    #[test]
    fn test_csv_escape_round_trip() {
        let fields = vec![
            "plain".to_string(),
            "with, comma".to_string(),
            "with \"quotes\"".to_string(),
            "line1\nline2".to_string(),
        ];
        let mut line = fields
            .iter()
            .map(|f| csv_escape(f))
            .collect::<Vec<_>>()
            .join(",");
        line.push('\n');
        assert_eq!(parse_csv_rows(&line), vec![fields]);
    }

    #[tokio::test]
    async fn test_csv_sink_reads_back_multiline_title() {
        // A quoted title spanning physical lines must not hide the row's
        // url from the next run
        let tmp = TempDir::new().expect("create temp dir");
        let sink = CsvFileSink::new(tmp.path().join("results.csv")).expect("create sink");

        sink.append(&[record("aaaaaaaaaaa", "line1\nline2")])
            .await
            .expect("append");

        let keys = sink.existing_keys().await.expect("keys");
        assert!(keys.contains("https://www.youtube.com/watch?v=aaaaaaaaaaa"));
        assert_eq!(keys.len(), 1);
    }
}
