use crate::error::Result;
use std::collections::HashSet;
use tubesift_core::NormalizedRecord;

/// Fixed column order shared by the tabular sinks.
pub const COLUMNS: [&str; 7] = [
    "title",
    "url",
    "views_text",
    "views_count",
    "channel_name",
    "upload_time",
    "saved_at",
];

/// Abstract durable destination for normalized records.
///
/// An append is all-or-nothing per batch from the pipeline's perspective;
/// a partial write must surface as an error, never as a mix of committed
/// and uncommitted records.
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &str;

    /// The set of urls already present in the store
    async fn existing_keys(&self) -> Result<HashSet<String>>;

    /// Append a batch of records, preserving its order
    async fn append(&self, records: &[NormalizedRecord]) -> Result<()>;
}

/// Render one record into the fixed column order.
pub(crate) fn record_columns(record: &NormalizedRecord) -> [String; 7] {
    [
        record.title.clone(),
        record.url.as_str().to_string(),
        record.views_text.clone(),
        record
            .views_count
            .map_or_else(String::new, |count| count.to_string()),
        record.channel_name.clone().unwrap_or_default(),
        record.upload_time_text.clone().unwrap_or_default(),
        record
            .saved_at
            .map_or_else(String::new, |ts| ts.to_rfc3339()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubesift_core::VideoUrl;

    #[test]
    fn test_record_columns_order() {
        let record = NormalizedRecord {
            title: "A video".to_string(),
            url: VideoUrl::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ").expect("valid url"),
            views_text: "1.2M".to_string(),
            views_count: Some(1_200_000),
            channel_name: Some("Channel".to_string()),
            upload_time_text: None,
            saved_at: None,
        };

        let columns = record_columns(&record);
        assert_eq!(columns[0], "A video");
        assert_eq!(columns[1], "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(columns[2], "1.2M");
        assert_eq!(columns[3], "1200000");
        assert_eq!(columns[4], "Channel");
        assert_eq!(columns[5], "");
        assert_eq!(columns[6], "");
    }

    #[test]
    fn test_unparsed_count_renders_empty_not_zero() {
        let record = NormalizedRecord {
            title: String::new(),
            url: VideoUrl::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ").expect("valid url"),
            views_text: "ライブ配信中".to_string(),
            views_count: None,
            channel_name: None,
            upload_time_text: None,
            saved_at: None,
        };

        assert_eq!(record_columns(&record)[3], "");
    }
}
