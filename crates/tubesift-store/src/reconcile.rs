//! Idempotent merge of a collected batch against a store's known keys.
//!
//! Pure with respect to the store: this module only looks at the key set
//! the caller read; the caller performs the append with the returned batch,
//! and only a successful append commits the run.

use chrono::Utc;
use std::collections::HashSet;
use tubesift_core::NormalizedRecord;

/// Result of reconciling a batch against existing keys.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Records to append, a subsequence of the input batch in original order
    pub to_append: Vec<NormalizedRecord>,
    /// Records dropped: already stored, or repeated within the batch
    pub duplicates: usize,
}

/// Filter `batch` down to genuinely new records.
///
/// Records whose url is in `existing_keys` are dropped. Within the batch
/// itself the first occurrence of a url wins; later occurrences are dropped
/// and counted. Surviving records get `saved_at` stamped with the current
/// wall-clock time. Relative order is preserved.
#[must_use]
pub fn reconcile(
    batch: Vec<NormalizedRecord>,
    existing_keys: &HashSet<String>,
) -> ReconcileOutcome {
    let now = Utc::now();
    let mut seen: HashSet<String> = HashSet::new();
    let mut to_append = Vec::new();
    let mut duplicates = 0;

    for mut record in batch {
        let key = record.url.as_str().to_string();
        if existing_keys.contains(&key) || !seen.insert(key) {
            duplicates += 1;
            continue;
        }
        record.saved_at = Some(now);
        to_append.push(record);
    }

    ReconcileOutcome {
        to_append,
        duplicates,
    }
}
