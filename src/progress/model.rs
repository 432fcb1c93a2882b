//! Progress data model shared by the store, the HTTP client and the
//! reference backend.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Completion/skip record for one page's tour.
///
/// `completed` and `skipped` are independent flags; both may be true at once.
/// Each `*_at` timestamp is stamped the first time its flag turns true and is
/// only cleared by removing the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_at: Option<DateTime<Utc>>,
}

impl ProgressEntry {
    /// Merge a patch into this entry.
    pub fn apply(&mut self, patch: &ProgressPatch, now: DateTime<Utc>) {
        if let Some(completed) = patch.completed {
            if completed && self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
            self.completed = completed;
        }
        if let Some(skipped) = patch.skipped {
            if skipped && self.skipped_at.is_none() {
                self.skipped_at = Some(now);
            }
            self.skipped = skipped;
        }
    }
}

/// pageId → entry. Key order carries no meaning.
pub type ProgressMap = HashMap<String, ProgressEntry>;

/// Body of `PATCH /guide-progress/{pageId}`. Absent flags are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
}

impl ProgressPatch {
    pub fn completed() -> Self {
        Self {
            completed: Some(true),
            skipped: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            completed: None,
            skipped: Some(true),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_none() && self.skipped.is_none()
    }
}

/// Change notifications fanned out by the progress store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A session load replaced the map.
    Loaded { pages: usize },
    /// One entry was created or overwritten.
    Updated {
        page_id: String,
        entry: ProgressEntry,
    },
    /// One entry was removed.
    Reset { page_id: String },
    /// The whole map was dropped (reset-all or logout).
    Cleared,
}

/// A page id must carry at least one non-whitespace character.
pub fn is_valid_page_id(page_id: &str) -> bool {
    !page_id.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn completing_stamps_completed_at_once() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(30);
        let mut entry = ProgressEntry::default();

        entry.apply(&ProgressPatch::completed(), t0);
        assert!(entry.completed);
        assert_eq!(entry.completed_at, Some(t0));

        entry.apply(&ProgressPatch::completed(), t1);
        assert_eq!(entry.completed_at, Some(t0), "first completion time is kept");
    }

    #[test]
    fn clearing_flag_keeps_timestamp() {
        let t0 = Utc::now();
        let mut entry = ProgressEntry::default();
        entry.apply(&ProgressPatch::skipped(), t0);
        entry.apply(
            &ProgressPatch {
                completed: None,
                skipped: Some(false),
            },
            t0 + Duration::seconds(5),
        );
        assert!(!entry.skipped);
        assert_eq!(entry.skipped_at, Some(t0));
    }

    #[test]
    fn completed_and_skipped_are_independent() {
        let now = Utc::now();
        let mut entry = ProgressEntry::default();
        entry.apply(&ProgressPatch::skipped(), now);
        entry.apply(&ProgressPatch::completed(), now);
        assert!(entry.completed && entry.skipped);
    }

    #[test]
    fn false_flag_does_not_stamp() {
        let mut entry = ProgressEntry::default();
        entry.apply(
            &ProgressPatch {
                completed: Some(false),
                skipped: None,
            },
            Utc::now(),
        );
        assert!(entry.completed_at.is_none());
    }

    #[test]
    fn entry_uses_camel_case_and_tolerates_missing_fields() {
        let entry: ProgressEntry = serde_json::from_str(r#"{"completed": true}"#).unwrap();
        assert!(entry.completed);
        assert!(!entry.skipped);
        assert!(entry.completed_at.is_none());

        let now = Utc::now();
        let mut entry = ProgressEntry::default();
        entry.apply(&ProgressPatch::completed(), now);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("completedAt").is_some());
        assert!(json.get("skippedAt").is_none());
    }

    #[test]
    fn patch_omits_absent_flags() {
        let json = serde_json::to_string(&ProgressPatch::skipped()).unwrap();
        assert_eq!(json, r#"{"skipped":true}"#);
        assert!(ProgressPatch::default().is_empty());
    }

    #[test]
    fn page_id_validation() {
        assert!(is_valid_page_id("dashboard"));
        assert!(!is_valid_page_id(""));
        assert!(!is_valid_page_id("   "));
    }
}
