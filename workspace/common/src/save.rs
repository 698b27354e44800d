use serde::{Deserialize, Serialize};

/// An entity that was written successfully, with the surrogate key the store
/// holds for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedEntity {
    pub key: String,
    pub id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveFailure {
    pub key: String,
    pub reason: String,
}

/// Outcome of one persistence pass.
///
/// Succeeded entities are no longer dirty. Failed and skipped ones stay dirty
/// so the pass can be retried.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveReport {
    pub succeeded: Vec<SavedEntity>,
    pub failed: Vec<SaveFailure>,
    /// Not attempted because the pass was cancelled.
    pub skipped: Vec<String>,
    pub cancelled: bool,
    pub timed_out: bool,
}

impl SaveReport {
    /// True when every entity handed to the pass was written.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn succeeded_keys(&self) -> impl Iterator<Item = &str> {
        self.succeeded.iter().map(|s| s.key.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Inserted { id: i32 },
    Updated { id: i32 },
    /// The stored record already matched; nothing was written.
    Unchanged { id: i32 },
    Failed { reason: String },
}

/// Emitted once per processed entity while a pass runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveProgress {
    /// 1-based position in the pass.
    pub index: usize,
    pub total: usize,
    pub key: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_completeness() {
        let mut report = SaveReport::default();
        assert!(report.is_complete());

        report.succeeded.push(SavedEntity {
            key: "INV-001".to_string(),
            id: 1,
        });
        report.skipped.push("INV-002".to_string());
        assert!(!report.is_complete());
        assert_eq!(report.attempted(), 1);
        assert_eq!(report.succeeded_keys().collect::<Vec<_>>(), vec!["INV-001"]);
    }

    #[test]
    fn test_progress_serializes_flat() {
        let progress = SaveProgress {
            index: 1,
            total: 2,
            key: "INV-001".to_string(),
            outcome: ItemOutcome::Inserted { id: 7 },
        };
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["outcome"], "inserted");
        assert_eq!(json["id"], 7);
        assert_eq!(json["key"], "INV-001");
    }
}
