use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A normalized statute section as produced by either parser.
/// `citation` is the section number within its title, e.g. "101" or "842a".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatuteSection {
    pub citation: String,
    pub heading: String,
    pub body: String,
}

/// A section as stored, pinned to a title and revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSection {
    pub title_code: String,
    pub revision: i64,
    pub citation: String,
    pub heading: String,
    pub body: String,
}

/// Summary row for a stored title.
#[derive(Debug, Clone)]
pub struct TitleInfo {
    pub code: String,
    pub source: String,
    pub latest_revision: i64,
    pub imported_at: Option<DateTime<Utc>>,
    pub section_count: i64,
}

/// Rendered diff for one modified section.
#[derive(Debug, Clone)]
pub struct SectionDiff {
    pub citation: String,
    pub diff: String,
}

/// What an import changed. `revision` is None when nothing changed and no
/// new revision was written.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub title_code: String,
    pub revision: Option<i64>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<SectionDiff>,
    pub unchanged: usize,
}

impl ImportReport {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.modified.is_empty()
    }
}

/// One full-text search hit against the latest revision.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title_code: String,
    pub citation: String,
    pub heading: String,
    pub snippet: String,
}

#[derive(Debug, Error)]
pub enum StatuteError {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Malformed JSON: {0}")]
    Json(String),

    #[error("No sections found in the supplied document")]
    EmptyDocument,

    #[error("An import of title {0} is already running")]
    ImportInProgress(String),

    #[error("No stored title {0}")]
    UnknownTitle(String),

    #[error("No section {citation} in title {title_code}")]
    UnknownSection { title_code: String, citation: String },

    #[error("Bad search query: {0}")]
    BadQuery(String),

    #[error("Failed to fetch release: {0}")]
    Fetch(String),

    #[error("Statute storage error: {0}")]
    Store(String),
}
