// The import pipeline and query surface for the statute database.
//
// Import flow: parse (caller picks the parser) -> load the stored revision ->
// classify every citation as added/removed/modified/unchanged -> render a
// unified diff per modified section -> write the new revision in one shot.
// Identical content writes nothing and reports zero changes.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

use super::diff::render_unified;
use super::models::{
    ImportReport, SearchHit, SectionDiff, StatuteError, StatuteSection, StoredSection, TitleInfo,
};

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for the normalized statute store. Production uses SQLite with FTS;
/// tests use a map.
#[async_trait]
pub trait StatuteStore: Send + Sync {
    async fn latest_revision(&self, title_code: &str) -> Result<Option<i64>, StatuteError>;

    async fn sections_at(
        &self,
        title_code: &str,
        revision: i64,
    ) -> Result<Vec<StoredSection>, StatuteError>;

    /// Write a whole revision atomically and make it the latest.
    async fn write_revision(
        &self,
        title_code: &str,
        source: &str,
        revision: i64,
        sections: &[StatuteSection],
    ) -> Result<(), StatuteError>;

    /// A section from the latest revision of its title.
    async fn section(
        &self,
        title_code: &str,
        citation: &str,
    ) -> Result<Option<StoredSection>, StatuteError>;

    /// Every stored copy of a section, oldest revision first.
    async fn section_revisions(
        &self,
        title_code: &str,
        citation: &str,
    ) -> Result<Vec<StoredSection>, StatuteError>;

    /// Full-text search over the latest revisions of all titles.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, StatuteError>;

    async fn titles(&self) -> Result<Vec<TitleInfo>, StatuteError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct StatuteService<S: StatuteStore> {
    store: S,
    /// Titles with an import currently running. Guards against a second
    /// import interleaving with the diff-then-write sequence.
    imports_in_flight: DashMap<String, ()>,
    diff_context: usize,
}

impl<S: StatuteStore> StatuteService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            imports_in_flight: DashMap::new(),
            diff_context: 3,
        }
    }

    /// Import parsed sections as the next revision of a title.
    pub async fn import(
        &self,
        title_code: &str,
        source: &str,
        sections: Vec<StatuteSection>,
    ) -> Result<ImportReport, StatuteError> {
        use dashmap::mapref::entry::Entry;

        match self.imports_in_flight.entry(title_code.to_string()) {
            Entry::Occupied(_) => {
                return Err(StatuteError::ImportInProgress(title_code.to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }

        let result = self.import_inner(title_code, source, sections).await;
        self.imports_in_flight.remove(title_code);
        result
    }

    async fn import_inner(
        &self,
        title_code: &str,
        source: &str,
        sections: Vec<StatuteSection>,
    ) -> Result<ImportReport, StatuteError> {
        let current_revision = self.store.latest_revision(title_code).await?;
        let stored = match current_revision {
            Some(revision) => self.store.sections_at(title_code, revision).await?,
            None => Vec::new(),
        };

        let old: BTreeMap<&str, &StoredSection> =
            stored.iter().map(|s| (s.citation.as_str(), s)).collect();
        let new: BTreeMap<&str, &StatuteSection> =
            sections.iter().map(|s| (s.citation.as_str(), s)).collect();

        let mut report = ImportReport {
            title_code: title_code.to_string(),
            ..Default::default()
        };

        for (citation, incoming) in &new {
            match old.get(citation) {
                None => report.added.push((*citation).to_string()),
                Some(existing)
                    if existing.body == incoming.body && existing.heading == incoming.heading =>
                {
                    report.unchanged += 1;
                }
                Some(existing) => {
                    report.modified.push(SectionDiff {
                        citation: (*citation).to_string(),
                        diff: render_unified(&existing.body, &incoming.body, self.diff_context),
                    });
                }
            }
        }
        for citation in old.keys() {
            if !new.contains_key(citation) {
                report.removed.push((*citation).to_string());
            }
        }

        if !report.has_changes() {
            tracing::info!(title_code, "Import matched the stored revision exactly");
            return Ok(report);
        }

        let next_revision = current_revision.unwrap_or(0) + 1;
        self.store
            .write_revision(title_code, source, next_revision, &sections)
            .await?;
        report.revision = Some(next_revision);

        tracing::info!(
            title_code,
            revision = next_revision,
            added = report.added.len(),
            removed = report.removed.len(),
            modified = report.modified.len(),
            unchanged = report.unchanged,
            "Imported statute revision"
        );
        Ok(report)
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, StatuteError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(StatuteError::BadQuery("empty query".to_string()));
        }
        self.store.search(query, limit).await
    }

    pub async fn section(
        &self,
        title_code: &str,
        citation: &str,
    ) -> Result<StoredSection, StatuteError> {
        self.store
            .section(title_code, citation)
            .await?
            .ok_or_else(|| StatuteError::UnknownSection {
                title_code: title_code.to_string(),
                citation: citation.to_string(),
            })
    }

    /// Diffs between each pair of consecutive revisions a section appeared
    /// in, rendered on demand.
    pub async fn section_history(
        &self,
        title_code: &str,
        citation: &str,
    ) -> Result<Vec<SectionDiff>, StatuteError> {
        let revisions = self.store.section_revisions(title_code, citation).await?;
        if revisions.is_empty() {
            return Err(StatuteError::UnknownSection {
                title_code: title_code.to_string(),
                citation: citation.to_string(),
            });
        }

        let mut diffs = Vec::new();
        for pair in revisions.windows(2) {
            let rendered = render_unified(&pair[0].body, &pair[1].body, self.diff_context);
            if !rendered.is_empty() {
                diffs.push(SectionDiff {
                    citation: format!("{} (rev {} -> {})", citation, pair[0].revision, pair[1].revision),
                    diff: rendered,
                });
            }
        }
        Ok(diffs)
    }

    pub async fn titles(&self) -> Result<Vec<TitleInfo>, StatuteError> {
        self.store.titles().await
    }
}

// ============================================================================
// TESTS
// ============================================================================
