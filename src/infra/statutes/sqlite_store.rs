// SQLite-backed statute store.
//
// Schema: titles / revisions / sections keep the full revision history;
// sections_fts is an FTS5 index over the LATEST revision only, rebuilt per
// title inside the same transaction that writes the revision.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

use crate::core::statutes::{
    SearchHit, StatuteError, StatuteSection, StatuteStore, StoredSection, TitleInfo,
};

pub struct SqliteStatuteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStatuteStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS titles (
                code TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                latest_revision INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS revisions (
                title_code TEXT NOT NULL,
                revision INTEGER NOT NULL,
                imported_at TEXT NOT NULL,
                PRIMARY KEY (title_code, revision)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sections (
                title_code TEXT NOT NULL,
                revision INTEGER NOT NULL,
                citation TEXT NOT NULL,
                heading TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (title_code, revision, citation)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS sections_fts USING fts5(
                title_code UNINDEXED,
                citation UNINDEXED,
                heading,
                body
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn store_err(e: sqlx::Error) -> StatuteError {
        StatuteError::Store(e.to_string())
    }

    fn row_to_section(row: &sqlx::sqlite::SqliteRow) -> StoredSection {
        StoredSection {
            title_code: row.get("title_code"),
            revision: row.get("revision"),
            citation: row.get("citation"),
            heading: row.get("heading"),
            body: row.get("body"),
        }
    }
}

#[async_trait]
impl StatuteStore for SqliteStatuteStore {
    async fn latest_revision(&self, title_code: &str) -> Result<Option<i64>, StatuteError> {
        let row = sqlx::query("SELECT latest_revision FROM titles WHERE code = ?")
            .bind(title_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::store_err)?;
        Ok(row.map(|r| r.get::<i64, _>("latest_revision")))
    }

    async fn sections_at(
        &self,
        title_code: &str,
        revision: i64,
    ) -> Result<Vec<StoredSection>, StatuteError> {
        let rows = sqlx::query(
            "SELECT title_code, revision, citation, heading, body
             FROM sections WHERE title_code = ? AND revision = ?
             ORDER BY citation",
        )
        .bind(title_code)
        .bind(revision)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::store_err)?;
        Ok(rows.iter().map(Self::row_to_section).collect())
    }

    async fn write_revision(
        &self,
        title_code: &str,
        source: &str,
        revision: i64,
        sections: &[StatuteSection],
    ) -> Result<(), StatuteError> {
        let mut tx = self.pool.begin().await.map_err(Self::store_err)?;

        sqlx::query("INSERT INTO revisions (title_code, revision, imported_at) VALUES (?, ?, ?)")
            .bind(title_code)
            .bind(revision)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(Self::store_err)?;

        for section in sections {
            sqlx::query(
                "INSERT INTO sections (title_code, revision, citation, heading, body)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(title_code)
            .bind(revision)
            .bind(&section.citation)
            .bind(&section.heading)
            .bind(&section.body)
            .execute(&mut *tx)
            .await
            .map_err(Self::store_err)?;
        }

        sqlx::query(
            r#"
            INSERT INTO titles (code, source, latest_revision)
            VALUES (?, ?, ?)
            ON CONFLICT(code) DO UPDATE SET
                source = excluded.source,
                latest_revision = excluded.latest_revision
            "#,
        )
        .bind(title_code)
        .bind(source)
        .bind(revision)
        .execute(&mut *tx)
        .await
        .map_err(Self::store_err)?;

        // The FTS index tracks the latest revision only: drop this title's
        // rows and reinsert the incoming set.
        sqlx::query("DELETE FROM sections_fts WHERE title_code = ?")
            .bind(title_code)
            .execute(&mut *tx)
            .await
            .map_err(Self::store_err)?;
        for section in sections {
            sqlx::query(
                "INSERT INTO sections_fts (title_code, citation, heading, body)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(title_code)
            .bind(&section.citation)
            .bind(&section.heading)
            .bind(&section.body)
            .execute(&mut *tx)
            .await
            .map_err(Self::store_err)?;
        }

        tx.commit().await.map_err(Self::store_err)
    }

    async fn section(
        &self,
        title_code: &str,
        citation: &str,
    ) -> Result<Option<StoredSection>, StatuteError> {
        let row = sqlx::query(
            "SELECT s.title_code, s.revision, s.citation, s.heading, s.body
             FROM sections s
             JOIN titles t ON t.code = s.title_code AND t.latest_revision = s.revision
             WHERE s.title_code = ? AND s.citation = ?",
        )
        .bind(title_code)
        .bind(citation)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::store_err)?;
        Ok(row.as_ref().map(Self::row_to_section))
    }

    async fn section_revisions(
        &self,
        title_code: &str,
        citation: &str,
    ) -> Result<Vec<StoredSection>, StatuteError> {
        let rows = sqlx::query(
            "SELECT title_code, revision, citation, heading, body
             FROM sections WHERE title_code = ? AND citation = ?
             ORDER BY revision",
        )
        .bind(title_code)
        .bind(citation)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::store_err)?;
        Ok(rows.iter().map(Self::row_to_section).collect())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, StatuteError> {
        let rows = sqlx::query(
            "SELECT title_code, citation, heading,
                    snippet(sections_fts, 3, '**', '**', '…', 12) AS snip
             FROM sections_fts
             WHERE sections_fts MATCH ?
             ORDER BY rank
             LIMIT ?",
        )
        .bind(query)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        // FTS5 reports bad query syntax as an SQL error; surface it as a
        // query problem rather than a storage failure.
        .map_err(|e| StatuteError::BadQuery(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| SearchHit {
                title_code: row.get("title_code"),
                citation: row.get("citation"),
                heading: row.get("heading"),
                snippet: row.get("snip"),
            })
            .collect())
    }

    async fn titles(&self) -> Result<Vec<TitleInfo>, StatuteError> {
        let rows = sqlx::query(
            "SELECT t.code, t.source, t.latest_revision, r.imported_at,
                    (SELECT COUNT(*) FROM sections s
                     WHERE s.title_code = t.code AND s.revision = t.latest_revision) AS section_count
             FROM titles t
             LEFT JOIN revisions r
               ON r.title_code = t.code AND r.revision = t.latest_revision
             ORDER BY t.code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Self::store_err)?;

        Ok(rows
            .iter()
            .map(|row| TitleInfo {
                code: row.get("code"),
                source: row.get("source"),
                latest_revision: row.get("latest_revision"),
                imported_at: row
                    .get::<Option<String>, _>("imported_at")
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                section_count: row.get("section_count"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStatuteStore {
        SqliteStatuteStore::new("sqlite::memory:").await.unwrap()
    }

    fn section(citation: &str, heading: &str, body: &str) -> StatuteSection {
        StatuteSection {
            citation: citation.to_string(),
            heading: heading.to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_write_and_read_revision() {
        let store = store().await;
        store
            .write_revision(
                "5",
                "usc",
                1,
                &[
                    section("101", "Executive departments", "The departments are listed."),
                    section("102", "Military departments", "Army, Navy, Air Force."),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.latest_revision("5").await.unwrap(), Some(1));
        assert_eq!(store.latest_revision("99").await.unwrap(), None);

        let sections = store.sections_at("5", 1).await.unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].citation, "101");
    }

    #[tokio::test]
    async fn test_section_reads_latest_revision() {
        let store = store().await;
        store
            .write_revision("5", "usc", 1, &[section("101", "Old", "old body")])
            .await
            .unwrap();
        store
            .write_revision("5", "usc", 2, &[section("101", "New", "new body")])
            .await
            .unwrap();

        let latest = store.section("5", "101").await.unwrap().unwrap();
        assert_eq!(latest.revision, 2);
        assert_eq!(latest.heading, "New");

        let history = store.section_revisions("5", "101").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].revision, 1);
    }

    #[tokio::test]
    async fn test_search_hits_latest_only() {
        let store = store().await;
        store
            .write_revision("5", "usc", 1, &[section("101", "Ferrets", "Ferrets are mustelids.")])
            .await
            .unwrap();
        store
            .write_revision("5", "usc", 2, &[section("101", "Badgers", "Badgers are mustelids.")])
            .await
            .unwrap();

        let hits = store.search("badgers", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].citation, "101");
        assert!(hits[0].snippet.contains("**Badgers**"));

        // The old revision's text is out of the index.
        assert!(store.search("ferrets", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_across_titles() {
        let store = store().await;
        store
            .write_revision("5", "usc", 1, &[section("101", "Departments", "Executive bodies.")])
            .await
            .unwrap();
        store
            .write_revision("18", "usc", 1, &[section("1", "Crimes", "Executive clemency.")])
            .await
            .unwrap();

        let hits = store.search("executive", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_bad_fts_query_is_typed() {
        let store = store().await;
        store
            .write_revision("5", "usc", 1, &[section("101", "H", "B")])
            .await
            .unwrap();

        let err = store.search("\"unbalanced", 10).await.unwrap_err();
        assert!(matches!(err, StatuteError::BadQuery(_)));
    }

    #[tokio::test]
    async fn test_titles_summary() {
        let store = store().await;
        store
            .write_revision("5", "usc", 1, &[section("101", "H", "B"), section("102", "H", "B")])
            .await
            .unwrap();

        let titles = store.titles().await.unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].code, "5");
        assert_eq!(titles[0].latest_revision, 1);
        assert_eq!(titles[0].section_count, 2);
        assert!(titles[0].imported_at.is_some());
    }
}
