//! libSQL-backed site registry.
//!
//! The [`SiteRegistry`] struct wraps a local libSQL database holding the
//! site -> knowledge-base bindings and crawl run history. The CLI is the
//! sole writer; there is one registry per config directory.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use sitesage_shared::{CrawlRunRecord, Result, SiteBinding, SitesageError};
use uuid::Uuid;

/// Registry handle wrapping a libSQL database.
pub struct SiteRegistry {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl SiteRegistry {
    /// Open or create a registry database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SitesageError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| SitesageError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| SitesageError::Storage(e.to_string()))?;

        let registry = Self { db, conn };
        registry.run_migrations().await?;
        Ok(registry)
    }

    /// Open a fresh in-memory registry. Nothing survives the handle;
    /// callers that want durable bindings use [`SiteRegistry::open`].
    pub async fn open_in_memory() -> Result<Self> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| SitesageError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| SitesageError::Storage(e.to_string()))?;

        let registry = Self { db, conn };
        registry.run_migrations().await?;
        Ok(registry)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    SitesageError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Site bindings
    // -----------------------------------------------------------------------

    /// Bind a site to a knowledge base (insert or update on conflict by
    /// `site_url`). `created_at` survives rebinding; everything else is
    /// replaced.
    pub async fn bind_site(
        &self,
        site_url: &str,
        kb_id: &str,
        corpus_sha256: &str,
        page_count: usize,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO sites (site_url, kb_id, created_at, updated_at, corpus_sha256, page_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(site_url) DO UPDATE SET
                   kb_id = excluded.kb_id,
                   updated_at = excluded.updated_at,
                   corpus_sha256 = excluded.corpus_sha256,
                   page_count = excluded.page_count",
                params![
                    site_url,
                    kb_id,
                    now.as_str(),
                    now.as_str(),
                    corpus_sha256,
                    page_count as i64
                ],
            )
            .await
            .map_err(|e| SitesageError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Look up the knowledge base bound to a site, if any.
    pub async fn kb_for_site(&self, site_url: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT kb_id FROM sites WHERE site_url = ?1",
                params![site_url],
            )
            .await
            .map_err(|e| SitesageError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row.get::<String>(0)
                    .map_err(|e| SitesageError::Storage(e.to_string()))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(SitesageError::Storage(e.to_string())),
        }
    }

    /// List all site bindings ordered by site URL.
    pub async fn list_sites(&self) -> Result<Vec<SiteBinding>> {
        let mut rows = self
            .conn
            .query(
                "SELECT site_url, kb_id, created_at, updated_at, corpus_sha256, page_count
                 FROM sites ORDER BY site_url",
                params![],
            )
            .await
            .map_err(|e| SitesageError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_binding(&row)?);
        }
        Ok(results)
    }

    /// Site URLs currently bound to a knowledge base.
    pub async fn sites_for_kb(&self, kb_id: &str) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT site_url FROM sites WHERE kb_id = ?1 ORDER BY site_url",
                params![kb_id],
            )
            .await
            .map_err(|e| SitesageError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(
                row.get::<String>(0)
                    .map_err(|e| SitesageError::Storage(e.to_string()))?,
            );
        }
        Ok(results)
    }

    /// Remove a site binding.
    pub async fn remove_site(&self, site_url: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sites WHERE site_url = ?1", params![site_url])
            .await
            .map_err(|e| SitesageError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Crawl runs
    // -----------------------------------------------------------------------

    /// Record the start of a crawl. Returns the generated run ID.
    pub async fn insert_crawl_run(&self, site_url: &str) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO crawl_runs (id, site_url, started_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), site_url, now.as_str()],
            )
            .await
            .map_err(|e| SitesageError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Mark a crawl run finished and attach its statistics.
    pub async fn finish_crawl_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE crawl_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(|e| SitesageError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Crawl history for a site, most recent first.
    pub async fn runs_for_site(&self, site_url: &str) -> Result<Vec<CrawlRunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, site_url, started_at, finished_at, stats_json
                 FROM crawl_runs WHERE site_url = ?1 ORDER BY started_at DESC",
                params![site_url],
            )
            .await
            .map_err(|e| SitesageError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_run(&row)?);
        }
        Ok(results)
    }
}

/// Convert a database row to a [`SiteBinding`].
fn row_to_binding(row: &libsql::Row) -> Result<SiteBinding> {
    Ok(SiteBinding {
        site_url: row
            .get::<String>(0)
            .map_err(|e| SitesageError::Storage(e.to_string()))?,
        kb_id: row
            .get::<String>(1)
            .map_err(|e| SitesageError::Storage(e.to_string()))?,
        created_at: parse_timestamp(
            &row.get::<String>(2)
                .map_err(|e| SitesageError::Storage(e.to_string()))?,
        )?,
        updated_at: parse_timestamp(
            &row.get::<String>(3)
                .map_err(|e| SitesageError::Storage(e.to_string()))?,
        )?,
        corpus_sha256: row
            .get::<String>(4)
            .map_err(|e| SitesageError::Storage(e.to_string()))?,
        page_count: row
            .get::<i64>(5)
            .map_err(|e| SitesageError::Storage(e.to_string()))? as usize,
    })
}

/// Convert a database row to a [`CrawlRunRecord`].
fn row_to_run(row: &libsql::Row) -> Result<CrawlRunRecord> {
    Ok(CrawlRunRecord {
        id: row
            .get::<String>(0)
            .map_err(|e| SitesageError::Storage(e.to_string()))?,
        site_url: row
            .get::<String>(1)
            .map_err(|e| SitesageError::Storage(e.to_string()))?,
        started_at: parse_timestamp(
            &row.get::<String>(2)
                .map_err(|e| SitesageError::Storage(e.to_string()))?,
        )?,
        finished_at: row
            .get::<String>(3)
            .ok()
            .map(|s| parse_timestamp(&s))
            .transpose()?,
        stats: row
            .get::<String>(4)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok()),
    })
}

/// Parse an RFC 3339 timestamp stored as TEXT.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SitesageError::Storage(format!("invalid date: {e}")))
}
