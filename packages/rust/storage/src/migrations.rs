//! SQL migration definitions for the SiteSage registry database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: sites, crawl_runs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Site -> knowledge base bindings, one row per site URL
CREATE TABLE IF NOT EXISTS sites (
    site_url      TEXT PRIMARY KEY,
    kb_id         TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    corpus_sha256 TEXT NOT NULL,
    page_count    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sites_kb_id ON sites(kb_id);

-- Crawl run history. No foreign key: the first run of a site is
-- recorded before any binding row exists.
CREATE TABLE IF NOT EXISTS crawl_runs (
    id          TEXT PRIMARY KEY,
    site_url    TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawl_runs_site ON crawl_runs(site_url);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
