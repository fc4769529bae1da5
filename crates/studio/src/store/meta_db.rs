use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE kv_entries (
    key             TEXT PRIMARY KEY,
    value           TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
"#;

const MIGRATIONS: &[(i64, &str)] = &[(1, MIGRATION_V1_SQL)];

/// The local `folio.db` SQLite file backing durable chapter records and the
/// project library.
#[derive(Debug)]
pub struct FolioDb {
    conn: Connection,
}

impl FolioDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create folio.db parent directory `{}`", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open folio.db at `{}`", path.display()))?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, mostly for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory folio.db")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            ",
        )
        .context("failed to configure sqlite pragmas for folio.db")?;

        ensure_migration_table(&conn)?;
        apply_pending_migrations(&mut conn)?;

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version(&self) -> Result<i64> {
        current_schema_version(&self.conn)
    }

    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv_entries WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("failed to read kv entry `{key}`"))
    }

    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO kv_entries (key, value, updated_at) \
                 VALUES (?1, ?2, datetime('now')) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
                                               updated_at = excluded.updated_at",
                params![key, value],
            )
            .with_context(|| format!("failed to write kv entry `{key}`"))?;
        Ok(())
    }

    pub fn delete_value(&self, key: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
            .with_context(|| format!("failed to delete kv entry `{key}`"))?;
        Ok(changed > 0)
    }

    /// Keys starting with `prefix`, sorted.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv_entries WHERE substr(key, 1, ?2) = ?1 ORDER BY key ASC")
            .context("failed to prepare kv prefix query")?;
        let prefix_len = prefix.chars().count() as i64;
        let rows = stmt
            .query_map(params![prefix, prefix_len], |row| row.get::<_, String>(0))
            .context("failed to query kv keys by prefix")?;

        rows.collect::<std::result::Result<Vec<_>, _>>().context("failed to collect kv keys")
    }
}

fn ensure_migration_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            applied_at  TEXT NOT NULL
        );
        ",
    )
    .context("failed to ensure schema_migrations table exists")
}

fn current_schema_version(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| row.get(0))
        .context("failed to read current schema version")
}

fn apply_pending_migrations(conn: &mut Connection) -> Result<()> {
    let mut current_version = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current_version {
            continue;
        }

        let tx = conn.transaction().context("failed to start migration transaction")?;
        tx.execute_batch(sql)
            .with_context(|| format!("failed to apply folio.db migration v{version}"))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
            params![version],
        )
        .with_context(|| format!("failed to record migration v{version}"))?;
        tx.commit().with_context(|| format!("failed to commit migration v{version}"))?;
        current_version = *version;
    }

    Ok(())
}
