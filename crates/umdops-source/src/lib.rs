// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, params, params_from_iter};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use umdops_app::{SourceError, TabularSource};

pub const APP_NAME: &str = "umdops";

/// Local SQLite copy of the spreadsheets. Each sheet is stored verbatim as a
/// table of text columns `c0..cN`, one SQLite row per sheet row, in sheet
/// order.
pub struct SnapshotSource {
    conn: Connection,
}

impl SnapshotSource {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_snapshot_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open snapshot at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory snapshot")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT name
                FROM sqlite_master
                WHERE type = 'table'
                  AND name NOT LIKE 'sqlite_%'
                ORDER BY name ASC
                ",
            )
            .context("prepare table names query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query table names")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect table names")
    }

    /// Replaces the stored copy of `table_id` with `grid`. Ragged rows are
    /// padded to the widest row.
    pub fn write_table(&mut self, table_id: &str, grid: &[Vec<String>]) -> Result<()> {
        if !is_safe_identifier(table_id) {
            bail!("invalid table name: {table_id:?}");
        }
        let width = grid.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let columns = (0..width).map(|index| format!("c{index}")).collect::<Vec<_>>();

        let tx = self
            .conn
            .transaction()
            .with_context(|| format!("begin write of {table_id}"))?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS \"{table_id}\"; CREATE TABLE \"{table_id}\" ({});",
            columns
                .iter()
                .map(|column| format!("{column} TEXT NOT NULL DEFAULT ''"))
                .collect::<Vec<_>>()
                .join(", ")
        ))
        .with_context(|| format!("create table {table_id}"))?;
        {
            let placeholders = vec!["?"; width].join(", ");
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO \"{table_id}\" ({}) VALUES ({placeholders})",
                    columns.join(", ")
                ))
                .with_context(|| format!("prepare insert into {table_id}"))?;
            for row in grid {
                let cells = (0..width).map(|index| row.get(index).map_or("", String::as_str));
                stmt.execute(params_from_iter(cells))
                    .with_context(|| format!("insert row into {table_id}"))?;
            }
        }
        tx.commit()
            .with_context(|| format!("commit write of {table_id}"))?;
        tracing::debug!(table = table_id, rows = grid.len(), "wrote snapshot table");
        Ok(())
    }

    fn read_grid(&self, table_id: &str) -> Result<Vec<Vec<String>>> {
        if !is_safe_identifier(table_id) {
            bail!("invalid table name: {table_id:?}");
        }
        if !table_exists(&self.conn, table_id)? {
            bail!("no such table in snapshot");
        }

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM \"{table_id}\" ORDER BY rowid"))
            .with_context(|| format!("prepare read of {table_id}"))?;
        let width = stmt.column_count();
        let mut rows = stmt
            .query([])
            .with_context(|| format!("query {table_id}"))?;

        let mut grid = Vec::new();
        while let Some(row) = rows.next().with_context(|| format!("scan {table_id}"))? {
            let mut output = Vec::with_capacity(width);
            for index in 0..width {
                let value = row
                    .get_ref(index)
                    .map(value_ref_to_string)
                    .with_context(|| format!("read column {index} of {table_id}"))?;
                output.push(value);
            }
            grid.push(output);
        }
        Ok(grid)
    }
}

impl TabularSource for SnapshotSource {
    fn read(&mut self, table_id: &str) -> Result<Vec<Vec<String>>, SourceError> {
        self.read_grid(table_id)
            .map_err(|error| SourceError::unavailable(table_id, format!("{error:#}")))
    }
}

/// Copies every listed table from `from` into the snapshot, stopping at the
/// first table that cannot be read.
pub fn sync_tables(
    from: &mut impl TabularSource,
    into: &mut SnapshotSource,
    table_ids: &[&str],
) -> Result<usize> {
    let mut rows = 0;
    for table_id in table_ids {
        let grid = from
            .read(table_id)
            .with_context(|| format!("fetch {table_id} for snapshot"))?;
        into.write_table(table_id, &grid)?;
        rows += grid.len();
    }
    tracing::info!(tables = table_ids.len(), rows, "snapshot synced");
    Ok(rows)
}

pub fn default_snapshot_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("UMDOPS_SNAPSHOT_PATH") {
        return Ok(PathBuf::from(override_path));
    }
    Ok(data_dir()?.join("snapshot.db"))
}

pub fn default_log_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("umdops.log"))
}

fn data_dir() -> Result<PathBuf> {
    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set UMDOPS_SNAPSHOT_PATH to a writable path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir)
}

pub fn photo_cache_dir() -> Result<PathBuf> {
    let cache_root = dirs::cache_dir().ok_or_else(|| {
        anyhow!("cannot resolve cache directory; set XDG_CACHE_HOME or platform equivalent")
    })?;
    let dir = cache_root.join(APP_NAME).join("photos");
    fs::create_dir_all(&dir)
        .with_context(|| format!("create cache directory {}", dir.display()))?;
    Ok(dir)
}

pub fn evict_stale_cache(dir: &Path, ttl_days: i64) -> Result<usize> {
    if ttl_days <= 0 || !dir.exists() {
        return Ok(0);
    }

    let ttl_secs = u64::try_from(ttl_days)
        .ok()
        .and_then(|days| days.checked_mul(24 * 60 * 60))
        .ok_or_else(|| anyhow!("ttl_days is too large: {ttl_days}"))?;
    let ttl = Duration::from_secs(ttl_secs);
    let now = std::time::SystemTime::now();

    let mut removed = 0usize;
    for entry in fs::read_dir(dir).with_context(|| format!("read cache dir {}", dir.display()))? {
        let entry = entry?;
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.is_dir() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if now.duration_since(modified).unwrap_or(Duration::ZERO) > ttl
            && fs::remove_file(entry.path()).is_ok()
        {
            removed += 1;
        }
    }

    if removed > 0 {
        tracing::info!(removed, dir = %dir.display(), "evicted stale photos");
    }
    Ok(removed)
}

pub fn validate_snapshot_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("snapshot path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "snapshot path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("snapshot path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "snapshot path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn value_ref_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(value) => value.to_string(),
        ValueRef::Real(value) => value.to_string(),
        ValueRef::Text(value) => String::from_utf8_lossy(value).into_owned(),
        ValueRef::Blob(value) => format!("{value:?}"),
    }
}

fn is_safe_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}
