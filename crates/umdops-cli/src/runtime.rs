// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::config::{Config, SourceKind};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use time::{Date, OffsetDateTime};
use umdops_app::pages::{self, TABLE_IDS};
use umdops_app::{Credentials, ImageFetchError, TabularSource};
use umdops_remote::PhotoClient;
use umdops_source::{SnapshotSource, sync_tables};
use umdops_testkit::SheetFaker;

pub const DEMO_SEED: u64 = 20_240_630;
pub const DEMO_USER: &str = "demo";

pub struct DashboardServices {
    source: Box<dyn TabularSource>,
    credentials: Credentials,
    photos: PhotoClient,
    photo_cache: PathBuf,
    map_url: String,
}

impl DashboardServices {
    pub fn new(
        source: Box<dyn TabularSource>,
        credentials: Credentials,
        photos: PhotoClient,
        photo_cache: PathBuf,
        map_url: &str,
    ) -> Self {
        Self {
            source,
            credentials,
            photos,
            photo_cache,
            map_url: map_url.to_owned(),
        }
    }
}

impl umdops_tui::DashboardRuntime for DashboardServices {
    fn source(&mut self) -> &mut dyn TabularSource {
        self.source.as_mut()
    }

    fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn fetch_photo(&mut self, link: &str) -> Result<PathBuf, ImageFetchError> {
        self.photos.fetch_cached(link, &self.photo_cache)
    }

    fn map_url(&self) -> &str {
        &self.map_url
    }

    fn today(&self) -> Date {
        OffsetDateTime::now_utc().date()
    }
}

/// Opens the source named by `[source].kind`.
pub fn open_source(config: &Config) -> Result<Box<dyn TabularSource>> {
    match config.source_kind() {
        SourceKind::Snapshot => {
            let path = config.snapshot_path()?;
            if !path.exists() {
                bail!(
                    "snapshot {} does not exist; run `umdops --sync` or set [source].kind = \"sheets\"",
                    path.display()
                );
            }
            let snapshot = SnapshotSource::open(&path).with_context(|| {
                format!(
                    "open snapshot {} -- if this path is wrong, set [source].snapshot_path or UMDOPS_SNAPSHOT_PATH",
                    path.display()
                )
            })?;
            Ok(Box::new(snapshot))
        }
        SourceKind::Sheets => Ok(Box::new(config.sheets_client()?)),
    }
}

/// In-memory snapshot filled with generated sheets ending at `today`.
pub fn demo_source(today: Date) -> Result<SnapshotSource> {
    let mut snapshot = SnapshotSource::open_memory()?;
    let mut workbook = SheetFaker::new(DEMO_SEED).workbook(today);
    sync_tables(&mut workbook, &mut snapshot, &TABLE_IDS)?;
    Ok(snapshot)
}

pub fn demo_credentials() -> Credentials {
    Credentials::default().with_password(DEMO_USER, DEMO_USER)
}

/// Pulls every table from the live sheets into the snapshot file.
pub fn sync_snapshot(config: &Config) -> Result<(PathBuf, usize)> {
    let mut sheets = config.sheets_client()?;
    let path = config.snapshot_path()?;
    let mut snapshot = SnapshotSource::open(&path)
        .with_context(|| format!("open snapshot {} for sync", path.display()))?;
    let rows = sync_tables(&mut sheets, &mut snapshot, &TABLE_IDS)?;
    Ok((path, rows))
}

/// Loads and parses every table a page reads. Returns the total row count.
pub fn check_tables(source: &mut dyn TabularSource) -> Result<usize> {
    let mut rows = 0;
    for config in [pages::field_work(), pages::acquisitions()] {
        rows += config.load(source)?.len();
    }
    for spec in [
        pages::stock_table(),
        pages::history_table(),
        pages::umd_details_table(),
    ] {
        rows += source.load(&spec)?.len();
    }
    Ok(rows)
}

pub fn prepare_photo_cache(config: &Config) -> Result<(PathBuf, usize)> {
    let dir = umdops_source::photo_cache_dir()?;
    let removed = evict(&dir, config.cache_ttl_days())?;
    Ok((dir, removed))
}

fn evict(dir: &Path, ttl_days: i64) -> Result<usize> {
    let removed = umdops_source::evict_stale_cache(dir, ttl_days)?;
    if removed > 0 {
        tracing::info!(removed, dir = %dir.display(), "evicted stale photos");
    }
    Ok(removed)
}
