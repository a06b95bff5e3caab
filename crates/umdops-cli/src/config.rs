// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use umdops_app::pages::TABLE_IDS;
use umdops_app::{Credentials, Language};
use umdops_remote::{DEFAULT_PHOTOS_BASE_URL, DEFAULT_SHEETS_BASE_URL, SheetRange, SheetsClient};

const CONFIG_VERSION: i64 = 1;
const DEFAULT_MAP_URL: &str = "https://amiga-map.ahuekna.org.ar";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_CACHE_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub photos: Photos,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            source: Source::default(),
            auth: Auth::default(),
            ui: Ui::default(),
            photos: Photos::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Snapshot,
    Sheets,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Source {
    pub kind: Option<SourceKind>,
    pub snapshot_path: Option<String>,
    pub sheets_base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<String>,
    #[serde(default)]
    pub tables: BTreeMap<String, TableRange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableRange {
    pub spreadsheet_id: String,
    pub range: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Auth {
    /// Username to lowercase hex SHA-256 of the password.
    #[serde(default)]
    pub users: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub language: Option<String>,
    pub map_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Photos {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
    pub cache_ttl_days: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("UMDOPS_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set UMDOPS_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(umdops_source::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` at the top",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(snapshot_path) = &self.source.snapshot_path {
            umdops_source::validate_snapshot_path(snapshot_path)?;
        }

        for table_id in self.source.tables.keys() {
            if !TABLE_IDS.contains(&table_id.as_str()) {
                bail!(
                    "unknown table [source.tables.{table_id}] in {}; expected one of {}",
                    path.display(),
                    TABLE_IDS.join(", ")
                );
            }
        }

        for (key, value) in [
            ("source.timeout", &self.source.timeout),
            ("photos.timeout", &self.photos.timeout),
        ] {
            if let Some(raw) = value
                && parse_duration(raw)? <= Duration::ZERO
            {
                bail!("{key} in {} must be positive, got {raw}", path.display());
            }
        }

        if let Some(ttl_days) = self.photos.cache_ttl_days
            && ttl_days < 0
        {
            bail!(
                "photos.cache_ttl_days in {} must be non-negative, got {}",
                path.display(),
                ttl_days
            );
        }

        if let Some(language) = &self.ui.language
            && Language::parse(language).is_none()
        {
            bail!(
                "ui.language in {} must be \"en\" or \"es\", got {language:?}",
                path.display()
            );
        }

        if let Some(level) = &self.log.level {
            EnvFilter::try_new(level).with_context(|| {
                format!("log.level {level:?} in {} is not a valid filter", path.display())
            })?;
        }

        self.credentials()
            .with_context(|| format!("invalid [auth.users] in {}", path.display()))?;
        Ok(())
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind.unwrap_or_default()
    }

    pub fn snapshot_path(&self) -> Result<PathBuf> {
        match &self.source.snapshot_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => umdops_source::default_snapshot_path(),
        }
    }

    pub fn sheets_base_url(&self) -> &str {
        self.source
            .sheets_base_url
            .as_deref()
            .unwrap_or(DEFAULT_SHEETS_BASE_URL)
    }

    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = &self.source.api_key {
            return Ok(key.clone());
        }
        env::var("UMDOPS_API_KEY").map_err(|_| {
            anyhow!("no sheets API key; set [source].api_key or UMDOPS_API_KEY")
        })
    }

    pub fn source_timeout(&self) -> Result<Duration> {
        parse_duration(self.source.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn sheet_ranges(&self) -> BTreeMap<String, SheetRange> {
        self.source
            .tables
            .iter()
            .map(|(table_id, table)| {
                (
                    table_id.clone(),
                    SheetRange {
                        spreadsheet_id: table.spreadsheet_id.clone(),
                        range: table.range.clone(),
                    },
                )
            })
            .collect()
    }

    pub fn sheets_client(&self) -> Result<SheetsClient> {
        SheetsClient::new(
            self.sheets_base_url(),
            &self.api_key()?,
            self.sheet_ranges(),
            self.source_timeout()?,
        )
        .context("invalid [source] sheets settings; fix sheets_base_url, api_key or timeout")
    }

    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::from_hex(
            self.auth
                .users
                .iter()
                .map(|(user, digest)| (user.as_str(), digest.as_str())),
        )
        .map_err(anyhow::Error::from)
    }

    pub fn language(&self) -> Language {
        self.ui
            .language
            .as_deref()
            .and_then(Language::parse)
            .unwrap_or_default()
    }

    pub fn map_url(&self) -> &str {
        self.ui.map_url.as_deref().unwrap_or(DEFAULT_MAP_URL)
    }

    pub fn photos_base_url(&self) -> &str {
        self.photos
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_PHOTOS_BASE_URL)
    }

    pub fn photos_timeout(&self) -> Result<Duration> {
        parse_duration(self.photos.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn cache_ttl_days(&self) -> i64 {
        self.photos.cache_ttl_days.unwrap_or(DEFAULT_CACHE_TTL_DAYS)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log.file {
            Some(path) => Ok(PathBuf::from(path)),
            None => umdops_source::default_log_path(),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# umdops config\n# Place this file at: {}\n\nversion = 1\n\n[source]\n# \"snapshot\" reads the local SQLite copy; \"sheets\" reads Google Sheets live.\nkind = \"snapshot\"\n# Optional. Default is platform data dir (for example ~/.local/share/umdops/snapshot.db)\n# snapshot_path = \"/absolute/path/to/snapshot.db\"\nsheets_base_url = \"{}\"\n# api_key = \"...\"  (or set UMDOPS_API_KEY)\ntimeout = \"{}\"\n\n[source.tables.field_work]\nspreadsheet_id = \"<spreadsheet id>\"\nrange = \"Form responses 1\"\n\n[source.tables.acquisitions]\nspreadsheet_id = \"<spreadsheet id>\"\nrange = \"Issues\"\n\n[source.tables.stats_stock]\nspreadsheet_id = \"<spreadsheet id>\"\nrange = \"Stock\"\n\n[source.tables.stats_history]\nspreadsheet_id = \"<spreadsheet id>\"\nrange = \"History\"\n\n[source.tables.umd_details]\nspreadsheet_id = \"<spreadsheet id>\"\nrange = \"Details\"\n\n[auth.users]\n# username = \"<lowercase hex sha256 of the password>\"\n\n[ui]\nlanguage = \"en\"\nmap_url = \"{}\"\n\n[photos]\nbase_url = \"{}\"\ntimeout = \"{}\"\ncache_ttl_days = {}\n\n[log]\nlevel = \"{}\"\n# file = \"/absolute/path/to/umdops.log\"\n",
            path.display(),
            DEFAULT_SHEETS_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_MAP_URL,
            DEFAULT_PHOTOS_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_CACHE_TTL_DAYS,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
