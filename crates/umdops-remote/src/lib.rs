// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use umdops_app::photos::drive_file_id;
use umdops_app::{ImageFetchError, SourceError, TabularSource};
use url::Url;

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
pub const DEFAULT_PHOTOS_BASE_URL: &str = "https://drive.google.com";

/// Where one dashboard table lives in the spreadsheets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    pub spreadsheet_id: String,
    pub range: String,
}

/// Reads raw grids through the Sheets v4 values API.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    base_url: Url,
    api_key: String,
    tables: BTreeMap<String, SheetRange>,
    http: HttpClient,
}

impl SheetsClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        tables: BTreeMap<String, SheetRange>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = parse_base_url(base_url, "source.sheets_base_url")?;
        if api_key.trim().is_empty() {
            bail!("source.api_key must not be empty for the sheets source");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            api_key: api_key.to_owned(),
            tables,
            http,
        })
    }

    pub fn table_ids(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn values_url(&self, range: &SheetRange) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("base url {} cannot have a path", self.base_url))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                range.spreadsheet_id.as_str(),
                "values",
                range.range.as_str(),
            ]);
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    pub fn fetch_values(&self, range: &SheetRange) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range)?;
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: ValuesResponse = response.json().context("decode sheet values")?;
        Ok(parsed
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

impl TabularSource for SheetsClient {
    fn read(&mut self, table_id: &str) -> Result<Vec<Vec<String>>, SourceError> {
        let Some(range) = self.tables.get(table_id) else {
            return Err(SourceError::unavailable(
                table_id,
                format!("no [source.tables.{table_id}] entry in config"),
            ));
        };
        self.fetch_values(range).map_err(|error| {
            tracing::warn!(table = table_id, error = %format!("{error:#}"), "sheet fetch failed");
            SourceError::unavailable(table_id, format!("{error:#}"))
        })
    }
}

/// Fetches Drive photos through the public `uc?export=view` endpoint.
#[derive(Debug, Clone)]
pub struct PhotoClient {
    base_url: Url,
    http: HttpClient,
}

impl PhotoClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url, "photos.base_url")?;
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { base_url, http })
    }

    pub fn view_url(&self, link: &str) -> Result<Url, ImageFetchError> {
        let id = drive_file_id(link)
            .ok_or_else(|| ImageFetchError::FetchError(format!("no file id in {link}")))?;
        let mut url = self
            .base_url
            .join("uc")
            .map_err(|error| ImageFetchError::FetchError(error.to_string()))?;
        url.query_pairs_mut()
            .append_pair("export", "view")
            .append_pair("id", id);
        Ok(url)
    }

    /// Single attempt; a 404 is reported separately from other failures.
    pub fn fetch_image(&self, link: &str) -> Result<Vec<u8>, ImageFetchError> {
        let url = self.view_url(link)?;
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| ImageFetchError::FetchError(error.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ImageFetchError::NotFound);
        }
        if !status.is_success() {
            return Err(ImageFetchError::FetchError(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|error| ImageFetchError::FetchError(error.to_string()))?;
        if bytes.is_empty() {
            return Err(ImageFetchError::FetchError("empty response".to_owned()));
        }
        Ok(bytes.to_vec())
    }

    /// Returns the cached copy of `link` under `cache_dir`, fetching it first
    /// when absent.
    pub fn fetch_cached(&self, link: &str, cache_dir: &Path) -> Result<PathBuf, ImageFetchError> {
        let id = drive_file_id(link)
            .ok_or_else(|| ImageFetchError::FetchError(format!("no file id in {link}")))?;
        let path = cache_dir.join(cache_file_name(id));
        if path.is_file() {
            return Ok(path);
        }

        let bytes = self.fetch_image(link).inspect_err(|error| {
            tracing::warn!(link, %error, "photo unavailable");
        })?;
        write_atomically(cache_dir, &path, &bytes).map_err(|error| {
            ImageFetchError::FetchError(format!("write {}: {error}", path.display()))
        })?;
        tracing::debug!(link, path = %path.display(), "cached photo");
        Ok(path)
    }
}

/// Writes into a temporary file beside `path` and renames it into place, so
/// readers never see a partial image.
fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut partial = NamedTempFile::new_in(dir)?;
    partial.write_all(bytes)?;
    partial.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: Option<GoogleErrorBody>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: String,
}

fn parse_base_url(raw: &str, key: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("{key} must not be empty");
    }
    let url = Url::parse(trimmed).with_context(|| format!("{key} {trimmed:?} is not a URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{key} must use http or https, got {}", url.scheme());
    }
    Ok(url)
}

fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn cache_file_name(id: &str) -> String {
    id.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

fn connection_error(base_url: &Url, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {base_url} -- check [source].sheets_base_url and network access ({error})"
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<GoogleErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), error.message);
    }

    if body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}
