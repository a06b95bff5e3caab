// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

/// Failures at the tabular-source boundary. Both are fatal for the page that
/// asked for the table; nothing inside the pipeline produces them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("table `{table}` is unavailable: {reason}")]
    SourceUnavailable { table: String, reason: String },

    #[error("table `{table}` row {row} column `{column}`: {value:?} is not a valid {expected}")]
    SchemaMismatch {
        table: String,
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },
}

impl SourceError {
    pub fn unavailable(table: &str, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            table: table.to_owned(),
            reason: reason.into(),
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::SourceUnavailable { table, .. } | Self::SchemaMismatch { table, .. } => table,
        }
    }
}

/// Failures of the image-fetch collaborator. Callers degrade to showing the
/// link instead of the image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageFetchError {
    #[error("image not found; it may have been deleted or is not shared publicly")]
    NotFound,

    #[error("image fetch failed: {0}")]
    FetchError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("password digest for user `{user}` is not 64 hex characters")]
    InvalidDigest { user: String },
}
