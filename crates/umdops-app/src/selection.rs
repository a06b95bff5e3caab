// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Language, Record, ResultProjection, Table, View, ViewRow};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a ViewRow),
    /// Treated exactly like "nothing selected".
    NotFound,
}

impl<'a> Lookup<'a> {
    pub fn row(self) -> Option<&'a ViewRow> {
        match self {
            Self::Found(row) => Some(row),
            Self::NotFound => None,
        }
    }
}

/// Maps an index into the displayed rows back to the full record.
pub fn resolve(view: &View, index: i64) -> Lookup<'_> {
    usize::try_from(index)
        .ok()
        .and_then(|index| view.rows.get(index))
        .map_or(Lookup::NotFound, Lookup::Found)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Disambiguation {
    /// Exactly one record shares the key; its report can be shown.
    Direct(Record),
    /// Several records share the key; a second selection is needed.
    Choose(View),
    /// Nobody shares the key, not even the primary record.
    Missing,
}

/// Collects every record of `source` that agrees with `primary` on all
/// `key_fields`.
pub fn disambiguate(
    source: &Table,
    primary: &Record,
    key_fields: &[&str],
    projection: &ResultProjection,
    language: Language,
) -> Disambiguation {
    let group = source.filtered(|record| {
        key_fields
            .iter()
            .all(|field| source.value(record, field) == source.value(primary, field))
    });
    match group.len() {
        0 => {
            tracing::warn!(
                table = %source.id,
                position = primary.position,
                "selected record has no group in its source table"
            );
            Disambiguation::Missing
        }
        1 => Disambiguation::Direct(group.records[0].clone()),
        _ => Disambiguation::Choose(projection.project(&group, language)),
    }
}
