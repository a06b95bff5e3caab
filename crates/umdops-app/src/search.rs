// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Record, Table};

/// Case-insensitive substring match against the display form of every field.
/// An empty query keeps everything without scanning.
pub fn matches(record: &Record, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    record
        .values
        .iter()
        .any(|value| value.display().to_lowercase().contains(&needle))
}

pub fn keep_mask(table: &Table, query: &str) -> Vec<bool> {
    if query.is_empty() {
        return vec![true; table.len()];
    }
    table
        .records
        .iter()
        .map(|record| matches(record, query))
        .collect()
}

pub fn apply(table: &Table, query: &str) -> Table {
    if query.is_empty() {
        return table.clone();
    }
    table.filtered(|record| matches(record, query))
}

#[cfg(test)]
mod tests {
    use super::{apply, keep_mask, matches};
    use crate::{FieldValue, Table};
    use time::macros::date;

    fn table() -> Table {
        let mut table = Table::new("t", vec!["name".to_owned(), "date".to_owned()]);
        table.push(vec![
            FieldValue::Text("Coihueco".to_owned()),
            FieldValue::Date(date!(2024 - 05 - 17)),
        ]);
        table.push(vec![
            FieldValue::Text("Los Morados".to_owned()),
            FieldValue::Date(date!(2023 - 11 - 02)),
        ]);
        table
    }

    #[test]
    fn empty_query_keeps_every_row() {
        let table = table();
        assert_eq!(keep_mask(&table, ""), vec![true, true]);
        assert_eq!(apply(&table, ""), table);
    }

    #[test]
    fn match_is_case_insensitive() {
        let table = table();
        assert!(matches(&table.records[1], "MORADOS"));
        assert!(!matches(&table.records[0], "morados"));
    }

    #[test]
    fn dates_match_on_display_form() {
        let table = table();
        assert_eq!(keep_mask(&table, "2024-05"), vec![true, false]);
    }

    #[test]
    fn query_matching_nothing_yields_empty_table() {
        let table = table();
        let result = apply(&table, "zzz");
        assert!(result.is_empty());
        assert_eq!(result.columns, table.columns);
    }
}
