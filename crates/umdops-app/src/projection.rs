// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::model::hash_record;
use crate::{Language, Record, Table, Text, photo_indicator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    Plain,
    /// Counts Drive links in the field instead of showing them.
    PhotoCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectedColumn {
    pub field: &'static str,
    pub label: Text,
    pub format: CellFormat,
}

impl ProjectedColumn {
    pub const fn plain(field: &'static str, label: Text) -> Self {
        Self {
            field,
            label,
            format: CellFormat::Plain,
        }
    }

    pub const fn photos(field: &'static str) -> Self {
        Self {
            field,
            label: Text::Photos,
            format: CellFormat::PhotoCount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultProjection {
    pub columns: Vec<ProjectedColumn>,
    pub sort_key: &'static str,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub cells: Vec<String>,
    /// The full source record behind this row.
    pub record: Record,
}

/// Rows as displayed. Selection indices point into `rows`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct View {
    pub headers: Vec<String>,
    pub rows: Vec<ViewRow>,
}

impl View {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.rows.len().hash(&mut hasher);
        for row in &self.rows {
            hash_record(&row.record, &mut hasher);
        }
        hasher.finish()
    }

    #[must_use]
    pub fn retain(mut self, keep: impl FnMut(&ViewRow) -> bool) -> Self {
        self.rows.retain(keep);
        self
    }
}

impl ResultProjection {
    /// Stable sort on `sort_key`; empty values stay at the end either way.
    pub fn project(&self, table: &Table, language: Language) -> View {
        let mut records = table.records.iter().collect::<Vec<_>>();
        records.sort_by(|left, right| {
            let left = table.value(left, self.sort_key);
            let right = table.value(right, self.sort_key);
            match (left.is_empty(), right.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => match self.direction {
                    SortDirection::Ascending => left.compare(right),
                    SortDirection::Descending => right.compare(left),
                },
            }
        });

        View {
            headers: self
                .columns
                .iter()
                .map(|column| column.label.get(language).to_owned())
                .collect(),
            rows: records
                .into_iter()
                .map(|record| ViewRow {
                    cells: self
                        .columns
                        .iter()
                        .map(|column| {
                            let text = table.text(record, column.field);
                            match column.format {
                                CellFormat::Plain => text,
                                CellFormat::PhotoCount => photo_indicator(&text, language),
                            }
                        })
                        .collect(),
                    record: record.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ProjectedColumn, ResultProjection, SortDirection};
    use crate::{FieldValue, Language, Table, Text};
    use time::macros::date;

    fn table() -> Table {
        let mut table = Table::new(
            "t",
            vec!["date".to_owned(), "status".to_owned(), "photos".to_owned()],
        );
        let rows = [
            (Some(date!(2024 - 01 - 05)), "Open", ""),
            (None, "Closed", ""),
            (Some(date!(2024 - 03 - 01)), "Open", "https://drive.google.com/open?id=x"),
            (Some(date!(2024 - 02 - 01)), "Closed", ""),
        ];
        for (date, status, photos) in rows {
            table.push(vec![
                date.map_or(FieldValue::Empty, FieldValue::Date),
                FieldValue::Text(status.to_owned()),
                FieldValue::Text(photos.to_owned()),
            ]);
        }
        table
    }

    fn positions(view: &super::View) -> Vec<usize> {
        view.rows.iter().map(|row| row.record.position).collect()
    }

    #[test]
    fn descending_dates_keep_empty_last() {
        let projection = ResultProjection {
            columns: vec![
                ProjectedColumn::plain("date", Text::ColumnDate),
                ProjectedColumn::photos("photos"),
            ],
            sort_key: "date",
            direction: SortDirection::Descending,
        };
        let view = projection.project(&table(), Language::En);
        assert_eq!(positions(&view), vec![2, 3, 0, 1]);
        assert_eq!(view.headers, vec!["Date", "Photos"]);
        assert_eq!(view.rows[0].cells, vec!["2024-03-01", "Contains 1 📷"]);
        assert_eq!(view.rows[3].cells[0], "");
    }

    #[test]
    fn ascending_sort_is_stable() {
        let projection = ResultProjection {
            columns: vec![ProjectedColumn::plain("status", Text::ColumnStatus)],
            sort_key: "status",
            direction: SortDirection::Ascending,
        };
        let view = projection.project(&table(), Language::Es);
        assert_eq!(positions(&view), vec![1, 3, 0, 2]);
        assert_eq!(view.headers, vec!["Estado"]);
    }

    #[test]
    fn fingerprint_tracks_row_identity() {
        let projection = ResultProjection {
            columns: vec![ProjectedColumn::plain("status", Text::ColumnStatus)],
            sort_key: "status",
            direction: SortDirection::Ascending,
        };
        let full = projection.project(&table(), Language::En);
        let narrowed = full.clone().retain(|row| row.record.position != 0);
        assert_ne!(full.fingerprint(), narrowed.fingerprint());
        assert_eq!(full.fingerprint(), projection.project(&table(), Language::Es).fingerprint());
    }
}
