// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;
use time::macros::format_description;

use crate::{FieldValue, SourceError, Table};

/// Order of the day and month components in slash-separated dates.
/// ISO `YYYY-MM-DD` is accepted under both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    DayFirst,
    MonthFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseRule {
    Text,
    Integer,
    Decimal,
    Date(DateOrder),
}

impl ParseRule {
    const fn expected(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Date(_) => "date",
        }
    }

    pub fn parse(self, raw: &str) -> Option<FieldValue> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Some(FieldValue::Empty);
        }
        match self {
            Self::Text => Some(FieldValue::Text(trimmed.to_owned())),
            _ if trimmed == "-" => Some(FieldValue::Empty),
            Self::Integer => parse_integer(trimmed).map(FieldValue::Integer),
            Self::Decimal => parse_decimal(trimmed).map(FieldValue::Decimal),
            Self::Date(order) => parse_date(trimmed, order).map(FieldValue::Date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Zero-based column position in the source sheet.
    pub source_index: usize,
    pub name: &'static str,
    pub rule: ParseRule,
}

impl ColumnSpec {
    pub const fn text(source_index: usize, name: &'static str) -> Self {
        Self {
            source_index,
            name,
            rule: ParseRule::Text,
        }
    }

    pub const fn integer(source_index: usize, name: &'static str) -> Self {
        Self {
            source_index,
            name,
            rule: ParseRule::Integer,
        }
    }

    pub const fn date(source_index: usize, name: &'static str, order: DateOrder) -> Self {
        Self {
            source_index,
            name,
            rule: ParseRule::Date(order),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub table_id: &'static str,
    /// Leading rows dropped before data starts (header and banner rows).
    pub skip_rows: usize,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| column.name.to_owned())
            .collect()
    }

    /// Selects, renames and parses the declared columns of a raw cell grid.
    pub fn parse(&self, raw: Vec<Vec<String>>) -> Result<Table, SourceError> {
        let mut table = Table::new(self.table_id, self.column_names());
        for (offset, row) in raw.into_iter().enumerate().skip(self.skip_rows) {
            let cells = self
                .columns
                .iter()
                .map(|column| row.get(column.source_index).map_or("", String::as_str))
                .collect::<Vec<_>>();
            if cells.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let mut values = Vec::with_capacity(self.columns.len());
            for (column, cell) in self.columns.iter().zip(cells) {
                let value = column.rule.parse(cell).ok_or_else(|| {
                    let error = SourceError::SchemaMismatch {
                        table: self.table_id.to_owned(),
                        row: offset + 1,
                        column: column.name.to_owned(),
                        value: cell.to_owned(),
                        expected: column.rule.expected(),
                    };
                    tracing::warn!(%error, "schema mismatch");
                    error
                })?;
                values.push(value);
            }
            table.push(values);
        }
        Ok(table)
    }
}

/// Read-only access to named tables. Implementations only fetch the raw grid;
/// column selection and parsing are shared.
pub trait TabularSource {
    /// Every row of `table_id` as strings, header rows included.
    fn read(&mut self, table_id: &str) -> Result<Vec<Vec<String>>, SourceError>;

    fn load(&mut self, spec: &TableSpec) -> Result<Table, SourceError> {
        let raw = self.read(spec.table_id)?;
        let table = spec.parse(raw)?;
        tracing::debug!(table = spec.table_id, rows = table.len(), "loaded table");
        Ok(table)
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    let value = parse_decimal(raw)?;
    (value.fract() == 0.0 && value.abs() < i64::MAX as f64).then_some(value as i64)
}

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parses the date part of a cell, ignoring any trailing time of day.
pub fn parse_date(raw: &str, order: DateOrder) -> Option<Date> {
    let token = raw.split_whitespace().next()?;
    let token = token.split('T').next().unwrap_or(token);

    if let Ok(value) = Date::parse(token, &format_description!("[year]-[month]-[day]")) {
        return Some(value);
    }

    if let Some(value) = parse_slashed(token, order) {
        return Some(value);
    }

    // A two-digit year cannot be resolved to a Date by `time`; read it as 20YY.
    let (day_month, year) = token.rsplit_once('/')?;
    if year.len() != 2 || !year.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    parse_slashed(&format!("{day_month}/20{year}"), order)
}

fn parse_slashed(token: &str, order: DateOrder) -> Option<Date> {
    let parsed = match order {
        DateOrder::DayFirst => Date::parse(
            token,
            &format_description!("[day padding:none]/[month padding:none]/[year]"),
        ),
        DateOrder::MonthFirst => Date::parse(
            token,
            &format_description!("[month padding:none]/[day padding:none]/[year]"),
        ),
    };
    parsed.ok()
}

#[cfg(test)]
mod tests {
    use super::{ColumnSpec, DateOrder, ParseRule, TableSpec, TabularSource, parse_date};
    use crate::{FieldValue, SourceError};
    use time::macros::date;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| (*cell).to_owned()).collect())
            .collect()
    }

    fn spec() -> TableSpec {
        TableSpec {
            table_id: "trips",
            skip_rows: 1,
            columns: vec![
                ColumnSpec::text(2, "name"),
                ColumnSpec::date(0, "date", DateOrder::DayFirst),
            ],
        }
    }

    #[test]
    fn parse_dates_in_supported_layouts() {
        assert_eq!(
            parse_date("17/05/2024 10:22:33", DateOrder::DayFirst),
            Some(date!(2024 - 05 - 17))
        );
        assert_eq!(
            parse_date("03/01/24", DateOrder::DayFirst),
            Some(date!(2024 - 01 - 03))
        );
        assert_eq!(
            parse_date("01/03/2024", DateOrder::MonthFirst),
            Some(date!(2024 - 01 - 03))
        );
        assert_eq!(
            parse_date("2024-02-29", DateOrder::DayFirst),
            Some(date!(2024 - 02 - 29))
        );
        assert_eq!(parse_date("31/02/2024", DateOrder::DayFirst), None);
    }

    #[test]
    fn parse_dates_accept_unpadded_parts_and_reject_junk() {
        assert_eq!(
            parse_date("5/3/2024", DateOrder::DayFirst),
            Some(date!(2024 - 03 - 05))
        );
        assert_eq!(
            parse_date("5/20/2024", DateOrder::MonthFirst),
            Some(date!(2024 - 05 - 20))
        );
        assert_eq!(
            parse_date("2024-03-05T08:00:00", DateOrder::MonthFirst),
            Some(date!(2024 - 03 - 05))
        );
        assert_eq!(parse_date("20/05/2024", DateOrder::MonthFirst), None);
        assert_eq!(parse_date("1/2/3/2024", DateOrder::DayFirst), None);
        assert_eq!(parse_date("01/02/2x", DateOrder::DayFirst), None);
        assert_eq!(parse_date("soon", DateOrder::DayFirst), None);
    }

    #[test]
    fn decimals_accept_comma_separator() {
        assert_eq!(
            ParseRule::Decimal.parse("12,5"),
            Some(FieldValue::Decimal(12.5))
        );
        assert_eq!(ParseRule::Integer.parse("7.0"), Some(FieldValue::Integer(7)));
        assert_eq!(ParseRule::Integer.parse("-"), Some(FieldValue::Empty));
        assert_eq!(
            ParseRule::Text.parse("-"),
            Some(FieldValue::Text("-".to_owned()))
        );
    }

    #[test]
    fn parse_selects_renames_and_skips_blank_rows() -> Result<(), SourceError> {
        let table = spec().parse(grid(&[
            &["Timestamp", "x", "Position"],
            &["01/02/2024", "x", "Coihueco"],
            &["", "", ""],
            &["02/02/2024", "x"],
        ]))?;

        assert_eq!(table.columns, vec!["name".to_owned(), "date".to_owned()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.text(&table.records[0], "name"), "Coihueco");
        assert!(table.value(&table.records[1], "name").is_empty());
        assert_eq!(table.records[1].position, 1);
        Ok(())
    }

    #[test]
    fn unparseable_cell_is_schema_mismatch() {
        let error = spec()
            .parse(grid(&[&["h"], &["not a date", "", "A"]]))
            .expect_err("bad date should fail");
        assert_eq!(
            error,
            SourceError::SchemaMismatch {
                table: "trips".to_owned(),
                row: 2,
                column: "date".to_owned(),
                value: "not a date".to_owned(),
                expected: "date",
            }
        );
    }

    struct Fixed(Vec<Vec<String>>);

    impl TabularSource for Fixed {
        fn read(&mut self, _table_id: &str) -> Result<Vec<Vec<String>>, SourceError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn load_goes_through_read_and_parse() -> Result<(), SourceError> {
        let mut source = Fixed(grid(&[&["h"], &["05/05/2024", "", "Malargüe"]]));
        let table = source.load(&spec())?;
        assert_eq!(table.id, "trips");
        assert_eq!(table.len(), 1);
        Ok(())
    }
}
