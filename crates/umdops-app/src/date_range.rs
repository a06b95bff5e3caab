// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;

use crate::Table;

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    pub const fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    pub fn covers(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRangeFilter {
    pub column: &'static str,
}

impl DateRangeFilter {
    pub const fn new(column: &'static str) -> Self {
        Self { column }
    }

    /// Earliest and latest dates in the whole table, or `today` twice when
    /// the table has no dates.
    pub fn bounds(&self, table: &Table, today: Date) -> DateRange {
        let mut dates = table
            .records
            .iter()
            .filter_map(|record| table.value(record, self.column).as_date());
        let Some(first) = dates.next() else {
            return DateRange::new(today, today);
        };
        let (start, end) = dates.fold((first, first), |(start, end), date| {
            (start.min(date), end.max(date))
        });
        DateRange::new(start, end)
    }

    /// Keeps records dated inside `range`. An inverted range keeps nothing.
    /// Undated records survive only while `range` still spans `bounds`.
    pub fn apply(&self, table: &Table, range: DateRange, bounds: DateRange) -> Table {
        if range.is_inverted() {
            return table.filtered(|_| false);
        }
        let keep_undated = range.covers(&bounds);
        table.filtered(|record| match table.value(record, self.column).as_date() {
            Some(date) => range.contains(date),
            None => keep_undated,
        })
    }
}
