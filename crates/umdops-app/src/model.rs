// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{DefaultHasher, Hash, Hasher};
use time::Date;
use time::macros::format_description;

static EMPTY: FieldValue = FieldValue::Empty;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Empty,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Date(Date),
}

impl FieldValue {
    /// Canonical display form; search and categorical matching both go through it.
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Decimal(value) => value.to_string(),
            Self::Date(value) => format_date(*value),
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub const fn as_date(&self) -> Option<Date> {
        match self {
            Self::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Ordering used by result sorting. Empty values sort after everything.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Empty, Self::Empty) => Ordering::Equal,
            (Self::Empty, _) => Ordering::Greater,
            (_, Self::Empty) => Ordering::Less,
            (Self::Integer(left), Self::Integer(right)) => left.cmp(right),
            (Self::Decimal(left), Self::Decimal(right)) => left.total_cmp(right),
            (Self::Integer(left), Self::Decimal(right)) => (*left as f64).total_cmp(right),
            (Self::Decimal(left), Self::Integer(right)) => left.total_cmp(&(*right as f64)),
            (Self::Date(left), Self::Date(right)) => left.cmp(right),
            (Self::Text(left), Self::Text(right)) => left.cmp(right),
            (left, right) => left.display().cmp(&right.display()),
        }
    }
}

pub fn format_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Row position in the loaded table, stable until the next load.
    pub position: usize,
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(id: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            id: id.into(),
            columns,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, values: Vec<FieldValue>) {
        let position = self.records.len();
        self.records.push(Record { position, values });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Missing columns read as empty so page configs can name optional fields.
    pub fn value<'a>(&self, record: &'a Record, column: &str) -> &'a FieldValue {
        self.column_index(column)
            .and_then(|index| record.values.get(index))
            .unwrap_or(&EMPTY)
    }

    pub fn text(&self, record: &Record, column: &str) -> String {
        self.value(record, column).display()
    }

    /// Copy of this table keeping the records accepted by `keep`, in order.
    pub fn filtered(&self, mut keep: impl FnMut(&Record) -> bool) -> Self {
        Self {
            id: self.id.clone(),
            columns: self.columns.clone(),
            records: self
                .records
                .iter()
                .filter(|record| keep(record))
                .cloned()
                .collect(),
        }
    }

    /// Appends a computed column to every record.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        mut derive: impl FnMut(&Self, &Record) -> FieldValue,
    ) -> Self {
        let values = self
            .records
            .iter()
            .map(|record| derive(&self, record))
            .collect::<Vec<_>>();
        for (record, value) in self.records.iter_mut().zip(values) {
            record.values.push(value);
        }
        self.columns.push(name.into());
        self
    }

    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.id.hash(&mut hasher);
        for record in &self.records {
            hash_record(record, &mut hasher);
        }
        hasher.finish()
    }
}

pub(crate) fn hash_record(record: &Record, hasher: &mut impl Hasher) {
    record.position.hash(hasher);
    for value in &record.values {
        value.display().hash(hasher);
    }
}
