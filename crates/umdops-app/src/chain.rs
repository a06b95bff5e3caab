// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};

use crate::{Record, Table, Text};

/// A slot's current value. `Unselected` passes every record through; it is
/// distinct from selecting an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Choice {
    #[default]
    Unselected,
    Exact(String),
}

impl Choice {
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact(value.into())
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Unselected => None,
            Self::Exact(value) => Some(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionOrder {
    Sorted,
    FirstSeen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalSlot {
    pub key: &'static str,
    pub label: Text,
    pub placeholder: Text,
    /// A record matches when any of these fields equals the choice.
    pub columns: Vec<&'static str>,
    pub order: OptionOrder,
    /// Values never offered, such as the `-` placeholder in module ids.
    pub ignored: Vec<&'static str>,
}

impl CategoricalSlot {
    pub fn new(key: &'static str, column: &'static str, label: Text, placeholder: Text) -> Self {
        Self {
            key,
            label,
            placeholder,
            columns: vec![column],
            order: OptionOrder::Sorted,
            ignored: Vec::new(),
        }
    }

    #[must_use]
    pub fn first_seen(mut self) -> Self {
        self.order = OptionOrder::FirstSeen;
        self
    }

    #[must_use]
    pub fn across(mut self, columns: Vec<&'static str>, ignored: Vec<&'static str>) -> Self {
        self.columns = columns;
        self.ignored = ignored;
        self
    }

    fn candidates<'a>(
        &'a self,
        table: &'a Table,
        record: &'a Record,
    ) -> impl Iterator<Item = String> + 'a {
        self.columns
            .iter()
            .map(move |column| table.value(record, column))
            .filter(|value| !value.is_empty())
            .map(|value| value.display())
            .filter(move |value| !self.ignored.contains(&value.as_str()))
    }

    /// Distinct non-empty values of this slot's fields in `table`.
    pub fn offered(&self, table: &Table) -> Vec<String> {
        match self.order {
            OptionOrder::Sorted => {
                let mut seen = BTreeSet::new();
                for record in &table.records {
                    seen.extend(self.candidates(table, record));
                }
                seen.into_iter().collect()
            }
            OptionOrder::FirstSeen => {
                let mut seen = BTreeSet::new();
                let mut offered = Vec::new();
                for record in &table.records {
                    for value in self.candidates(table, record) {
                        if seen.insert(value.clone()) {
                            offered.push(value);
                        }
                    }
                }
                offered
            }
        }
    }

    pub fn matches(&self, table: &Table, record: &Record, value: &str) -> bool {
        self.columns
            .iter()
            .any(|column| table.value(record, column).display() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotOutcome {
    pub key: &'static str,
    pub offered: Vec<String>,
    pub choice: Choice,
    /// The stored choice was no longer offered and fell back to `Unselected`.
    pub dropped: bool,
}

impl SlotOutcome {
    /// Next choice when stepping through `Unselected` followed by the offered values.
    pub fn step(&self, forward: bool) -> Choice {
        let count = self.offered.len() + 1;
        let current = match &self.choice {
            Choice::Unselected => 0,
            Choice::Exact(value) => self
                .offered
                .iter()
                .position(|offered| offered == value)
                .map_or(0, |index| index + 1),
        };
        let next = if forward {
            (current + 1) % count
        } else {
            (current + count - 1) % count
        };
        match next {
            0 => Choice::Unselected,
            index => Choice::Exact(self.offered[index - 1].clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub slots: Vec<SlotOutcome>,
    pub view: Table,
}

impl ChainOutcome {
    /// Choices after stale values were dropped, ready to store back.
    pub fn choices(&self) -> BTreeMap<String, Choice> {
        self.slots
            .iter()
            .map(|slot| (slot.key.to_owned(), slot.choice.clone()))
            .collect()
    }
}

/// Dependent dropdowns: each slot's options come from the records left by the
/// slots declared before it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoricalFilterChain {
    pub slots: Vec<CategoricalSlot>,
}

impl CategoricalFilterChain {
    pub fn new(slots: Vec<CategoricalSlot>) -> Self {
        Self { slots }
    }

    pub fn evaluate(&self, table: &Table, choices: &BTreeMap<String, Choice>) -> ChainOutcome {
        let mut current = table.clone();
        let mut outcomes = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let offered = slot.offered(&current);
            let stored = choices.get(slot.key).cloned().unwrap_or_default();
            let (choice, dropped) = match stored {
                Choice::Exact(value) if !offered.contains(&value) => {
                    tracing::warn!(slot = slot.key, %value, "dropping stale filter choice");
                    (Choice::Unselected, true)
                }
                other => (other, false),
            };
            if let Choice::Exact(value) = &choice {
                current = current.filtered(|record| slot.matches(table, record, value));
            }
            outcomes.push(SlotOutcome {
                key: slot.key,
                offered,
                choice,
                dropped,
            });
        }
        ChainOutcome {
            slots: outcomes,
            view: current,
        }
    }
}
