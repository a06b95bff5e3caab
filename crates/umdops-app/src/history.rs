// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;

use crate::pages::{MODULE_SLOTS, module_field};
use crate::{Record, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockPoint {
    pub date: Date,
    pub assembled: i64,
}

/// One of the three module slots at an installed position. Geometry stays
/// as sheet text and is parsed only when drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSlot {
    pub module: u16,
    pub id: String,
    pub rotation_angle: String,
    pub radial_distance: String,
    pub position_angle: String,
    pub ekit: String,
}

impl ModuleSlot {
    pub fn is_installed(&self) -> bool {
        self.id.starts_with("M-")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub position: String,
    pub id: Option<i64>,
    pub install_date: Date,
    pub modules: Vec<ModuleSlot>,
}

impl Installation {
    fn from_record(table: &Table, record: &Record) -> Option<Self> {
        let install_date = table.value(record, "install_date").as_date()?;
        Some(Self {
            position: table.text(record, "position"),
            id: table.value(record, "id").as_integer(),
            install_date,
            modules: MODULE_SLOTS
                .iter()
                .map(|module| ModuleSlot {
                    module: *module,
                    id: table.text(record, module_field("id", *module)),
                    rotation_angle: table.text(record, module_field("rotation_angle", *module)),
                    radial_distance: table.text(record, module_field("radial_distance", *module)),
                    position_angle: table.text(record, module_field("position_angle", *module)),
                    ekit: table.text(record, module_field("ekit", *module)),
                })
                .collect(),
        })
    }

    pub fn modules_installed(&self) -> i64 {
        self.modules
            .iter()
            .filter(|module| module.is_installed())
            .count() as i64
    }

    pub fn module(&self, umd_id: &str) -> Option<&ModuleSlot> {
        self.modules.iter().find(|module| module.id == umd_id)
    }
}

/// Installed positions ordered by install date. Rows without a date are
/// positions that were never installed and are left out.
pub fn installations(history: &Table) -> Vec<Installation> {
    let mut rows = history
        .records
        .iter()
        .filter_map(|record| Installation::from_record(history, record))
        .collect::<Vec<_>>();
    rows.sort_by_key(|row| row.install_date);
    rows
}

/// Assembly counts by date. Incomplete rows are skipped.
pub fn stock_points(stock: &Table) -> Vec<StockPoint> {
    stock
        .records
        .iter()
        .filter_map(|record| {
            Some(StockPoint {
                date: stock.value(record, "date").as_date()?,
                assembled: stock.value(record, "assembled").as_integer()?,
            })
        })
        .collect()
}
