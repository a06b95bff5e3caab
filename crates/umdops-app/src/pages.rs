// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use regex::Regex;
use std::sync::LazyLock;

use crate::{
    CategoricalFilterChain, CategoricalSlot, ColumnSpec, DateOrder, DateRangeFilter, FieldValue,
    PageConfig, PageId, ProjectedColumn, ResultProjection, SortDirection, Table, TableSpec, Text,
};

pub const FIELD_WORK_TABLE: &str = "field_work";
pub const ACQUISITIONS_TABLE: &str = "acquisitions";
pub const STOCK_TABLE: &str = "stats_stock";
pub const HISTORY_TABLE: &str = "stats_history";
pub const UMD_DETAILS_TABLE: &str = "umd_details";

pub const TABLE_IDS: [&str; 5] = [
    FIELD_WORK_TABLE,
    ACQUISITIONS_TABLE,
    STOCK_TABLE,
    HISTORY_TABLE,
    UMD_DETAILS_TABLE,
];

/// Module slots of one installation row, in sheet order.
pub const MODULE_SLOTS: [u16; 3] = [101, 102, 103];

pub fn field_work() -> PageConfig {
    PageConfig {
        id: PageId::FieldWork,
        table: TableSpec {
            table_id: FIELD_WORK_TABLE,
            skip_rows: 1,
            columns: vec![
                ColumnSpec::text(1, "content"),
                ColumnSpec::text(2, "position(id)"),
                ColumnSpec::text(3, "type"),
                ColumnSpec::text(5, "team"),
                ColumnSpec::date(6, "date", DateOrder::DayFirst),
                ColumnSpec::text(54, "photos"),
            ],
        },
        derive: Some(split_position_id),
        chain: CategoricalFilterChain::new(vec![
            CategoricalSlot::new("position", "name", Text::Position, Text::PositionPlaceholder),
            CategoricalSlot::new(
                "type",
                "type",
                Text::FieldWorkType,
                Text::FieldWorkTypePlaceholder,
            )
            .first_seen(),
        ]),
        date: DateRangeFilter::new("date"),
        projection: ResultProjection {
            columns: vec![
                ProjectedColumn::plain("date", Text::ColumnDate),
                ProjectedColumn::plain("name", Text::ColumnName),
                ProjectedColumn::plain("id", Text::ColumnId),
                ProjectedColumn::plain("type", Text::ColumnType),
                ProjectedColumn::photos("photos"),
            ],
            sort_key: "date",
            direction: SortDirection::Descending,
        },
        primary_exclude: None,
        disambiguate_by: Vec::new(),
        report_field: "content",
        photos_field: Some("photos"),
    }
}

pub fn acquisitions() -> PageConfig {
    PageConfig {
        id: PageId::Acquisitions,
        table: TableSpec {
            table_id: ACQUISITIONS_TABLE,
            skip_rows: 1,
            columns: vec![
                ColumnSpec::text(0, "position"),
                ColumnSpec::text(2, "modules"),
                ColumnSpec::date(3, "date", DateOrder::DayFirst),
                ColumnSpec::text(6, "summary"),
                ColumnSpec::text(9, "team"),
                ColumnSpec::text(11, "status"),
                ColumnSpec::text(12, "report"),
            ],
        },
        derive: None,
        chain: CategoricalFilterChain::new(vec![
            CategoricalSlot::new(
                "position",
                "position",
                Text::Position,
                Text::PositionPlaceholder,
            ),
            CategoricalSlot::new("status", "status", Text::Status, Text::StatusPlaceholder)
                .first_seen(),
            CategoricalSlot::new("team", "team", Text::Team, Text::TeamPlaceholder),
        ]),
        date: DateRangeFilter::new("date"),
        projection: ResultProjection {
            columns: vec![
                ProjectedColumn::plain("date", Text::ColumnDate),
                ProjectedColumn::plain("position", Text::ColumnName),
                ProjectedColumn::plain("modules", Text::ColumnModules),
                ProjectedColumn::plain("summary", Text::ColumnSummary),
                ProjectedColumn::plain("status", Text::ColumnStatus),
                ProjectedColumn::plain("team", Text::ColumnTeam),
            ],
            sort_key: "status",
            direction: SortDirection::Ascending,
        },
        primary_exclude: Some(("status", "Complete")),
        disambiguate_by: vec!["position", "summary"],
        report_field: "report",
        photos_field: None,
    }
}

pub fn stock_table() -> TableSpec {
    TableSpec {
        table_id: STOCK_TABLE,
        skip_rows: 9,
        columns: vec![
            ColumnSpec::date(0, "date", DateOrder::DayFirst),
            ColumnSpec::integer(1, "assembled"),
        ],
    }
}

pub fn history_table() -> TableSpec {
    let mut columns = vec![
        ColumnSpec::text(2, "position"),
        ColumnSpec::integer(3, "id"),
        ColumnSpec::date(6, "install_date", DateOrder::MonthFirst),
    ];
    for (slot, module) in MODULE_SLOTS.iter().enumerate() {
        let base = 11 + slot * 4;
        columns.extend([
            ColumnSpec::text(base, module_field("id", *module)),
            ColumnSpec::text(base + 1, module_field("rotation_angle", *module)),
            ColumnSpec::text(base + 2, module_field("radial_distance", *module)),
            ColumnSpec::text(base + 3, module_field("position_angle", *module)),
        ]);
    }
    for (slot, module) in MODULE_SLOTS.iter().enumerate() {
        columns.push(ColumnSpec::text(31 + slot, module_field("ekit", *module)));
    }
    TableSpec {
        table_id: HISTORY_TABLE,
        skip_rows: 7,
        columns,
    }
}

pub fn umd_details_table() -> TableSpec {
    TableSpec {
        table_id: UMD_DETAILS_TABLE,
        skip_rows: 1,
        columns: vec![ColumnSpec::text(0, "umd_id"), ColumnSpec::text(2, "details")],
    }
}

/// Field name of a per-module column, such as `id_m101`.
pub fn module_field(prefix: &str, module: u16) -> &'static str {
    match (prefix, module) {
        ("id", 101) => "id_m101",
        ("id", 102) => "id_m102",
        ("id", 103) => "id_m103",
        ("rotation_angle", 101) => "rotation_angle_m101",
        ("rotation_angle", 102) => "rotation_angle_m102",
        ("rotation_angle", 103) => "rotation_angle_m103",
        ("radial_distance", 101) => "radial_distance_m101",
        ("radial_distance", 102) => "radial_distance_m102",
        ("radial_distance", 103) => "radial_distance_m103",
        ("position_angle", 101) => "position_angle_m101",
        ("position_angle", 102) => "position_angle_m102",
        ("position_angle", 103) => "position_angle_m103",
        ("ekit", 101) => "ekit_m101",
        ("ekit", 102) => "ekit_m102",
        ("ekit", 103) => "ekit_m103",
        _ => "",
    }
}

/// Splits `Name (id=12)` cells into `name` and `id` columns.
pub fn split_position_id(table: Table) -> Table {
    table
        .with_column("name", |table, record| {
            parse_position_id(&table.text(record, "position(id)"))
                .map_or(FieldValue::Empty, |(name, _)| FieldValue::Text(name))
        })
        .with_column("id", |table, record| {
            parse_position_id(&table.text(record, "position(id)"))
                .map_or(FieldValue::Empty, |(_, id)| FieldValue::Integer(id))
        })
}

static POSITION_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\w\s.]+)\s*\(id=(\d+)\)").expect("position id pattern compiles")
});

fn parse_position_id(cell: &str) -> Option<(String, i64)> {
    let captures = POSITION_ID.captures(cell)?;
    let name = captures.get(1)?.as_str().trim();
    let id = captures.get(2)?.as_str().parse().ok()?;
    (!name.is_empty()).then(|| (name.to_owned(), id))
}

#[cfg(test)]
mod tests {
    use super::{history_table, module_field, parse_position_id, split_position_id};
    use crate::{FieldValue, Table};

    #[test]
    fn position_id_cells_split() {
        assert_eq!(
            parse_position_id("Los Morados (id=1764)"),
            Some(("Los Morados".to_owned(), 1764))
        );
        assert_eq!(parse_position_id("Kathy"), None);
        assert_eq!(parse_position_id("(id=3)"), None);
        assert_eq!(
            parse_position_id("Malargüe St. 2 (id=40) extra"),
            Some(("Malargüe St. 2".to_owned(), 40))
        );
        assert_eq!(parse_position_id("Kathy (id=x)"), None);
    }

    #[test]
    fn split_appends_name_and_id() {
        let mut table = Table::new("field_work", vec!["position(id)".to_owned()]);
        table.push(vec![FieldValue::Text("Coihueco (id=93)".to_owned())]);
        table.push(vec![FieldValue::Text("unknown".to_owned())]);
        let table = split_position_id(table);
        assert_eq!(table.text(&table.records[0], "name"), "Coihueco");
        assert_eq!(table.value(&table.records[0], "id"), &FieldValue::Integer(93));
        assert!(table.value(&table.records[1], "name").is_empty());
    }

    #[test]
    fn history_columns_follow_sheet_layout() {
        let spec = history_table();
        let names = spec
            .columns
            .iter()
            .map(|column| (column.source_index, column.name))
            .collect::<Vec<_>>();
        assert_eq!(names.len(), 18);
        assert_eq!(names[3], (11, "id_m101"));
        assert_eq!(names[7], (15, "id_m102"));
        assert_eq!(names[14], (22, "position_angle_m103"));
        assert_eq!(names[17], (33, "ekit_m103"));
        assert_eq!(module_field("ekit", 104), "");
    }
}
