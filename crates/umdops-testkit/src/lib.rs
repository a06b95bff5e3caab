// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use time::macros::format_description;
use time::{Date, Duration};
use umdops_app::pages::{
    ACQUISITIONS_TABLE, FIELD_WORK_TABLE, HISTORY_TABLE, MODULE_SLOTS, STOCK_TABLE,
    UMD_DETAILS_TABLE,
};
use umdops_app::{SourceError, TabularSource};

pub const FIELD_WORK_WIDTH: usize = 55;
pub const ACQUISITIONS_WIDTH: usize = 13;
pub const HISTORY_WIDTH: usize = 34;

const POSITIONS: [(&str, i64); 8] = [
    ("Kathy", 93),
    ("Coihueco", 1510),
    ("Los Morados", 1764),
    ("Ianina", 1570),
    ("Corrientes", 1522),
    ("Toune", 1574),
    ("Juan", 1519),
    ("Yeti", 1497),
];

const TEAMS: [&str; 4] = ["Malargüe", "Bariloche", "Buenos Aires", "Karlsruhe"];
const FIELD_WORK_TYPES: [&str; 4] = ["Installation", "Maintenance", "Inspection", "Repair"];
const STATUSES: [&str; 3] = ["Open", "In progress", "Complete"];
const SUMMARIES: [&str; 6] = [
    "No data from module",
    "Noisy channels",
    "Power cycling",
    "Lost communication",
    "High baseline",
    "GPS time drift",
];
const ISSUE_WORDS: [&str; 6] = [
    "broken fiber",
    "low gain",
    "dead channel",
    "cross talk",
    "bad solder",
    "saturated",
];
const WORDS: [&str; 20] = [
    "checked",
    "replaced",
    "cable",
    "module",
    "electronics",
    "tank",
    "antenna",
    "solar",
    "panel",
    "battery",
    "connector",
    "firmware",
    "trench",
    "measured",
    "voltage",
    "sealed",
    "dug",
    "cleaned",
    "verified",
    "rebooted",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Raw sheet grids keyed by table id, header and banner rows included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub sheets: BTreeMap<String, Vec<Vec<String>>>,
}

impl Workbook {
    pub fn with_sheet(mut self, table_id: &str, grid: Vec<Vec<String>>) -> Self {
        self.sheets.insert(table_id.to_owned(), grid);
        self
    }

    pub fn sheet(&self, table_id: &str) -> Option<&Vec<Vec<String>>> {
        self.sheets.get(table_id)
    }
}

impl TabularSource for Workbook {
    fn read(&mut self, table_id: &str) -> Result<Vec<Vec<String>>, SourceError> {
        self.sheets
            .get(table_id)
            .cloned()
            .ok_or_else(|| SourceError::unavailable(table_id, "no such sheet"))
    }
}

#[derive(Debug, Clone)]
pub struct SheetFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl SheetFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// Every dashboard sheet, with dates spread over the eighteen months
    /// before `end`.
    pub fn workbook(&mut self, end: Date) -> Workbook {
        let installs = self.history_grid(end);
        let umd_ids = umd_ids(&installs);
        Workbook::default()
            .with_sheet(FIELD_WORK_TABLE, self.field_work_grid(24, end))
            .with_sheet(ACQUISITIONS_TABLE, self.acquisitions_grid(18, end))
            .with_sheet(STOCK_TABLE, self.stock_grid(end))
            .with_sheet(UMD_DETAILS_TABLE, self.umd_details_grid(&umd_ids))
            .with_sheet(HISTORY_TABLE, installs)
    }

    pub fn field_work_grid(&mut self, rows: usize, end: Date) -> Vec<Vec<String>> {
        let mut grid = vec![sparse_row(
            FIELD_WORK_WIDTH,
            &[
                (0, "Timestamp"),
                (1, "Work done"),
                (2, "Position (id)"),
                (3, "Type"),
                (5, "Team"),
                (6, "Date"),
                (54, "Photos"),
            ],
        )];
        for _ in 0..rows {
            let (name, id) = POSITIONS[self.rng.int_n(POSITIONS.len())];
            let date = self.date_before(end, 540);
            let content = self.sentence(6, 14);
            let position = format!("{name} (id={id})");
            let photos = self.photo_links();
            let kind = self.pick(&FIELD_WORK_TYPES);
            let team = self.pick(&TEAMS);
            let stamp = format!("{} 10:{:02}:00", day_first(date), self.rng.int_n(60));
            grid.push(sparse_row(
                FIELD_WORK_WIDTH,
                &[
                    (0, &stamp),
                    (1, &content),
                    (2, &position),
                    (3, kind),
                    (5, team),
                    (6, &day_first(date)),
                    (54, &photos),
                ],
            ));
        }
        grid
    }

    /// Acquisition issues. Some position and summary pairs repeat so that a
    /// selected row can map to several reports.
    pub fn acquisitions_grid(&mut self, rows: usize, end: Date) -> Vec<Vec<String>> {
        let mut grid = vec![sparse_row(
            ACQUISITIONS_WIDTH,
            &[
                (0, "Position"),
                (2, "Modules"),
                (3, "Date"),
                (6, "Summary"),
                (9, "Team"),
                (11, "Status"),
                (12, "Report"),
            ],
        )];
        let mut previous: Option<(String, String)> = None;
        for _ in 0..rows {
            let (position, summary) = match previous.take() {
                Some(pair) if self.rng.int_n(3) == 0 => pair,
                _ => (
                    POSITIONS[self.rng.int_n(POSITIONS.len())].0.to_owned(),
                    self.pick(&SUMMARIES).to_owned(),
                ),
            };
            let modules = match self.rng.int_n(3) {
                0 => "M101".to_owned(),
                1 => "M101, M102".to_owned(),
                _ => "M101, M102, M103".to_owned(),
            };
            let date = day_first(self.date_before(end, 540));
            let report = self.sentence(10, 24);
            let team = self.pick(&TEAMS);
            let status = self.pick(&STATUSES);
            grid.push(sparse_row(
                ACQUISITIONS_WIDTH,
                &[
                    (0, &position),
                    (2, &modules),
                    (3, &date),
                    (6, &summary),
                    (9, team),
                    (11, status),
                    (12, &report),
                ],
            ));
            previous = Some((position, summary));
        }
        grid
    }

    /// Weekly cumulative assembly counts below nine banner rows.
    pub fn stock_grid(&mut self, end: Date) -> Vec<Vec<String>> {
        let mut grid = banner_rows(9, 2);
        grid[0][0] = "UMD stock".to_owned();
        let mut date = end - Duration::weeks(78);
        let mut assembled = 0;
        while date <= end {
            assembled += self.rng.int_n(5);
            grid.push(vec![day_first(date), assembled.to_string()]);
            date += Duration::weeks(1);
        }
        grid
    }

    /// Installation history below seven banner rows. Every position gets
    /// three module slots; some slots stay empty (`-`) and the last position
    /// has no install date yet.
    pub fn history_grid(&mut self, end: Date) -> Vec<Vec<String>> {
        let mut grid = banner_rows(7, HISTORY_WIDTH);
        grid[0][0] = "Deployment history".to_owned();
        let mut next_umd = 1;
        for (index, (name, id)) in POSITIONS.iter().enumerate() {
            let mut row = vec![String::new(); HISTORY_WIDTH];
            row[2] = (*name).to_owned();
            row[3] = id.to_string();
            row[6] = if index + 1 == POSITIONS.len() {
                "-".to_owned()
            } else {
                month_first(self.date_before(end, 540))
            };
            for (slot, module) in MODULE_SLOTS.iter().enumerate() {
                let base = 11 + slot * 4;
                if slot > 0 && self.rng.int_n(5) == 0 {
                    row[base] = "-".to_owned();
                    continue;
                }
                row[base] = format!("M-{next_umd}");
                row[base + 1] = (90 * self.rng.int_n(4)).to_string();
                row[base + 2] = format!("{},{}", 4 + self.rng.int_n(3), self.rng.int_n(10));
                row[base + 3] = (120 * slot).to_string();
                row[31 + slot] = format!("EK-{module}-{next_umd}");
                next_umd += 1;
            }
            grid.push(row);
        }
        grid
    }

    pub fn umd_details_grid(&mut self, umd_ids: &[String]) -> Vec<Vec<String>> {
        let mut grid = vec![vec![
            "UMD".to_owned(),
            "Assembled".to_owned(),
            "Details".to_owned(),
        ]];
        for umd_id in umd_ids {
            let details = if self.rng.bool() {
                String::new()
            } else {
                let count = 1 + self.rng.int_n(3);
                (0..count)
                    .map(|_| format!("{} ({})", 1 + self.rng.int_n(64), self.pick(&ISSUE_WORDS)))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            grid.push(vec![umd_id.clone(), "yes".to_owned(), details]);
        }
        grid
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn date_before(&mut self, end: Date, max_days: usize) -> Date {
        end - Duration::days(self.rng.int_n(max_days + 1) as i64)
    }

    fn photo_links(&mut self) -> String {
        let count = self.rng.int_n(4);
        (0..count)
            .map(|_| {
                format!(
                    "https://drive.google.com/open?id={:016x}",
                    self.rng.next_u64()
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let count = min_words + self.rng.int_n(max_words.saturating_sub(min_words) + 1);
        let mut sentence = (0..count)
            .map(|_| self.pick(&WORDS))
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }
}

/// Row of `width` empty cells with the given cells filled in.
pub fn sparse_row(width: usize, cells: &[(usize, &str)]) -> Vec<String> {
    let mut row = vec![String::new(); width];
    for (index, value) in cells {
        if let Some(cell) = row.get_mut(*index) {
            *cell = (*value).to_owned();
        }
    }
    row
}

pub fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|cell| (*cell).to_owned()).collect())
        .collect()
}

/// Module ids present in a history grid, in sheet order.
pub fn umd_ids(history: &[Vec<String>]) -> Vec<String> {
    history
        .iter()
        .skip(7)
        .flat_map(|row| {
            (0..MODULE_SLOTS.len()).filter_map(move |slot| row.get(11 + slot * 4))
        })
        .filter(|id| id.starts_with("M-"))
        .cloned()
        .collect()
}

pub fn day_first(date: Date) -> String {
    date.format(&format_description!("[day]/[month]/[year]"))
        .unwrap_or_default()
}

pub fn month_first(date: Date) -> String {
    date.format(&format_description!("[month]/[day]/[year]"))
        .unwrap_or_default()
}

pub fn temp_snapshot_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("snapshot.db");
    Ok((dir, path))
}

fn banner_rows(count: usize, width: usize) -> Vec<Vec<String>> {
    vec![vec![String::new(); width]; count]
}
