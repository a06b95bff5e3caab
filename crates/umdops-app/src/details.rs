// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use regex::Regex;
use std::sync::LazyLock;
use time::Date;

use crate::pages::{MODULE_SLOTS, module_field};
use crate::{
    CategoricalFilterChain, CategoricalSlot, GeometryError, Installation, PageSession,
    PositionDiagram, SlotOutcome, Strip, Table, Text, installations, position_diagram,
    strip_layout,
};

pub const POSITION_SLOT: &str = "position";
pub const UMD_SLOT: &str = "umd";

pub fn umd_chain() -> CategoricalFilterChain {
    let module_ids = MODULE_SLOTS
        .iter()
        .map(|module| module_field("id", *module))
        .collect();
    CategoricalFilterChain::new(vec![
        CategoricalSlot::new(
            POSITION_SLOT,
            "position",
            Text::Position,
            Text::PositionPlaceholder,
        ),
        CategoricalSlot::new(UMD_SLOT, "id_m101", Text::SelectUmd, Text::SelectUmd)
            .across(module_ids, vec!["-"]),
    ])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issues {
    NoneReported,
    Items(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UmdDetail {
    pub umd_id: String,
    pub position: String,
    pub install_date: Date,
    pub module: u16,
    pub ekit: String,
    pub rotation_angle: String,
    pub radial_distance: String,
    pub position_angle: String,
    /// Every module id at the position, by slot.
    pub siblings: Vec<(u16, String)>,
    pub issues: Issues,
    pub strips: Vec<Strip>,
    pub diagram: Result<PositionDiagram, GeometryError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UmdLookup {
    Nothing,
    /// The UMD has no row in the details sheet.
    UnknownUmd,
    NoInstallation,
    Found(Box<UmdDetail>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UmdDetailsView {
    pub slots: Vec<SlotOutcome>,
    pub lookup: UmdLookup,
}

/// The UMD details page: position and UMD dropdowns over the installed
/// rows, then everything known about the chosen UMD.
pub fn render_details(
    history: &Table,
    details: &Table,
    session: &PageSession,
) -> (UmdDetailsView, PageSession) {
    let installed =
        history.filtered(|record| history.value(record, "install_date").as_date().is_some());
    let chain = umd_chain().evaluate(&installed, &session.filters.choices);

    let mut next = session.clone();
    next.filters.choices = chain.choices();

    let found = match next.filters.choice(UMD_SLOT).value() {
        None => UmdLookup::Nothing,
        Some(umd_id) => lookup(&installations(history), details, umd_id),
    };
    (
        UmdDetailsView {
            slots: chain.slots,
            lookup: found,
        },
        next,
    )
}

pub fn lookup(installs: &[Installation], details: &Table, umd_id: &str) -> UmdLookup {
    let Some(record) = details
        .records
        .iter()
        .find(|record| details.text(record, "umd_id") == umd_id)
    else {
        tracing::debug!(umd_id, "no details row");
        return UmdLookup::UnknownUmd;
    };
    let Some((install, slot)) = installs
        .iter()
        .find_map(|install| install.module(umd_id).map(|slot| (install, slot)))
    else {
        return UmdLookup::NoInstallation;
    };

    let text = details.text(record, "details");
    let diagram = position_diagram(install, umd_id);
    if let Err(error) = &diagram {
        tracing::warn!(umd_id, %error, "cannot place modules");
    }
    UmdLookup::Found(Box::new(UmdDetail {
        umd_id: umd_id.to_owned(),
        position: install.position.clone(),
        install_date: install.install_date,
        module: slot.module,
        ekit: slot.ekit.clone(),
        rotation_angle: slot.rotation_angle.clone(),
        radial_distance: slot.radial_distance.clone(),
        position_angle: slot.position_angle.clone(),
        siblings: install
            .modules
            .iter()
            .map(|module| (module.module, module.id.clone()))
            .collect(),
        issues: issues(&text),
        strips: strip_layout(&flagged_strips(&text)),
        diagram,
    }))
}

static ISSUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*\([^)]+\)").expect("issue pattern compiles"));
static STRIP_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("strip number pattern compiles"));

/// Splits `12 (cracked) 40 (dim)` into items; text without that shape is
/// one item.
pub fn issues(text: &str) -> Issues {
    let text = text.trim();
    if text.is_empty() {
        return Issues::NoneReported;
    }
    let mut items = ISSUE
        .find_iter(text)
        .map(|found| found.as_str().trim().to_owned())
        .collect::<Vec<_>>();
    if items.is_empty() {
        items.push(text.to_owned());
    }
    Issues::Items(items)
}

/// Every number in the details text names a strip to highlight.
pub fn flagged_strips(text: &str) -> Vec<u32> {
    STRIP_NUMBER
        .find_iter(text)
        .filter_map(|found| found.as_str().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Issues, UMD_SLOT, UmdLookup, flagged_strips, issues, render_details};
    use crate::pages::{history_table, umd_details_table};
    use crate::{Choice, PageSession, Table};

    fn history() -> Table {
        let row = |cells: &[(usize, &str)]| {
            let mut row = vec![String::new(); 34];
            for (index, value) in cells {
                row[*index] = (*value).to_owned();
            }
            row
        };
        let mut grid = vec![vec![String::new(); 34]; 7];
        grid.push(row(&[
            (2, "Kathy"),
            (3, "1"),
            (6, "05/20/2024"),
            (11, "M-7"),
            (12, "0"),
            (13, "5,5"),
            (14, "90"),
            (15, "-"),
            (19, "M-2"),
            (20, "10"),
            (21, "4"),
            (22, "180"),
            (33, "K-9"),
        ]));
        grid.push(row(&[(2, "Ianina"), (3, "2"), (6, "-"), (11, "M-5")]));
        grid.push(row(&[(2, "Coihueco"), (3, "3"), (6, "06/01/2024"), (11, "M-1")]));
        history_table().parse(grid).expect("history parses")
    }

    fn details() -> Table {
        let grid = [
            ["UMD", "x", "Details"],
            ["M-2", "", "12 (cracked) 40 (dim)"],
            ["M-7", "", ""],
            ["M-5", "", "ok"],
        ]
        .iter()
        .map(|row| row.iter().map(|cell| (*cell).to_owned()).collect())
        .collect();
        umd_details_table().parse(grid).expect("details parse")
    }

    #[test]
    fn issue_items_are_split() {
        assert_eq!(
            issues("12 (cracked fiber) and 40(dim)"),
            Issues::Items(vec!["12 (cracked fiber)".to_owned(), "40(dim)".to_owned()])
        );
        assert_eq!(
            issues("general noise"),
            Issues::Items(vec!["general noise".to_owned()])
        );
        assert_eq!(issues("  "), Issues::NoneReported);
        assert_eq!(flagged_strips("12 (x) 40 (y3)"), vec![12, 40, 3]);
    }

    #[test]
    fn umd_options_follow_position() {
        let mut session = PageSession::default();
        let (view, _) = render_details(&history(), &details(), &session);
        assert_eq!(view.slots[0].offered, vec!["Coihueco", "Kathy"]);
        assert_eq!(view.slots[1].offered, vec!["M-1", "M-2", "M-7"]);
        assert_eq!(view.lookup, UmdLookup::Nothing);

        session.filters.set_choice("position", Choice::exact("Kathy"));
        let (view, _) = render_details(&history(), &details(), &session);
        assert_eq!(view.slots[1].offered, vec!["M-2", "M-7"]);
    }

    #[test]
    fn selected_umd_resolves_its_slot() {
        let mut session = PageSession::default();
        session.filters.set_choice(UMD_SLOT, Choice::exact("M-2"));
        let (view, _) = render_details(&history(), &details(), &session);
        let UmdLookup::Found(detail) = view.lookup else {
            panic!("expected details, got {:?}", view.lookup);
        };
        assert_eq!(detail.module, 103);
        assert_eq!(detail.position, "Kathy");
        assert_eq!(detail.ekit, "K-9");
        assert_eq!(detail.radial_distance, "4");
        assert_eq!(detail.siblings[1], (102, "-".to_owned()));
        let flagged = detail
            .strips
            .iter()
            .filter(|strip| strip.flagged)
            .count();
        assert_eq!(flagged, 2);
        let diagram = detail.diagram.expect("geometry parses");
        assert_eq!(diagram.modules.len(), 2);
        assert!(diagram.modules[1].selected);
    }

    #[test]
    fn missing_rows_degrade_without_failing() {
        let installs = crate::installations(&history());
        assert_eq!(
            super::lookup(&installs, &details(), "M-5"),
            UmdLookup::NoInstallation
        );
        assert_eq!(
            super::lookup(&installs, &details(), "M-1"),
            UmdLookup::UnknownUmd
        );
    }

    #[test]
    fn stale_umd_choice_is_dropped() {
        let mut session = PageSession::default();
        session.filters.set_choice("position", Choice::exact("Coihueco"));
        session.filters.set_choice(UMD_SLOT, Choice::exact("M-2"));
        let (view, next) = render_details(&history(), &details(), &session);
        assert_eq!(view.lookup, UmdLookup::Nothing);
        assert_eq!(next.filters.choice(UMD_SLOT), &Choice::Unselected);
    }
}
