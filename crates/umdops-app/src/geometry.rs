// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::Installation;

pub const TANK_DIAMETER: f64 = 3.6;
pub const MARGIN_DIAMETER: f64 = 13.6;
pub const MODULE_WIDTH: f64 = 1.4;
pub const MODULE_LENGTH: f64 = 9.0;

pub const STRIP_PANEL_WIDTH: f64 = 1.28;
pub const STRIPS_PER_SIDE: usize = 32;
pub const STRIP_LENGTH: f64 = 0.5;
pub const STRIP_OFFSET: f64 = 0.25;

/// FPGA channel of scintillator `n` at index `n - 1`.
pub const FPGA_CHANNELS: [u8; 64] = [
    13, 14, 15, 16, 21, 22, 23, 24, 29, 30, 31, 32, 5, 6, 7, 8, 40, 39, 38, 37, 48, 47, 46, 45,
    64, 63, 62, 61, 56, 55, 54, 53, 12, 11, 10, 9, 20, 19, 18, 17, 28, 27, 26, 25, 4, 3, 2, 1,
    33, 34, 35, 36, 41, 42, 43, 44, 57, 58, 59, 60, 49, 50, 51, 52,
];

/// Data channel of scintillator `n` at index `n - 1`.
pub const DATA_CHANNELS: [u8; 64] = [
    52, 51, 50, 49, 44, 43, 42, 41, 36, 35, 34, 33, 60, 59, 58, 57, 25, 26, 27, 28, 17, 18, 19, 20,
    1, 2, 3, 4, 9, 10, 11, 12, 53, 54, 55, 56, 45, 46, 47, 48, 37, 38, 39, 40, 61, 62, 63, 64,
    32, 31, 30, 29, 24, 23, 22, 21, 8, 7, 6, 5, 16, 15, 14, 13,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("module m{module} has no usable {field}: {value:?}")]
    InvalidNumber {
        module: u16,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strip {
    pub number: u8,
    /// Lower-left corner.
    pub origin: Point,
    pub width: f64,
    pub length: f64,
    pub fpga_channel: u8,
    pub data_channel: u8,
    pub flagged: bool,
}

pub fn channels(strip: u8) -> Option<(u8, u8)> {
    let index = usize::from(strip).checked_sub(1)?;
    Some((*FPGA_CHANNELS.get(index)?, *DATA_CHANNELS.get(index)?))
}

/// All 64 strips: 1..=32 on top and 64..=33 on the bottom, both left to right.
pub fn strip_layout(flagged: &[u32]) -> Vec<Strip> {
    let width = STRIP_PANEL_WIDTH / STRIPS_PER_SIDE as f64;
    let mut strips = Vec::with_capacity(STRIPS_PER_SIDE * 2);
    for (top, y) in [(true, STRIP_OFFSET), (false, -STRIP_OFFSET - STRIP_LENGTH)] {
        for slot in 0..STRIPS_PER_SIDE {
            let number = (if top { slot + 1 } else { 64 - slot }) as u8;
            let (fpga_channel, data_channel) = channels(number).unwrap_or_default();
            strips.push(Strip {
                number,
                origin: Point {
                    x: -STRIP_PANEL_WIDTH / 2.0 + slot as f64 * width,
                    y,
                },
                width,
                length: STRIP_LENGTH,
                fpga_channel,
                data_channel,
                flagged: flagged.contains(&u32::from(number)),
            });
        }
    }
    strips
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleFootprint {
    pub module: u16,
    pub umd_id: String,
    pub center: Point,
    /// Closed outline: the first corner is repeated at the end.
    pub outline: [Point; 5],
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionDiagram {
    pub tank_radius: f64,
    pub margin_radius: f64,
    pub modules: Vec<ModuleFootprint>,
    pub north: (Point, Point),
}

/// Places every module of an installation around the tank. Angles are in
/// degrees, distances in metres, and either may use a decimal comma.
pub fn position_diagram(
    install: &Installation,
    selected_umd: &str,
) -> Result<PositionDiagram, GeometryError> {
    let mut modules = Vec::new();
    for slot in &install.modules {
        if slot.id.is_empty() || slot.id == "-" {
            continue;
        }
        let rd = parse_number(slot.module, "radial distance", &slot.radial_distance)?;
        let pa = parse_number(slot.module, "position angle", &slot.position_angle)?.to_radians();
        let ra = parse_number(slot.module, "rotation angle", &slot.rotation_angle)?.to_radians();
        let center = Point {
            x: -rd * pa.sin(),
            y: -rd * pa.cos(),
        };
        let (half_w, half_l) = (MODULE_WIDTH / 2.0, MODULE_LENGTH / 2.0);
        let corners = [
            (-half_w, -half_l),
            (half_w, -half_l),
            (half_w, half_l),
            (-half_w, half_l),
            (-half_w, -half_l),
        ];
        let outline = corners.map(|(dx, dy)| Point {
            x: center.x - dx * ra.cos() - dy * ra.sin(),
            y: center.y + dx * ra.sin() - dy * ra.cos(),
        });
        modules.push(ModuleFootprint {
            module: slot.module,
            umd_id: slot.id.clone(),
            center,
            outline,
            selected: slot.id == selected_umd,
        });
    }

    let tank_radius = TANK_DIAMETER / 2.0;
    Ok(PositionDiagram {
        tank_radius,
        margin_radius: MARGIN_DIAMETER / 2.0,
        modules,
        north: (
            Point {
                x: 0.0,
                y: tank_radius + 0.5,
            },
            Point {
                x: 0.0,
                y: tank_radius + 1.5,
            },
        ),
    })
}

fn parse_number(module: u16, field: &'static str, raw: &str) -> Result<f64, GeometryError> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| GeometryError::InvalidNumber {
            module,
            field,
            value: raw.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::{GeometryError, channels, position_diagram, strip_layout};
    use crate::{Installation, ModuleSlot};
    use time::macros::date;

    fn slot(module: u16, id: &str, ra: &str, rd: &str, pa: &str) -> ModuleSlot {
        ModuleSlot {
            module,
            id: id.to_owned(),
            rotation_angle: ra.to_owned(),
            radial_distance: rd.to_owned(),
            position_angle: pa.to_owned(),
            ekit: String::new(),
        }
    }

    fn install(modules: Vec<ModuleSlot>) -> Installation {
        Installation {
            position: "Kathy".to_owned(),
            id: Some(1),
            install_date: date!(2024 - 01 - 01),
            modules,
        }
    }

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn channel_table_matches_known_strips() {
        assert_eq!(channels(1), Some((13, 52)));
        assert_eq!(channels(25), Some((64, 1)));
        assert_eq!(channels(64), Some((52, 13)));
        assert_eq!(channels(0), None);
        assert_eq!(channels(65), None);
    }

    #[test]
    fn strips_run_top_then_bottom() {
        let strips = strip_layout(&[2, 40]);
        assert_eq!(strips.len(), 64);
        assert_eq!(strips[0].number, 1);
        assert!(close(strips[0].origin.x, -0.64));
        assert!(close(strips[31].origin.x, 0.6));
        assert_eq!(strips[32].number, 64);
        assert_eq!(strips[63].number, 33);
        assert!(close(strips[32].origin.y, -0.75));
        let flagged = strips
            .iter()
            .filter(|strip| strip.flagged)
            .map(|strip| strip.number)
            .collect::<Vec<_>>();
        assert_eq!(flagged, vec![2, 40]);
    }

    #[test]
    fn module_center_follows_position_angle() -> Result<(), GeometryError> {
        let diagram = position_diagram(
            &install(vec![
                slot(101, "M-1", "0", "5", "90"),
                slot(102, "-", "", "", ""),
                slot(103, "M-3", "90", "4,5", "0"),
            ]),
            "M-3",
        )?;
        assert_eq!(diagram.modules.len(), 2);
        let first = &diagram.modules[0];
        assert!(close(first.center.x, -5.0));
        assert!(close(first.center.y, 0.0));
        assert!(!first.selected);
        // Unrotated: long side along y.
        assert!(close(first.outline[0].x, first.center.x + 0.7));
        assert!(close(first.outline[0].y, first.center.y + 4.5));

        let second = &diagram.modules[1];
        assert!(second.selected);
        assert!(close(second.center.y, -4.5));
        // Rotated a quarter turn: long side along x.
        assert!(close(second.outline[0].x, second.center.x + 4.5));
        assert!(close(diagram.north.0.y, 2.3));
        Ok(())
    }

    #[test]
    fn bad_geometry_is_reported() {
        let result = position_diagram(&install(vec![slot(101, "M-1", "x", "1", "1")]), "M-1");
        assert_eq!(
            result,
            Err(GeometryError::InvalidNumber {
                module: 101,
                field: "rotation angle",
                value: "x".to_owned(),
            })
        );
    }
}
