// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use time::macros::date;
use time::{Date, Duration, Month};

use crate::{DateRange, Installation, Language, StockPoint, Text};

/// Positions equipped before the installation sheet was started.
pub const PREEXISTING_POSITIONS: usize = 4;
pub const PLANNED_POSITIONS: usize = 73;
pub const FIRST_QUARTER_YEAR: i32 = 2023;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadedPeriod {
    pub name: &'static str,
    pub start: Date,
    pub end: Date,
}

pub const SHADED_PERIODS: [ShadedPeriod; 8] = [
    ShadedPeriod {
        name: "COVID Lockdown",
        start: date!(2020 - 03 - 20),
        end: date!(2020 - 06 - 08),
    },
    ShadedPeriod {
        name: "Summer Break 2025",
        start: date!(2025 - 01 - 01),
        end: date!(2025 - 02 - 15),
    },
    ShadedPeriod {
        name: "Summer Break 2024",
        start: date!(2024 - 01 - 01),
        end: date!(2024 - 02 - 15),
    },
    ShadedPeriod {
        name: "Summer Break 2023",
        start: date!(2023 - 01 - 01),
        end: date!(2023 - 02 - 15),
    },
    ShadedPeriod {
        name: "Summer Break 2022",
        start: date!(2022 - 01 - 01),
        end: date!(2022 - 02 - 15),
    },
    ShadedPeriod {
        name: "Summer Break 2021",
        start: date!(2021 - 01 - 01),
        end: date!(2021 - 02 - 15),
    },
    ShadedPeriod {
        name: "Summer Break 2020",
        start: date!(2020 - 01 - 01),
        end: date!(2020 - 02 - 15),
    },
    ShadedPeriod {
        name: "Summer Break 2019",
        start: date!(2019 - 01 - 01),
        end: date!(2019 - 02 - 15),
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    AllTime,
    LastMonth,
    LastQuarter,
    LastYear,
    Quarter { year: i32, quarter: u8 },
}

impl TimeWindow {
    /// Every window on offer: the relative ones, then quarters newest first.
    pub fn options(today: Date) -> Vec<Self> {
        let mut options = vec![
            Self::AllTime,
            Self::LastMonth,
            Self::LastQuarter,
            Self::LastYear,
        ];
        let current = (today.year(), quarter_of(today.month()));
        let mut quarters = Vec::new();
        let (mut year, mut quarter) = (FIRST_QUARTER_YEAR, 1);
        while (year, quarter) <= current {
            quarters.push(Self::Quarter { year, quarter });
            (year, quarter) = if quarter == 4 {
                (year + 1, 1)
            } else {
                (year, quarter + 1)
            };
        }
        options.extend(quarters.into_iter().rev());
        options
    }

    /// Stable identifier stored in the session.
    pub fn key(self) -> String {
        match self {
            Self::AllTime => "all_time".to_owned(),
            Self::LastMonth => "last_month".to_owned(),
            Self::LastQuarter => "last_quarter".to_owned(),
            Self::LastYear => "last_year".to_owned(),
            Self::Quarter { year, quarter } => format!("{year}-q{quarter}"),
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "all_time" => Some(Self::AllTime),
            "last_month" => Some(Self::LastMonth),
            "last_quarter" => Some(Self::LastQuarter),
            "last_year" => Some(Self::LastYear),
            _ => {
                let (year, quarter) = key.split_once("-q")?;
                let quarter = quarter.parse().ok().filter(|q| (1..=4).contains(q))?;
                Some(Self::Quarter {
                    year: year.parse().ok()?,
                    quarter,
                })
            }
        }
    }

    pub fn label(self, language: Language) -> String {
        match self {
            Self::AllTime => Text::StatsAllTime.get(language).to_owned(),
            Self::LastMonth => Text::StatsLastMonth.get(language).to_owned(),
            Self::LastQuarter => Text::StatsLastQuarter.get(language).to_owned(),
            Self::LastYear => Text::StatsLastYear.get(language).to_owned(),
            Self::Quarter { year, quarter } => format!("Q{quarter} {year}"),
        }
    }

    /// Dates the window spans. Relative windows run from their cutoff, which
    /// itself is excluded, to today.
    pub fn span(self, today: Date) -> Option<DateRange> {
        let months = match self {
            Self::AllTime => return None,
            Self::LastMonth => 1,
            Self::LastQuarter => 3,
            Self::LastYear => 12,
            Self::Quarter { year, quarter } => return quarter_span(year, quarter),
        };
        let cutoff = shift_date_by_months(today, -months)?;
        Some(DateRange::new(cutoff.next_day()?, today))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deltas {
    pub assembled: i64,
    pub installed: i64,
    pub positions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub total_assembled: i64,
    pub total_installed: i64,
    pub positions: usize,
    /// Percentage of planned positions equipped.
    pub completion: f64,
    /// Absent for the all-time window.
    pub deltas: Option<Deltas>,
}

pub fn metrics(
    stock: &[StockPoint],
    installs: &[Installation],
    window: TimeWindow,
    today: Date,
) -> Metrics {
    let total_assembled = stock.iter().map(|point| point.assembled).max().unwrap_or(0);
    let total_installed: i64 = installs.iter().map(Installation::modules_installed).sum();
    let positions = distinct_positions(installs.iter()) + PREEXISTING_POSITIONS;
    Metrics {
        total_assembled,
        total_installed,
        positions,
        completion: positions as f64 / PLANNED_POSITIONS as f64 * 100.0,
        deltas: window
            .span(today)
            .map(|span| deltas(stock, installs, window, span)),
    }
}

fn deltas(
    stock: &[StockPoint],
    installs: &[Installation],
    window: TimeWindow,
    span: DateRange,
) -> Deltas {
    let max_in = stock
        .iter()
        .filter(|point| span.contains(point.date))
        .map(|point| point.assembled)
        .max();
    let max_before = stock
        .iter()
        .filter(|point| point.date < span.start)
        .map(|point| point.assembled)
        .max()
        .unwrap_or(0);
    let assembled = match (max_in, window) {
        (None, _) => 0,
        (Some(current), TimeWindow::Quarter { .. }) => current - max_before,
        (Some(current), _) => (current - max_before).max(0),
    };
    let inside = installs
        .iter()
        .filter(|install| span.contains(install.install_date));
    Deltas {
        assembled,
        installed: inside.clone().map(Installation::modules_installed).sum(),
        positions: distinct_positions(inside),
    }
}

fn distinct_positions<'a>(installs: impl Iterator<Item = &'a Installation>) -> usize {
    installs
        .map(|install| install.position.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesPoint {
    pub date: Date,
    pub assembled: i64,
    pub installed: i64,
}

/// Daily series across both tables with the last known value carried
/// forward. Empty when either input is empty.
pub fn combined_series(stock: &[StockPoint], installs: &[Installation]) -> Vec<SeriesPoint> {
    let (Some(stock_start), Some(stock_end)) = (
        stock.iter().map(|point| point.date).min(),
        stock.iter().map(|point| point.date).max(),
    ) else {
        return Vec::new();
    };
    let (Some(first_install), Some(last_install)) = (
        installs.iter().map(|install| install.install_date).min(),
        installs.iter().map(|install| install.install_date).max(),
    ) else {
        return Vec::new();
    };

    let mut stock = stock.to_vec();
    stock.sort_by_key(|point| point.date);
    let mut installs = installs.iter().collect::<Vec<_>>();
    installs.sort_by_key(|install| install.install_date);

    let end = stock_end.max(last_install);
    let mut series = Vec::new();
    let (mut assembled, mut installed) = (0, 0);
    let (mut next_stock, mut next_install) = (0, 0);
    let mut day = stock_start.min(first_install);
    loop {
        while let Some(point) = stock.get(next_stock).filter(|point| point.date <= day) {
            assembled = point.assembled;
            next_stock += 1;
        }
        while let Some(install) = installs.get(next_install).filter(|install| install.install_date <= day) {
            installed += install.modules_installed();
            next_install += 1;
        }
        series.push(SeriesPoint {
            date: day,
            assembled,
            installed,
        });
        match day.next_day() {
            Some(next) if next <= end => day = next,
            _ => break,
        }
    }
    series
}

const fn quarter_of(month: Month) -> u8 {
    (month as u8 - 1) / 3 + 1
}

fn quarter_span(year: i32, quarter: u8) -> Option<DateRange> {
    let first_month = Month::try_from((quarter - 1) * 3 + 1).ok()?;
    let start = Date::from_calendar_date(year, first_month, 1).ok()?;
    let end = shift_date_by_months(start, 3)? - Duration::days(1);
    Some(DateRange::new(start, end))
}

pub(crate) fn shift_date_by_months(date: Date, months: i32) -> Option<Date> {
    let base_month = i32::from(date.month() as u8);
    let total_month = base_month - 1 + months;
    let year = date.year() + total_month.div_euclid(12);
    let month = Month::try_from((total_month.rem_euclid(12) + 1) as u8).ok()?;
    let day = date.day().min(last_day_of_month(year, month)?);
    Date::from_calendar_date(year, month, day).ok()
}

fn last_day_of_month(year: i32, month: Month) -> Option<u8> {
    let (next_year, next_month) = if month == Month::December {
        (year + 1, Month::January)
    } else {
        (year, month.next())
    };
    let first_next_month = Date::from_calendar_date(next_year, next_month, 1).ok()?;
    Some((first_next_month - Duration::days(1)).day())
}
