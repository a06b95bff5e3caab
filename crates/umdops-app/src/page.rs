// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;

use crate::{
    CategoricalFilterChain, DateRange, DateRangeFilter, Disambiguation, FilterState, Language,
    PageSession, Record, ResultProjection, SlotOutcome, SourceError, Table, TableSpec,
    TabularSource, Text, View, disambiguate, drive_links, resolve, search,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PageId {
    Map,
    FieldWork,
    Acquisitions,
    Statistics,
    UmdDetails,
}

impl PageId {
    pub const ALL: [Self; 5] = [
        Self::Map,
        Self::FieldWork,
        Self::Acquisitions,
        Self::Statistics,
        Self::UmdDetails,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::FieldWork => "field_work",
            Self::Acquisitions => "acquisitions",
            Self::Statistics => "statistics",
            Self::UmdDetails => "umd_details",
        }
    }

    pub const fn title(self) -> Text {
        match self {
            Self::Map => Text::TabMap,
            Self::FieldWork => Text::TabFieldWork,
            Self::Acquisitions => Text::TabAcquisitions,
            Self::Statistics => Text::TabStatistics,
            Self::UmdDetails => Text::TabUmdDetails,
        }
    }
}

/// Everything that differs between the filter-and-report pages.
#[derive(Debug, Clone)]
pub struct PageConfig {
    pub id: PageId,
    pub table: TableSpec,
    /// Computed columns appended after load.
    pub derive: Option<fn(Table) -> Table>,
    pub chain: CategoricalFilterChain,
    pub date: DateRangeFilter,
    pub projection: ResultProjection,
    /// Rows whose field equals the value stay out of the primary table.
    pub primary_exclude: Option<(&'static str, &'static str)>,
    /// Key fields for the ambiguous-group lookup. Empty disables it.
    pub disambiguate_by: Vec<&'static str>,
    pub report_field: &'static str,
    pub photos_field: Option<&'static str>,
}

impl PageConfig {
    pub fn load(&self, source: &mut (impl TabularSource + ?Sized)) -> Result<Table, SourceError> {
        let table = source.load(&self.table)?;
        Ok(match self.derive {
            Some(derive) => derive(table),
            None => table,
        })
    }

    pub fn initial_filters(&self, table: &Table, today: Date) -> FilterState {
        FilterState {
            choices: self
                .chain
                .slots
                .iter()
                .map(|slot| (slot.key.to_owned(), Default::default()))
                .collect(),
            date_range: Some(self.date.bounds(table, today)),
            query: String::new(),
        }
    }

    /// Back to the initial state, with date bounds taken from `table` as it is now.
    pub fn reset(&self, _filters: &FilterState, table: &Table, today: Date) -> FilterState {
        self.initial_filters(table, today)
    }

    /// One full pass of the page pipeline: search, categorical chain, date
    /// range, projection, then selection lookup. Returns what to show and the
    /// session to keep for the next pass.
    pub fn render(
        &self,
        table: &Table,
        session: &PageSession,
        today: Date,
        language: Language,
    ) -> (PageView, PageSession) {
        let filters = &session.filters;
        let bounds = self.date.bounds(table, today);

        let searched = search::apply(table, &filters.query);
        let search_hits = (!filters.query.is_empty()).then_some(searched.len());

        let chain = self.chain.evaluate(&searched, &filters.choices);
        let range = filters.date_range.unwrap_or(bounds);
        let dated = self.date.apply(&chain.view, range, bounds);

        let mut view = self.projection.project(&dated, language);
        if let Some((field, excluded)) = self.primary_exclude {
            view = view.retain(|row| table.text(&row.record, field) != excluded);
        }

        let fingerprint = view.fingerprint();
        let mut next = PageSession {
            filters: FilterState {
                choices: chain.choices(),
                date_range: Some(range),
                query: filters.query.clone(),
            },
            selection: session.selection,
            secondary: session.secondary,
            fingerprint: Some(fingerprint),
            group_fingerprint: session.group_fingerprint,
        };
        if session.fingerprint != Some(fingerprint) && next.selection.is_some() {
            tracing::debug!(page = self.id.key(), "view changed, clearing selection");
            next.clear_selection();
        }

        let status = if view.is_empty() {
            PageStatus::EmptyResult
        } else {
            PageStatus::Results(view.len())
        };
        let detail = match status {
            PageStatus::EmptyResult => Detail::Nothing,
            PageStatus::Results(_) => self.detail(table, &view, &mut next, language),
        };

        let page = PageView {
            page: self.id,
            slots: chain.slots,
            bounds,
            range,
            search_hits,
            view,
            status,
            detail,
        };
        (page, next)
    }

    fn detail(
        &self,
        table: &Table,
        view: &View,
        session: &mut PageSession,
        language: Language,
    ) -> Detail {
        let Some(index) = session.selection else {
            return Detail::Nothing;
        };
        let Some(row) = resolve(view, index).row() else {
            tracing::debug!(page = self.id.key(), index, "stale selection ignored");
            session.clear_selection();
            return Detail::Nothing;
        };
        if self.disambiguate_by.is_empty() {
            return Detail::Report(self.report(table, &row.record));
        }

        match disambiguate(
            table,
            &row.record,
            &self.disambiguate_by,
            &self.projection,
            language,
        ) {
            Disambiguation::Direct(record) => {
                session.secondary = None;
                session.group_fingerprint = None;
                Detail::Report(self.report(table, &record))
            }
            Disambiguation::Missing => {
                session.secondary = None;
                session.group_fingerprint = None;
                Detail::NotFound
            }
            Disambiguation::Choose(group) => {
                let group_fingerprint = group.fingerprint();
                if session.secondary.is_some()
                    && session.group_fingerprint != Some(group_fingerprint)
                {
                    tracing::debug!(page = self.id.key(), "group changed, clearing selection");
                    session.secondary = None;
                }
                session.group_fingerprint = Some(group_fingerprint);
                let picked = session
                    .secondary
                    .and_then(|index| resolve(&group, index).row())
                    .map(|row| self.report(table, &row.record));
                if picked.is_none() {
                    session.secondary = None;
                }
                let selected = picked.as_ref().and(session.secondary);
                Detail::Choose {
                    group,
                    selected,
                    report: picked,
                }
            }
        }
    }

    fn report(&self, table: &Table, record: &Record) -> Report {
        Report {
            record: record.clone(),
            text: table.text(record, self.report_field),
            photo_links: self
                .photos_field
                .map(|field| drive_links(&table.text(record, field)))
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// Not an error: the filters leave nothing, and the detail pane stays empty.
    EmptyResult,
    Results(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub record: Record,
    pub text: String,
    pub photo_links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    Nothing,
    Report(Report),
    Choose {
        group: View,
        selected: Option<i64>,
        report: Option<Report>,
    },
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub page: PageId,
    pub slots: Vec<SlotOutcome>,
    /// Observed date span of the whole table.
    pub bounds: DateRange,
    pub range: DateRange,
    /// Matches for a non-empty search query.
    pub search_hits: Option<usize>,
    pub view: View,
    pub status: PageStatus,
    pub detail: Detail,
}
