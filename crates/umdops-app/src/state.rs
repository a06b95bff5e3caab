// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use crate::{Choice, DateRange, Language, PageId, format_date};

/// Active filters for one page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub choices: BTreeMap<String, Choice>,
    /// `None` means the full observed range of the table.
    pub date_range: Option<DateRange>,
    pub query: String,
}

impl FilterState {
    pub fn choice(&self, slot: &str) -> &Choice {
        static UNSELECTED: Choice = Choice::Unselected;
        self.choices.get(slot).unwrap_or(&UNSELECTED)
    }

    pub fn set_choice(&mut self, slot: &str, choice: Choice) {
        self.choices.insert(slot.to_owned(), choice);
    }

    pub fn is_unfiltered(&self) -> bool {
        self.query.is_empty()
            && self
                .choices
                .values()
                .all(|choice| *choice == Choice::Unselected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageSession {
    pub filters: FilterState,
    /// Row index into the last rendered primary view.
    pub selection: Option<i64>,
    /// Row index into the ambiguous group of the primary selection.
    pub secondary: Option<i64>,
    /// Fingerprint of the view `selection` indexes into.
    pub fingerprint: Option<u64>,
    /// Fingerprint of the group `secondary` indexes into.
    pub group_fingerprint: Option<u64>,
}

impl PageSession {
    pub fn select(&mut self, index: i64) {
        self.selection = Some(index);
        self.secondary = None;
        self.group_fingerprint = None;
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.secondary = None;
        self.group_fingerprint = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub logged_in: bool,
    pub user: Option<String>,
    pub language: Language,
    pub active_page: PageId,
    pub pages: BTreeMap<PageId, PageSession>,
    pub status_line: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    NextPage,
    PrevPage,
    OpenPage(PageId),
    ToggleLanguage,
    Logout,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PageChanged(PageId),
    LanguageChanged(Language),
    LoggedOut,
    StatusUpdated(String),
    StatusCleared,
}

impl SessionState {
    pub fn new(language: Language) -> Self {
        Self {
            logged_in: false,
            user: None,
            language,
            active_page: PageId::FieldWork,
            pages: BTreeMap::new(),
            status_line: None,
        }
    }

    pub fn page(&self, page: PageId) -> PageSession {
        self.pages.get(&page).cloned().unwrap_or_default()
    }

    pub fn page_mut(&mut self, page: PageId) -> &mut PageSession {
        self.pages.entry(page).or_default()
    }

    pub fn store(&mut self, page: PageId, session: PageSession) {
        self.pages.insert(page, session);
    }

    pub fn dispatch(&mut self, command: SessionCommand) -> Vec<SessionEvent> {
        match command {
            SessionCommand::NextPage => self.rotate_page(1),
            SessionCommand::PrevPage => self.rotate_page(-1),
            SessionCommand::OpenPage(page) => {
                self.active_page = page;
                vec![SessionEvent::PageChanged(page)]
            }
            SessionCommand::ToggleLanguage => {
                self.language = self.language.toggled();
                vec![
                    SessionEvent::LanguageChanged(self.language),
                    self.set_status(self.language.code()),
                ]
            }
            SessionCommand::Logout => {
                self.logged_in = false;
                self.user = None;
                self.pages.clear();
                vec![SessionEvent::LoggedOut]
            }
            SessionCommand::SetStatus(message) => vec![self.set_status(&message)],
            SessionCommand::ClearStatus => {
                self.status_line = None;
                vec![SessionEvent::StatusCleared]
            }
        }
    }

    /// Flattened view keyed by `<page>.<slot>`, `<page>.search` and `<page>.date`.
    pub fn entries(&self) -> BTreeMap<String, String> {
        let mut entries = BTreeMap::new();
        for (page, session) in &self.pages {
            let filters = &session.filters;
            for (slot, choice) in &filters.choices {
                if let Choice::Exact(value) = choice {
                    entries.insert(format!("{}.{slot}", page.key()), value.clone());
                }
            }
            if !filters.query.is_empty() {
                entries.insert(format!("{}.search", page.key()), filters.query.clone());
            }
            if let Some(range) = filters.date_range {
                entries.insert(
                    format!("{}.date", page.key()),
                    format!("{}..{}", format_date(range.start), format_date(range.end)),
                );
            }
        }
        entries
    }

    fn rotate_page(&mut self, delta: isize) -> Vec<SessionEvent> {
        let pages = PageId::ALL;
        let current = pages
            .iter()
            .position(|page| *page == self.active_page)
            .unwrap_or(0) as isize;
        let len = pages.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_page = pages[next];
        vec![SessionEvent::PageChanged(self.active_page)]
    }

    fn set_status(&mut self, message: &str) -> SessionEvent {
        self.status_line = Some(message.to_owned());
        SessionEvent::StatusUpdated(message.to_owned())
    }
}
