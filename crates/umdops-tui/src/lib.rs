// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::Span;
use ratatui::widgets::canvas::{Canvas, Circle, Line as CanvasLine, Rectangle};
use ratatui::widgets::{
    Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row,
    Table as TableWidget, TableState, Tabs, Wrap,
};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::Date;
use umdops_app::details::{self, Issues, UmdDetail, UmdDetailsView, UmdLookup};
use umdops_app::pages;
use umdops_app::{
    Access, Choice, Credentials, Deltas, Detail, ImageFetchError, Language, Metrics, PageConfig,
    PageId, PageStatus, PageView, PositionDiagram, Report, SHADED_PERIODS, SeriesPoint,
    SessionCommand, SessionEvent, SessionState, SlotOutcome, SourceError, Strip, Table,
    TabularSource, Text, TimeWindow, View, combined_series, format_date, guard, installations,
    metrics, stock_points,
};

const STATS_WINDOW_SLOT: &str = "window";
const DATE_PAGE_DAYS: i64 = 30;
const MAX_COLUMN_WIDTH: usize = 40;
const CURSOR_MARK: &str = "›";

/// What the dashboard needs from the outside world.
pub trait DashboardRuntime {
    fn source(&mut self) -> &mut dyn TabularSource;
    fn credentials(&self) -> &Credentials;
    /// Local path of the image behind a Drive link.
    fn fetch_photo(&mut self, link: &str) -> Result<PathBuf, ImageFetchError>;
    fn map_url(&self) -> &str;
    fn today(&self) -> Date;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Focus {
    #[default]
    Filters,
    Results,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LoginField {
    #[default]
    User,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct LoginForm {
    user: String,
    password: String,
    field: LoginField,
    failed: bool,
}

impl LoginForm {
    fn active_mut(&mut self) -> &mut String {
        match self.field {
            LoginField::User => &mut self.user,
            LoginField::Password => &mut self.password,
        }
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            LoginField::User => LoginField::Password,
            LoginField::Password => LoginField::User,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterRow {
    Slot(usize),
    From,
    To,
    Search,
    Window,
}

#[derive(Debug, Clone, PartialEq)]
struct StatsView {
    window: TimeWindow,
    metrics: Metrics,
    series: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq)]
enum Screen {
    Map,
    Page(Box<PageView>),
    Statistics(Box<StatsView>),
    Details(Box<UmdDetailsView>),
    Unavailable(String),
}

#[derive(Debug)]
struct ViewData {
    configs: BTreeMap<PageId, PageConfig>,
    tables: BTreeMap<&'static str, Table>,
    screen: Screen,
    focus: Focus,
    filter_cursor: usize,
    result_cursor: usize,
    group_cursor: usize,
    editing_search: bool,
    help_visible: bool,
    login: LoginForm,
    photos: BTreeMap<String, Result<PathBuf, String>>,
    map_url: String,
    status_token: u64,
}

impl ViewData {
    fn new(map_url: &str) -> Self {
        Self {
            configs: [pages::field_work(), pages::acquisitions()]
                .into_iter()
                .map(|config| (config.id, config))
                .collect(),
            tables: BTreeMap::new(),
            screen: Screen::Map,
            focus: Focus::Filters,
            filter_cursor: 0,
            result_cursor: 0,
            group_cursor: 0,
            editing_search: false,
            help_visible: false,
            login: LoginForm::default(),
            photos: BTreeMap::new(),
            map_url: map_url.to_owned(),
            status_token: 0,
        }
    }

    fn reset_navigation(&mut self) {
        self.focus = Focus::Filters;
        self.filter_cursor = 0;
        self.result_cursor = 0;
        self.group_cursor = 0;
        self.editing_search = false;
    }
}

pub fn run_app<R: DashboardRuntime>(state: &mut SessionState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(runtime.map_url());
    let (internal_tx, internal_rx) = mpsc::channel();

    if guard(state) == Access::Granted {
        refresh_or_report(state, runtime, &mut view_data, &internal_tx, true);
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut SessionState,
    view_data: &ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(SessionCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn dispatch_session(
    state: &mut SessionState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: SessionCommand,
) {
    let events = state.dispatch(command);
    if events
        .iter()
        .any(|event| matches!(event, SessionEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
}

fn emit_status(
    state: &mut SessionState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    dispatch_session(
        state,
        view_data,
        internal_tx,
        SessionCommand::SetStatus(message.into()),
    );
}

fn load_page_tables(
    page: PageId,
    source: &mut dyn TabularSource,
    view_data: &mut ViewData,
    force: bool,
) -> Result<(), SourceError> {
    if let Some(config) = view_data.configs.get(&page) {
        if force || !view_data.tables.contains_key(config.table.table_id) {
            let table = config.load(source)?;
            view_data.tables.insert(config.table.table_id, table);
        }
        return Ok(());
    }

    let specs = match page {
        PageId::Statistics => vec![pages::stock_table(), pages::history_table()],
        PageId::UmdDetails => vec![pages::history_table(), pages::umd_details_table()],
        PageId::Map | PageId::FieldWork | PageId::Acquisitions => Vec::new(),
    };
    for spec in specs {
        if force || !view_data.tables.contains_key(spec.table_id) {
            let table = source.load(&spec)?;
            view_data.tables.insert(spec.table_id, table);
        }
    }
    Ok(())
}

/// Reruns the active page's pipeline against the cached tables, loading
/// them first when missing or when `force` is set.
fn refresh_screen<R: DashboardRuntime>(
    state: &mut SessionState,
    runtime: &mut R,
    view_data: &mut ViewData,
    force: bool,
) -> Result<(), SourceError> {
    let page = state.active_page;
    if let Err(error) = load_page_tables(page, runtime.source(), view_data, force) {
        tracing::warn!(page = page.key(), %error, "page data unavailable");
        view_data.screen = Screen::Unavailable(error.to_string());
        return Err(error);
    }

    let today = runtime.today();
    view_data.screen = match page {
        PageId::Map => Screen::Map,
        PageId::FieldWork | PageId::Acquisitions => {
            let rendered = view_data.configs.get(&page).and_then(|config| {
                let table = view_data.tables.get(config.table.table_id)?;
                Some(config.render(table, &state.page(page), today, state.language))
            });
            match rendered {
                Some((view, next)) => {
                    state.store(page, next);
                    Screen::Page(Box::new(view))
                }
                None => Screen::Unavailable(format!("{} is not loaded", page.key())),
            }
        }
        PageId::Statistics => {
            match (
                view_data.tables.get(pages::STOCK_TABLE),
                view_data.tables.get(pages::HISTORY_TABLE),
            ) {
                (Some(stock), Some(history)) => {
                    let stock = stock_points(stock);
                    let installs = installations(history);
                    let window = stats_window(state, today);
                    Screen::Statistics(Box::new(StatsView {
                        window,
                        metrics: metrics(&stock, &installs, window, today),
                        series: combined_series(&stock, &installs),
                    }))
                }
                _ => Screen::Unavailable(format!("{} is not loaded", page.key())),
            }
        }
        PageId::UmdDetails => {
            match (
                view_data.tables.get(pages::HISTORY_TABLE),
                view_data.tables.get(pages::UMD_DETAILS_TABLE),
            ) {
                (Some(history), Some(umd_details)) => {
                    let (view, next) =
                        details::render_details(history, umd_details, &state.page(page));
                    state.store(page, next);
                    Screen::Details(Box::new(view))
                }
                _ => Screen::Unavailable(format!("{} is not loaded", page.key())),
            }
        }
    };
    clamp_cursors(view_data);
    Ok(())
}

fn refresh_or_report<R: DashboardRuntime>(
    state: &mut SessionState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    force: bool,
) {
    if let Err(error) = refresh_screen(state, runtime, view_data, force) {
        emit_status(state, view_data, internal_tx, format!("load failed: {error}"));
    }
}

fn stats_window(state: &SessionState, today: Date) -> TimeWindow {
    state
        .page(PageId::Statistics)
        .filters
        .choice(STATS_WINDOW_SLOT)
        .value()
        .and_then(TimeWindow::from_key)
        .filter(|window| TimeWindow::options(today).contains(window))
        .unwrap_or(TimeWindow::AllTime)
}

fn filter_rows(screen: &Screen) -> Vec<FilterRow> {
    match screen {
        Screen::Page(view) => {
            let mut rows = (0..view.slots.len())
                .map(FilterRow::Slot)
                .collect::<Vec<_>>();
            rows.extend([FilterRow::From, FilterRow::To, FilterRow::Search]);
            rows
        }
        Screen::Details(view) => (0..view.slots.len()).map(FilterRow::Slot).collect(),
        Screen::Statistics(_) => vec![FilterRow::Window],
        Screen::Map | Screen::Unavailable(_) => Vec::new(),
    }
}

fn result_count(screen: &Screen) -> usize {
    match screen {
        Screen::Page(view) => view.view.rows.len(),
        _ => 0,
    }
}

fn group_count(screen: &Screen) -> usize {
    match screen {
        Screen::Page(view) => match &view.detail {
            Detail::Choose { group, .. } => group.rows.len(),
            _ => 0,
        },
        _ => 0,
    }
}

fn clamp_cursors(view_data: &mut ViewData) {
    let clamp = |cursor: usize, len: usize| cursor.min(len.saturating_sub(1));
    view_data.filter_cursor = clamp(view_data.filter_cursor, filter_rows(&view_data.screen).len());
    view_data.result_cursor = clamp(view_data.result_cursor, result_count(&view_data.screen));
    view_data.group_cursor = clamp(view_data.group_cursor, group_count(&view_data.screen));
    if view_data.focus == Focus::Group && group_count(&view_data.screen) == 0 {
        view_data.focus = Focus::Results;
    }
    if view_data.focus == Focus::Results && result_count(&view_data.screen) == 0 {
        view_data.focus = Focus::Filters;
    }
}

fn current_report(screen: &Screen) -> Option<&Report> {
    let Screen::Page(view) = screen else {
        return None;
    };
    match &view.detail {
        Detail::Report(report) => Some(report),
        Detail::Choose {
            report: Some(report),
            ..
        } => Some(report),
        _ => None,
    }
}

fn handle_key_event<R: DashboardRuntime>(
    state: &mut SessionState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('q' | 'c'))
    {
        return true;
    }

    if guard(state) == Access::RedirectToLogin {
        return handle_login_key(state, runtime, view_data, internal_tx, key);
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.editing_search {
        handle_search_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Tab | KeyCode::Char('f') => {
            switch_page(state, runtime, view_data, internal_tx, SessionCommand::NextPage);
        }
        KeyCode::BackTab | KeyCode::Char('b') => {
            switch_page(state, runtime, view_data, internal_tx, SessionCommand::PrevPage);
        }
        KeyCode::Char('L') => {
            dispatch_session(state, view_data, internal_tx, SessionCommand::ToggleLanguage);
            refresh_or_report(state, runtime, view_data, internal_tx, false);
        }
        KeyCode::Char('X') => logout(state, view_data, internal_tx),
        KeyCode::Char('g') => match refresh_screen(state, runtime, view_data, true) {
            Ok(()) => emit_status(state, view_data, internal_tx, "reloaded"),
            Err(error) => {
                emit_status(state, view_data, internal_tx, format!("load failed: {error}"));
            }
        },
        KeyCode::Char('c') => clear_filters(state, runtime, view_data, internal_tx),
        KeyCode::Char('/') => start_search(view_data),
        KeyCode::Char('p') => fetch_photos(state, runtime, view_data, internal_tx),
        KeyCode::Up | KeyCode::Char('k') => move_cursor(view_data, -1),
        KeyCode::Down | KeyCode::Char('j') => move_cursor(view_data, 1),
        KeyCode::Left | KeyCode::Char('h') => {
            step_filter(state, runtime, view_data, internal_tx, false, 1);
        }
        KeyCode::Right | KeyCode::Char('l') => {
            step_filter(state, runtime, view_data, internal_tx, true, 1);
        }
        KeyCode::PageUp => {
            step_filter(state, runtime, view_data, internal_tx, false, DATE_PAGE_DAYS);
        }
        KeyCode::PageDown => {
            step_filter(state, runtime, view_data, internal_tx, true, DATE_PAGE_DAYS);
        }
        KeyCode::Enter => activate(state, runtime, view_data, internal_tx),
        KeyCode::Esc => back(state, runtime, view_data, internal_tx),
        _ => {}
    }
    false
}

fn handle_login_key<R: DashboardRuntime>(
    state: &mut SessionState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            view_data.login.toggle_field();
        }
        KeyCode::Backspace => {
            view_data.login.active_mut().pop();
        }
        KeyCode::Enter if view_data.login.field == LoginField::User => {
            view_data.login.field = LoginField::Password;
        }
        KeyCode::Enter => submit_login(state, runtime, view_data, internal_tx),
        KeyCode::Char(ch) => view_data.login.active_mut().push(ch),
        _ => {}
    }
    false
}

fn submit_login<R: DashboardRuntime>(
    state: &mut SessionState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let ok = runtime.credentials().login(
        state,
        view_data.login.user.trim(),
        &view_data.login.password,
    );
    if !ok {
        view_data.login.password.clear();
        view_data.login.field = LoginField::Password;
        view_data.login.failed = true;
        return;
    }

    view_data.login = LoginForm::default();
    view_data.reset_navigation();
    let user = state.user.clone().unwrap_or_default();
    emit_status(state, view_data, internal_tx, format!("signed in as {user}"));
    refresh_or_report(state, runtime, view_data, internal_tx, true);
}

fn logout(state: &mut SessionState, view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>) {
    dispatch_session(state, view_data, internal_tx, SessionCommand::Logout);
    view_data.reset_navigation();
    view_data.tables.clear();
    view_data.photos.clear();
    view_data.screen = Screen::Map;
    let message = Text::LoggedOut.get(state.language);
    emit_status(state, view_data, internal_tx, message);
}

fn switch_page<R: DashboardRuntime>(
    state: &mut SessionState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: SessionCommand,
) {
    dispatch_session(state, view_data, internal_tx, command);
    view_data.reset_navigation();
    refresh_or_report(state, runtime, view_data, internal_tx, true);
}

fn handle_search_key<R: DashboardRuntime>(
    state: &mut SessionState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let page = state.active_page;
    match key.code {
        KeyCode::Enter | KeyCode::Esc => view_data.editing_search = false,
        KeyCode::Backspace => {
            state.page_mut(page).filters.query.pop();
            refresh_or_report(state, runtime, view_data, internal_tx, false);
        }
        KeyCode::Char(ch) => {
            state.page_mut(page).filters.query.push(ch);
            refresh_or_report(state, runtime, view_data, internal_tx, false);
        }
        _ => {}
    }
}

fn start_search(view_data: &mut ViewData) {
    let Some(index) = filter_rows(&view_data.screen)
        .iter()
        .position(|row| *row == FilterRow::Search)
    else {
        return;
    };
    view_data.focus = Focus::Filters;
    view_data.filter_cursor = index;
    view_data.editing_search = true;
}

fn move_cursor(view_data: &mut ViewData, delta: isize) {
    let (cursor, len) = match view_data.focus {
        Focus::Filters => (
            &mut view_data.filter_cursor,
            filter_rows(&view_data.screen).len(),
        ),
        Focus::Results => (
            &mut view_data.result_cursor,
            result_count(&view_data.screen),
        ),
        Focus::Group => (&mut view_data.group_cursor, group_count(&view_data.screen)),
    };
    if len == 0 {
        *cursor = 0;
        return;
    }
    *cursor = cursor.saturating_add_signed(delta).min(len - 1);
}

fn step_filter<R: DashboardRuntime>(
    state: &mut SessionState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    forward: bool,
    days: i64,
) {
    if view_data.focus != Focus::Filters {
        return;
    }
    let page = state.active_page;
    let Some(row) = filter_rows(&view_data.screen)
        .get(view_data.filter_cursor)
        .copied()
    else {
        return;
    };

    match row {
        FilterRow::Slot(index) => {
            let outcome: Option<&SlotOutcome> = match &view_data.screen {
                Screen::Page(view) => view.slots.get(index),
                Screen::Details(view) => view.slots.get(index),
                _ => None,
            };
            let Some(outcome) = outcome else {
                return;
            };
            let next = outcome.step(forward);
            state.page_mut(page).filters.set_choice(outcome.key, next);
        }
        FilterRow::From | FilterRow::To => {
            let Screen::Page(view) = &view_data.screen else {
                return;
            };
            let mut range = view.range;
            let bound = if row == FilterRow::From {
                &mut range.start
            } else {
                &mut range.end
            };
            let delta = time::Duration::days(if forward { days } else { -days });
            if let Some(shifted) = bound.checked_add(delta) {
                *bound = shifted;
            }
            state.page_mut(page).filters.date_range = Some(range);
        }
        FilterRow::Window => {
            let today = runtime.today();
            let options = TimeWindow::options(today);
            let current = stats_window(state, today);
            let index = options
                .iter()
                .position(|window| *window == current)
                .unwrap_or(0);
            let next = if forward {
                (index + 1) % options.len()
            } else {
                (index + options.len() - 1) % options.len()
            };
            state
                .page_mut(PageId::Statistics)
                .filters
                .set_choice(STATS_WINDOW_SLOT, Choice::Exact(options[next].key()));
        }
        FilterRow::Search => return,
    }
    refresh_or_report(state, runtime, view_data, internal_tx, false);
}

fn activate<R: DashboardRuntime>(
    state: &mut SessionState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let page = state.active_page;
    match view_data.focus {
        Focus::Filters => {
            let row = filter_rows(&view_data.screen)
                .get(view_data.filter_cursor)
                .copied();
            if row == Some(FilterRow::Search) {
                view_data.editing_search = true;
            } else if result_count(&view_data.screen) > 0 {
                view_data.focus = Focus::Results;
            }
        }
        Focus::Results => {
            if view_data.result_cursor >= result_count(&view_data.screen) {
                return;
            }
            state
                .page_mut(page)
                .select(view_data.result_cursor as i64);
            view_data.group_cursor = 0;
            refresh_or_report(state, runtime, view_data, internal_tx, false);
            if group_count(&view_data.screen) > 0 {
                view_data.focus = Focus::Group;
            }
        }
        Focus::Group => {
            state.page_mut(page).secondary = Some(view_data.group_cursor as i64);
            refresh_or_report(state, runtime, view_data, internal_tx, false);
        }
    }
}

fn back<R: DashboardRuntime>(
    state: &mut SessionState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let page = state.active_page;
    match view_data.focus {
        Focus::Filters => return,
        Focus::Results => {
            state.page_mut(page).clear_selection();
            view_data.focus = Focus::Filters;
        }
        Focus::Group => {
            state.page_mut(page).secondary = None;
            view_data.focus = Focus::Results;
        }
    }
    refresh_or_report(state, runtime, view_data, internal_tx, false);
}

fn clear_filters<R: DashboardRuntime>(
    state: &mut SessionState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let page = state.active_page;
    let today = runtime.today();
    match page {
        PageId::Map => return,
        PageId::FieldWork | PageId::Acquisitions => {
            let Some(config) = view_data.configs.get(&page) else {
                return;
            };
            let Some(table) = view_data.tables.get(config.table.table_id) else {
                return;
            };
            let session = state.page_mut(page);
            let filters = config.reset(&session.filters, table, today);
            session.filters = filters;
            session.clear_selection();
        }
        PageId::Statistics | PageId::UmdDetails => {
            *state.page_mut(page) = Default::default();
        }
    }
    view_data.reset_navigation();
    refresh_or_report(state, runtime, view_data, internal_tx, false);
}

fn fetch_photos<R: DashboardRuntime>(
    state: &mut SessionState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let links = current_report(&view_data.screen)
        .map(|report| report.photo_links.clone())
        .unwrap_or_default();
    if links.is_empty() {
        let message = Text::NoPhotos.get(state.language);
        emit_status(state, view_data, internal_tx, message);
        return;
    }

    let (mut cached, mut failed) = (0, 0);
    for link in links {
        let result = runtime.fetch_photo(&link).map_err(|error| error.to_string());
        if result.is_ok() {
            cached += 1;
        } else {
            failed += 1;
        }
        view_data.photos.insert(link, result);
    }
    let message = Text::PhotosFetched.fill(state.language, &[&cached, &failed]);
    emit_status(state, view_data, internal_tx, message);
}

fn render(frame: &mut ratatui::Frame<'_>, state: &SessionState, view_data: &ViewData) {
    if guard(state) == Access::RedirectToLogin {
        render_login(frame, state, view_data);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let language = state.language;
    let selected = PageId::ALL
        .iter()
        .position(|page| *page == state.active_page)
        .unwrap_or(0);
    let titles = PageId::ALL
        .iter()
        .map(|page| page.title().get(language).to_owned())
        .collect::<Vec<String>>();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .title(Text::PageTitle.get(language))
                .borders(Borders::ALL),
        )
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    match &view_data.screen {
        Screen::Map => {
            let body = Paragraph::new(map_text(language, &view_data.map_url))
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(Text::TabMap.get(language)),
                );
            frame.render_widget(body, layout[1]);
        }
        Screen::Unavailable(reason) => {
            let body = Paragraph::new(format!("{}\n\n{reason}", Text::NoData.get(language)))
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: false })
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(body, layout[1]);
        }
        Screen::Page(view) => render_filter_page(frame, layout[1], state, view_data, view),
        Screen::Statistics(stats) => render_statistics(frame, layout[1], state, view_data, stats),
        Screen::Details(view) => render_details_page(frame, layout[1], state, view_data, view),
    }

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if view_data.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .wrap(Wrap { trim: false })
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_login(frame: &mut ratatui::Frame<'_>, state: &SessionState, view_data: &ViewData) {
    let area = centered_rect(60, 50, frame.area());
    frame.render_widget(Clear, area);
    let login = Paragraph::new(login_text(&view_data.login, state.language))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(Text::PageTitle.get(state.language))
                .borders(Borders::ALL),
        );
    frame.render_widget(login, area);
}

fn render_filter_page(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &SessionState,
    view_data: &ViewData,
    view: &PageView,
) {
    let language = state.language;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(20)])
        .split(area);
    let filters = Paragraph::new(filter_panel_text(state, view_data))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Text::Filters.get(language)),
        );
    frame.render_widget(filters, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[1]);

    let title = match view.status {
        PageStatus::EmptyResult => format!("{} (0)", Text::Results.get(language)),
        PageStatus::Results(count) => format!("{} ({count})", Text::Results.get(language)),
    };
    let selection = state.page(view.page).selection;
    render_view_table(
        frame,
        right[0],
        title,
        &view.view,
        (view_data.focus == Focus::Results).then_some(view_data.result_cursor),
        selection,
        Text::EmptyResult.get(language),
    );

    let with_photos = view.page == PageId::FieldWork;
    match &view.detail {
        Detail::Choose {
            group, selected, ..
        } => {
            let split = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(45), Constraint::Min(3)])
                .split(right[1]);
            render_view_table(
                frame,
                split[0],
                Text::SeveralReports.get(language).to_owned(),
                group,
                (view_data.focus == Focus::Group).then_some(view_data.group_cursor),
                *selected,
                Text::NoReportFound.get(language),
            );
            let report = Paragraph::new(report_text(
                &view.detail,
                language,
                with_photos,
                &view_data.photos,
            ))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(Text::Report.get(language)),
            );
            frame.render_widget(report, split[1]);
        }
        detail => {
            let report = Paragraph::new(report_text(detail, language, with_photos, &view_data.photos))
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(Text::Report.get(language)),
                );
            frame.render_widget(report, right[1]);
        }
    }
}

fn render_view_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: String,
    view: &View,
    cursor: Option<usize>,
    selected: Option<i64>,
    empty_text: &str,
) {
    let block = Block::default().borders(Borders::ALL).title(title);
    if view.rows.is_empty() {
        frame.render_widget(Paragraph::new(empty_text.to_owned()).block(block), area);
        return;
    }

    let header = Row::new(view.headers.iter().map(|header| Cell::from(header.clone())))
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = view.rows.iter().enumerate().map(|(index, row)| {
        let mut style = Style::default();
        if selected == Some(index as i64) {
            style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
        }
        if cursor == Some(index) {
            style = style.bg(Color::DarkGray);
        }
        Row::new(row.cells.iter().map(|cell| Cell::from(cell.clone()))).style(style)
    });
    let table = TableWidget::new(rows, column_widths(view))
        .header(header)
        .column_spacing(1)
        .block(block);
    let mut table_state = TableState::default().with_selected(cursor);
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn column_widths(view: &View) -> Vec<Constraint> {
    view.headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let widest = view
                .rows
                .iter()
                .filter_map(|row| row.cells.get(index))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                .max(header.chars().count())
                .min(MAX_COLUMN_WIDTH);
            Constraint::Length(u16::try_from(widest).unwrap_or(u16::MAX))
        })
        .collect()
}

fn render_statistics(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &SessionState,
    view_data: &ViewData,
    stats: &StatsView,
) {
    let language = state.language;
    let shaded = shaded_periods_text(&stats.series, language);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9),
            Constraint::Min(8),
            Constraint::Length(u16::try_from(shaded.lines().count() + 2).unwrap_or(u16::MAX)),
        ])
        .split(area);

    let mut header = stats_text(stats, language);
    if view_data.focus == Focus::Filters {
        header.push_str("\n\nh/l: ");
        header.push_str(Text::StatsTimeFilter.get(language));
    }
    let summary = Paragraph::new(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Text::StatsHeader.get(language)),
    );
    frame.render_widget(summary, layout[0]);

    render_series_chart(frame, layout[1], &stats.series, language);

    let periods = Paragraph::new(shaded).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Text::StatsShadedPeriods.get(language)),
    );
    frame.render_widget(periods, layout[2]);
}

fn julian(date: Date) -> f64 {
    f64::from(date.to_julian_day())
}

fn render_series_chart(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    series: &[SeriesPoint],
    language: Language,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Text::StatsCombinedTitle.get(language));
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        frame.render_widget(Paragraph::new(Text::NoData.get(language)).block(block), area);
        return;
    };

    let assembled = series
        .iter()
        .map(|point| (julian(point.date), point.assembled as f64))
        .collect::<Vec<_>>();
    let installed = series
        .iter()
        .map(|point| (julian(point.date), point.installed as f64))
        .collect::<Vec<_>>();
    let x_min = julian(first.date);
    let x_max = julian(last.date).max(x_min + 1.0);
    let y_max = series
        .iter()
        .map(|point| point.assembled.max(point.installed))
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    let shading = SHADED_PERIODS
        .iter()
        .filter(|period| julian(period.end) >= x_min && julian(period.start) <= x_max)
        .map(|period| {
            let start = julian(period.start).max(x_min) as i64;
            let end = julian(period.end).min(x_max) as i64;
            (start..=end)
                .map(|day| (day as f64, y_max))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut datasets = shading
        .iter()
        .map(|points| {
            Dataset::default()
                .marker(Marker::Dot)
                .graph_type(GraphType::Bar)
                .style(Style::default().fg(Color::DarkGray))
                .data(points)
        })
        .collect::<Vec<_>>();
    datasets.push(
        Dataset::default()
            .name(Text::StatsAssembled.get(language))
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&assembled),
    );
    datasets.push(
        Dataset::default()
            .name(Text::StatsInstalled.get(language))
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Green))
            .data(&installed),
    );

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([x_min, x_max])
                .labels(vec![
                    Span::raw(format_date(first.date)),
                    Span::raw(format_date(last.date)),
                ]),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, y_max])
                .labels(vec![Span::raw("0"), Span::raw(format!("{}", y_max as i64))]),
        );
    frame.render_widget(chart, area);
}

fn render_details_page(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &SessionState,
    view_data: &ViewData,
    view: &UmdDetailsView,
) {
    let language = state.language;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(46), Constraint::Min(20)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(u16::try_from(view.slots.len() + 2).unwrap_or(u16::MAX)),
            Constraint::Min(5),
        ])
        .split(columns[0]);

    let filters = Paragraph::new(filter_panel_text(state, view_data)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Text::Filters.get(language)),
    );
    frame.render_widget(filters, left[0]);

    let info = Paragraph::new(details_text(&view.lookup, language))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Text::InstallationInfo.get(language)),
        );
    frame.render_widget(info, left[1]);

    let UmdLookup::Found(detail) = &view.lookup else {
        let empty = Paragraph::new(Text::NoPlotData.get(language))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, columns[1]);
        return;
    };

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(columns[1]);
    render_strip_layout(frame, right[0], &detail.strips, language);
    match &detail.diagram {
        Ok(diagram) => render_position_diagram(frame, right[1], diagram, language),
        Err(error) => {
            let message = Paragraph::new(format!("{}\n{error}", Text::NoPlotData.get(language)))
                .style(Style::default().fg(Color::Red))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(Text::UmdPosition.get(language)),
                );
            frame.render_widget(message, right[1]);
        }
    }
}

fn render_strip_layout(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    strips: &[Strip],
    language: Language,
) {
    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Text::UmdLayout.get(language)),
        )
        .marker(Marker::Braille)
        .x_bounds([-0.7, 0.7])
        .y_bounds([-0.8, 0.8])
        .paint(|ctx| {
            for strip in strips {
                ctx.draw(&Rectangle {
                    x: strip.origin.x,
                    y: strip.origin.y,
                    width: strip.width,
                    height: strip.length,
                    color: if strip.flagged {
                        Color::Red
                    } else {
                        Color::Gray
                    },
                });
            }
            for strip in strips.iter().filter(|strip| strip.flagged) {
                ctx.print(
                    strip.origin.x,
                    strip.origin.y + strip.length / 2.0,
                    strip.number.to_string(),
                );
            }
        });
    frame.render_widget(canvas, area);
}

fn render_position_diagram(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    diagram: &PositionDiagram,
    language: Language,
) {
    let bound = diagram.margin_radius + 1.0;
    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Text::UmdPosition.get(language)),
        )
        .marker(Marker::Braille)
        .x_bounds([-bound, bound])
        .y_bounds([-bound, bound])
        .paint(|ctx| {
            ctx.draw(&Circle {
                x: 0.0,
                y: 0.0,
                radius: diagram.margin_radius,
                color: Color::DarkGray,
            });
            ctx.draw(&Circle {
                x: 0.0,
                y: 0.0,
                radius: diagram.tank_radius,
                color: Color::Blue,
            });
            for module in &diagram.modules {
                let color = if module.selected {
                    Color::Yellow
                } else {
                    Color::Cyan
                };
                for edge in module.outline.windows(2) {
                    ctx.draw(&CanvasLine {
                        x1: edge[0].x,
                        y1: edge[0].y,
                        x2: edge[1].x,
                        y2: edge[1].y,
                        color,
                    });
                }
                ctx.print(module.center.x, module.center.y, module.umd_id.clone());
            }
            let (tail, head) = diagram.north;
            ctx.draw(&CanvasLine {
                x1: tail.x,
                y1: tail.y,
                x2: head.x,
                y2: head.y,
                color: Color::White,
            });
            ctx.print(head.x, head.y, "N");
        });
    frame.render_widget(canvas, area);
}

fn slot_texts(page: PageId, view_data: &ViewData) -> Vec<(Text, Text)> {
    let chain = match view_data.configs.get(&page) {
        Some(config) => config.chain.clone(),
        None => details::umd_chain(),
    };
    chain
        .slots
        .iter()
        .map(|slot| (slot.label, slot.placeholder))
        .collect()
}

fn filter_panel_text(state: &SessionState, view_data: &ViewData) -> String {
    let language = state.language;
    let page = state.active_page;
    let session = state.page(page);
    let texts = slot_texts(page, view_data);
    let slots: &[SlotOutcome] = match &view_data.screen {
        Screen::Page(view) => &view.slots,
        Screen::Details(view) => &view.slots,
        _ => &[],
    };

    let mut lines = Vec::new();
    for (index, row) in filter_rows(&view_data.screen).into_iter().enumerate() {
        let mark = if view_data.focus == Focus::Filters && view_data.filter_cursor == index {
            CURSOR_MARK
        } else {
            " "
        };
        let line = match row {
            FilterRow::Slot(slot) => {
                let (label, placeholder) = texts
                    .get(slot)
                    .map(|(label, placeholder)| (label.get(language), placeholder.get(language)))
                    .unwrap_or_default();
                let value = slots
                    .get(slot)
                    .and_then(|outcome| outcome.choice.value().map(str::to_owned))
                    .unwrap_or_else(|| format!("<{placeholder}>"));
                format!("{label} {value}")
            }
            FilterRow::From | FilterRow::To => {
                let Screen::Page(view) = &view_data.screen else {
                    continue;
                };
                if row == FilterRow::From {
                    format!("{} {}", Text::From.get(language), format_date(view.range.start))
                } else {
                    format!("{} {}", Text::To.get(language), format_date(view.range.end))
                }
            }
            FilterRow::Search => {
                let query = if session.filters.query.is_empty() && !view_data.editing_search {
                    format!("<{}>", Text::SearchPlaceholder.get(language))
                } else if view_data.editing_search {
                    format!("{}_", session.filters.query)
                } else {
                    session.filters.query.clone()
                };
                format!("{} {query}", Text::Search.get(language))
            }
            FilterRow::Window => {
                let Screen::Statistics(stats) = &view_data.screen else {
                    continue;
                };
                format!(
                    "{}: {}",
                    Text::StatsTimeFilter.get(language),
                    stats.window.label(language)
                )
            }
        };
        lines.push(format!("{mark} {line}"));
    }

    if let Screen::Page(view) = &view_data.screen
        && let Some(hits) = view.search_hits
    {
        lines.push(String::new());
        let query = &session.filters.query;
        lines.push(if hits == 0 {
            Text::NoResults.fill(language, &[query])
        } else {
            Text::SearchResults.fill(language, &[&hits, query])
        });
    }
    lines.join("\n")
}

fn report_text(
    detail: &Detail,
    language: Language,
    with_photos: bool,
    photos: &BTreeMap<String, Result<PathBuf, String>>,
) -> String {
    let report = match detail {
        Detail::Nothing => return Text::ClickReport.get(language).to_owned(),
        Detail::NotFound => return Text::NoReportFound.get(language).to_owned(),
        Detail::Choose { report: None, .. } => {
            return Text::SeveralReports.get(language).to_owned();
        }
        Detail::Report(report)
        | Detail::Choose {
            report: Some(report),
            ..
        } => report,
    };

    let mut out = report.text.clone();
    if !with_photos {
        return out;
    }
    out.push_str("\n\n");
    out.push_str(Text::Photos.get(language));
    if report.photo_links.is_empty() {
        out.push('\n');
        out.push_str(Text::NoPhotos.get(language));
        return out;
    }
    for link in &report.photo_links {
        out.push('\n');
        match photos.get(link) {
            Some(Ok(path)) => out.push_str(&format!("{} ({link})", path.display())),
            Some(Err(error)) => out.push_str(&format!(
                "{} {error}\n{}: {link}",
                Text::ImageLoadError.get(language),
                Text::ImageLink.get(language)
            )),
            None => out.push_str(&format!("{}: {link}", Text::ImageLink.get(language))),
        }
    }
    out
}

fn stats_text(stats: &StatsView, language: Language) -> String {
    let metrics = &stats.metrics;
    let delta = |value: i64| match metrics.deltas {
        Some(_) => format!(" ({value:+})"),
        None => String::new(),
    };
    let deltas = metrics.deltas.unwrap_or(Deltas {
        assembled: 0,
        installed: 0,
        positions: 0,
    });
    [
        format!(
            "{}: {}",
            Text::StatsTimeFilter.get(language),
            stats.window.label(language)
        ),
        format!(
            "{}: {}{}",
            Text::StatsAssembled.get(language),
            metrics.total_assembled,
            delta(deltas.assembled)
        ),
        format!(
            "{}: {}{}",
            Text::StatsInstalled.get(language),
            metrics.total_installed,
            delta(deltas.installed)
        ),
        format!(
            "{}: {}{}",
            Text::StatsPositions.get(language),
            metrics.positions,
            delta(deltas.positions as i64)
        ),
        format!("{}: {:.1}%", Text::StatsRate.get(language), metrics.completion),
    ]
    .join("\n")
}

fn shaded_periods_text(series: &[SeriesPoint], language: Language) -> String {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Text::NoData.get(language).to_owned();
    };
    let lines = SHADED_PERIODS
        .iter()
        .filter(|period| period.end >= first.date && period.start <= last.date)
        .map(|period| {
            format!(
                "{}: {} .. {}",
                period.name,
                format_date(period.start),
                format_date(period.end)
            )
        })
        .collect::<Vec<_>>();
    if lines.is_empty() {
        return Text::NoData.get(language).to_owned();
    }
    lines.join("\n")
}

fn details_text(lookup: &UmdLookup, language: Language) -> String {
    match lookup {
        UmdLookup::Nothing => Text::SelectUmd.get(language).to_owned(),
        UmdLookup::UnknownUmd => Text::UnknownUmd.get(language).to_owned(),
        UmdLookup::NoInstallation => Text::NoInstallationInfo.get(language).to_owned(),
        UmdLookup::Found(detail) => found_umd_text(detail, language),
    }
}

fn found_umd_text(detail: &UmdDetail, language: Language) -> String {
    let mut lines = vec![
        format!(
            "{} ({})",
            detail.position,
            format_date(detail.install_date)
        ),
        format!("{} m{}", Text::ModulePosition.get(language), detail.module),
        format!("{} {}", Text::ElectronicKit.get(language), detail.ekit),
        Text::ModuleDetails.get(language).to_owned(),
        format!(
            "  {}: {}",
            Text::RotationAngle.get(language),
            detail.rotation_angle
        ),
        format!(
            "  {}: {}",
            Text::RadialDistance.get(language),
            detail.radial_distance
        ),
        format!(
            "  {}: {}",
            Text::PositionAngle.get(language),
            detail.position_angle
        ),
        Text::OtherModules.get(language).to_owned(),
    ];
    lines.extend(
        detail
            .siblings
            .iter()
            .map(|(module, umd_id)| format!("  m{module}: {umd_id}")),
    );
    lines.push(Text::AssemblyIssues.get(language).to_owned());
    match &detail.issues {
        Issues::NoneReported => {
            lines.push(format!("  {}", Text::NoIssuesReported.get(language)));
        }
        Issues::Items(items) => lines.extend(items.iter().map(|item| format!("  - {item}"))),
    }
    lines.extend(
        detail
            .strips
            .iter()
            .filter(|strip| strip.flagged)
            .map(|strip| {
                format!(
                    "  #{}: FPGA {} / data {}",
                    strip.number, strip.fpga_channel, strip.data_channel
                )
            }),
    );
    lines.join("\n")
}

fn login_text(form: &LoginForm, language: Language) -> String {
    let marker = |field: LoginField| {
        if form.field == field {
            CURSOR_MARK
        } else {
            " "
        }
    };
    let mut lines = vec![
        format!(
            "{} {}: {}",
            marker(LoginField::User),
            Text::Username.get(language),
            form.user
        ),
        format!(
            "{} {}: {}",
            marker(LoginField::Password),
            Text::Password.get(language),
            "*".repeat(form.password.chars().count())
        ),
    ];
    if form.failed {
        lines.push(String::new());
        lines.push(Text::LoginFailed.get(language).to_owned());
    }
    lines.push(String::new());
    lines.push(Text::Support.get(language).to_owned());
    lines.join("\n")
}

fn map_text(language: Language, url: &str) -> String {
    format!("{}\n\n{url}", Text::MapHint.get(language))
}

fn status_text(state: &SessionState, view_data: &ViewData) -> String {
    if view_data.help_visible {
        return String::new();
    }
    let hints = if view_data.editing_search {
        "type to search | backspace | enter/esc done"
    } else {
        match view_data.focus {
            Focus::Filters => {
                "tab/b/f pages | j/k move | h/l change | enter results | / search | c clear | L lang | X logout | ? help | q quit"
            }
            Focus::Results => "j/k move | enter select | esc filters | p photos | g reload | ? help",
            Focus::Group => "j/k move | enter read report | esc results | p photos | ? help",
        }
    };
    let user = state.user.as_deref().unwrap_or("-");
    let head = format!("{user} | {}", state.language.code());
    match &state.status_line {
        Some(status) => format!("{head} | {status} | {hints}"),
        None => format!("{head} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | q quit | ? help\n\
pages: tab/shift+tab or f/b next/previous | L language | X logout | g reload data\n\
move: j/k or up/down | enter select | esc back\n\
filters: h/l or left/right change value or date by a day | pgup/pgdn date by 30 days\n\
filters: / search | c clear filters\n\
report: p fetch photos\n\
login: tab switch field | enter submit | esc quit"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        DashboardRuntime, Detail, FilterRow, Focus, InternalEvent, LoginField, Screen, ViewData,
        emit_status, filter_panel_text, filter_rows, handle_key_event, help_overlay_text,
        process_internal_events, refresh_screen, report_text, status_text,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::mpsc;
    use time::Date;
    use time::macros::date;
    use umdops_app::details::UmdLookup;
    use umdops_app::pages::{self, ACQUISITIONS_TABLE, FIELD_WORK_TABLE};
    use umdops_app::{
        Choice, Credentials, ImageFetchError, Language, PageId, PageStatus, PageView,
        SessionState, TabularSource, Text, TimeWindow,
    };
    use umdops_testkit::{
        ACQUISITIONS_WIDTH, FIELD_WORK_WIDTH, SheetFaker, Workbook, sparse_row,
    };

    const TODAY: Date = date!(2024 - 06 - 30);
    const PHOTO: &str = "https://drive.google.com/open?id=abc123";

    struct TestRuntime {
        source: Workbook,
        credentials: Credentials,
        fetched: Vec<String>,
        photo_result: Result<PathBuf, ImageFetchError>,
    }

    impl TestRuntime {
        fn with_workbook(source: Workbook) -> Self {
            Self {
                source,
                credentials: Credentials::default().with_password("ops", "secret"),
                fetched: Vec::new(),
                photo_result: Err(ImageFetchError::NotFound),
            }
        }
    }

    impl Default for TestRuntime {
        fn default() -> Self {
            Self::with_workbook(SheetFaker::new(7).workbook(TODAY))
        }
    }

    impl DashboardRuntime for TestRuntime {
        fn source(&mut self) -> &mut dyn TabularSource {
            &mut self.source
        }

        fn credentials(&self) -> &Credentials {
            &self.credentials
        }

        fn fetch_photo(&mut self, link: &str) -> Result<PathBuf, ImageFetchError> {
            self.fetched.push(link.to_owned());
            self.photo_result.clone()
        }

        fn map_url(&self) -> &str {
            "https://maps.example.com/umd"
        }

        fn today(&self) -> Date {
            TODAY
        }
    }

    fn view_data_for_test() -> ViewData {
        ViewData::new("https://maps.example.com/umd")
    }

    fn internal_tx() -> mpsc::Sender<InternalEvent> {
        let (tx, _rx) = mpsc::channel();
        tx
    }

    fn logged_in(runtime: &mut TestRuntime, page: PageId) -> (SessionState, ViewData) {
        let mut state = SessionState {
            logged_in: true,
            user: Some("ops".to_owned()),
            active_page: page,
            ..SessionState::default()
        };
        let mut view_data = view_data_for_test();
        refresh_screen(&mut state, runtime, &mut view_data, true).expect("page should load");
        (state, view_data)
    }

    fn press(
        state: &mut SessionState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        code: KeyCode,
    ) -> bool {
        handle_key_event(
            state,
            runtime,
            view_data,
            &internal_tx(),
            KeyEvent::new(code, KeyModifiers::NONE),
        )
    }

    fn type_text(
        state: &mut SessionState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        text: &str,
    ) {
        for ch in text.chars() {
            press(state, runtime, view_data, KeyCode::Char(ch));
        }
    }

    fn page_view(view_data: &ViewData) -> &PageView {
        match &view_data.screen {
            Screen::Page(view) => view,
            other => panic!("expected a filter page, got {other:?}"),
        }
    }

    fn single_field_work_row() -> Workbook {
        Workbook::default().with_sheet(
            FIELD_WORK_TABLE,
            vec![
                sparse_row(FIELD_WORK_WIDTH, &[(0, "Timestamp")]),
                sparse_row(
                    FIELD_WORK_WIDTH,
                    &[
                        (1, "Replaced the solar panel cable"),
                        (2, "Kathy (id=93)"),
                        (3, "Repair"),
                        (5, "Malargüe"),
                        (6, "05/03/2024"),
                        (54, PHOTO),
                    ],
                ),
            ],
        )
    }

    fn repeated_issue() -> Workbook {
        let issue = |date: &str, report: &str| {
            sparse_row(
                ACQUISITIONS_WIDTH,
                &[
                    (0, "Kathy"),
                    (2, "M-101"),
                    (3, date),
                    (6, "Noisy channels"),
                    (9, "Malargüe"),
                    (11, "Open"),
                    (12, report),
                ],
            )
        };
        Workbook::default().with_sheet(
            ACQUISITIONS_TABLE,
            vec![
                sparse_row(ACQUISITIONS_WIDTH, &[(0, "Position")]),
                issue("05/03/2024", "first report"),
                issue("06/03/2024", "second report"),
            ],
        )
    }

    #[test]
    fn login_requires_valid_credentials() {
        let mut state = SessionState::default();
        let mut runtime = TestRuntime::default();
        let mut view_data = view_data_for_test();

        type_text(&mut state, &mut runtime, &mut view_data, "ops");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        assert_eq!(view_data.login.field, LoginField::Password);
        type_text(&mut state, &mut runtime, &mut view_data, "wrong");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        assert!(!state.logged_in);
        assert!(view_data.login.failed);
        assert!(view_data.login.password.is_empty());

        type_text(&mut state, &mut runtime, &mut view_data, "secret");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        assert!(state.logged_in);
        assert_eq!(state.user.as_deref(), Some("ops"));
        assert_eq!(page_view(&view_data).page, PageId::FieldWork);
        assert_eq!(view_data.login.user, "");
    }

    #[test]
    fn escape_on_login_quits() {
        let mut state = SessionState::default();
        let mut runtime = TestRuntime::default();
        let mut view_data = view_data_for_test();
        assert!(press(&mut state, &mut runtime, &mut view_data, KeyCode::Esc));
    }

    #[test]
    fn protected_keys_are_ignored_before_login() {
        let mut state = SessionState::default();
        let mut runtime = TestRuntime::default();
        let mut view_data = view_data_for_test();
        assert!(!press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('q')));
        assert_eq!(state.active_page, PageId::FieldWork);
        assert_eq!(view_data.login.user, "q");
    }

    #[test]
    fn tab_key_cycles_pages_and_loads_each() {
        let mut runtime = TestRuntime::default();
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::FieldWork);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab);
        assert_eq!(state.active_page, PageId::Acquisitions);
        assert_eq!(page_view(&view_data).page, PageId::Acquisitions);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab);
        assert!(matches!(view_data.screen, Screen::Statistics(_)));

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab);
        assert!(matches!(view_data.screen, Screen::Details(_)));

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab);
        assert_eq!(state.active_page, PageId::Map);
        assert_eq!(view_data.screen, Screen::Map);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::BackTab);
        assert_eq!(state.active_page, PageId::UmdDetails);
    }

    #[test]
    fn stepping_the_position_slot_filters_results() {
        let mut runtime = TestRuntime::default();
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::FieldWork);
        let first = page_view(&view_data).slots[0].offered[0].clone();

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Right);
        assert_eq!(
            state.page(PageId::FieldWork).filters.choice("position"),
            &Choice::exact(first.clone())
        );
        let view = page_view(&view_data);
        assert!(!view.view.rows.is_empty());
        assert!(view.view.rows.iter().all(|row| row.cells[1] == first));

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Left);
        assert_eq!(
            state.page(PageId::FieldWork).filters.choice("position"),
            &Choice::Unselected
        );
    }

    #[test]
    fn date_rows_shift_the_range() {
        let mut runtime = TestRuntime::default();
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::FieldWork);
        let bounds = page_view(&view_data).bounds;
        let from_row = filter_rows(&view_data.screen)
            .iter()
            .position(|row| *row == FilterRow::From)
            .expect("from row");
        view_data.filter_cursor = from_row;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::PageDown);
        let range = page_view(&view_data).range;
        assert_eq!(range.start, bounds.start + time::Duration::days(30));
        assert_eq!(range.end, bounds.end);
        assert!(page_view(&view_data).view.rows.len() <= 24);
    }

    #[test]
    fn enter_selects_a_row_and_escape_clears_it() {
        let mut runtime = TestRuntime::with_workbook(single_field_work_row());
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::FieldWork);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        assert_eq!(view_data.focus, Focus::Results);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        assert_eq!(state.page(PageId::FieldWork).selection, Some(0));
        match &page_view(&view_data).detail {
            Detail::Report(report) => {
                assert_eq!(report.text, "Replaced the solar panel cable");
                assert_eq!(report.photo_links, vec![PHOTO.to_owned()]);
            }
            other => panic!("expected a report, got {other:?}"),
        }

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Esc);
        assert_eq!(state.page(PageId::FieldWork).selection, None);
        assert_eq!(view_data.focus, Focus::Filters);
        assert_eq!(page_view(&view_data).detail, Detail::Nothing);
    }

    #[test]
    fn failed_photo_fetch_degrades_to_link() {
        let mut runtime = TestRuntime::with_workbook(single_field_work_row());
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::FieldWork);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('p'));
        assert_eq!(runtime.fetched, vec![PHOTO.to_owned()]);
        assert!(view_data.photos.get(PHOTO).is_some_and(Result::is_err));
        assert_eq!(
            state.status_line.as_deref(),
            Some("Photos: 0 cached, 1 failed")
        );

        let text = report_text(
            &page_view(&view_data).detail,
            Language::En,
            true,
            &view_data.photos,
        );
        assert!(text.contains(Text::ImageLoadError.get(Language::En)));
        assert!(text.contains(PHOTO));
    }

    #[test]
    fn cached_photo_shows_its_path() {
        let mut runtime = TestRuntime::with_workbook(single_field_work_row());
        runtime.photo_result = Ok(PathBuf::from("/cache/abc123"));
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::FieldWork);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('p'));

        let text = report_text(
            &page_view(&view_data).detail,
            Language::En,
            true,
            &view_data.photos,
        );
        assert!(text.contains("/cache/abc123"));
    }

    #[test]
    fn repeated_issue_asks_which_report() {
        let mut runtime = TestRuntime::with_workbook(repeated_issue());
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::Acquisitions);
        assert_eq!(page_view(&view_data).status, PageStatus::Results(2));

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        assert_eq!(view_data.focus, Focus::Group);
        assert!(matches!(
            page_view(&view_data).detail,
            Detail::Choose { report: None, .. }
        ));

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Down);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        assert_eq!(state.page(PageId::Acquisitions).secondary, Some(1));
        match &page_view(&view_data).detail {
            Detail::Choose {
                report: Some(report),
                ..
            } => assert!(report.text.ends_with("report")),
            other => panic!("expected a chosen report, got {other:?}"),
        }

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Esc);
        assert_eq!(state.page(PageId::Acquisitions).secondary, None);
        assert_eq!(view_data.focus, Focus::Results);
    }

    #[test]
    fn search_reruns_on_every_keystroke() {
        let mut runtime = TestRuntime::default();
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::FieldWork);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('/'));
        assert!(view_data.editing_search);
        type_text(&mut state, &mut runtime, &mut view_data, "zzzz");
        assert_eq!(state.page(PageId::FieldWork).filters.query, "zzzz");
        let view = page_view(&view_data);
        assert_eq!(view.search_hits, Some(0));
        assert_eq!(view.status, PageStatus::EmptyResult);
        assert!(filter_panel_text(&state, &view_data).contains("No results found for 'zzzz'"));

        for _ in 0..4 {
            press(&mut state, &mut runtime, &mut view_data, KeyCode::Backspace);
        }
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        assert!(!view_data.editing_search);
        assert_eq!(page_view(&view_data).search_hits, None);
        assert_eq!(page_view(&view_data).status, PageStatus::Results(24));
    }

    #[test]
    fn clear_restores_initial_filters() {
        let mut runtime = TestRuntime::default();
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::FieldWork);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Right);
        assert!(!state.page(PageId::FieldWork).filters.is_unfiltered());

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('c'));
        let config = pages::field_work();
        let table = &view_data.tables[FIELD_WORK_TABLE];
        assert_eq!(
            state.page(PageId::FieldWork).filters,
            config.initial_filters(table, TODAY)
        );
    }

    #[test]
    fn language_toggle_translates_headers() {
        let mut runtime = TestRuntime::default();
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::FieldWork);
        assert_eq!(page_view(&view_data).view.headers[0], "Date");

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('L'));
        assert_eq!(state.language, Language::Es);
        assert_eq!(page_view(&view_data).view.headers[0], "Fecha");
    }

    #[test]
    fn missing_sheet_shows_unavailable() {
        let mut runtime = TestRuntime::with_workbook(Workbook::default());
        let mut state = SessionState {
            logged_in: true,
            ..SessionState::default()
        };
        let mut view_data = view_data_for_test();
        let error = refresh_screen(&mut state, &mut runtime, &mut view_data, true)
            .expect_err("no sheets");
        assert_eq!(error.table(), FIELD_WORK_TABLE);
        match &view_data.screen {
            Screen::Unavailable(reason) => assert!(reason.contains(FIELD_WORK_TABLE)),
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[test]
    fn statistics_window_steps_and_persists() {
        let mut runtime = TestRuntime::default();
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::Statistics);
        match &view_data.screen {
            Screen::Statistics(stats) => {
                assert_eq!(stats.window, TimeWindow::AllTime);
                assert_eq!(stats.metrics.deltas, None);
                assert!(!stats.series.is_empty());
            }
            other => panic!("expected statistics, got {other:?}"),
        }

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Right);
        assert_eq!(
            state.entries().get("statistics.window").map(String::as_str),
            Some("last_month")
        );
        match &view_data.screen {
            Screen::Statistics(stats) => {
                assert_eq!(stats.window, TimeWindow::LastMonth);
                assert!(stats.metrics.deltas.is_some());
            }
            other => panic!("expected statistics, got {other:?}"),
        }

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Left);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Left);
        let last = TimeWindow::options(TODAY)
            .last()
            .copied()
            .expect("options are never empty");
        assert!(matches!(&view_data.screen, Screen::Statistics(stats) if stats.window == last));
    }

    #[test]
    fn details_page_finds_the_chosen_umd() {
        let mut runtime = TestRuntime::default();
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::UmdDetails);
        assert!(matches!(
            &view_data.screen,
            Screen::Details(view) if view.lookup == UmdLookup::Nothing
        ));

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Right);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Down);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Right);
        let Screen::Details(view) = &view_data.screen else {
            panic!("expected details, got {:?}", view_data.screen);
        };
        let chosen = view.slots[1].choice.value().expect("umd chosen").to_owned();
        match &view.lookup {
            UmdLookup::Found(detail) => {
                assert_eq!(detail.umd_id, chosen);
                assert_eq!(detail.strips.len(), 64);
            }
            other => panic!("expected a found UMD, got {other:?}"),
        }
    }

    #[test]
    fn logout_returns_to_login_and_clears_pages() {
        let mut runtime = TestRuntime::default();
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::FieldWork);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Right);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('X'));
        assert!(!state.logged_in);
        assert!(state.pages.is_empty());
        assert!(view_data.tables.is_empty());
        assert_eq!(
            state.status_line.as_deref(),
            Some(Text::LoggedOut.get(Language::En))
        );
    }

    #[test]
    fn help_overlay_swallows_keys_until_closed() {
        let mut runtime = TestRuntime::default();
        let (mut state, mut view_data) = logged_in(&mut runtime, PageId::FieldWork);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('?'));
        assert!(view_data.help_visible);
        assert!(!press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('q')));
        assert!(status_text(&state, &view_data).is_empty());

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Esc);
        assert!(!view_data.help_visible);
        assert!(press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('q')));
        assert!(help_overlay_text().contains("p fetch photos"));
    }

    #[test]
    fn stale_status_clear_is_ignored() {
        let mut state = SessionState::default();
        let mut view_data = view_data_for_test();
        let (tx, rx) = mpsc::channel();

        emit_status(&mut state, &mut view_data, &tx, "first");
        emit_status(&mut state, &mut view_data, &tx, "second");
        tx.send(InternalEvent::ClearStatus { token: 1 })
            .expect("receiver alive");
        process_internal_events(&mut state, &view_data, &rx);
        assert_eq!(state.status_line.as_deref(), Some("second"));

        tx.send(InternalEvent::ClearStatus { token: 2 })
            .expect("receiver alive");
        process_internal_events(&mut state, &view_data, &rx);
        assert_eq!(state.status_line, None);
    }

    #[test]
    fn status_text_shows_user_language_and_message() {
        let mut state = SessionState {
            logged_in: true,
            user: Some("ops".to_owned()),
            status_line: Some("reloaded".to_owned()),
            ..SessionState::default()
        };
        let view_data = view_data_for_test();
        let status = status_text(&state, &view_data);
        assert!(status.starts_with("ops | en | reloaded | "));
        assert!(status.contains("/ search"));

        state.status_line = None;
        assert!(!status_text(&state, &view_data).contains("reloaded"));
    }

    #[test]
    fn report_text_covers_every_detail_state() {
        let photos = BTreeMap::new();
        assert_eq!(
            report_text(&Detail::Nothing, Language::En, true, &photos),
            Text::ClickReport.get(Language::En)
        );
        assert_eq!(
            report_text(&Detail::NotFound, Language::Es, false, &photos),
            Text::NoReportFound.get(Language::Es)
        );
    }
}
