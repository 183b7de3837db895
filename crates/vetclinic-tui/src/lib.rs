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
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::{Date, Month, OffsetDateTime, UtcOffset};
use tracing::{debug, warn};
use vetclinic_app::{
    AppCommand, AppState, ClientField, DirectoryError, DirectoryOutcome, DirectoryRequest,
    DisplayLocale, FieldKey, FieldSet, FieldSpec, HistoryField, KeyOutcome, LookupCascade,
    MessageTone, NO_HISTORIES, PetField, PetId, Prompt, Screen, ScreenKind, Screens,
    format_picker_date, parse_picker_date, render_timestamp,
};

const PET_COLUMNS: [&str; 7] = [
    "",
    "Nombre",
    "Especie",
    "Sexo",
    "Nacimiento",
    "Raza",
    "Collar",
];
const HISTORY_COLUMNS: [&str; 7] = [
    "Fecha",
    "Motivo",
    "Diagnóstico",
    "Procedimiento",
    "Tratamiento",
    "Observación",
    "Fórmula",
];

/// A directory request tagged with the screen that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    pub screen: ScreenKind,
    pub request: DirectoryRequest,
}

pub trait AppRuntime {
    fn execute_request(&mut self, request: &DirectoryRequest) -> DirectoryOutcome;

    /// Runs a request and reports its outcome through `tx`. The default runs
    /// inline; runtimes backed by the network hand it to a worker instead.
    fn spawn_request(&mut self, ticket: RequestTicket, tx: Sender<InternalEvent>) -> Result<()> {
        let outcome = self.execute_request(&ticket.request);
        tx.send(InternalEvent::Directory { ticket, outcome })
            .map_err(|_| anyhow::anyhow!("directory event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    Directory {
        ticket: RequestTicket,
        outcome: DirectoryOutcome,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellOptions {
    pub date_locale: DisplayLocale,
    /// Offset used to pick the calendar day of received timestamps.
    pub utc_offset: UtcOffset,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            date_locale: DisplayLocale::default(),
            utc_offset: UtcOffset::UTC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Lookup,
    Pets,
    Field(usize),
}

#[derive(Debug, Clone, PartialEq, Default)]
struct DatePickerUiState {
    visible: bool,
    screen: Option<ScreenKind>,
    field: usize,
    field_label: String,
    original: Option<Date>,
    selected: Option<Date>,
}

#[derive(Debug, Clone)]
struct ViewData {
    screens: Screens,
    focus: Focus,
    pet_cursor: usize,
    date_picker: DatePickerUiState,
    prompt: Option<String>,
    date_locale: DisplayLocale,
    utc_offset: UtcOffset,
    status_token: u64,
}

impl ViewData {
    fn new(screen: ScreenKind, options: ShellOptions) -> Self {
        Self {
            screens: Screens::default(),
            focus: first_focus(screen),
            pet_cursor: 0,
            date_picker: DatePickerUiState::default(),
            prompt: None,
            date_locale: options.date_locale,
            utc_offset: options.utc_offset,
            status_token: 0,
        }
    }
}

/// Field access by position, so key handling and rendering can treat the
/// three forms alike.
trait EditableForm {
    fn field_count(&self) -> usize;
    fn spec_at(&self, index: usize) -> Option<FieldSpec>;
    fn value_at(&self, index: usize) -> &str;
    fn push_key_at(&mut self, index: usize, ch: char) -> KeyOutcome;
    fn backspace_at(&mut self, index: usize);
    fn set_at(&mut self, index: usize, raw: &str);
}

impl<K: FieldKey> EditableForm for FieldSet<K> {
    fn field_count(&self) -> usize {
        K::ALL.len()
    }

    fn spec_at(&self, index: usize) -> Option<FieldSpec> {
        K::ALL.get(index).map(|key| key.spec())
    }

    fn value_at(&self, index: usize) -> &str {
        K::ALL
            .get(index)
            .map(|key| self.get(*key))
            .unwrap_or_default()
    }

    fn push_key_at(&mut self, index: usize, ch: char) -> KeyOutcome {
        match K::ALL.get(index) {
            Some(key) => self.push_key(*key, ch),
            None => KeyOutcome::Rejected,
        }
    }

    fn backspace_at(&mut self, index: usize) {
        if let Some(key) = K::ALL.get(index) {
            self.backspace(*key);
        }
    }

    fn set_at(&mut self, index: usize, raw: &str) {
        if let Some(key) = K::ALL.get(index) {
            self.set(*key, raw);
        }
    }
}

fn form_view(screens: &Screens, kind: ScreenKind) -> Option<&dyn EditableForm> {
    match kind {
        ScreenKind::CreateClient => Some(&screens.create_client.form),
        ScreenKind::CreatePet => Some(&screens.create_pet.form),
        ScreenKind::CreateHistory => Some(&screens.create_history.form),
        ScreenKind::QueryHistory => None,
    }
}

fn form_view_mut(screens: &mut Screens, kind: ScreenKind) -> Option<&mut dyn EditableForm> {
    match kind {
        ScreenKind::CreateClient => Some(&mut screens.create_client.form),
        ScreenKind::CreatePet => Some(&mut screens.create_pet.form),
        ScreenKind::CreateHistory => Some(&mut screens.create_history.form),
        ScreenKind::QueryHistory => None,
    }
}

fn focus_ring(kind: ScreenKind) -> Vec<Focus> {
    let fields = |count: usize| (0..count).map(Focus::Field);
    match kind {
        ScreenKind::CreateClient => fields(ClientField::ALL.len()).collect(),
        ScreenKind::CreatePet => [Focus::Lookup, Focus::Pets]
            .into_iter()
            .chain(fields(PetField::ALL.len()))
            .collect(),
        ScreenKind::CreateHistory => [Focus::Lookup, Focus::Pets]
            .into_iter()
            .chain(fields(HistoryField::ALL.len()))
            .collect(),
        ScreenKind::QueryHistory => vec![Focus::Lookup, Focus::Pets],
    }
}

fn first_focus(kind: ScreenKind) -> Focus {
    focus_ring(kind)
        .first()
        .copied()
        .unwrap_or(Focus::Lookup)
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: ShellOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(state.active_screen, options);
    let (internal_tx, internal_rx) = mpsc::channel();

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

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

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Directory { ticket, outcome } => {
                let follow_up = view_data
                    .screens
                    .get_mut(ticket.screen)
                    .complete(&ticket.request, outcome);
                clamp_pet_cursor(view_data, state.active_screen);
                dispatch_requests(runtime, view_data, tx, ticket.screen, follow_up);
            }
        }
    }
}

/// Queues requests on the runtime. A request that cannot be queued completes
/// right away as a transport failure so the screen never stays busy.
fn dispatch_requests<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    screen: ScreenKind,
    requests: Vec<DirectoryRequest>,
) {
    let mut pending: VecDeque<DirectoryRequest> = requests.into();
    while let Some(request) = pending.pop_front() {
        let ticket = RequestTicket { screen, request };
        if let Err(error) = runtime.spawn_request(ticket.clone(), tx.clone()) {
            warn!(request = ticket.request.label(), error = %format!("{error:#}"), "request not queued");
            let failure = Err(DirectoryError::Transport(format!("{error:#}")));
            pending.extend(
                view_data
                    .screens
                    .get_mut(screen)
                    .complete(&ticket.request, failure),
            );
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

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn show_prompt(view_data: &mut ViewData, prompt: Prompt) {
    debug!(prompt = prompt.text(), "blocking prompt");
    view_data.prompt = Some(prompt.text().to_owned());
}

fn is_plain(modifiers: KeyModifiers) -> bool {
    modifiers.is_empty() || modifiers == KeyModifiers::SHIFT
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.prompt.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            view_data.prompt = None;
        }
        return false;
    }

    if view_data.date_picker.visible {
        handle_date_picker_key(state, view_data, internal_tx, key);
        return false;
    }

    if state.menu_open() {
        handle_menu_key(state, view_data, key);
        return false;
    }

    let kind = state.active_screen;
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::F(2) => {
            state.dispatch(AppCommand::OpenMenu);
            return false;
        }
        KeyCode::Right if ctrl => {
            switch_screen(state, view_data, AppCommand::NextScreen);
            return false;
        }
        KeyCode::Left if ctrl => {
            switch_screen(state, view_data, AppCommand::PrevScreen);
            return false;
        }
        KeyCode::Char('s') if ctrl => {
            match view_data.screens.submit(kind) {
                Ok(requests) => dispatch_requests(runtime, view_data, internal_tx, kind, requests),
                Err(prompt) => show_prompt(view_data, prompt),
            }
            return false;
        }
        KeyCode::Char('p') if ctrl && kind == ScreenKind::CreateClient => {
            switch_screen(
                state,
                view_data,
                AppCommand::Navigate(ScreenKind::CreatePet),
            );
            return false;
        }
        KeyCode::Tab => {
            move_focus(view_data, kind, 1);
            return false;
        }
        KeyCode::BackTab => {
            move_focus(view_data, kind, -1);
            return false;
        }
        _ => {}
    }

    match view_data.focus {
        Focus::Lookup => handle_lookup_key(runtime, view_data, internal_tx, kind, key),
        Focus::Pets => handle_pet_table_key(state, runtime, view_data, internal_tx, key),
        Focus::Field(index) => handle_field_key(state, view_data, internal_tx, kind, index, key),
    }
    false
}

fn switch_screen(state: &mut AppState, view_data: &mut ViewData, command: AppCommand) {
    state.dispatch(command);
    view_data.focus = first_focus(state.active_screen);
    view_data.pet_cursor = 0;
}

fn handle_menu_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            state.dispatch(AppCommand::MenuUp);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.dispatch(AppCommand::MenuDown);
        }
        KeyCode::Enter => switch_screen(state, view_data, AppCommand::PickMenuEntry),
        KeyCode::Esc | KeyCode::F(2) => {
            state.dispatch(AppCommand::CloseMenu);
        }
        _ => {}
    }
}

fn move_focus(view_data: &mut ViewData, kind: ScreenKind, delta: isize) {
    let ring = focus_ring(kind);
    if ring.is_empty() {
        return;
    }
    let current = ring
        .iter()
        .position(|focus| *focus == view_data.focus)
        .unwrap_or(0) as isize;
    let next = (current + delta).rem_euclid(ring.len() as isize) as usize;
    view_data.focus = ring[next];
}

fn handle_lookup_key<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: ScreenKind,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Enter => match view_data.screens.lookup(kind) {
            Ok(requests) => dispatch_requests(runtime, view_data, internal_tx, kind, requests),
            Err(prompt) => show_prompt(view_data, prompt),
        },
        KeyCode::Backspace => {
            if let Some(cascade) = view_data.screens.cascade_mut(kind) {
                cascade.backspace_document();
            }
        }
        KeyCode::Char(ch) if is_plain(key.modifiers) => {
            if let Some(cascade) = view_data.screens.cascade_mut(kind) {
                let _ = cascade.push_document_key(ch);
            }
        }
        _ => {}
    }
}

fn handle_pet_table_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let kind = state.active_screen;
    let Some(cascade) = view_data.screens.cascade(kind) else {
        return;
    };
    let count = cascade.pets().len();
    let highlighted: Option<PetId> = cascade
        .pets()
        .get(view_data.pet_cursor)
        .map(|pet| pet.id.clone());

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            view_data.pet_cursor = view_data.pet_cursor.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if view_data.pet_cursor + 1 < count {
                view_data.pet_cursor += 1;
            }
        }
        KeyCode::Char(' ') => {
            if let Some(pet_id) = highlighted {
                let requests = view_data.screens.select_pet(kind, &pet_id);
                dispatch_requests(runtime, view_data, internal_tx, kind, requests);
            }
        }
        KeyCode::Char('x') if kind == ScreenKind::CreatePet => {
            if let Some(pet_id) = highlighted {
                let requests = view_data.screens.create_pet.delete(&pet_id);
                dispatch_requests(runtime, view_data, internal_tx, kind, requests);
            }
        }
        KeyCode::Char('n') if kind == ScreenKind::CreatePet => {
            if view_data.screens.create_pet.edit_target().is_some() {
                view_data.screens.create_pet.cancel_edit();
                emit_status(state, view_data, internal_tx, "edición cancelada");
            }
        }
        _ => {}
    }
}

fn clamp_pet_cursor(view_data: &mut ViewData, kind: ScreenKind) {
    let count = view_data
        .screens
        .cascade(kind)
        .map(|cascade| cascade.pets().len())
        .unwrap_or(0);
    view_data.pet_cursor = view_data.pet_cursor.min(count.saturating_sub(1));
}

fn handle_field_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: ScreenKind,
    index: usize,
    key: KeyEvent,
) {
    let Some(spec) = form_view(&view_data.screens, kind).and_then(|form| form.spec_at(index))
    else {
        return;
    };

    if spec.policy.is_date() {
        match key.code {
            KeyCode::Enter => open_date_picker(state, view_data, internal_tx, kind, index, spec),
            KeyCode::Backspace | KeyCode::Delete => {
                if let Some(form) = form_view_mut(&mut view_data.screens, kind) {
                    form.set_at(index, "");
                }
            }
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Enter => move_focus(view_data, kind, 1),
        KeyCode::Backspace => {
            if let Some(form) = form_view_mut(&mut view_data.screens, kind) {
                form.backspace_at(index);
            }
        }
        KeyCode::Char(ch) if is_plain(key.modifiers) => {
            if let Some(form) = form_view_mut(&mut view_data.screens, kind) {
                let _ = form.push_key_at(index, ch);
            }
        }
        _ => {}
    }
}

fn open_date_picker(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: ScreenKind,
    index: usize,
    spec: FieldSpec,
) {
    let original = form_view(&view_data.screens, kind)
        .and_then(|form| parse_picker_date(form.value_at(index)));
    let selected = original.unwrap_or_else(|| OffsetDateTime::now_utc().date());

    view_data.date_picker = DatePickerUiState {
        visible: true,
        screen: Some(kind),
        field: index,
        field_label: spec.label.to_owned(),
        original,
        selected: Some(selected),
    };
    emit_status(state, view_data, internal_tx, "calendario abierto");
}

fn handle_date_picker_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(current) = view_data.date_picker.selected else {
        view_data.date_picker = DatePickerUiState::default();
        return;
    };

    let next = match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            view_data.date_picker = DatePickerUiState::default();
            emit_status(state, view_data, internal_tx, "fecha sin cambios");
            return;
        }
        (KeyCode::Enter, _) => {
            let picker = std::mem::take(&mut view_data.date_picker);
            let picked = format_picker_date(current);
            if let Some(kind) = picker.screen
                && let Some(form) = form_view_mut(&mut view_data.screens, kind)
            {
                form.set_at(picker.field, &picked);
            }
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("{}: {picked}", picker.field_label),
            );
            return;
        }
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => shift_date_by_days(current, -1),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => shift_date_by_days(current, 1),
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => shift_date_by_days(current, 7),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => shift_date_by_days(current, -7),
        (KeyCode::Char('H'), _) => shift_date_by_months(current, -1),
        (KeyCode::Char('L'), _) => shift_date_by_months(current, 1),
        (KeyCode::Char('['), _) => shift_date_by_years(current, -1),
        (KeyCode::Char(']'), _) => shift_date_by_years(current, 1),
        _ => None,
    };

    if let Some(date) = next {
        view_data.date_picker.selected = Some(date);
    }
}

fn shift_date_by_days(date: Date, days: i64) -> Option<Date> {
    date.checked_add(time::Duration::days(days))
}

fn shift_date_by_years(date: Date, years: i32) -> Option<Date> {
    shift_date_by_months(date, years.saturating_mul(12))
}

fn shift_date_by_months(date: Date, months: i32) -> Option<Date> {
    let base_month = i32::from(date.month() as u8);
    let total_month = base_month - 1 + months;
    let year = date.year() + total_month.div_euclid(12);
    let month_number = (total_month.rem_euclid(12) + 1) as u8;
    let month = Month::try_from(month_number).ok()?;
    let max_day = last_day_of_month(year, month)?;
    Date::from_calendar_date(year, month, date.day().min(max_day)).ok()
}

fn last_day_of_month(year: i32, month: Month) -> Option<u8> {
    let (next_year, next_month) = if month == Month::December {
        (year + 1, Month::January)
    } else {
        (year, month.next())
    };

    let first_next_month = Date::from_calendar_date(next_year, next_month, 1).ok()?;
    let last = first_next_month - time::Duration::days(1);
    Some(last.day())
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = ScreenKind::ALL
        .iter()
        .position(|screen| *screen == state.active_screen)
        .unwrap_or(0);
    let tabs = Tabs::new(ScreenKind::ALL.iter().map(|screen| screen.label()))
        .block(Block::default().title("vetclinic").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    match state.active_screen {
        ScreenKind::CreateClient => render_client_body(frame, layout[1], view_data),
        kind => render_cascade_body(frame, layout[1], kind, view_data),
    }

    let message_tone = view_data
        .screens
        .get(state.active_screen)
        .message()
        .map(|message| message.tone);
    let status_color = match message_tone {
        Some(MessageTone::Error) => Color::Red,
        _ => Color::Yellow,
    };
    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(status_color))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if state.menu_open() {
        let area = centered_rect(40, 40, frame.area());
        frame.render_widget(Clear, area);
        let menu = Paragraph::new(render_menu_text(state)).block(
            Block::default()
                .title("Seleccionar Módulo")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(menu, area);
    }

    if view_data.date_picker.visible {
        let area = centered_rect(48, 30, frame.area());
        frame.render_widget(Clear, area);
        let picker = Paragraph::new(render_date_picker_overlay_text(&view_data.date_picker))
            .block(Block::default().title("calendario").borders(Borders::ALL));
        frame.render_widget(picker, area);
    }

    if let Some(prompt) = &view_data.prompt {
        let area = centered_rect(50, 25, frame.area());
        frame.render_widget(Clear, area);
        let notice = Paragraph::new(format!("{prompt}\n\n[enter] Aceptar")).block(
            Block::default()
                .title("Aviso")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Yellow)),
        );
        frame.render_widget(notice, area);
    }
}

fn render_client_body(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let screen = &view_data.screens.create_client;
    let mut text = render_form_text(
        &screen.form,
        focused_field(view_data),
        view_data.screens.get(ScreenKind::CreateClient).is_busy(),
    );
    if let Some(warning) = screen.phone_warning() {
        text.push_str(&format!("\n{warning}"));
    }
    text.push_str("\n[ctrl+p] Crear Mascota");
    let body = Paragraph::new(text).block(
        Block::default()
            .title(ScreenKind::CreateClient.label())
            .borders(Borders::ALL),
    );
    frame.render_widget(body, area);
}

fn render_cascade_body(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    kind: ScreenKind,
    view_data: &ViewData,
) {
    let Some(cascade) = view_data.screens.cascade(kind) else {
        return;
    };
    let busy = view_data.screens.get(kind).is_busy();

    let constraints: Vec<Constraint> = match kind {
        ScreenKind::CreatePet => vec![
            Constraint::Length(4),
            Constraint::Percentage(40),
            Constraint::Min(9),
        ],
        ScreenKind::CreateHistory => vec![
            Constraint::Length(4),
            Constraint::Percentage(25),
            Constraint::Length(9),
            Constraint::Min(4),
        ],
        _ => vec![
            Constraint::Length(4),
            Constraint::Percentage(35),
            Constraint::Min(4),
        ],
    };
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let lookup = Paragraph::new(render_lookup_text(
        cascade,
        view_data.focus == Focus::Lookup,
        busy,
    ))
    .block(Block::default().title(kind.label()).borders(Borders::ALL));
    frame.render_widget(lookup, sections[0]);

    let pets_title = if view_data.focus == Focus::Pets {
        match kind {
            ScreenKind::CreatePet => "Mascotas [space] editar [x] eliminar [n] nueva",
            _ => "Mascotas [space] seleccionar",
        }
    } else {
        "Mascotas"
    };
    let cursor = (view_data.focus == Focus::Pets).then_some(view_data.pet_cursor);
    render_rows_table(
        frame,
        sections[1],
        pets_title,
        &PET_COLUMNS,
        pet_table_rows(cascade),
        cursor,
    );

    match kind {
        ScreenKind::CreatePet => {
            let screen = &view_data.screens.create_pet;
            let title = if screen.edit_target().is_some() {
                "Editar Mascota"
            } else {
                "Nueva Mascota"
            };
            let form = Paragraph::new(render_form_text(
                &screen.form,
                focused_field(view_data),
                busy,
            ))
            .block(Block::default().title(title).borders(Borders::ALL));
            frame.render_widget(form, sections[2]);
        }
        ScreenKind::CreateHistory => {
            let form = Paragraph::new(render_form_text(
                &view_data.screens.create_history.form,
                focused_field(view_data),
                busy,
            ))
            .block(
                Block::default()
                    .title("Nueva Historia Clínica")
                    .borders(Borders::ALL),
            );
            frame.render_widget(form, sections[2]);
            render_histories(frame, sections[3], cascade, view_data);
        }
        _ => render_histories(frame, sections[2], cascade, view_data),
    }
}

fn render_histories(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    cascade: &LookupCascade,
    view_data: &ViewData,
) {
    if let Some(placeholder) = histories_placeholder(cascade) {
        let empty = Paragraph::new(placeholder).block(
            Block::default()
                .title("Historias Clínicas")
                .borders(Borders::ALL),
        );
        frame.render_widget(empty, area);
        return;
    }
    render_rows_table(
        frame,
        area,
        "Historias Clínicas",
        &HISTORY_COLUMNS,
        history_table_rows(cascade, view_data.date_locale, view_data.utc_offset),
        None,
    );
}

fn render_rows_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    columns: &[&str],
    rows: Vec<Vec<String>>,
    cursor: Option<usize>,
) {
    let widths = vec![Constraint::Min(6); columns.len().max(1)];
    let header = Row::new(columns.iter().map(|label| {
        Cell::from(label.to_string()).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = rows.into_iter().enumerate().map(|(index, cells)| {
        let style = if cursor == Some(index) {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Row::new(cells.into_iter().map(Cell::from)).style(style)
    });
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(title.to_owned()).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn focused_field(view_data: &ViewData) -> Option<usize> {
    match view_data.focus {
        Focus::Field(index) => Some(index),
        _ => None,
    }
}

fn render_lookup_text(cascade: &LookupCascade, focused: bool, busy: bool) -> String {
    let marker = if focused { ">" } else { " " };
    let action = if busy { "Buscando..." } else { "[enter] Buscar" };
    let heading = cascade.client_heading().unwrap_or_default();
    format!(
        "{marker} Cédula del cliente: {}  {action}\n  {heading}",
        cascade.document_number()
    )
}

fn render_form_text(form: &dyn EditableForm, focused: Option<usize>, busy: bool) -> String {
    let mut lines = Vec::with_capacity(form.field_count() + 1);
    for index in 0..form.field_count() {
        let Some(spec) = form.spec_at(index) else {
            continue;
        };
        let marker = if focused == Some(index) { ">" } else { " " };
        let required = if spec.required { "*" } else { " " };
        let mut line = format!("{marker}{required}{}: {}", spec.label, form.value_at(index));
        if spec.policy.is_date() && focused == Some(index) {
            line.push_str("  [enter] calendario");
        }
        lines.push(line);
    }
    lines.push(if busy {
        "Guardando...".to_owned()
    } else {
        "[ctrl+s] Guardar".to_owned()
    });
    lines.join("\n")
}

fn pet_table_rows(cascade: &LookupCascade) -> Vec<Vec<String>> {
    cascade
        .pets()
        .iter()
        .map(|pet| {
            let radio = if cascade.is_selected(&pet.id) {
                "(x)"
            } else {
                "( )"
            };
            vec![
                radio.to_owned(),
                pet.nombre.clone(),
                pet.especie.clone(),
                pet.sexo.clone(),
                pet.fecha_nacimiento.clone(),
                pet.raza.clone(),
                pet.codigo_collar.clone(),
            ]
        })
        .collect()
}

fn history_table_rows(
    cascade: &LookupCascade,
    locale: DisplayLocale,
    offset: UtcOffset,
) -> Vec<Vec<String>> {
    cascade
        .histories()
        .iter()
        .map(|history| {
            vec![
                render_timestamp(&history.created_at, locale, offset),
                history.motivo_consulta.clone(),
                history.diagnostico.clone(),
                history.procedimiento.clone(),
                history.tratamiento.clone(),
                history.observacion.clone(),
                history.formula.clone(),
            ]
        })
        .collect()
}

fn histories_placeholder(cascade: &LookupCascade) -> Option<&'static str> {
    if cascade.selected_pet_id().is_none() {
        return Some("Seleccione una mascota para ver sus historias clínicas.");
    }
    if cascade.histories_loaded() && cascade.histories().is_empty() {
        return Some(NO_HISTORIES);
    }
    None
}

fn render_menu_text(state: &AppState) -> String {
    let mut lines: Vec<String> = ScreenKind::ALL
        .iter()
        .enumerate()
        .map(|(index, screen)| {
            let marker = if index == state.menu_cursor { ">" } else { " " };
            format!("{marker} {}", screen.label())
        })
        .collect();
    lines.push(String::new());
    lines.push("j/k mover | enter abrir | esc cerrar".to_owned());
    lines.join("\n")
}

fn render_date_picker_overlay_text(date_picker: &DatePickerUiState) -> String {
    let selected = date_picker
        .selected
        .map(format_picker_date)
        .unwrap_or_else(|| "-".to_owned());
    let original = date_picker
        .original
        .map(format_picker_date)
        .unwrap_or_else(|| "(vacío)".to_owned());

    [
        format!("campo: {}", date_picker.field_label),
        format!("actual: {original}"),
        format!("elegida: {selected}"),
        String::new(),
        "h/l día | j/k semana | H/L mes | [/] año".to_owned(),
        "enter elegir | esc cancelar".to_owned(),
    ]
    .join("\n")
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if state.menu_open() || view_data.date_picker.visible || view_data.prompt.is_some() {
        return String::new();
    }

    let mut parts: Vec<String> = Vec::new();
    if let Some(status) = &state.status_line {
        parts.push(status.clone());
    }
    if let Some(message) = view_data.screens.get(state.active_screen).message() {
        parts.push(message.text.clone());
    }
    parts.push("tab foco | F2 módulos | ctrl+←/→ pantalla | ctrl+s guardar | ctrl+q salir".to_owned());
    parts.join(" | ")
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
        AppRuntime, Focus, ShellOptions, ViewData, handle_key_event, histories_placeholder,
        history_table_rows, pet_table_rows, render_date_picker_overlay_text, render_form_text,
        render_lookup_text, render_menu_text, shift_date_by_months, shift_date_by_years,
        status_text,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::sync::mpsc;
    use time::{Date, Month, UtcOffset};
    use vetclinic_app::{
        AppState, ClientField, ClientId, DirectoryOutcome, DirectoryRequest, DisplayLocale,
        NO_HISTORIES, PetField, PetId, ScreenKind, execute,
    };
    use vetclinic_testkit::{ClinicFaker, MemoryDirectory, fixture_datetime};

    const DOCUMENT: &str = "123456789";

    #[derive(Debug, Default)]
    struct TestRuntime {
        directory: MemoryDirectory,
    }

    impl TestRuntime {
        /// One client with two pets; the first pet has one consultation.
        fn seeded() -> (Self, ClientId, Vec<PetId>) {
            let mut faker = ClinicFaker::new(11);
            let mut directory = MemoryDirectory::new();
            let mut client = faker.client();
            client.number_document = DOCUMENT.to_owned();
            client.first_name = "ANA".to_owned();
            client.second_name = String::new();
            client.first_last_name = "PEREZ".to_owned();
            client.second_last_name = String::new();
            let client_id = directory.insert_client(client).id;
            let first = directory.insert_pet(faker.pet(client_id.clone())).id;
            let second = directory.insert_pet(faker.pet(client_id.clone())).id;
            directory.insert_history(faker.history(first.clone()), fixture_datetime());
            (Self { directory }, client_id, vec![first, second])
        }
    }

    impl AppRuntime for TestRuntime {
        fn execute_request(&mut self, request: &DirectoryRequest) -> DirectoryOutcome {
            execute(&mut self.directory, request)
        }
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: mpsc::Sender<super::InternalEvent>,
        rx: mpsc::Receiver<super::InternalEvent>,
    }

    impl Harness {
        fn new(screen: ScreenKind, runtime: TestRuntime) -> Self {
            let (tx, rx) = mpsc::channel();
            Self {
                state: AppState::starting_at(screen),
                runtime,
                view_data: ViewData::new(screen, ShellOptions::default()),
                tx,
                rx,
            }
        }

        fn press(&mut self, key: KeyEvent) -> bool {
            let quit = handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                key,
            );
            super::process_internal_events(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                &self.rx,
            );
            quit
        }

        fn run_key_script(&mut self, keys: &[KeyEvent]) {
            for key in keys {
                let _ = self.press(*key);
            }
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                let _ = self.press(plain(KeyCode::Char(ch)));
            }
        }
    }

    fn plain(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn lookup_client(harness: &mut Harness) {
        harness.type_text(DOCUMENT);
        let _ = harness.press(plain(KeyCode::Enter));
    }

    #[test]
    fn ctrl_q_quits() {
        let mut harness = Harness::new(ScreenKind::CreateClient, TestRuntime::default());
        assert!(harness.press(ctrl('q')));
    }

    #[test]
    fn ctrl_arrows_cycle_screens() {
        let mut harness = Harness::new(ScreenKind::CreateClient, TestRuntime::default());
        let _ = harness.press(KeyEvent::new(KeyCode::Right, KeyModifiers::CONTROL));
        assert_eq!(harness.state.active_screen, ScreenKind::CreatePet);
        assert_eq!(harness.view_data.focus, Focus::Lookup);

        let _ = harness.press(KeyEvent::new(KeyCode::Left, KeyModifiers::CONTROL));
        let _ = harness.press(KeyEvent::new(KeyCode::Left, KeyModifiers::CONTROL));
        assert_eq!(harness.state.active_screen, ScreenKind::QueryHistory);
    }

    #[test]
    fn module_menu_picks_a_screen() {
        let mut harness = Harness::new(ScreenKind::CreateClient, TestRuntime::default());
        harness.run_key_script(&[
            plain(KeyCode::F(2)),
            plain(KeyCode::Char('j')),
            plain(KeyCode::Char('j')),
        ]);
        assert!(harness.state.menu_open());
        assert!(render_menu_text(&harness.state).contains("> Crear Historia Clínica"));
        assert!(status_text(&harness.state, &harness.view_data).is_empty());

        let _ = harness.press(plain(KeyCode::Enter));
        assert!(!harness.state.menu_open());
        assert_eq!(harness.state.active_screen, ScreenKind::CreateHistory);
    }

    #[test]
    fn ctrl_p_jumps_from_client_to_pet_screen() {
        let mut harness = Harness::new(ScreenKind::CreateClient, TestRuntime::default());
        let _ = harness.press(ctrl('p'));
        assert_eq!(harness.state.active_screen, ScreenKind::CreatePet);
    }

    #[test]
    fn empty_lookup_shows_blocking_prompt() {
        let mut harness = Harness::new(ScreenKind::QueryHistory, TestRuntime::default());
        let _ = harness.press(plain(KeyCode::Enter));
        assert_eq!(
            harness.view_data.prompt.as_deref(),
            Some("Por favor, ingrese la cédula del cliente.")
        );
        assert!(harness.runtime.directory.calls().is_empty());

        let _ = harness.press(plain(KeyCode::Char('1')));
        assert!(harness.view_data.prompt.is_some());
        let _ = harness.press(plain(KeyCode::Esc));
        assert!(harness.view_data.prompt.is_none());
    }

    #[test]
    fn lookup_field_rejects_letters() {
        let mut harness = Harness::new(ScreenKind::QueryHistory, TestRuntime::default());
        harness.type_text("12ab3");
        let cascade = harness
            .view_data
            .screens
            .cascade(ScreenKind::QueryHistory)
            .expect("query screen has a cascade");
        assert_eq!(cascade.document_number(), "123");
    }

    #[test]
    fn lookup_loads_client_and_pets() {
        let (runtime, client_id, pets) = TestRuntime::seeded();
        let mut harness = Harness::new(ScreenKind::QueryHistory, runtime);
        lookup_client(&mut harness);

        let cascade = harness
            .view_data
            .screens
            .cascade(ScreenKind::QueryHistory)
            .expect("query screen has a cascade");
        assert_eq!(cascade.client_heading().as_deref(), Some("Cliente: ANA PEREZ"));
        assert_eq!(cascade.pets().len(), pets.len());
        assert_eq!(
            harness.runtime.directory.calls(),
            &[
                DirectoryRequest::FindClient {
                    document_number: DOCUMENT.to_owned()
                },
                DirectoryRequest::ListPets { client_id },
            ]
        );
        assert!(
            render_lookup_text(cascade, true, false).contains("Cliente: ANA PEREZ"),
            "lookup text should carry the heading"
        );
    }

    #[test]
    fn unknown_document_reports_not_found() {
        let (runtime, _, _) = TestRuntime::seeded();
        let mut harness = Harness::new(ScreenKind::QueryHistory, runtime);
        harness.type_text("000");
        let _ = harness.press(plain(KeyCode::Enter));

        assert_eq!(harness.runtime.directory.calls().len(), 1);
        assert!(status_text(&harness.state, &harness.view_data).contains("Cliente no encontrado."));
    }

    #[test]
    fn space_selects_pet_and_loads_histories() {
        let (runtime, _, pets) = TestRuntime::seeded();
        let mut harness = Harness::new(ScreenKind::QueryHistory, runtime);
        lookup_client(&mut harness);
        harness.run_key_script(&[plain(KeyCode::Tab), plain(KeyCode::Char(' '))]);

        let cascade = harness
            .view_data
            .screens
            .cascade(ScreenKind::QueryHistory)
            .expect("query screen has a cascade");
        assert!(cascade.is_selected(&pets[0]));
        let rows = history_table_rows(cascade, DisplayLocale::Es, UtcOffset::UTC);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "19/2/2026");
        assert!(histories_placeholder(cascade).is_none());

        harness.run_key_script(&[plain(KeyCode::Down), plain(KeyCode::Char(' '))]);
        let cascade = harness
            .view_data
            .screens
            .cascade(ScreenKind::QueryHistory)
            .expect("query screen has a cascade");
        assert!(cascade.is_selected(&pets[1]));
        assert!(!cascade.is_selected(&pets[0]));
        assert_eq!(histories_placeholder(cascade), Some(NO_HISTORIES));
        let radios: Vec<String> = pet_table_rows(cascade)
            .into_iter()
            .map(|row| row[0].clone())
            .collect();
        assert_eq!(radios, vec!["( )".to_owned(), "(x)".to_owned()]);
    }

    #[test]
    fn pet_screen_edits_and_deletes_from_table() {
        let (runtime, _, pets) = TestRuntime::seeded();
        let mut harness = Harness::new(ScreenKind::CreatePet, runtime);
        lookup_client(&mut harness);
        harness.run_key_script(&[plain(KeyCode::Tab), plain(KeyCode::Char(' '))]);

        let screen = &harness.view_data.screens.create_pet;
        assert_eq!(screen.edit_target(), Some(&pets[0]));
        assert!(!screen.form.get(PetField::Name).is_empty());

        let _ = harness.press(plain(KeyCode::Char('n')));
        assert!(harness.view_data.screens.create_pet.edit_target().is_none());

        let _ = harness.press(plain(KeyCode::Char('x')));
        let cascade = &harness.view_data.screens.create_pet.cascade;
        assert_eq!(cascade.pets().len(), 1);
        assert_eq!(cascade.pets()[0].id, pets[1]);
        assert_eq!(harness.runtime.directory.calls_labeled("list pets"), 1);
    }

    #[test]
    fn client_form_typing_follows_field_policies() {
        let mut harness = Harness::new(ScreenKind::CreateClient, TestRuntime::default());
        harness.type_text("cc1");
        let _ = harness.press(plain(KeyCode::Tab));
        harness.type_text("98x7");
        for _ in 0..8 {
            let _ = harness.press(plain(KeyCode::Tab));
        }
        harness.type_text("abc12345678901");

        let form = &harness.view_data.screens.create_client.form;
        assert_eq!(form.get(ClientField::DocumentType), "CC");
        assert_eq!(form.get(ClientField::DocumentNumber), "987");
        assert_eq!(form.get(ClientField::Phone), "1234567890");
    }

    #[test]
    fn date_picker_sets_birth_date() {
        let mut harness = Harness::new(ScreenKind::CreateClient, TestRuntime::default());
        harness.run_key_script(&[plain(KeyCode::Tab), plain(KeyCode::Tab)]);
        assert_eq!(harness.view_data.focus, Focus::Field(2));

        let _ = harness.press(plain(KeyCode::Char('7')));
        assert_eq!(
            harness
                .view_data
                .screens
                .create_client
                .form
                .get(ClientField::BirthDate),
            ""
        );

        let _ = harness.press(plain(KeyCode::Enter));
        assert!(harness.view_data.date_picker.visible);
        let opened = harness
            .view_data
            .date_picker
            .selected
            .expect("picker starts on a date");
        assert!(render_date_picker_overlay_text(&harness.view_data.date_picker).contains("Fecha Nacimiento"));

        harness.run_key_script(&[plain(KeyCode::Char('l')), plain(KeyCode::Enter)]);
        assert!(!harness.view_data.date_picker.visible);
        let expected = vetclinic_app::format_picker_date(
            opened.next_day().expect("tomorrow exists"),
        );
        assert_eq!(
            harness
                .view_data
                .screens
                .create_client
                .form
                .get(ClientField::BirthDate),
            expected
        );
    }

    #[test]
    fn incomplete_client_submit_prompts_without_request() {
        let mut harness = Harness::new(ScreenKind::CreateClient, TestRuntime::default());
        let _ = harness.press(ctrl('s'));
        let prompt = harness
            .view_data
            .prompt
            .clone()
            .expect("missing fields prompt");
        assert!(prompt.contains("Tipo Documento"));
        assert!(harness.runtime.directory.calls().is_empty());
    }

    #[test]
    fn history_submit_without_pet_sets_inline_message() {
        let (runtime, _, _) = TestRuntime::seeded();
        let mut harness = Harness::new(ScreenKind::CreateHistory, runtime);
        lookup_client(&mut harness);
        let _ = harness.press(ctrl('s'));

        assert!(harness.view_data.prompt.is_none());
        assert!(status_text(&harness.state, &harness.view_data).contains("Debe seleccionar una mascota."));
        assert_eq!(harness.runtime.directory.calls_labeled("create history"), 0);
    }

    #[test]
    fn form_text_marks_focus_and_busy_state() {
        let form = vetclinic_app::PetForm::default();
        let idle = render_form_text(&form, Some(0), false);
        assert!(idle.starts_with(">*Nombre Mascota: "));
        assert!(idle.ends_with("[ctrl+s] Guardar"));
        assert!(render_form_text(&form, None, true).ends_with("Guardando..."));
    }

    #[test]
    fn shift_date_by_months_clamps_day() {
        let date = Date::from_calendar_date(2024, Month::January, 31).expect("valid date");
        assert_eq!(
            shift_date_by_months(date, 1),
            Some(Date::from_calendar_date(2024, Month::February, 29).expect("valid date"))
        );
        assert_eq!(
            shift_date_by_years(date, -1),
            Some(Date::from_calendar_date(2023, Month::January, 31).expect("valid date"))
        );
    }
}
