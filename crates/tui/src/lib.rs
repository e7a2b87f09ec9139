use std::io::{self, Stdout};
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chill_adapters::http::{HttpTransport, HttpTransportError};
use chill_core::actions::{ActionId, ActionRegistry};
use chill_core::classifier::Classifier;
use chill_core::config::ClientConfig;
use chill_core::navigation::{
    Applied, Completion, NavigationError, Navigator, RequestTicket, ViewContent,
};
use chill_core::resource::{Location, ResourceName};
use chill_core::session::Session;
use chill_core::view::{self, Body, Screen};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::{Frame, Terminal};
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(120);

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Transport(#[from] HttpTransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectionKey {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    ToggleHelp,
    Open,
    Navigate(DirectionKey),
    Invoke(ActionId),
    Input(char),
    Backspace,
    Confirm,
    Cancel,
}

#[derive(Debug)]
struct TuiApp {
    navigator: Navigator,
    registry: ActionRegistry,
    selected: usize,
    input: String,
    show_help: bool,
    should_quit: bool,
    status_line: Option<String>,
    outbox: Vec<RequestTicket>,
}

impl TuiApp {
    fn new() -> Self {
        let mut navigator = Navigator::new();
        let first = navigator.start();
        Self {
            navigator,
            registry: ActionRegistry,
            selected: 0,
            input: String::new(),
            show_help: false,
            should_quit: false,
            status_line: None,
            outbox: vec![first],
        }
    }

    fn prompt_open(&self) -> bool {
        self.navigator.prompt().is_some()
    }

    fn handle(&mut self, msg: Msg) {
        self.status_line = None;
        match msg {
            Msg::Quit => self.should_quit = true,
            Msg::ToggleHelp => self.show_help = !self.show_help,
            Msg::Open => {
                let result = self.open_selected();
                self.record(result);
            }
            Msg::Navigate(direction) => self.navigate(direction),
            Msg::Invoke(action) => {
                let result = self.invoke(action);
                self.record(result);
            }
            Msg::Input(ch) => self.input.push(ch),
            Msg::Backspace => {
                self.input.pop();
            }
            Msg::Confirm => {
                let before = self.navigator.prompt().cloned();
                if let Some(ticket) = self.navigator.confirm_prompt(&self.input) {
                    self.outbox.push(ticket);
                }
                // Blank required input leaves the same prompt open; keep what was typed.
                if self.navigator.prompt() != before.as_ref() {
                    self.input.clear();
                }
            }
            Msg::Cancel => {
                self.navigator.cancel_prompt();
                self.input.clear();
            }
        }
    }

    fn apply_completion(&mut self, completion: Completion) {
        let before = self.navigator.location().clone();
        match self.navigator.apply(completion) {
            Applied::Discarded => {}
            Applied::Applied { follow_up } => self.outbox.extend(follow_up),
        }
        if self.navigator.location() != &before {
            self.selected = 0;
        }
        self.selected = self.selected.min(self.item_count().saturating_sub(1));
    }

    fn take_outbox(&mut self) -> Vec<RequestTicket> {
        mem::take(&mut self.outbox)
    }

    fn record(&mut self, result: Result<Option<RequestTicket>, NavigationError>) {
        match result {
            Ok(Some(ticket)) => self.outbox.push(ticket),
            Ok(None) => {}
            Err(error) => self.status_line = Some(error.to_string()),
        }
    }

    fn invoke(&mut self, action: ActionId) -> Result<Option<RequestTicket>, NavigationError> {
        match action {
            ActionId::Refresh => self.navigator.refresh().map(Some),
            ActionId::OpenDatabase | ActionId::OpenTable => self.open_selected(),
            ActionId::Back => {
                self.selected = 0;
                self.navigator.back().map(Some)
            }
            ActionId::CreateDatabase => self.navigator.prompt_create_database().map(|()| None),
            ActionId::DropDatabase => {
                let target = self.selected_database();
                self.navigator.prompt_drop_database(target).map(|()| None)
            }
            ActionId::CreateTable => self.navigator.prompt_create_table().map(|()| None),
            ActionId::DropTable => {
                let target = self.selected_table();
                self.navigator.prompt_drop_table(target).map(|()| None)
            }
            ActionId::InsertRow => self.navigator.prompt_insert_row().map(|()| None),
            ActionId::EditRow => {
                let pk_value = self.selected_pk()?;
                self.navigator.prompt_edit_row(pk_value).map(|()| None)
            }
            ActionId::DeleteRow => {
                let pk_value = self.selected_pk()?;
                self.navigator.prompt_delete_row(pk_value).map(|()| None)
            }
            ActionId::FilterRows => self.navigator.prompt_filter().map(|()| None),
            ActionId::ClearFilter => self.navigator.clear_filter().map(Some),
            ActionId::RunQuery => self.navigator.prompt_query().map(|()| None),
        }
    }

    fn open_selected(&mut self) -> Result<Option<RequestTicket>, NavigationError> {
        match self.navigator.location() {
            Location::Root => {
                let database = self
                    .selected_database()
                    .ok_or(NavigationError::NothingSelected("database"))?;
                self.navigator.select_database(database).map(Some)
            }
            Location::DatabaseView(_) | Location::TableListView(_) => {
                let table = self
                    .selected_table()
                    .ok_or(NavigationError::NothingSelected("table"))?;
                self.navigator.select_table(table).map(Some)
            }
            Location::TableDataView { .. } | Location::AdHocResultView { .. } => Ok(None),
        }
    }

    fn selected_database(&self) -> Option<ResourceName> {
        matches!(self.navigator.location(), Location::Root)
            .then(|| self.navigator.listing().get(self.selected).cloned())
            .flatten()
    }

    fn selected_table(&self) -> Option<ResourceName> {
        matches!(
            self.navigator.location(),
            Location::DatabaseView(_) | Location::TableListView(_)
        )
        .then(|| self.navigator.listing().get(self.selected).cloned())
        .flatten()
    }

    /// The primary key is taken from the first cell of the highlighted row.
    fn selected_pk(&self) -> Result<String, NavigationError> {
        self.navigator
            .rows()
            .and_then(|rows| rows.rows.get(self.selected))
            .and_then(|row| row.first())
            .cloned()
            .ok_or(NavigationError::NothingSelected("row"))
    }

    fn item_count(&self) -> usize {
        match self.navigator.location() {
            Location::Root | Location::DatabaseView(_) | Location::TableListView(_) => {
                self.navigator.listing().len()
            }
            Location::TableDataView { .. } | Location::AdHocResultView { .. } => {
                self.navigator.rows().map_or(0, |rows| rows.rows.len())
            }
        }
    }

    fn navigate(&mut self, direction: DirectionKey) {
        let count = self.item_count();
        if count == 0 {
            self.selected = 0;
            return;
        }
        self.selected = match direction {
            DirectionKey::Up => self.selected.saturating_sub(1),
            DirectionKey::Down => (self.selected + 1).min(count - 1),
        };
    }

    fn footer_actions(&self) -> String {
        let enabled = self
            .registry
            .enabled_actions(&self.navigator.action_context());
        if enabled.is_empty() {
            return "No available actions in this view".to_string();
        }
        enabled
            .iter()
            .map(|action| format!("{}:{}", action_key(action.id), action.title))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn is_loading(&self) -> bool {
        self.navigator.view().content == ViewContent::Loading
            || self.navigator.view().pending.is_some()
    }
}

pub fn run(config: &ClientConfig) -> Result<(), TuiError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    let transport = HttpTransport::from_config(config)?;
    info!(base_url = transport.base_url(), "browsing store");
    let session = Arc::new(Session::new(
        transport,
        Classifier::new(config.markers.clone()),
    ));

    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, &runtime, &session);
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    runtime: &Runtime,
    session: &Arc<Session<HttpTransport>>,
) -> Result<(), TuiError> {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let mut app = TuiApp::new();
    let mut last_tick = Instant::now();

    loop {
        for ticket in app.take_outbox() {
            dispatch(runtime, session, &sender, ticket);
        }

        terminal.draw(|frame| render(frame, &app))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(message) = map_key_event(key, app.prompt_open()) {
                        app.handle(message);
                    }
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            drain_completions(&mut app, &mut receiver);
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn dispatch(
    runtime: &Runtime,
    session: &Arc<Session<HttpTransport>>,
    sender: &UnboundedSender<Completion>,
    ticket: RequestTicket,
) {
    let session = Arc::clone(session);
    let sender = sender.clone();
    runtime.spawn(async move {
        let completion = session.execute(ticket).await;
        if sender.send(completion).is_err() {
            debug!("ui closed before the response arrived");
        }
    });
}

fn drain_completions(app: &mut TuiApp, receiver: &mut UnboundedReceiver<Completion>) {
    while let Ok(completion) = receiver.try_recv() {
        app.apply_completion(completion);
    }
}

fn render(frame: &mut Frame<'_>, app: &TuiApp) {
    let screen = view::render(app.navigator.location(), app.navigator.view());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(frame.area());

    frame.render_widget(header(&screen, app.is_loading()), chunks[0]);
    render_workspace(frame, chunks[1], &screen, app.selected);

    let status = app
        .status_line
        .as_deref()
        .or(screen.status.as_deref())
        .unwrap_or("-");
    let footer = Paragraph::new(vec![
        Line::from(app.footer_actions()),
        Line::from(format!("Status: {status}")),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title("Actions"));
    frame.render_widget(footer, chunks[2]);

    if app.show_help {
        render_help_popup(frame);
    }
    if let Some(prompt) = app.navigator.prompt() {
        render_prompt_popup(
            frame,
            &prompt.title,
            &prompt.message,
            prompt.requires_input.then_some(app.input.as_str()),
        );
    }
}

fn header(screen: &Screen, loading: bool) -> Paragraph<'static> {
    let mut spans = vec![Span::styled(
        format!(" {} ", screen.breadcrumb),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(filter) = &screen.filter {
        spans.push(Span::raw(" | "));
        spans.push(Span::raw(format!("filter: {filter}")));
    }
    if let Some(pending) = &screen.pending {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("{pending}..."),
            Style::default().fg(Color::Cyan),
        ));
    } else if loading {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled("loading...", Style::default().fg(Color::Cyan)));
    }

    Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("chill"))
}

fn render_workspace(frame: &mut Frame<'_>, area: Rect, screen: &Screen, selected: usize) {
    let block = Block::default().borders(Borders::ALL).title("Workspace");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (banner_area, body_area) = if screen.banner.is_some() {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(inner);
        (Some(split[0]), split[1])
    } else {
        (None, inner)
    };

    if let (Some(banner), Some(banner_area)) = (&screen.banner, banner_area) {
        let banner = Paragraph::new(Line::from(Span::styled(
            format!("! {banner}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        frame.render_widget(banner, banner_area);
    }

    match &screen.body {
        Body::Loading => frame.render_widget(Paragraph::new("Loading..."), body_area),
        Body::Empty { message } => frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::DarkGray),
            ))),
            body_area,
        ),
        Body::Error(message) => frame.render_widget(
            Paragraph::new(message.clone())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: false }),
            body_area,
        ),
        Body::Notice(message) => frame.render_widget(
            Paragraph::new(message.clone()).wrap(Wrap { trim: false }),
            body_area,
        ),
        Body::Listing { heading, items } => {
            let mut lines = vec![
                Line::from(Span::styled(
                    heading.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
            ];
            for (index, item) in items.iter().enumerate() {
                let marker = if index == selected { ">" } else { " " };
                lines.push(Line::from(format!("{marker} {item}")));
            }
            frame.render_widget(
                Paragraph::new(lines).alignment(Alignment::Left),
                body_area,
            );
        }
        Body::Table(result) => {
            let header = Row::new(result.columns.iter().map(|column| {
                Cell::from(column.clone()).style(Style::default().add_modifier(Modifier::BOLD))
            }));
            let rows = result
                .rows
                .iter()
                .map(|row| Row::new(row.iter().map(|cell| Cell::from(cell.clone()))));
            let widths = vec![Constraint::Fill(1); result.width().max(1)];
            let table = Table::new(rows, widths)
                .header(header)
                .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));
            let mut state = TableState::default().with_selected(Some(selected));
            frame.render_stateful_widget(table, body_area, &mut state);
        }
    }
}

fn render_prompt_popup(frame: &mut Frame<'_>, title: &str, message: &str, input: Option<&str>) {
    let area = centered_rect(60, 30, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from(message.to_string()), Line::from("")];
    if let Some(input) = input {
        lines.push(Line::from(vec![
            Span::raw("> "),
            Span::styled(input.to_string(), Style::default().fg(Color::Yellow)),
            Span::raw("_"),
        ]));
        lines.push(Line::from(""));
    }
    lines.push(Line::from("Enter: confirm | Esc: cancel"));

    let prompt = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string()),
        );
    frame.render_widget(prompt, area);
}

fn render_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("Global keymap"),
        Line::from("q: quit    ?: toggle help"),
        Line::from("Enter: open highlighted database or table"),
        Line::from("Esc: back to parent view"),
        Line::from("Arrows or jk: move selection"),
        Line::from("r: refresh    s: run query"),
        Line::from("c: new database    D: drop database"),
        Line::from("t: new table    x: drop table"),
        Line::from("a: add row    e: edit row    d: delete row"),
        Line::from("f: filter rows    F: clear filter"),
        Line::from(""),
        Line::from("While a prompt is open, type to fill it in."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn action_key(action: ActionId) -> &'static str {
    match action {
        ActionId::Refresh => "r",
        ActionId::OpenDatabase | ActionId::OpenTable => "Enter",
        ActionId::Back => "Esc",
        ActionId::CreateDatabase => "c",
        ActionId::DropDatabase => "D",
        ActionId::CreateTable => "t",
        ActionId::DropTable => "x",
        ActionId::InsertRow => "a",
        ActionId::EditRow => "e",
        ActionId::DeleteRow => "d",
        ActionId::FilterRows => "f",
        ActionId::ClearFilter => "F",
        ActionId::RunQuery => "s",
    }
}

fn map_key_event(key: KeyEvent, prompt_open: bool) -> Option<Msg> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Msg::Quit);
    }

    if prompt_open {
        return match key.code {
            KeyCode::Enter => Some(Msg::Confirm),
            KeyCode::Esc => Some(Msg::Cancel),
            KeyCode::Backspace => Some(Msg::Backspace),
            KeyCode::Char(ch) => Some(Msg::Input(ch)),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Some(Msg::Quit),
        KeyCode::Char('?') => Some(Msg::ToggleHelp),
        KeyCode::Enter => Some(Msg::Open),
        KeyCode::Esc => Some(Msg::Invoke(ActionId::Back)),
        KeyCode::Up | KeyCode::Char('k') => Some(Msg::Navigate(DirectionKey::Up)),
        KeyCode::Down | KeyCode::Char('j') => Some(Msg::Navigate(DirectionKey::Down)),
        KeyCode::Char('r') => Some(Msg::Invoke(ActionId::Refresh)),
        KeyCode::Char('c') => Some(Msg::Invoke(ActionId::CreateDatabase)),
        KeyCode::Char('D') => Some(Msg::Invoke(ActionId::DropDatabase)),
        KeyCode::Char('t') => Some(Msg::Invoke(ActionId::CreateTable)),
        KeyCode::Char('x') => Some(Msg::Invoke(ActionId::DropTable)),
        KeyCode::Char('a') => Some(Msg::Invoke(ActionId::InsertRow)),
        KeyCode::Char('e') => Some(Msg::Invoke(ActionId::EditRow)),
        KeyCode::Char('d') => Some(Msg::Invoke(ActionId::DeleteRow)),
        KeyCode::Char('f') => Some(Msg::Invoke(ActionId::FilterRows)),
        KeyCode::Char('F') => Some(Msg::Invoke(ActionId::ClearFilter)),
        KeyCode::Char('s') => Some(Msg::Invoke(ActionId::RunQuery)),
        _ => None,
    }
}
