use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use margin_engine::{Document, Page, PageStorage};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::io::{Stdout, stdout};

use crate::commands::block_lines;

struct App {
    pages: Vec<Page>,
    list_state: ListState,
    content: Vec<String>,
}

impl App {
    fn new(storage: &dyn PageStorage) -> Result<Self> {
        let mut app = Self {
            pages: storage.list()?,
            list_state: ListState::default(),
            content: Vec::new(),
        };

        if !app.pages.is_empty() {
            app.list_state.select(Some(0));
            app.update_content_for_selection();
        }

        Ok(app)
    }

    fn next_page(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % self.pages.len(),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.update_content_for_selection();
    }

    fn previous_page(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.pages.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
        self.update_content_for_selection();
    }

    fn update_content_for_selection(&mut self) {
        let Some(page) = self.list_state.selected().and_then(|i| self.pages.get(i)) else {
            self.content.clear();
            return;
        };

        let document = Document::from_persisted(&page.content);
        let mut lines = vec![page.title.clone()];
        if let Some(token) = page.share_token.as_deref().filter(|_| page.is_public) {
            lines.push(format!("shared: {token}"));
        }
        lines.push(String::new());
        lines.extend(block_lines(&document));
        self.content = lines;
    }
}

pub fn run(storage: &dyn PageStorage) -> Result<()> {
    let mut app = App::new(storage)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next_page(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_page(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[0]);

    let page_items: Vec<ListItem> = app
        .pages
        .iter()
        .map(|page| {
            let marker = if page.is_public { "🔗 " } else { "📄 " };
            ListItem::new(Line::from(vec![Span::raw(format!("{marker}{}", page.title))]))
        })
        .collect();

    let pages_list = List::new(page_items)
        .block(Block::default().borders(Borders::ALL).title("Pages"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    f.render_stateful_widget(pages_list, columns[0], &mut app.list_state);

    let content_text: Vec<Line> = if app.content.is_empty() {
        vec![Line::from("No pages yet. Create one with `margin-cli new <title>`")]
    } else {
        app.content
            .iter()
            .map(|line| Line::from(line.as_str()))
            .collect()
    };

    let content = Paragraph::new(content_text)
        .block(Block::default().borders(Borders::ALL).title("Blocks (flat offset, type, text)"));

    f.render_widget(content, columns[1]);

    let help = Paragraph::new(Line::from("q: Quit | ↑/k: Previous | ↓/j: Next"));
    f.render_widget(help, rows[1]);
}
