mod app;
mod config;
mod content;
mod engine;
mod event;
mod session;
mod store;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use tracing_subscriber::EnvFilter;

use app::{App, AppScreen, NoticeKind, StartOptions};
use config::{Config, ThemeKind};
use content::Category;
use engine::pronunciation::{PinyinDictionary, ToneStyle};
use event::{AppEvent, EventHandler};
use session::report::{self, Period};
use store::Persistence;
use store::schema::ExportData;
use ui::components::dashboard::Dashboard;
use ui::components::menu::MenuView;
use ui::components::mistake_list::MistakeList;
use ui::components::stats_dashboard::StatsDashboard;
use ui::components::stats_sidebar::StatsSidebar;
use ui::components::typing_area::TypingArea;
use ui::layout::{AppLayout, centered_rect, pack_hint_lines};

#[derive(Parser)]
#[command(name = "pinydr", version, about = "Terminal pinyin typing practice")]
struct Cli {
    #[arg(short, long, value_enum, help = "Color theme")]
    theme: Option<ThemeKind>,

    #[arg(short, long, help = "Category id (poem, tongue, sentence, ...) or volume id")]
    category: Option<String>,

    #[arg(short, long, help = "Session length in minutes (0 for a 10-second trial)")]
    minutes: Option<u32>,

    #[arg(long, help = "Start with this text instead of fetching one")]
    text: Option<String>,

    #[arg(long, help = "Base URL of the content service")]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the pinyin of a text
    Convert {
        text: String,
        #[arg(short, long, value_enum, default_value_t = ToneStyle::Marks)]
        style: ToneStyle,
        #[arg(short, long, help = "List every reading of polyphonic characters")]
        all: bool,
    },
    /// Print the markdown learning report
    Report {
        #[arg(short, long, value_enum, default_value_t = Period::Week)]
        period: Period,
    },
    /// Write mistakes, sessions and preferences to a JSON file
    Export { path: PathBuf },
    /// Replace saved data with an export file
    Import { path: PathBuf },
    /// Delete every saved document
    Clear,
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pinydr")
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging(dir: &Path) {
    if fs::create_dir_all(dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("pinydr.log"))
    else {
        return;
    };
    let filter =
        EnvFilter::try_from_env("PINYDR_LOG").unwrap_or_else(|_| EnvFilter::new("pinydr=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = data_dir();
    init_logging(&data_dir);

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config unreadable, using defaults");
        Config::default()
    });
    if let Some(minutes) = cli.minutes {
        config.session_minutes = minutes;
    }
    if let Some(endpoint) = cli.endpoint {
        config.content_endpoint = Some(endpoint);
    }
    config.validate();

    if let Some(command) = cli.command {
        return run_command(command, &config);
    }

    let source = content::source_for(config.content_endpoint.as_deref());
    let options = StartOptions {
        category: cli.category.as_deref().map(Category::parse),
        theme: cli.theme,
        text: cli.text,
        report_dir: Some(data_dir.join("reports")),
    };
    let mut app = App::new(
        config,
        Persistence::open_default(),
        source,
        PinyinDictionary::new(),
        options,
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(100));

    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!(error = ?err, "terminal loop failed");
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_command(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Convert { text, style, all } => {
            println!("{}", PinyinDictionary::new().convert(&text, style, all));
        }
        Command::Report { period } => {
            let persistence = Persistence::open_default();
            let history = persistence.load_sessions();
            let mistakes = persistence.load_mistakes();
            match report::learning_report(history.sessions(), &mistakes, period, Utc::now()) {
                Some(report) => print!("{report}"),
                None => println!("No practice sessions recorded yet."),
            }
        }
        Command::Export { path } => {
            let data = Persistence::open_default().export_all(config);
            let json = serde_json::to_string_pretty(&data)?;
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        Command::Import { path } => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let data: ExportData = serde_json::from_str(&json)?;
            Persistence::open_default().import_all(&data)?;
            let mut imported = data.config;
            imported.validate();
            imported.save()?;
            println!("Imported {}", path.display());
        }
        Command::Clear => {
            Persistence::open_default().clear_all();
            println!("Saved mistakes, sessions and preferences cleared.");
        }
    }
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Tick | AppEvent::Resize => {}
        }
        app.tick(Instant::now(), Utc::now());

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => app.should_quit = true,
            KeyCode::Char('r') => app.reset_session(),
            _ => {}
        }
        return;
    }

    if app.menu_open {
        handle_menu_key(app, key);
        return;
    }

    match app.screen {
        AppScreen::Practice => handle_practice_key(app, key),
        AppScreen::Mistakes => handle_mistakes_key(app, key),
        AppScreen::Stats => handle_stats_key(app, key),
        AppScreen::Summary => handle_summary_key(app, key),
    }
}

fn handle_practice_key(app: &mut App, key: KeyEvent) {
    let now = Instant::now();
    match key.code {
        KeyCode::Char(' ') => app.space(),
        KeyCode::Char(ch) => app.type_key(ch, now),
        KeyCode::Backspace => app.backspace(now),
        KeyCode::Enter => app.start_session(now, Utc::now()),
        KeyCode::Esc => {
            if app.tracker.is_active() {
                app.end_session(Utc::now());
            } else {
                app.should_quit = true;
            }
        }
        KeyCode::Tab => app.open_menu(),
        KeyCode::F(2) => app.go_to_mistakes(),
        KeyCode::F(3) => app.go_to_stats(),
        KeyCode::F(4) => app.toggle_theme(),
        KeyCode::F(5) => app.request_next(),
        _ => {}
    }
}

fn handle_menu_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.menu.prev(),
        KeyCode::Down | KeyCode::Char('j') => app.menu.next(),
        KeyCode::Enter => app.choose_menu_item(),
        KeyCode::Esc | KeyCode::Tab => app.menu_open = false,
        _ => {}
    }
}

fn handle_mistakes_key(app: &mut App, key: KeyEvent) {
    if app.mistake_confirm_clear {
        match key.code {
            KeyCode::Char('y') => app.clear_mistakes(),
            KeyCode::Char('n') | KeyCode::Esc => app.mistake_confirm_clear = false,
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.go_to_practice(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next_mistake(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev_mistake(),
        KeyCode::Char('x') | KeyCode::Delete => app.delete_selected_mistake(),
        KeyCode::Char('C') => {
            if !app.mistakes.is_empty() {
                app.mistake_confirm_clear = true;
            }
        }
        KeyCode::Char('p') => app.practice_mistakes(),
        _ => {}
    }
}

fn handle_stats_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.go_to_practice(),
        KeyCode::Char('1') => app.stats_tab = 0,
        KeyCode::Char('2') => app.stats_tab = 1,
        KeyCode::Char('3') => app.stats_tab = 2,
        KeyCode::Tab => app.next_stats_tab(),
        KeyCode::BackTab => app.prev_stats_tab(),
        KeyCode::Char('p') => app.cycle_period(),
        KeyCode::Char('r') => app.save_report(Utc::now()),
        _ => {}
    }
}

fn handle_summary_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Esc => app.go_to_practice(),
        KeyCode::Char('s') => app.go_to_stats(),
        KeyCode::Char('m') => app.go_to_mistakes(),
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    match app.screen {
        AppScreen::Practice => render_practice(frame, app),
        AppScreen::Mistakes => render_mistakes(frame, app),
        AppScreen::Stats => render_stats(frame, app),
        AppScreen::Summary => render_summary(frame, app),
    }

    if app.menu_open {
        let menu_area = centered_rect(40, 70, area);
        frame.render_widget(
            MenuView {
                menu: &app.menu,
                current: app.category(),
                theme: &app.theme,
            },
            menu_area,
        );
    }
}

fn render_practice(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let hints = [
        "[Space] Confirm",
        "[Enter] Start session",
        "[Esc] End/Quit",
        "[Tab] Category",
        "[F2] Mistakes",
        "[F3] Stats",
        "[F4] Theme",
        "[F5] New text",
    ];
    let hint_lines = pack_hint_lines(&hints, area.width as usize);
    let layout = AppLayout::new(area, hint_lines.len() as u16 + 1);

    let category = app.menu.label_of(app.category());
    let session_text = match app.tracker.remaining_secs() {
        Some(secs) => format!(" | {} left", session::tracker::format_mmss(secs)),
        None => String::new(),
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " pinydr ",
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.header_bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {category}{session_text}"),
            Style::default()
                .fg(colors.text_pending())
                .bg(colors.header_bg()),
        ),
    ]))
    .style(Style::default().bg(colors.header_bg()));
    frame.render_widget(header, layout.header);

    let typing = TypingArea::new(
        app.engine.slots(),
        app.engine.cursor(),
        app.engine.buffer(),
        &app.theme,
    )
    .title(app.title.as_deref());
    frame.render_widget(typing, layout.main);

    if let Some(sidebar_area) = layout.sidebar {
        let sidebar = StatsSidebar {
            text_accuracy: app.engine.accuracy(),
            graded: app.engine.graded_count(),
            targets: app.engine.target_count(),
            remaining_secs: app.tracker.remaining_secs(),
            counters: app.tracker.counters(),
            session_secs: app.config.session_secs(),
            theme: &app.theme,
        };
        frame.render_widget(sidebar, sidebar_area);
    }

    let mut footer: Vec<Line> = Vec::new();
    footer.push(match app.notice {
        Some(ref notice) => {
            let color = match notice.kind {
                NoticeKind::Info => colors.accent(),
                NoticeKind::Error => colors.error(),
            };
            Line::from(Span::styled(format!(" {}", notice.text), Style::default().fg(color)))
        }
        None => Line::from(""),
    });
    footer.extend(hint_lines.into_iter().map(|hint| {
        Line::from(Span::styled(hint, Style::default().fg(colors.text_pending())))
    }));
    frame.render_widget(Paragraph::new(footer), layout.footer);
}

fn render_mistakes(frame: &mut ratatui::Frame, app: &App) {
    let entries = app.sorted_mistakes();
    let list = MistakeList {
        entries: &entries,
        selected: app.mistake_selected,
        confirm_clear: app.mistake_confirm_clear,
        theme: &app.theme,
    };
    frame.render_widget(list, frame.area());
}

fn render_stats(frame: &mut ratatui::Frame, app: &App) {
    let dashboard = StatsDashboard {
        sessions: app.history.sessions(),
        mistakes: &app.mistakes,
        period: app.stats_period,
        active_tab: app.stats_tab,
        now: Utc::now(),
        notice: app.notice.as_ref().map(|n| n.text.as_str()),
        theme: &app.theme,
    };
    frame.render_widget(dashboard, frame.area());
}

fn render_summary(frame: &mut ratatui::Frame, app: &App) {
    if let Some(ref summary) = app.last_summary {
        let centered = centered_rect(60, 70, frame.area());
        frame.render_widget(Dashboard::new(summary, &app.theme), centered);
    }
}
