mod ui;

use std::{
    cell::RefCell,
    error::Error,
    io::{self, stdin},
    rc::Rc,
    sync::Mutex,
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use tracing::warn;
use tracing_subscriber::filter::EnvFilter;

use typewise::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    history::ResultLog,
    passages,
    runtime::{
        CrosstermEventSource, EngineEvent, FixedTicker, Runner, ThreadTickScheduler,
        TickScheduler,
    },
    Keystroke, SessionConfig, SessionController, SessionResult, SessionStatus,
};

const REDRAW_RATE_MS: u64 = 50;
const RECENT_RUNS: usize = 5;

/// typing-speed trainer with live wpm, accuracy, and consistency
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A typing-speed trainer: type the passage, watch live wpm and accuracy, and get gross/net wpm, accuracy, consistency, and your most-missed keys when you finish."
)]
pub struct Cli {
    /// number of seconds to run test (0 runs until the passage is typed)
    #[clap(short = 's', long)]
    secs: Option<u32>,

    /// custom prompt to use
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// don't append results to the history log
    #[clap(long)]
    no_log: bool,

    /// store these options as the new defaults
    #[clap(long)]
    save: bool,
}

impl Cli {
    /// Command-line flags override stored preferences
    fn merge(&self, stored: Config) -> Config {
        Config {
            duration_secs: match self.secs {
                Some(0) => None,
                Some(secs) => Some(secs),
                None => stored.duration_secs,
            },
            passage: self.prompt.clone().or(stored.passage),
            log_results: stored.log_results && !self.no_log,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Typing,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub controller: SessionController,
    pub settings: Config,
    pub state: AppState,
    pub result: Option<SessionResult>,
    pub best_wpm: Option<u32>,
    /// Net WPM of the latest logged sessions, newest first
    pub recent: Vec<u32>,
    finished: Rc<RefCell<Option<SessionResult>>>,
    log: Option<ResultLog>,
}

impl App {
    pub fn new(
        settings: Config,
        scheduler: Box<dyn TickScheduler>,
        log: Option<ResultLog>,
    ) -> Self {
        let best_wpm = log.as_ref().and_then(|l| l.best_net_wpm().ok().flatten());
        let mut app = Self {
            controller: SessionController::with_scheduler(scheduler),
            settings,
            state: AppState::Typing,
            result: None,
            best_wpm,
            recent: Vec::new(),
            finished: Rc::new(RefCell::new(None)),
            log,
        };
        app.new_passage();
        app
    }

    /// Per-session configuration; the completion callback logs the result
    /// and hands it to the results screen.
    fn session_config(&self) -> SessionConfig {
        let slot = self.finished.clone();
        let log = self.log.clone();
        let config = match self.settings.duration_secs {
            Some(secs) => SessionConfig::timed(secs as f64),
            None => SessionConfig::untimed(),
        };

        config.on_complete(move |result| {
            if let Some(log) = log {
                if let Err(e) = log.append(&result) {
                    warn!(error = %e, path = %log.path().display(), "failed to log result");
                }
            }
            *slot.borrow_mut() = Some(result);
        })
    }

    fn load(&mut self, text: &str) {
        let config = self.session_config();
        if let Err(e) = self.controller.load(text, config) {
            warn!(error = %e, "rejected passage, falling back to a built-in one");
            let fallback = passages::random_passage(&mut rand::thread_rng());
            let config = self.session_config();
            if let Err(e) = self.controller.load(fallback, config) {
                warn!(error = %e, "rejected built-in passage");
            }
        }
        self.state = AppState::Typing;
        self.result = None;
    }

    pub fn new_passage(&mut self) {
        let text = match &self.settings.passage {
            Some(p) => p.clone(),
            None => {
                passages::next_passage(&mut rand::thread_rng(), self.controller.text()).to_string()
            }
        };
        self.load(&text);
    }

    pub fn restart(&mut self) {
        let config = self.session_config();
        if let Ok(Some(_)) = self.controller.restart(config) {
            self.state = AppState::Typing;
            self.result = None;
        } else {
            self.new_passage();
        }
    }

    /// Moves to the results screen once the session's callback has fired
    pub fn poll_result(&mut self) {
        if let Some(result) = self.finished.borrow_mut().take() {
            self.best_wpm = Some(self.best_wpm.unwrap_or(0).max(result.net_wpm));
            if let Some(log) = &self.log {
                match log.recent(RECENT_RUNS) {
                    Ok(records) => self.recent = records.iter().map(|r| r.net_wpm).collect(),
                    Err(e) => warn!(error = %e, "failed to read result log"),
                }
            }
            self.result = Some(result);
            self.state = AppState::Results;
        }
    }

    pub fn on_event(&mut self, event: EngineEvent) -> Flow {
        let flow = match event {
            EngineEvent::Tick(id) => {
                self.controller.tick(id);
                Flow::Continue
            }
            EngineEvent::Key(key) => self.on_key(key),
            EngineEvent::Resize => Flow::Continue,
        };
        self.poll_result();
        flow
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.kind == KeyEventKind::Release {
            return Flow::Continue;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Flow::Quit;
        }

        match self.state {
            AppState::Typing => match key.code {
                KeyCode::Esc => {
                    if self.controller.status() == Some(SessionStatus::Idle)
                        || !self.controller.abort()
                    {
                        return Flow::Quit;
                    }
                }
                KeyCode::Tab => {
                    self.controller.toggle_pause();
                }
                KeyCode::Backspace => {
                    self.controller.submit_keystroke(Keystroke::Backspace);
                }
                KeyCode::Char(c) => {
                    self.controller.submit_keystroke(Keystroke::Char(c));
                }
                _ => {}
            },
            AppState::Results => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
                KeyCode::Char('r') => self.restart(),
                KeyCode::Char('n') => self.new_passage(),
                _ => {}
            },
        }
        Flow::Continue
    }

    pub fn is_paused(&self) -> bool {
        self.controller.status() == Some(SessionStatus::Paused)
    }
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .with_env_var("TYPEWISE_LOG")
        .from_env_lossy();

    // Log to a file so the alternate screen stays clean
    let path = AppDirs::trace_log_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let store = FileConfigStore::new();
    let settings = cli.merge(store.load());
    if cli.save {
        store.save(&settings)?;
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = CrosstermEventSource::new();
    let scheduler = ThreadTickScheduler::new(events.sender());
    let log = settings.log_results.then(ResultLog::new);
    let mut app = App::new(settings, Box::new(scheduler), log);

    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(REDRAW_RATE_MS)));
    let outcome = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<CrosstermEventSource, FixedTicker>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui(app, f))?;

        if let Some(event) = runner.step() {
            if app.on_event(event) == Flow::Quit {
                break;
            }
        }
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
