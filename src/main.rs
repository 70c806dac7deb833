use std::io::{self, stdout, BufRead, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, TryRecvError};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;

use taskman::api::{DirectoryApi, HttpDirectory, InMemoryDirectory, RegisterInput};
use taskman::app::LogicThread;
use taskman::config::Config;
use taskman::core::User;
use taskman::render::RenderState;
use taskman::session::{Session, SessionManager};
use taskman::{tlog, tlog_warn, ui, Error, Result};

const FRAME_DURATION: Duration = Duration::from_micros(16_666); // 60fps

/// Taskman - terminal kanban board for organizations, projects and tasks
#[derive(Parser, Debug)]
#[command(name = "taskman")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    TASKMAN_DEBUG=1     Enable debug logging (alternative to --debug)"
)]
pub struct Cli {
    /// Enable debug logging (writes to ~/.taskman/taskman.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Directory base URL (overrides config.toml)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Run against a seeded in-memory directory instead of a server
    #[arg(long)]
    pub demo: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Account commands; with no command the board opens.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Log in and store the session token
    Login {
        #[arg(long, short = 'e')]
        email: String,
    },

    /// Create an account and log in
    Register {
        #[arg(long, short = 'e')]
        email: String,

        /// Full name shown on cards
        #[arg(long, short = 'n')]
        name: String,
    },

    /// Forget the stored session
    Logout,

    /// Show who is logged in
    Whoami,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    taskman::log::init_with_debug(cli.debug);

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url.clone() {
        config.api_url = url;
    }

    match cli.command {
        Some(Command::Login { email }) => return run_login(&config, &email),
        Some(Command::Register { email, name }) => return run_register(&config, &email, &name),
        Some(Command::Logout) => return run_logout(),
        Some(Command::Whoami) => return run_whoami(),
        None => {
            // No subcommand: launch TUI
        }
    }

    if cli.debug {
        tlog!("Taskman starting (debug mode enabled)");
    } else {
        tlog!("Taskman starting");
    }

    let (api, principal) = connect(&config, cli.demo)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let (state_tx, state_rx) = crossbeam_channel::bounded::<RenderState>(1);

    let shutdown_clone = shutdown.clone();
    let logic_handle = thread::spawn(move || {
        LogicThread::run(config, api, principal, state_tx, shutdown_clone)
    });

    let mut terminal = setup_terminal()?;
    let result = render_loop(&mut terminal, state_rx, &shutdown);

    shutdown.store(true, Ordering::SeqCst);
    let logic_result = logic_handle
        .join()
        .map_err(|_| Error::TaskJoin("logic thread panicked".to_string()));
    restore_terminal(&mut terminal)?;
    result?;
    logic_result?
}

/// Pick the directory and confirm who the principal is.
fn connect(config: &Config, demo: bool) -> Result<(Arc<dyn DirectoryApi>, User)> {
    let runtime = Runtime::new()?;

    if demo {
        let api = InMemoryDirectory::demo()?;
        let principal = runtime.block_on(api.me())?;
        tlog!("Demo directory, principal={}", principal.email);
        let api: Arc<dyn DirectoryApi> = Arc::new(api);
        return Ok((api, principal));
    }

    let sessions = SessionManager::default_location()?;
    let Some(session) = sessions.load()? else {
        return Err(Error::Unauthenticated);
    };
    let api = HttpDirectory::new(
        config.api_url.clone(),
        Some(session.token.clone()),
        config.request_timeout(),
    )?;

    match runtime.block_on(api.me()) {
        Ok(principal) => {
            let api: Arc<dyn DirectoryApi> = Arc::new(api);
            Ok((api, principal))
        }
        Err(Error::Protocol { status: 401, .. }) => {
            tlog_warn!("Stored session rejected, clearing it");
            sessions.clear()?;
            Err(Error::Unauthenticated)
        }
        Err(e) => Err(e),
    }
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn store_session(session: Session) -> Result<()> {
    SessionManager::default_location()?.save(&session)?;
    println!(
        "Logged in as {} <{}>",
        session.user.full_name, session.user.email
    );
    tlog!("Session stored for {}", session.user.email);
    Ok(())
}

fn run_login(config: &Config, email: &str) -> Result<()> {
    let password = read_password()?;
    let api = HttpDirectory::new(config.api_url.clone(), None, config.request_timeout())?;
    let auth = Runtime::new()?.block_on(api.login(email, &password))?;
    store_session(auth.into())
}

fn run_register(config: &Config, email: &str, name: &str) -> Result<()> {
    let password = read_password()?;
    let api = HttpDirectory::new(config.api_url.clone(), None, config.request_timeout())?;
    let input = RegisterInput {
        email: email.to_string(),
        password,
        full_name: name.to_string(),
    };
    let auth = Runtime::new()?.block_on(api.register(&input))?;
    store_session(auth.into())
}

fn run_logout() -> Result<()> {
    if SessionManager::default_location()?.clear()? {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

fn run_whoami() -> Result<()> {
    match SessionManager::default_location()?.load()? {
        Some(session) => println!(
            "{} <{}> (since {})",
            session.user.full_name,
            session.user.email,
            session.saved_at.format("%Y-%m-%d %H:%M")
        ),
        None => println!("Not logged in."),
    }
    Ok(())
}

fn render_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: Receiver<RenderState>,
    shutdown: &AtomicBool,
) -> Result<()> {
    let mut state = RenderState::default();
    let mut last_version: u64 = 0;
    let mut last_frame = Instant::now();
    let mut dirty = true;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match state_rx.try_recv() {
            Ok(s) => {
                dirty = dirty || s.version != last_version;
                state = s;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break,
        }

        if last_frame.elapsed() < FRAME_DURATION {
            thread::sleep(Duration::from_micros(500));
            continue;
        }
        last_frame = Instant::now();

        if dirty {
            terminal.draw(|f| ui::draw(f, &state))?;
            last_version = state.version;
            dirty = false;
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.hide_cursor()?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor()?;
    execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
    Ok(disable_raw_mode()?)
}
