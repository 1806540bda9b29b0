//! bobsled Terminal UI.
//!
//! Dashboard for browsing tasks and runs of a bobsled backend, with live
//! scheduler heartbeat and run logs.

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bobsled_client::{HttpClient, Origin, DEFAULT_ORIGIN};
use bobsled_core::{PageId, RunId, TaskName};

mod app;
mod backend;
mod event;
mod page;
mod ui;

use app::App;
use backend::SessionConfig;
use event::{BackendCommand, UiEvent};

#[derive(Parser)]
#[command(name = "bobsled-tui")]
#[command(about = "bobsled Terminal UI")]
#[command(version)]
struct Cli {
    /// Backend origin (scheme, host and port)
    #[arg(short, long, default_value = DEFAULT_ORIGIN)]
    origin: Origin,

    /// Reconnect closed live channels after this many seconds
    #[arg(long)]
    reconnect_secs: Option<u64>,

    /// Log file (the terminal is owned by the UI)
    #[arg(long, default_value = "/tmp/bobsled-tui.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    page: Option<StartPage>,
}

/// Page to open first.
#[derive(Subcommand)]
enum StartPage {
    /// Task list with scheduler heartbeat
    Index,

    /// One task and its runs
    #[command(alias = "t")]
    Task { name: String },

    /// One run with live logs
    #[command(alias = "r")]
    Run { uuid: String },

    /// Recent runs across all tasks
    Latest,
}

impl From<StartPage> for PageId {
    fn from(page: StartPage) -> Self {
        match page {
            StartPage::Index => PageId::Index,
            StartPage::Task { name } => PageId::Task(TaskName::new(name)),
            StartPage::Run { uuid } => PageId::Run(RunId::new(uuid)),
            StartPage::Latest => PageId::LatestRuns,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Write logs to a file to avoid terminal interference
    if let Ok(file) = std::fs::File::create(&cli.log_file) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("bobsled_tui=debug,bobsled_client=debug"));
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_env_filter(filter)
            .with_ansi(false)
            .init();
    }

    let start: PageId = cli.page.map(PageId::from).unwrap_or(PageId::Index);
    let config = SessionConfig {
        reconnect: cli.reconnect_secs.map(Duration::from_secs),
    };
    info!(origin = %cli.origin, page = %start, "Starting TUI");

    // Create channels for UI <-> backend communication
    let (ui_tx, ui_rx) = mpsc::channel::<UiEvent>(100);
    let (cmd_tx, cmd_rx) = mpsc::channel::<BackendCommand>(100);

    // Background thread with its own tokio runtime
    let rt = tokio::runtime::Runtime::new()?;
    let client = HttpClient::new(cli.origin);
    let bg_handle = std::thread::spawn(move || {
        rt.block_on(backend::run_backend(client, config, ui_tx, cmd_rx));
    });

    // Initialize terminal (enters alternate screen, enables raw mode)
    let terminal = ratatui::init();

    let mut app = App::new(start, ui_rx, cmd_tx);
    let result = app.run(terminal);

    // Restore terminal (exits alternate screen, disables raw mode)
    ratatui::restore();

    // Dropping the app closes the command channel if Quit was not delivered
    drop(app);
    let _ = bg_handle.join();

    info!("TUI shutdown complete");

    result.map_err(|e| e.into())
}
