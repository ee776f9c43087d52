//! Terminal UI and command line for Jezero, the habitat waste-management system.

mod app;
mod config;
mod input;
mod ui;

use std::{
    fs::OpenOptions,
    io::{self, Write as _},
    path::PathBuf,
    process::ExitCode,
    sync::{Arc, Mutex},
    time::Duration as StdDuration,
};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use jezero_core::{
    DocumentPort, HabitatStore, JezeroService, MemoryStore, Operation, Request, dispatch, seed,
};
use jezero_store_mongodb::MongoStore;
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::{Config, StoreConfig};
use crate::input::Action;

#[derive(Parser)]
#[command(name = "jezero")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "JEZERO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Launch the interactive terminal UI (default)
    Tui,
    /// Run one named operation and print the JSON response
    Call {
        /// Operation name, e.g. `getSmartBins`
        operation: String,
        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },
    /// Load the bundled fixtures into empty collections
    Seed,
    /// List every operation name
    Operations,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;
    let command = cli.command.unwrap_or(Command::Tui);

    init_logging(&config, cli.verbose, matches!(command, Command::Tui))?;

    match command {
        Command::Operations => {
            let mut stdout = io::stdout().lock();
            for operation in Operation::ALL {
                let kind = if operation.is_mutation() { "mutation" } else { "query" };
                writeln!(stdout, "{:<34} {kind}", operation.name())?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Seed => {
            let store = open_store(&config).await?;
            let report = seed(&store).await;

            let mut stdout = io::stdout().lock();
            for (collection, count) in &report.seeded {
                writeln!(stdout, "seeded   {collection}: {count} documents")?;
            }
            for (collection, count) in &report.existing {
                writeln!(stdout, "kept     {collection}: {count} documents")?;
            }
            for (collection, reason) in &report.failures {
                writeln!(stdout, "failed   {collection}: {reason}")?;
            }
            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Call { operation, args } => {
            let operation = operation.parse::<Operation>()?;
            let args = serde_json::from_str(&args).context("arguments must be a JSON object")?;

            let service = open_service(&config).await?;
            let response = dispatch(&service, Request::new(operation, args)).await;

            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", serde_json::to_string_pretty(&response)?)?;
            Ok(if response.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Tui => {
            let service = open_service(&config).await?;
            run_tui(App::new(Arc::new(service))).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over `-v`, which wins over the configured level. The TUI owns the
/// terminal, so it logs to a file instead of stderr.
fn init_logging(config: &Config, verbose: u8, to_file: bool) -> Result<()> {
    let level = match verbose {
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    if to_file {
        let path = config.log_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

async fn open_store(config: &Config) -> Result<HabitatStore> {
    let port: Arc<dyn DocumentPort> = match &config.store {
        StoreConfig::Memory { .. } => {
            let path = config
                .snapshot_path()
                .context("memory store without snapshot path")?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            Arc::new(MemoryStore::open(path).await?)
        }
        StoreConfig::Mongodb {
            uri,
            uri_env,
            database,
        } => {
            let uri = crate::config::connection_string(uri.as_deref(), uri_env.as_deref(), |name| {
                std::env::var(name).ok()
            })?;
            Arc::new(MongoStore::connect(&uri, database).await?)
        }
    };

    info!(kind = %port.meta().kind, location = %port.meta().location, "opened document store");
    Ok(HabitatStore::new(port))
}

async fn open_service(config: &Config) -> Result<JezeroService> {
    let store = open_store(config).await?;

    if config.seed_on_start {
        let report = seed(&store).await;
        if !report.is_clean() {
            warn!(failures = report.failures.len(), "seeding was incomplete");
        }
    }

    Ok(JezeroService::new(store))
}

async fn run_tui(app: App) -> Result<()> {
    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app).await;

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

async fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            let action = input::handle_key_event(key, &mut app);

            match action {
                Action::Quit => break,
                Action::None => {}
                action => {
                    app.is_loading = true;
                    terminal.draw(|frame| ui::draw(frame, &app))?;

                    let res = app.perform(action).await;

                    app.is_loading = false;
                    if let Err(err) = res {
                        warn!(?action, error = %err, "action failed");
                        app.error_message = Some(err.to_string());
                    }
                }
            }
        }
    }

    Ok(())
}
