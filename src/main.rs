use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod domain;
mod inputter;
mod model;
mod snapshot;
mod source;
mod ui;

use controller::Controller;
use domain::{Config, DirectoryError, Message, Status};
use model::Model;
use source::DatasetSource;
use ui::DirectoryUI;

/// A tui based faculty directory viewer.
#[derive(Parser, Debug)]
#[command(name = "fdv", version, about)]
struct CliArgs {
    /// Path or URL of the faculty dataset (a JSON array of records)
    #[arg(default_value = "faculty.json")]
    source: String,

    /// Where exported snapshots are written
    #[arg(short, long, default_value = "faculty-directory.png")]
    output: PathBuf,

    /// Log file (filtered through RUST_LOG)
    #[arg(long, default_value = "fdv.log")]
    log_file: PathBuf,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn run() -> Result<(), DirectoryError> {
    let args = CliArgs::parse();
    init_tracing(&args.log_file)?;

    let config = Config::default()
        .source(args.source)
        .export_path(args.output);

    let (events, event_queue) = crossbeam_channel::unbounded::<Message>();

    let mut model = Model::init(&config, events.clone())?;
    source::spawn_fetch(DatasetSource::detect(&config.source), events);

    let mut ui = DirectoryUI::new();
    let controller = Controller::new(&config);

    let mut terminal = ratatui::init();

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle terminal events and map them to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        }

        // Drain whatever the background threads delivered meanwhile
        while let Ok(message) = event_queue.try_recv() {
            model.update(message)?;
        }
    }

    Ok(())
}

// The TUI owns the terminal, so diagnostics go to a file instead.
fn init_tracing(path: &std::path::Path) -> Result<(), DirectoryError> {
    let log_file = Arc::new(File::create(path)?);
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
