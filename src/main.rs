use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use grammar_chat::config::{self, Config, Overrides, Settings};
use grammar_chat::{logging, CorrectionPipeline, GeminiClient, MessageStore, PipelineEvent};
use tui::{Screen, TerminalEvents};

const ANIMATION_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Parser)]
#[command(name = "grammar-chat")]
#[command(about = "Chat with Gemini to fix the grammar of what you type", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Gemini model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Quiet period before a request is sent, in milliseconds
    #[arg(long, global = true)]
    debounce_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Correct one piece of text and print the result
    Check {
        /// Text to correct
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config = Config::load().unwrap_or_else(|e| {
        eprintln!("WARN: ignoring unreadable config file ({})", e);
        Config::new()
    });
    let overrides = Overrides {
        model: cli.model.clone(),
        debounce_ms: cli.debounce_ms,
    };
    let settings = config::install(Settings::resolve(&file_config, &overrides, |name| {
        std::env::var(name).ok()
    }))?;

    let _log_guard = match logging::default_log_dir() {
        Ok(dir) => Some(logging::init(&dir, &settings.log_filter)?),
        Err(e) => {
            eprintln!("WARN: logging disabled ({})", e);
            None
        }
    };
    info!(version = env!("CARGO_PKG_VERSION"), model = %settings.model, "grammar-chat starting");

    let client = GeminiClient::new(&settings.base_url, &settings.model, settings.api_key.as_deref());
    let has_api_key = client.has_api_key();
    let pipeline = CorrectionPipeline::new(Arc::new(client), settings.quiet_period);

    match cli.command {
        Some(Commands::Check { text }) => check_once(pipeline, &text).await,
        None => run_tui(App::new(pipeline, &settings.model, has_api_key)).await,
    }
}

/// Push a single piece of text through the pipeline without a terminal UI.
async fn check_once(mut pipeline: CorrectionPipeline, text: &str) -> Result<()> {
    let mut store = MessageStore::new();
    let id = pipeline
        .submit(&mut store, text)
        .ok_or_else(|| anyhow!("nothing to correct: input is empty"))?;

    loop {
        match pipeline.step(&mut store).await {
            PipelineEvent::Corrected { message_id, .. } if message_id == id => {
                let corrected = store
                    .get(id)
                    .and_then(|m| m.corrected_text())
                    .unwrap_or_default();
                println!("{}", corrected);
                return Ok(());
            }
            PipelineEvent::Failed { message_id, .. } if message_id == id => {
                let reason = pipeline.last_error().unwrap_or(grammar_chat::error::CORRECTION_FAILED);
                return Err(anyhow!("{}", reason));
            }
            _ => {}
        }
    }
}

async fn run_tui(mut app: App) -> Result<()> {
    tui::install_panic_hook();
    let mut screen = Screen::enter()?;
    let mut events = TerminalEvents::spawn();

    run_loop(&mut screen.terminal, &mut app, &mut events).await
}

async fn run_loop(terminal: &mut tui::Tui, app: &mut App, events: &mut TerminalEvents) -> Result<()> {
    // Drives the "Thinking..." ellipsis; polled only while something is outstanding
    let mut ticker = time::interval(ANIMATION_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            event = events.next() => match event {
                Some(event) => handler::handle_event(app, event)?,
                None => break,
            },
            event = app.pipeline.step(&mut app.store) => {
                app.on_pipeline_event(&event);
            }
            _ = ticker.tick(), if app.is_animating() => {
                app.tick_animation();
            }
        }
    }

    info!("grammar-chat exiting");
    Ok(())
}
