//! polytone - play the computer keyboard like a synth, with a live scope
//!
//! Run with: cargo run --release

mod app;
mod ui;

use std::{fs::File, path::PathBuf, sync::Mutex};

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use polytone::{config::Config, io::keymap::KeyLayout};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

#[derive(Debug, Parser)]
#[command(name = "polytone", version, about = "Polyphonic keyboard synth with waveform and spectrum scopes")]
struct Cli {
    /// Config file (defaults to the platform config dir when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keyboard layout, overriding the config file
    #[arg(short, long, value_parser = parse_layout)]
    layout: Option<KeyLayout>,

    /// Log file, overriding the config file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_layout(value: &str) -> Result<KeyLayout, String> {
    match value.to_ascii_lowercase().as_str() {
        "chromatic" => Ok(KeyLayout::Chromatic),
        "diatonic" => Ok(KeyLayout::Diatonic),
        other => Err(format!("unknown layout '{other}', expected chromatic or diatonic")),
    }
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path).wrap_err_with(|| format!("loading {}", path.display()))?,
        None => Config::load_default().wrap_err("loading default config")?,
    };
    if let Some(layout) = cli.layout {
        config.keyboard.layout = layout;
    }
    if let Some(file) = cli.log_file {
        config.log.file = Some(file);
    }

    init_logging(&config)?;
    tracing::info!(layout = ?config.keyboard.layout, "starting polytone");

    let mut app = App::new(config)?;
    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    app.teardown();
    drop(app);
    ratatui::restore();
    result
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging(config: &Config) -> EyreResult<()> {
    let path = config.log.file_path();
    let file = File::create(&path).wrap_err_with(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_new(&config.log.filter)
        .wrap_err_with(|| format!("invalid log filter '{}'", config.log.filter))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Ok(())
}
