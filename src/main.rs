//! qutesheet - A score event sheet driven from the terminal.
//!
//! Reads one command per line from stdin and prints dispatched score
//! events to stdout, one per line, ready to be piped into a performance
//! engine.
//!
//! # Usage
//!
//! ```bash
//! qutesheet score.sco                  # Load score text
//! qutesheet --tempo 120 sheet.json     # Load a saved sheet at 120 BPM
//! ```

use anyhow::{Context, Result};
use qutesheet::{Command, EventSheet, EventSink, SheetConfig, SheetDocument};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// How often the loop timer is checked.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Command-line options for the application.
struct CliOptions {
    /// Path to a JSON configuration file.
    config: Option<PathBuf>,
    /// Tempo override in beats per minute.
    tempo: Option<f64>,
    /// Loop length override in beats.
    loop_length: Option<f64>,
    /// Score text or sheet document to load.
    file: Option<PathBuf>,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--config <path>` or `-c <path>`: Load settings from a JSON file
    /// - `--tempo <bpm>` or `-t <bpm>`: Override the tempo
    /// - `--loop-length <beats>` or `-l <beats>`: Override the loop length
    /// - `--help` or `-h`: Print help and exit
    /// - a positional path: the sheet to load
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut options = Self {
            config: None,
            tempo: None,
            loop_length: None,
            file: None,
        };
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    i += 1;
                    let path = args.get(i).context("--config requires a path argument")?;
                    options.config = Some(PathBuf::from(path));
                }
                "--tempo" | "-t" => {
                    i += 1;
                    let value = args.get(i).context("--tempo requires a value")?;
                    options.tempo = Some(value.parse().context("invalid --tempo value")?);
                }
                "--loop-length" | "-l" => {
                    i += 1;
                    let value = args.get(i).context("--loop-length requires a value")?;
                    options.loop_length =
                        Some(value.parse().context("invalid --loop-length value")?);
                }
                "--help" | "-h" => {
                    eprintln!("qutesheet - Score event sheet");
                    eprintln!();
                    eprintln!(
                        "Usage: {} [OPTIONS] [FILE]",
                        args.first().map_or("qutesheet", String::as_str)
                    );
                    eprintln!();
                    eprintln!("Options:");
                    eprintln!("  -c, --config PATH         Load settings from a JSON file");
                    eprintln!("  -t, --tempo BPM           Tempo in beats per minute");
                    eprintln!("  -l, --loop-length BEATS   Loop length in beats");
                    eprintln!("  -h, --help                Print this help message");
                    eprintln!();
                    eprintln!("FILE is score text, or a sheet document if it ends in .json.");
                    std::process::exit(0);
                }
                other if other.starts_with('-') => {
                    eprintln!("Unknown option: {}", other);
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
                other => options.file = Some(PathBuf::from(other)),
            }
            i += 1;
        }

        Ok(options)
    }
}

/// Prints dispatched events to stdout.
struct StdoutSink;

impl EventSink for StdoutSink {
    fn send_event(&mut self, event: &str) {
        println!("{}", event);
    }
}

/// Loads a sheet file into the sheet, choosing the format by extension.
fn load_file(sheet: &mut EventSheet, path: &Path) -> Result<()> {
    if path.extension().is_some_and(|e| e == "json") {
        let document = SheetDocument::load_from_file(path)
            .with_context(|| format!("Failed to load sheet {}", path.display()))?;
        sheet.load_document(document);
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read score {}", path.display()))?;
        sheet.load_text(&text);
    }
    Ok(())
}

/// Restores the autosave if one exists. Failures are logged, not fatal.
fn try_load_autosave(sheet: &mut EventSheet, path: &Path) {
    if !path.exists() {
        return;
    }
    match SheetDocument::load_from_binary(path) {
        Ok(document) => {
            info!("restored autosave from {}", path.display());
            sheet.load_document(document);
        }
        Err(e) => warn!("could not restore autosave {}: {}", path.display(), e),
    }
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => SheetConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SheetConfig::default(),
    };
    if let Some(tempo) = cli.tempo {
        config.tempo = tempo;
    }
    if let Some(loop_length) = cli.loop_length {
        config.loop_length = loop_length;
    }

    let mut sheet = EventSheet::from_config(&config);
    match (&cli.file, &config.autosave_path) {
        (Some(path), _) => load_file(&mut sheet, path)?,
        (None, Some(autosave)) => try_load_autosave(&mut sheet, autosave),
        (None, None) => {}
    }
    // Settings given on the command line win over the loaded document.
    if let Some(tempo) = cli.tempo {
        sheet.set_tempo(tempo);
    }
    if let Some(loop_length) = cli.loop_length {
        sheet.set_loop_length(loop_length);
    }
    sheet.set_event_sink(StdoutSink);

    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    run(&mut sheet, &rx);

    sheet.stop_all_events();
    if let Some(path) = &config.autosave_path {
        sheet
            .to_document()
            .save_to_binary(path)
            .with_context(|| format!("Failed to write autosave {}", path.display()))?;
    }
    Ok(())
}

/// Runs commands until `quit` or end of input, firing the loop timer in
/// between.
fn run(sheet: &mut EventSheet, commands: &mpsc::Receiver<String>) {
    loop {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => match command.apply(sheet) {
                    Ok(Some(output)) => eprintln!("{}", output),
                    Ok(None) => {}
                    Err(e) => eprintln!("Error: {}", e),
                },
                Err(e) => eprintln!("Error: {}", e),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        sheet.poll_timer(Instant::now());
    }
}
