//! relaycon - interactive console relay for a remote command interpreter
//!
//! relaycon opens a pseudo-terminal pair and serves a line-edited
//! console on the slave side. Typed lines are edited locally (cursor
//! movement, history, kill-to-end) and forwarded to a command
//! interpreter child process on submit; responses and asynchronous
//! debug output from the interpreter are relayed back to the terminal.
//!
//! # Quick Start
//!
//! ```text
//! relaycon my-interpreter            # serve a console for my-interpreter
//! relaycon -l debug my-interpreter   # with per-keystroke logging
//! ```
//!
//! Point a terminal program (e.g. minicom or screen) at the PTY path
//! printed on startup.
//!
//! # Key bindings
//!
//! | Key | Action |
//! |-----|--------|
//! | Left/Right, Ctrl+B/Ctrl+F | Move cursor |
//! | Up/Down, Ctrl+P/Ctrl+N | Browse history |
//! | Home/End, Ctrl+A/Ctrl+E | Start/end of line |
//! | Delete, Ctrl+D | Delete at cursor |
//! | Ctrl+K | Kill to end of line |
//! | Enter | Submit line |
//!
//! The command `history` is handled locally and lists all submitted
//! commands.

mod config;
mod core;

use std::env;

use anyhow::Context;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::{home_dir, Config};
use crate::core::{serve, Console, Interpreter, Pty};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parsed command line
struct Args {
    /// Interpreter program to spawn
    program: String,
    /// Arguments passed to the interpreter
    program_args: Vec<String>,
    /// Log level
    log_level: Level,
}

fn print_version() {
    eprintln!("relaycon {}", VERSION);
}

fn print_help() {
    eprintln!(
        "relaycon {} - interactive console relay for a remote command interpreter",
        VERSION
    );
    eprintln!();
    eprintln!("Usage: relaycon [OPTIONS] <interpreter> [args...]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <interpreter>         Command interpreter to spawn; its stdin/stdout");
    eprintln!("                        carry commands and responses, its stderr carries");
    eprintln!("                        debug output");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -l, --log-level <LVL> info, debug, warning, or error (default: info)");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("The console is served on a PTY; the slave path is printed on startup.");
    eprintln!("Connect to it with a terminal program, e.g.: minicom -D /dev/pts/N");
    eprintln!();
    eprintln!("Configuration: ~/.relaycon/config.toml (prompt, line_limit)");
    eprintln!("Log file:      ~/.relaycon/relaycon.log");
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut log_level = Level::INFO;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-l" | "--log-level" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing log level argument".to_string());
                }
                log_level = match args[i].to_lowercase().as_str() {
                    "info" => Level::INFO,
                    "debug" => Level::DEBUG,
                    "warning" | "warn" => Level::WARN,
                    "error" => Level::ERROR,
                    other => return Err(format!("Invalid log level: {}", other)),
                };
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
            _ => {
                // First positional is the interpreter; the rest are its
                // arguments.
                return Ok(Args {
                    program: args[i].clone(),
                    program_args: args[i + 1..].to_vec(),
                    log_level,
                });
            }
        }
        i += 1;
    }

    Err("Missing interpreter command. Use -h for help.".to_string())
}

/// Initialize logging to ~/.relaycon/relaycon.log
fn init_logging(level: Level) {
    let log_path = home_dir()
        .map(|h| h.join(".relaycon").join("relaycon.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("relaycon.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging(args.log_level);
    info!("relaycon starting...");

    let config = Config::load();
    info!(
        "prompt: '{}', line limit: {}",
        config.prompt, config.line_limit
    );

    // Spawn the interpreter first; there is no console without it.
    let mut peer = Interpreter::spawn(&args.program, &args.program_args)
        .context("failed to start interpreter")?;

    let mut pty = Pty::open().context("failed to open PTY pair")?;
    println!("Console is being served on {}.", pty.slave_path().display());

    let mut console = Console::new(config.prompt, config.line_limit);

    // Runs until a channel breaks; a dead peer or terminal is fatal.
    let result = serve(&mut console, &mut pty, &mut peer);
    if let Err(ref e) = result {
        error!("console stopped: {}", e);
    }
    result.context("console session ended")?;
    Ok(())
}
