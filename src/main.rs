//! Purpose: `mqbridge` CLI entry point for inspecting the compiled host contract.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable JSON on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Notes: Never touches a live host; everything here works off the compiled-in layouts.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use mqbridge::api::{
    BridgeConfig, Error, ErrorKind, PathKind, RecordKind, colorize_line, to_exit_code,
};

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

#[derive(Parser)]
#[command(
    name = "mqbridge",
    version,
    about = "Inspect the Rust/MacroQuest boundary contract",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the record field layouts and path codes this build expects.
    Layout,
    /// Work with plugin config files.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Show what an ANSI-colored line looks like after host color translation.
    Colorize {
        /// Text to translate; escape sequences are taken literally (use $'..' in a shell).
        text: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Validate a config file and print it with defaults filled in.
    Check {
        #[arg(value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
    /// Print the default config.
    Default,
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(code);
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage).with_message(clap_error_summary(&err)));
            }
        },
    };

    let value = match cli.command {
        Command::Layout => layout_json(),
        Command::Config { command } => match command {
            ConfigCommand::Check { path } => {
                let config = BridgeConfig::load(&path)?;
                tracing::debug!(path = %path.display(), "config is valid");
                config_json(&config)?
            }
            ConfigCommand::Default => config_json(&BridgeConfig::default())?,
        },
        Command::Colorize { text } => {
            let output = colorize_line(text.as_str());
            json!({ "input": text, "output": output })
        }
    };
    emit_json(&value)?;
    Ok(0)
}

fn layout_json() -> Value {
    let records: Vec<Value> = RecordKind::ALL
        .iter()
        .map(|record| {
            let field = record.name_field();
            json!({
                "record": record.as_str(),
                "code": record.code(),
                "field": record.host_field(),
                "offset": field.offset,
                "capacity": field.capacity,
            })
        })
        .collect();
    let paths: Vec<Value> = PathKind::ALL
        .iter()
        .map(|kind| json!({ "kind": kind.as_str(), "code": kind.code() }))
        .collect();
    json!({ "records": records, "paths": paths })
}

fn config_json(config: &BridgeConfig) -> Result<Value, Error> {
    serde_json::to_value(config).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to serialize config")
            .with_source(err)
    })
}

fn emit_json(value: &Value) -> Result<(), Error> {
    let text = serde_json::to_string_pretty(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("json encode failed")
            .with_source(err)
    })?;
    println!("{text}");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim_start_matches("error: ").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {}", error_message(err));
        return;
    }
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Uninitialized => "host is not initialized".to_string(),
        ErrorKind::InvalidReference => "invalid record reference".to_string(),
        ErrorKind::Encoding => "text is not representable".to_string(),
        ErrorKind::WrongThread => "called off the host thread".to_string(),
        ErrorKind::LayoutMismatch => "record layout mismatch".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(record) = err.record() {
        inner.insert("record".to_string(), json!(record));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }
    json!({ "error": Value::Object(inner) })
}
