//! `yaf`: línea de comandos sobre la capa de datos.
//!
//! - `yaf ops [--json]`: tabla de operaciones Postgres (no requiere base).
//! - `yaf exec <OP> [ARGS]...`: ejecuta una operación; cada argumento es
//!   `nombre=valor` o `valor` posicional.
//! - `yaf setting get|set`: registro global / por board.
//! - `yaf migrate`: aplica migraciones pendientes.
//!
//! Códigos de salida: 0 ok, 4 rechazado / no soportado, 5 error.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::debug;
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use yaf_core::{ArgumentBag, DispatchOutcome, NameMatching, OpValue};
use yaf_persistence::functions::pg_functions;
use yaf_persistence::migrations::run_pending_migrations;
use yaf_persistence::pg::connect_pool;
use yaf_persistence::{BoardSettingsStore, DbConfig, DbFunctionType, DbFunctions};

#[derive(Parser, Debug)]
#[command(name = "yaf")]
#[command(about = "Data-layer operations for the forum database", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered operations and their signatures
    Ops {
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute an operation by name
    Exec {
        /// Operation name (case-insensitive)
        operation: String,
        /// `name=value` or positional `value`; values parse as JSON, else text
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,
        /// Expected result shape
        #[arg(long, default_value = "scalar")]
        kind: DbFunctionType,
        /// Run without an explicit transaction
        #[arg(long)]
        no_transaction: bool,
    },

    /// Read or write registry settings
    Setting {
        #[command(subcommand)]
        action: SettingAction,
    },

    /// Apply pending migrations
    Migrate,
}

#[derive(Subcommand, Debug)]
enum SettingAction {
    /// Read a value (board override first when --board is given)
    Get {
        key: String,
        #[arg(long)]
        board: Option<i32>,
    },
    /// Write a value (global unless --board is given)
    Set {
        key: String,
        value: String,
        #[arg(long)]
        board: Option<i32>,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Done,
    Rejected(String),
}

fn main() -> ExitCode {
    // Cargar .env si existe para obtener DATABASE_URL
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env())
                                     .with_writer(std::io::stderr)
                                     .try_init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::Rejected(msg)) => {
            eprintln!("rechazado: {msg}");
            ExitCode::from(4)
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(5)
        }
    }
}

fn run(command: Commands) -> anyhow::Result<Outcome> {
    match command {
        Commands::Ops { json } => {
            println!("{}", render_ops(json)?);
            Ok(Outcome::Done)
        }
        Commands::Exec { operation,
                         args,
                         kind,
                         no_transaction, } => {
            let bag = parse_arguments(&args);
            debug!("exec '{operation}' kind={kind} args={}", bag.len());
            let functions = connect()?;
            match functions.run(kind, &operation, &bag, !no_transaction)? {
                DispatchOutcome::Handled(value) => {
                    println!("{}", render_value(&value));
                    Ok(Outcome::Done)
                }
                DispatchOutcome::NotSupported => Ok(Outcome::Rejected(format!("operación '{operation}' no soportada"))),
            }
        }
        Commands::Setting { action } => {
            let functions = connect()?;
            let store = BoardSettingsStore::new(&functions);
            match action {
                SettingAction::Get { key, board } => {
                    let raw = match board {
                        Some(board) => store.load(board)?.raw(&key).map(str::to_string),
                        None => store.load_dictionary(None)?.raw(&key).map(str::to_string),
                    };
                    match raw {
                        Some(value) => {
                            println!("{value}");
                            Ok(Outcome::Done)
                        }
                        None => Ok(Outcome::Rejected(format!("clave '{key}' sin valor"))),
                    }
                }
                SettingAction::Set { key, value, board } => {
                    store.save(&key, Some(&value), board)?;
                    let level = if board.is_some() { "board" } else { "global" };
                    println!("{key} = {value} ({level})");
                    Ok(Outcome::Done)
                }
            }
        }
        Commands::Migrate => {
            let cfg = DbConfig::from_env()?;
            let pool = connect_pool(&cfg.url, 1, 1)?;
            let mut conn = pool.get().context("pool get for migrations")?;
            let applied = run_pending_migrations(&mut conn)?;
            println!("migraciones aplicadas: {applied}");
            Ok(Outcome::Done)
        }
    }
}

fn connect() -> anyhow::Result<DbFunctions> {
    let cfg = DbConfig::from_env()?;
    DbFunctions::from_config(&cfg).context("building database functions")
}

fn render_ops(json: bool) -> anyhow::Result<String> {
    let dispatcher = pg_functions::dispatcher(NameMatching::default())?;
    let descriptors = dispatcher.registry().descriptors();
    if json {
        return Ok(serde_json::to_string_pretty(&descriptors)?);
    }
    Ok(descriptors.iter()
                  .map(|d| d.signature())
                  .collect::<Vec<_>>()
                  .join("\n"))
}

fn render_value(value: &OpValue) -> String {
    match value {
        OpValue::Text(s) => s.clone(),
        other => other.to_json().to_string(),
    }
}

fn parse_value(raw: &str) -> OpValue {
    match serde_json::from_str::<Value>(raw) {
        Ok(v) => OpValue::from_json(v),
        Err(_) => OpValue::Text(raw.to_string()),
    }
}

fn is_parameter_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `nombre=valor` → argumento nombrado; cualquier otra cosa → posicional.
fn parse_argument(raw: &str) -> (Option<String>, OpValue) {
    match raw.split_once('=') {
        Some((name, value)) if is_parameter_name(name) => (Some(name.to_string()), parse_value(value)),
        _ => (None, parse_value(raw)),
    }
}

fn parse_arguments(raw: &[String]) -> ArgumentBag {
    raw.iter().map(|a| parse_argument(a)).collect()
}
