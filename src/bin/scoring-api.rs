//! Scoring API CLI
//!
//! Runs the HTTP server and offers offline helpers for schemas and tokens.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use scoring_api::{
    arguments_schema, serve, to_json_schema, MemoryStore, Principal, Schema, ServerConfig,
    METHODS, METHOD_REQUEST,
};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scoring-api")]
#[command(about = "Scoring API server and request schema tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the API over HTTP
    Serve {
        /// Address to bind
        #[arg(long, env = "SCORING_API_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, short, env = "SCORING_API_PORT", default_value_t = 8080)]
        port: u16,

        /// Log file (stderr if not specified)
        #[arg(long, short, env = "SCORING_API_LOG")]
        log: Option<PathBuf>,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },

    /// Print the JSON Schema for a method's arguments (or "method" for the envelope)
    Schema {
        /// Method name: online_score, clients_interests, or method
        name: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a method's arguments payload
    Validate {
        /// Arguments payload file (JSON object)
        payload: PathBuf,

        /// Method the arguments are for
        #[arg(long, short)]
        method: String,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Print a valid token for a login
    Token {
        /// Caller login ("admin" yields the hourly admin token)
        #[arg(long)]
        login: String,

        /// Caller account
        #[arg(long, default_value = "")]
        account: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            host,
            port,
            log,
            timeout_secs,
        } => run_serve(ServerConfig {
            host,
            port,
            log,
            request_timeout: Duration::from_secs(timeout_secs),
        }),

        Commands::Schema { name, pretty } => run_schema(&name, pretty),

        Commands::Validate {
            payload,
            method,
            json,
        } => run_validate(&payload, &method, json),

        Commands::Token { login, account } => {
            println!("{}", Principal::new(&account, &login).expected_token(Utc::now()));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .context("failed to open log file")?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn run_serve(config: ServerConfig) -> Result<(), u8> {
    init_tracing(config.log.as_deref()).map_err(|e| {
        eprintln!("Error: {:#}", e);
        3u8
    })?;

    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        eprintln!("Error starting runtime: {}", e);
        3u8
    })?;

    let shutdown = async {
        // Ctrl-C handler failing to install just means no graceful stop.
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    };

    runtime
        .block_on(serve(config, Arc::new(MemoryStore::new()), shutdown))
        .map_err(|e| {
            eprintln!("Error: {:#}", e);
            1u8
        })
}

/// Schema selected by name: a method's arguments, or the envelope.
fn lookup_schema(name: &str) -> Option<&'static Schema> {
    if name == "method" {
        Some(&METHOD_REQUEST)
    } else {
        arguments_schema(name)
    }
}

fn run_schema(name: &str, pretty: bool) -> Result<(), u8> {
    let schema = lookup_schema(name).ok_or_else(|| {
        eprintln!("Error: unknown schema \"{}\"", name);
        2u8
    })?;
    let doc = to_json_schema(schema);

    let output = if pretty {
        serde_json::to_string_pretty(&doc)
    } else {
        serde_json::to_string(&doc)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    println!("{}", output);
    Ok(())
}

fn run_validate(payload_path: &Path, method: &str, json_output: bool) -> Result<(), u8> {
    let schema = arguments_schema(method).ok_or_else(|| {
        report_error(
            json_output,
            &format!(
                "unknown method \"{}\" (expected one of: {})",
                method,
                METHODS.join(", ")
            ),
        );
        2u8
    })?;

    let text = std::fs::read_to_string(payload_path).map_err(|e| {
        report_error(
            json_output,
            &format!("cannot read {}: {}", payload_path.display(), e),
        );
        3u8
    })?;

    let payload = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            report_error(json_output, "payload must be a JSON object");
            return Err(2);
        }
        Err(e) => {
            report_error(json_output, &format!("invalid JSON: {}", e));
            return Err(2);
        }
    };

    match schema.bind(&payload, Utc::now().date_naive()) {
        Ok(bound) => {
            if json_output {
                let output = serde_json::json!({ "valid": true, "has": bound.has });
                println!("{}", output);
            } else {
                println!("Valid");
                let has: Vec<&str> = bound.has.into_iter().collect();
                println!("  supplied: {}", has.join(", "));
            }
            Ok(())
        }
        Err(e) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "error": e.to_string(),
                    "field": e.field(),
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                eprintln!("  {}", e);
            }
            Err(1)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}
