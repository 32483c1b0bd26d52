//! envcompose CLI
//!
//! Reads a single JSON `FunctionRequest` from stdin, runs the engine, and
//! writes a single JSON `FunctionResponse` to stdout. Diagnostics go to
//! stderr so the response stream stays clean.

use std::io::{self, Read, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use envcompose::{run, FunctionRequest, FunctionResponse};

#[derive(Parser)]
#[command(name = "envcompose")]
#[command(about = "Environment selection-and-merge engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one invocation: JSON request on stdin, JSON response on stdout
    Run {
        /// Pretty-print the JSON response
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { pretty } => {
            let mut stdin = io::stdin().lock();
            let mut stdout = io::stdout().lock();
            match run_with_io(&mut stdin, &mut stdout, pretty) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("envcompose: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// Read one request, run the engine, write one response. Split from main
/// for testability with in-memory I/O.
fn run_with_io<R: Read, W: Write>(reader: &mut R, writer: &mut W, pretty: bool) -> io::Result<()> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;

    let response = match serde_json::from_str::<FunctionRequest>(&raw) {
        Ok(request) => run(&request),
        Err(e) => {
            // A response is still owed; report the parse failure on it.
            let mut response = FunctionResponse::to(&FunctionRequest::default());
            response.fatal(format!("cannot parse request: {e}"));
            response
        }
    };

    let body = if pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(body.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}
