// The refute CLI.
// Checks every assertion of a proof unit and writes one JSON report line per assertion.

use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use refute::config::ProverConfig;
use refute::driver::{write_reports, Driver, ProofUnit, Verdict};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(
    name = "refute",
    about = "A refutation prover for assertions over integers, arrays and records",
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check every assertion in a proof unit
    Check {
        /// The proof unit, as JSON
        #[clap(value_name = "UNIT")]
        unit: PathBuf,

        /// Read prover budgets from a JSON file
        #[clap(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Write the JSONL report here instead of stdout
        #[clap(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Override the step budget for each assertion
        #[clap(long, value_name = "N")]
        max_steps: Option<usize>,
    },
}

fn main() {
    // Use RUST_LOG to control log levels, e.g.:
    //   RUST_LOG=refute::prover=trace refute check unit.json
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Check {
            unit,
            config,
            report,
            max_steps,
        } => {
            let mut config = match config {
                Some(path) => ProverConfig::load(&path).unwrap_or_else(|e| {
                    println!("Error loading config: {}", e);
                    std::process::exit(1);
                }),
                None => ProverConfig::default(),
            };
            if let Some(max_steps) = max_steps {
                config.max_steps = max_steps;
            }

            let unit = ProofUnit::load(&unit).unwrap_or_else(|e| {
                println!("Error loading unit: {}", e);
                std::process::exit(1);
            });
            let driver = Driver::new(unit.declarations.clone(), config);
            let reports = match driver.check_all(&unit) {
                Ok(reports) => reports,
                Err(e) => {
                    println!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            let written = match &report {
                Some(path) => File::create(path)
                    .map_err(Into::into)
                    .and_then(|f| write_reports(&reports, BufWriter::new(f))),
                None => write_reports(&reports, std::io::stdout().lock()),
            };
            if let Err(e) = written {
                println!("Error writing report: {}", e);
                std::process::exit(1);
            }

            let mut failures = 0;
            for r in &reports {
                if !r.verdict.is_proved() {
                    failures += 1;
                }
                if report.is_some() {
                    let label = match &r.verdict {
                        Verdict::Proved => "proved".to_string(),
                        Verdict::Counterexample { .. } => "counterexample".to_string(),
                        Verdict::Inconclusive { reason } => format!("inconclusive ({})", reason),
                        Verdict::ResolutionError { message } => format!("error ({})", message),
                    };
                    println!("{}: {}", r.assertion, label);
                }
            }
            if failures > 0 {
                eprintln!("{} of {} assertions not proved", failures, reports.len());
                std::process::exit(1);
            }
        }
    }
}
