use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use ormgen::config::Config;
use ormgen::emit::{SqlAlchemyRenderer, WhitespaceFormatter};
use ormgen::pipeline::{Pipeline, PipelineRun, RunMode};
use tracing_subscriber::EnvFilter;

/// Validate a table schema document and generate ORM model sources
#[derive(Parser, Debug)]
#[command(name = "ormgen")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Schema document (JSON)
    input: PathBuf,

    /// Path to configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// How far to run the pipeline
    #[arg(long, short = 'm', value_enum, default_value_t = Mode::Generate)]
    mode: Mode,

    /// Print the whole run as one JSON document
    #[arg(long)]
    json: bool,

    /// Detailed plan and debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Check,
    Plan,
    Generate,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Check => RunMode::Check,
            Mode::Plan => RunMode::Plan,
            Mode::Generate => RunMode::Generate,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    let input = match fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", cli.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let run = Pipeline::new(&config, &SqlAlchemyRenderer)
        .with_formatter(&WhitespaceFormatter)
        .with_mode(cli.mode.into())
        .run_str(&input);

    let text = if cli.json {
        match serde_json::to_string_pretty(&run) {
            Ok(json) => json + "\n",
            Err(e) => {
                eprintln!("Failed to serialize run: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        render_text(&run, cli.verbose)
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = fs::write(path, &text) {
                eprintln!("Failed to write {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
        None => print!("{text}"),
    }

    if run.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn render_text(run: &PipelineRun, verbose: bool) -> String {
    let mut out = String::new();
    for report in run.reports() {
        let _ = writeln!(out, "{report}\n");
    }
    if let Some(error) = &run.internal_error {
        let _ = writeln!(out, "Internal error: {error}\n");
    }
    if let Some(plan) = &run.plan {
        let text = if verbose { plan.detailed() } else { plan.summary() };
        let _ = writeln!(out, "{text}\n");
    }
    if let Some(output) = &run.output {
        let _ = writeln!(out, "{}", output.summary);
        for path in output.files.keys() {
            let _ = writeln!(out, "  + {path}");
        }
        for (path, error) in &output.failures {
            let _ = writeln!(out, "  ! {path}: {error}");
        }
        for warning in &output.warnings {
            let _ = writeln!(out, "  warning: {warning}");
        }
        if verbose {
            for (path, source) in &output.files {
                let _ = writeln!(out, "\n# --- {path} ---\n{source}");
            }
        }
    }
    out
}
