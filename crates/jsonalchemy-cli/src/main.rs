mod config;
mod logging;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;

use config::{ConfigError, load_config};
use jsonalchemy_core::{SchemaError, SchemaNode};
use jsonalchemy_generate::{
    GenerationError, GenerationReport, GenerationSession, IssueLevel, Seed,
};
use logging::init_logging;

#[derive(Debug, Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to read schema {path}: {source}")]
    ReadSchema {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("schema {path} is not valid JSON: {source}")]
    ParseSchema {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Generation(err) => match err.schema_error() {
                Some(SchemaError::UnresolvedReference { .. } | SchemaError::UnsupportedReference(_)) => 2,
                Some(SchemaError::Unsatisfiable { .. }) => 3,
                Some(SchemaError::BudgetExceeded { .. }) => 4,
                _ => 1,
            },
            _ => 1,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "jsonalchemy", version, about = "Generate example data from JSON Schema")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate instances of a schema.
    Generate(GenerateArgs),
    /// Print the JSON Schema of the config file.
    ConfigSchema,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Schema document path, or `-` to read standard input.
    #[arg(value_name = "SCHEMA_PATH")]
    schema: String,
    /// Seed; numeric text is used as-is, other text is hashed.
    #[arg(long)]
    seed: Option<Seed>,
    /// Number of instances. More than one is written as a JSON array.
    #[arg(long)]
    count: Option<usize>,
    /// Override `generate.max_depth`.
    #[arg(long)]
    max_depth: Option<usize>,
    /// Override `generate.locale`.
    #[arg(long)]
    locale: Option<String>,
    /// Config file (defaults to ./jsonalchemy.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Pretty-print output.
    #[arg(long, default_value_t = false)]
    pretty: bool,
    /// Log filter, e.g. `info` or `jsonalchemy=debug`. Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::ConfigSchema => print_config_schema(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(event = "run_failed", kind = error_kind(&err), error = %err);
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    init_logging(args.log_level.as_deref(), args.log_json).map_err(CliError::Logging)?;

    let started = Instant::now();
    let loaded = load_config(args.config.as_deref(), Path::new("."))?;
    let mut config = loaded.config;
    if let Some(count) = args.count {
        config.output.count = count;
    }
    if let Some(max_depth) = args.max_depth {
        config.generate.max_depth = max_depth;
    }
    if let Some(locale) = args.locale {
        config.generate.locale = locale;
    }
    config.output.pretty |= args.pretty;
    if config.output.count == 0 {
        return Err(CliError::InvalidArgs("--count must be at least 1".to_string()));
    }

    tracing::info!(
        event = "run_started",
        started_at = %Utc::now().to_rfc3339(),
        schema = %args.schema,
        config = ?loaded.source,
        count = config.output.count,
        seeded = args.seed.is_some()
    );

    let document = read_schema(&args.schema)?;
    tracing::info!(event = "schema_loaded", schema = %args.schema);

    let session = GenerationSession::new(config.generate)?;
    let root = SchemaNode::root(document);
    let (output, report) = if config.output.count == 1 {
        let outcome = session.generate(&root, args.seed)?;
        (outcome.value, outcome.report)
    } else {
        let (values, report) = session.generate_many(&root, args.seed, config.output.count)?;
        (Value::Array(values), report)
    };

    log_report(&report);
    write_output(&output, config.output.pretty)?;

    tracing::info!(
        event = "run_finished",
        seed = report.seed,
        nodes = report.nodes_generated,
        max_depth_reached = report.max_depth_reached,
        issues = report.issues.len(),
        duration_ms = started.elapsed().as_millis() as u64
    );
    Ok(())
}

fn read_schema(source: &str) -> Result<Value, CliError> {
    let read_error = |err| CliError::ReadSchema {
        path: source.to_string(),
        source: err,
    };
    let contents = if source == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).map_err(read_error)?;
        buffer
    } else {
        std::fs::read_to_string(source).map_err(read_error)?
    };
    serde_json::from_str(&contents).map_err(|err| CliError::ParseSchema {
        path: source.to_string(),
        source: err,
    })
}

fn log_report(report: &GenerationReport) {
    for issue in &report.issues {
        let count = report.count(issue.code);
        match issue.level {
            IssueLevel::Info => tracing::info!(
                event = "generation_issue",
                code = issue.code.as_str(),
                path = %issue.path,
                occurrences = count,
                message = %issue.message
            ),
            IssueLevel::Warning => tracing::warn!(
                event = "generation_issue",
                code = issue.code.as_str(),
                path = %issue.path,
                occurrences = count,
                message = %issue.message
            ),
        }
    }
}

fn write_output(value: &Value, pretty: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn print_config_schema() -> Result<(), CliError> {
    let schema = config::config_json_schema();
    write_output(&serde_json::to_value(schema)?, true)
}

fn error_kind(err: &CliError) -> &'static str {
    match err {
        CliError::Generation(GenerationError::Schema(err)) => err.kind(),
        CliError::Generation(GenerationError::InvalidOptions(_)) => "invalid_options",
        CliError::Config(_) => "config",
        CliError::ReadSchema { .. } | CliError::ParseSchema { .. } => "schema_input",
        CliError::Output(_) | CliError::Encode(_) => "output",
        CliError::Logging(_) => "logging",
        CliError::InvalidArgs(_) => "invalid_args",
    }
}
