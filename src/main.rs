//! Anaplan Sequence CLI
//!
//! Entry point for the `anaplan-seq` command-line tool.

use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use anaplan_sequence::config::{
    credentials_from_env, ConfigError, EffectiveConfig, DEFAULT_CONFIG_FILE, DEFAULT_EMAIL_VAR, DEFAULT_PASSWORD_VAR,
};
use anaplan_sequence::pipeline::default_remote_name;
use anaplan_sequence::summary::{BatchSummary, ExitCode, NamedResult};
use anaplan_sequence::{EngineError, SequenceEngine, SequenceRequest};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "anaplan-seq")]
#[command(about = "Wake-up, chunked upload and process run for Anaplan models", version)]
struct Cli {
    /// Path to config file (default: ./anaplan.toml when present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "anaplan_sequence=trace" (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Environment variable holding the account email
    #[arg(long, global = true, default_value = DEFAULT_EMAIL_VAR)]
    email_var: String,

    /// Environment variable holding the account password
    #[arg(long, global = true, default_value = DEFAULT_PASSWORD_VAR)]
    password_var: String,

    /// Seconds between task status requests
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    /// Status requests before a task counts as timed out
    #[arg(long, global = true)]
    max_poll_attempts: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sequence from flags or from a configured [[sequence]]
    Run(RunArgs),

    /// Run every configured sequence one after another
    RunAll {
        /// Keep going after a failed sequence
        #[arg(long)]
        continue_on_failure: bool,

        /// Output a human-readable summary instead of JSON
        #[arg(long)]
        human: bool,
    },

    /// List workspaces visible to the credentials
    Workspaces {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List files of a model
    Files {
        #[command(flatten)]
        target: ModelArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List processes of a model
    Processes {
        #[command(flatten)]
        target: ModelArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration with provenance
    Config,
}

#[derive(Args)]
struct ModelArgs {
    #[arg(long, short = 'w')]
    workspace: String,

    #[arg(long, short = 'm')]
    model: String,
}

#[derive(Args)]
struct RunArgs {
    /// Name of a configured [[sequence]]
    #[arg(long, short = 's', conflicts_with_all = ["workspace", "model", "wake_up", "file", "main"])]
    sequence: Option<String>,

    #[arg(long, short = 'w')]
    workspace: Option<String>,

    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Name of the wake-up process
    #[arg(long)]
    wake_up: Option<String>,

    /// Local file to upload
    #[arg(long, short = 'f')]
    file: Option<PathBuf>,

    /// Remote file name (default: the local file name)
    #[arg(long)]
    remote_name: Option<String>,

    /// Name of the main process
    #[arg(long)]
    main: Option<String>,

    /// Chunk size in bytes
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Locale sent with process runs
    #[arg(long)]
    locale: Option<String>,

    /// Output a human-readable summary instead of JSON
    #[arg(long)]
    human: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref(), cli.log_format);

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(ExitCode::Config.as_i32());
        }
    };

    let code = match &cli.command {
        Commands::Run(args) => run_sequence(&cli, &config, args),
        Commands::RunAll {
            continue_on_failure,
            human,
        } => run_all(&cli, &config, *continue_on_failure, *human),
        Commands::Workspaces { json } => run_workspaces(&cli, &config, *json),
        Commands::Files { target, json } => run_files(&cli, &config, target, *json),
        Commands::Processes { target, json } => run_processes(&cli, &config, target, *json),
        Commands::Config => print_or_fail(config.to_json()),
    };

    process::exit(code.as_i32());
}

fn init_logging(level: Option<&str>, format: LogFormat) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(cli: &Cli) -> Result<EffectiveConfig, ConfigError> {
    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    let path = match &cli.config {
        Some(path) => Some(path.as_path()),
        None if default_path.exists() => Some(default_path),
        None => None,
    };

    let mut overrides = Map::new();
    if let Some(interval) = cli.poll_interval {
        overrides.insert("poll_interval_seconds".to_string(), json!(interval));
    }
    if let Some(attempts) = cli.max_poll_attempts {
        overrides.insert("max_poll_attempts".to_string(), json!(attempts));
    }
    let overrides = (!overrides.is_empty()).then_some(Value::Object(overrides));

    EffectiveConfig::build(path, overrides)
}

fn build_engine(cli: &Cli, config: &EffectiveConfig) -> Result<SequenceEngine, ConfigError> {
    let credentials = credentials_from_env(&cli.email_var, &cli.password_var)?;
    SequenceEngine::builder(config.settings.clone(), credentials).build()
}

fn request_from_args(config: &EffectiveConfig, args: &RunArgs) -> Result<SequenceRequest, ConfigError> {
    let mut request = match &args.sequence {
        Some(name) => {
            let spec = config
                .sequence(name)
                .ok_or_else(|| ConfigError::UnknownSequence(name.clone()))?;
            SequenceRequest::from_spec(spec)?
        }
        None => {
            let required = |value: &Option<String>, flag: &str| {
                value
                    .clone()
                    .ok_or_else(|| ConfigError::ValidationError(format!("--{} is required without --sequence", flag)))
            };
            let file = args
                .file
                .clone()
                .ok_or_else(|| ConfigError::ValidationError("--file is required without --sequence".to_string()))?;
            let remote = match &args.remote_name {
                Some(name) => name.clone(),
                None => default_remote_name(&file).ok_or_else(|| {
                    ConfigError::ValidationError(format!("cannot derive a remote name from {}", file.display()))
                })?,
            };
            SequenceRequest::new(
                required(&args.workspace, "workspace")?,
                required(&args.model, "model")?,
                required(&args.wake_up, "wake-up")?,
                file,
                remote,
                required(&args.main, "main")?,
            )
        }
    };

    if let Some(size) = args.chunk_size {
        request = request.with_chunk_size(size);
    }
    if let Some(locale) = &args.locale {
        request = request.with_locale(locale.clone());
    }
    Ok(request)
}

fn run_sequence(cli: &Cli, config: &EffectiveConfig, args: &RunArgs) -> ExitCode {
    let request = match request_from_args(config, args) {
        Ok(r) => r,
        Err(e) => return config_failure(e),
    };
    if let Err(e) = request.validate() {
        return engine_failure(e);
    }
    let engine = match build_engine(cli, config) {
        Ok(engine) => engine,
        Err(e) => return config_failure(e),
    };

    let result = engine.execute_sequence(&request);
    if args.human {
        println!("{}", result.human_summary());
    } else {
        let printed = print_or_fail(result.to_json());
        if !printed.is_success() {
            return printed;
        }
    }
    result.exit_code()
}

fn run_all(cli: &Cli, config: &EffectiveConfig, continue_on_failure: bool, human: bool) -> ExitCode {
    if config.sequences.is_empty() {
        eprintln!("No [[sequence]] entries configured.");
        return ExitCode::Config;
    }

    let start = Instant::now();
    let mut results = Vec::new();

    for spec in &config.sequences {
        let request = match SequenceRequest::from_spec(spec) {
            Ok(r) => r,
            Err(e) => return config_failure(e),
        };
        // Fresh engine per sequence so sessions never leak between them
        let engine = match build_engine(cli, config) {
            Ok(engine) => engine,
            Err(e) => return config_failure(e),
        };

        tracing::info!(sequence = %spec.name, "starting sequence");
        let result = engine.execute_sequence(&request);
        let failed = !result.success;
        results.push(NamedResult {
            name: spec.name.clone(),
            result,
        });

        if failed && !continue_on_failure {
            break;
        }
    }

    let skipped = config.sequences.len() - results.len();
    let summary = BatchSummary::from_results(results, skipped, start.elapsed().as_millis() as u64);

    if human {
        for named in &summary.sequences {
            println!("[{}]", named.name);
            println!("{}\n", named.result.human_summary());
        }
        println!("{}", summary.human_summary);
    } else {
        let printed = print_or_fail(summary.to_json());
        if !printed.is_success() {
            return printed;
        }
    }
    summary.exit_code()
}

fn run_workspaces(cli: &Cli, config: &EffectiveConfig, json_output: bool) -> ExitCode {
    let engine = match build_engine(cli, config) {
        Ok(engine) => engine,
        Err(e) => return config_failure(e),
    };

    match engine.list_workspaces() {
        Ok(workspaces) if json_output => print_or_fail(serde_json::to_string_pretty(&workspaces)),
        Ok(workspaces) => {
            if workspaces.is_empty() {
                println!("No workspaces visible.");
            }
            for ws in workspaces {
                println!("  {}  {}", ws.id, ws.name);
            }
            ExitCode::Success
        }
        Err(e) => engine_failure(e),
    }
}

fn run_files(cli: &Cli, config: &EffectiveConfig, target: &ModelArgs, json_output: bool) -> ExitCode {
    let engine = match build_engine(cli, config) {
        Ok(engine) => engine,
        Err(e) => return config_failure(e),
    };

    match engine.list_files(&target.workspace, &target.model) {
        Ok(files) if json_output => print_or_fail(serde_json::to_string_pretty(&files)),
        Ok(files) => {
            println!("Files in {}/{} ({} total):\n", target.workspace, target.model, files.len());
            for file in files {
                match file.chunk_count {
                    Some(chunks) => println!("  {}  {} ({} chunks)", file.id, file.name, chunks),
                    None => println!("  {}  {}", file.id, file.name),
                }
            }
            ExitCode::Success
        }
        Err(e) => engine_failure(e),
    }
}

fn run_processes(cli: &Cli, config: &EffectiveConfig, target: &ModelArgs, json_output: bool) -> ExitCode {
    let engine = match build_engine(cli, config) {
        Ok(engine) => engine,
        Err(e) => return config_failure(e),
    };

    match engine.list_processes(&target.workspace, &target.model) {
        Ok(processes) if json_output => print_or_fail(serde_json::to_string_pretty(&processes)),
        Ok(processes) => {
            println!("Processes in {}/{} ({} total):\n", target.workspace, target.model, processes.len());
            for p in processes {
                println!("  {}  {}", p.id, p.name);
            }
            ExitCode::Success
        }
        Err(e) => engine_failure(e),
    }
}

fn print_or_fail(output: serde_json::Result<String>) -> ExitCode {
    match output {
        Ok(json) => {
            println!("{}", json);
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            ExitCode::Config
        }
    }
}

fn config_failure(e: ConfigError) -> ExitCode {
    eprintln!("Configuration error: {}", e);
    ExitCode::Config
}

fn engine_failure(e: EngineError) -> ExitCode {
    eprintln!("Error: {}", e);
    e.exit_code()
}
