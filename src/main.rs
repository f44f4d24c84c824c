// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use slice_translator::app_config::{Config, LogLevel};
use slice_translator::app_controller::Controller;
use slice_translator::translation::CancellationToken;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate documents (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for slice-translator
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Write a configuration file with the default settings
    InitConfig {
        /// Where to write the file
        #[arg(default_value = "settings.json")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct TranslateArgs {
    /// Text files to translate
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    options: SharedOptions,
}

#[derive(clap::Args, Debug, Clone)]
struct SharedOptions {
    /// Configuration file path
    #[arg(short, long, default_value = "settings.json", env = "SLICE_TRANSLATOR_CONFIG")]
    config: PathBuf,

    /// Language to translate into
    #[arg(short, long)]
    target_language: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Generate endpoint URL
    #[arg(long)]
    url: Option<String>,

    /// Token budget per slice
    #[arg(long)]
    tokens_per_slice: Option<usize>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force: bool,

    /// Do not probe the endpoint before translating
    #[arg(long)]
    skip_connection_test: bool,
}

/// slice-translator - translate long documents with a local LLM
///
/// Splits each document into token-budgeted slices of whole sentences,
/// translates them through Ollama and writes `<name>-translated.<ext>`
/// next to the input.
#[derive(Parser, Debug)]
#[command(name = "slice-translator")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(about = "Translate long documents slice by slice with a local LLM")]
#[command(long_about = "slice-translator splits documents into sentence-aligned slices and translates them with Ollama.

EXAMPLES:
    slice-translator paper.md                         # Translate using settings.json
    slice-translator -f paper.md                      # Force overwrite existing output
    slice-translator -t German -m qwen2.5:7b a.txt    # Override language and model
    slice-translator --tokens-per-slice 512 book.txt  # Smaller slices
    slice-translator init-config                      # Write default settings.json
    slice-translator completions bash > st.bash       # Generate bash completions

CONFIGURATION:
    Settings are read from settings.json by default. A missing or unreadable
    file falls back to the built-in defaults.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Text files to translate
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    options: SharedOptions,
}

struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // The logger accepts everything; `log::set_max_level` does the filtering
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "slice-translator", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::InitConfig { path, force }) => {
            init_config(&path, force)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => {
            // Default behavior - top-level args are a translate invocation
            if cli.inputs.is_empty() {
                return Err(anyhow!("INPUT is required when no subcommand is specified"));
            }
            run_translate(TranslateArgs {
                inputs: cli.inputs,
                options: cli.options,
            })
            .await
        }
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow!("{} already exists (use -f to overwrite)", path.display()));
    }
    Config::default().save(path)?;
    info!("Default configuration written to {}", path.display());
    Ok(())
}

/// Load the configuration file and apply command line overrides
fn build_config(options: &SharedOptions) -> Config {
    let mut config = Config::load_or_default(&options.config);

    if let Some(target_language) = &options.target_language {
        config.translation.target_language = target_language.clone();
    }
    if let Some(model) = &options.model {
        config.inference.model_name = model.clone();
    }
    if let Some(url) = &options.url {
        config.inference.url = url.clone();
    }
    if let Some(tokens) = options.tokens_per_slice {
        config.translation.target_tokens_per_slice = tokens;
    }
    if let Some(log_level) = options.log_level {
        config.general.log_level = log_level.into();
    }
    if options.skip_connection_test {
        config.general.skip_connection_test = true;
    }

    config
}

async fn run_translate(args: TranslateArgs) -> Result<ExitCode> {
    // Apply the command line level before the config file is read
    if let Some(level) = args.options.log_level {
        log::set_max_level(LogLevel::from(level).to_level_filter());
    }

    let config = build_config(&args.options);
    log::set_max_level(config.general.log_level.to_level_filter());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight requests");
            on_interrupt.cancel();
        }
    });

    let controller = Controller::with_config(config)
        .context("Invalid configuration")?
        .with_progress(true)
        .with_cancellation(cancel);

    let summary = controller.run(&args.inputs, args.options.force).await;

    Ok(if summary.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
