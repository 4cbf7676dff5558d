use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docscribe::cli::commands::{self, run::RunOptions};
use docscribe::config::{Config, ConfigLoader};

#[derive(Parser)]
#[command(name = "docscribe")]
#[command(
    version,
    about = "Transcribe scanned documents into structured JSON with a vision model"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read configuration from this file instead of the global/project files
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe every image in a directory
    Run {
        #[arg(help = "Directory of scanned images (default: batch.input_dir)")]
        input_dir: Option<PathBuf>,
        #[arg(long, short, help = "Directory for JSON transcripts")]
        output: Option<PathBuf>,
        #[arg(long, short = 'n', help = "Process at most N files")]
        limit: Option<usize>,
        #[arg(long, short, help = "Worker pool size")]
        workers: Option<usize>,
        #[arg(long, short, help = "Skip images whose transcript already exists")]
        resume: bool,
        #[arg(long, short, help = "Vision model to use")]
        model: Option<String>,
    },

    /// Show how many images are transcribed and pending
    Status {
        #[arg(long, short, help = "Directory of scanned images")]
        input: Option<PathBuf>,
        #[arg(long, short, help = "Directory for JSON transcripts")]
        output: Option<PathBuf>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mdocscribe encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    Ok(config)
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run {
            input_dir,
            output,
            limit,
            workers,
            resume,
            model,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let options = RunOptions {
                input_dir,
                output_dir: output,
                limit,
                workers,
                resume,
                model,
            };

            let rt = Runtime::new()?;
            let report = rt.block_on(commands::run::run(config, options))?;
            if report.failed() > 0 {
                bail!("{} of {} jobs failed", report.failed(), report.total());
            }
        }
        Commands::Status {
            input,
            output,
            format,
        } => {
            let config = load_config(cli.config.as_ref())?;
            commands::status::run(config, input, output, &format)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                let config = load_config(cli.config.as_ref())?;
                commands::config::show(&config, &format)?;
            }
            ConfigAction::Path => {
                commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
