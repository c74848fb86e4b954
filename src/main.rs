//! promptpilot - queue-driven prompt submission over the DevTools protocol
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use promptpilot::automation::{run, CancelFlag, Progress};
use promptpilot::cli::{inspect_page, list_targets, render_event, render_result, show_config};
use promptpilot::Config;
use tracing_subscriber::EnvFilter;

/// promptpilot - submit a queue of prompts through a browser tab
#[derive(Parser, Debug)]
#[command(name = "promptpilot")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file (defaults to the user config directory)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// DevTools host
    #[arg(long, global = true)]
    host: Option<String>,

    /// DevTools port
    #[arg(long, short = 'p', global = true)]
    port: Option<u16>,

    /// Prompt queue file, one prompt per line
    #[arg(long, global = true)]
    prompts: Option<PathBuf>,

    /// Seconds to wait after each submission
    #[arg(long, global = true)]
    delay: Option<u64>,

    /// Rounds per prompt
    #[arg(long, global = true)]
    retries: Option<u32>,

    /// Seconds between rounds
    #[arg(long, global = true)]
    retry_delay: Option<u64>,

    /// Per-command timeout in seconds (0 waits indefinitely)
    #[arg(long, global = true)]
    command_timeout: Option<u64>,

    /// Enable debug output
    #[arg(long, short = 'd', global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit every prompt in the queue (default)
    Run,
    /// List the browser's debuggable targets
    Targets,
    /// Describe the text fields and buttons on the platform tab
    Inspect,
    /// Print the effective configuration
    Config {
        /// Save it to the default config location
        #[arg(long)]
        save: bool,
    },
}

fn build_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let _ = dotenvy::dotenv();
            Config::from_file(path)?
        }
        None => Config::load()?,
    };

    // Apply CLI overrides
    if let Some(ref host) = args.host {
        config.browser.host = host.clone();
    }
    if let Some(port) = args.port {
        config.browser.port = port;
    }
    if let Some(ref prompts) = args.prompts {
        config.queue.path = prompts.clone();
    }
    if let Some(delay) = args.delay {
        config.timing.settle_secs = delay;
    }
    if let Some(retries) = args.retries {
        config.timing.retry_attempts = retries;
    }
    if let Some(retry_delay) = args.retry_delay {
        config.timing.retry_delay_secs = retry_delay;
    }
    if let Some(timeout) = args.command_timeout {
        config.browser.command_timeout_secs = timeout;
    }
    if args.debug {
        config.logging.level = "debug".to_string();
    }

    Ok(config)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("promptpilot={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_queue(config: &Config) -> anyhow::Result<bool> {
    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nStopping after the current prompt...");
            on_signal.cancel();
        }
    });

    let progress = Progress::new(Box::new(|event| println!("{}", render_event(event))));
    let result = run(config, cancel, progress).await?;

    println!("{}", render_result(&result));
    Ok(result.is_success())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let config = build_config(&args)?;
    init_tracing(&config.logging.level);

    let passed = match args.command.unwrap_or(Command::Run) {
        Command::Run => run_queue(&config).await?,
        Command::Targets => {
            println!("{}", list_targets(&config).await?);
            true
        }
        Command::Inspect => {
            println!("{}", inspect_page(&config).await?);
            true
        }
        Command::Config { save } => {
            println!("{}", show_config(&config, save)?);
            true
        }
    };

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
