use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod ask;
pub mod calendar;
pub mod chat;

use crate::core::AppConfig;

#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat session
    Chat {},
    /// Ask a single question and print the answer
    Ask {
        #[arg(long)]
        question: String,

        /// Device error code to look up alongside the question, e.g. E05
        #[arg(long)]
        error_code: Option<String>,

        /// Current device state as a JSON object
        #[arg(long)]
        device_state: Option<String>,
    },
    /// Print a month of the calendar with upcoming events
    Calendar {
        #[arg(long)]
        year: Option<i32>,

        /// 1-based month
        #[arg(long)]
        month: Option<u32>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Base URL of the RAG service
    #[arg(long, global = true)]
    rag_url: Option<String>,

    /// Base URL of the calendar events service
    #[arg(long, global = true)]
    calendar_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

fn init_logging() {
    // Logs go to stderr so they don't interleave with the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    init_logging();

    let config = AppConfig::default().with_overrides(args.rag_url, args.calendar_url);
    tracing::debug!("Using config {:?}", config);

    // Handle each sub command
    match args.command {
        Some(Command::Chat {}) => {
            chat::run(&config).await?;
        }
        Some(Command::Ask {
            question,
            error_code,
            device_state,
        }) => {
            ask::run(&config, question, error_code, device_state).await?;
        }
        Some(Command::Calendar { year, month }) => {
            calendar::run(&config, year, month).await?;
        }
        None => {}
    }

    Ok(())
}
