use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use reportflow_core::{analyze_topic, OpenAiProvider};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reportflow-cli", version, about = "ReportFlow research crew")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the research crew on a topic and print the report.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Topic to research.
    #[arg(long)]
    topic: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            info!(topic = %args.topic, "starting analysis");
            let provider = Arc::new(OpenAiProvider::from_env()?);
            let report = analyze_topic(provider, &args.topic).await;
            println!("{report}");
        }
    }

    Ok(())
}
