mod commands;
mod output;
mod read;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tablecheck")]
#[command(version, about = "Tabular data package validator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the data of a package against its descriptor
    Validate {
        /// Path to the package descriptor (JSON, YAML or TOML)
        descriptor: String,

        /// Only normalize the descriptor, without reading any data
        #[arg(long)]
        schema_only: bool,

        /// Validate only the first N rows of every table
        #[arg(long)]
        sample_size: Option<usize>,

        /// Report only the first unparseable value of each field
        #[arg(long)]
        first_invalid_only: bool,

        /// Run all checks on a single thread
        #[arg(long)]
        sequential: bool,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check a descriptor and print the effective check plan
    Check {
        /// Path to the package descriptor (JSON, YAML or TOML)
        descriptor: String,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // Logs go to stderr so JSON output on stdout stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Commands::Validate {
            descriptor,
            schema_only,
            sample_size,
            first_invalid_only,
            sequential,
            format,
        } => {
            let options = commands::validate::Options {
                schema_only,
                sample_size,
                first_invalid_only,
                parallel: !sequential,
            };
            commands::validate::execute(&descriptor, options, &format).await
        }

        Commands::Check { descriptor, format } => {
            commands::check::execute(&descriptor, &format).await
        }
    }
}
