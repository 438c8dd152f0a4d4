//! Loupe - Main Entry Point
//!
//! Thin CLI over the research pipeline: parse the question, run the
//! loop, print the final result as JSON on stdout. All diagnostics go
//! to stderr so the output stays machine-readable.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use loupe::config::AppConfig;
use loupe::research::FinalResult;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "loupe")]
#[command(about = "Loupe - answer questions with iterative web research and cited answers")]
#[command(version)]
struct Args {
    /// The question to research.
    question: String,

    /// Enable verbose round-by-round diagnostics on stderr.
    #[arg(long, env = "LOUPE_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_tracing(args.debug);

    match run(&args).await {
        Ok(result) => {
            print_result(&result);
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            print_result(&FinalResult {
                answer: "An error occurred while processing your question.".to_string(),
                citations: Vec::new(),
            });
            std::process::exit(1);
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<FinalResult> {
    tracing::info!("Starting Loupe v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    tracing::debug!("Configuration loaded");

    loupe::process_with_config(&args.question, &config).await
}

fn print_result(result: &FinalResult) {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            // Serializing two plain strings cannot realistically fail;
            // keep the output contract anyway.
            tracing::error!(error = %e, "Failed to serialize result");
            println!("{{\"answer\": \"An error occurred while processing your question.\", \"citations\": []}}");
        }
    }
}

/// Initialize tracing/logging on stderr.
fn init_tracing(debug: bool) {
    let default_level = if debug { "loupe=debug" } else { "loupe=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
