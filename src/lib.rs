//! Loupe - iterative web research with slot-based sufficiency.
//!
//! Given a natural-language question, Loupe plans a handful of web
//! search queries, gathers and deduplicates evidence across a bounded
//! number of rounds, judges sufficiency by decomposing the question
//! into required information slots, and synthesizes a short answer
//! whose citations are validated against the evidence actually
//! gathered.
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`config`]: Configuration management and environment loading
//! - [`llm`]: Chat client abstraction and provider implementations
//! - [`search`]: Search collaborator and evidence accumulation
//! - [`decode`]: Structured response decoding for model output
//! - [`research`]: Planner, reflector, synthesizer, and the loop
//!   controller
//!
//! # Example
//!
//! ```rust,ignore
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let result = loupe::process("Compare Kubernetes HPA and KEDA").await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! No failure inside the pipeline is fatal: every component degrades to
//! a defined default, so `process` yields a well-formed result even in
//! total provider outage. The only caller-visible failure mode is an
//! error-indicating answer string with an empty citation list.

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod decode;
pub mod error;
pub mod llm;
pub mod research;
pub mod search;

use std::sync::Arc;

use config::AppConfig;
use llm::providers::OpenAiCompatClient;
use research::{FinalResult, ResearchLoop};
use search::TavilyClient;

pub use error::{ResearchError, ResearchResult};

/// Answer a question using configuration from the environment.
pub async fn process(question: &str) -> anyhow::Result<FinalResult> {
    let config = AppConfig::load()?;
    process_with_config(question, &config).await
}

/// Answer a question using an explicit configuration.
pub async fn process_with_config(
    question: &str,
    config: &AppConfig,
) -> anyhow::Result<FinalResult> {
    let chat = Arc::new(OpenAiCompatClient::new(config.llm.clone())?);
    let search = Arc::new(TavilyClient::new(config.search.clone())?);

    let research = ResearchLoop::new(chat, search, &config.llm);
    Ok(research.process(question).await)
}
