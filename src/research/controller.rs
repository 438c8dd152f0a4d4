//! Research loop orchestration.
//!
//! Runs at most [`MAX_ROUNDS`] plan→search→reflect rounds, accumulating
//! deduplicated evidence across rounds, then synthesizes once over the
//! full evidence set. Each round re-plans from the original question;
//! the reflection's suggested follow-up queries are surfaced in the
//! round reports but are not dispatched.

use std::sync::Arc;

use crate::llm::{ChatClient, LlmSettings};
use crate::research::{
    FinalResult, QueryPlanner, Reflection, Reflector, Synthesizer,
};
use crate::search::{self, Document, SearchProvider};

/// Maximum number of search-reflect rounds.
pub const MAX_ROUNDS: usize = 2;

/// Per-round progress record, exposed as an observability side channel.
#[derive(Debug, Clone)]
pub struct RoundReport {
    /// 1-based round number.
    pub round: usize,
    /// Queries dispatched this round (empty when planning failed).
    pub queries: Vec<String>,
    /// Documents added to the evidence set this round.
    pub new_documents: usize,
    /// The sufficiency judgment for this round.
    pub reflection: Reflection,
}

/// Full outcome of a research run: the final result plus the per-round
/// trace and the evidence it was synthesized from.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    /// The externally visible result.
    pub result: FinalResult,
    /// One report per executed round.
    pub rounds: Vec<RoundReport>,
    /// The accumulated evidence set.
    pub evidence: Vec<Document>,
}

/// Research loop controller.
///
/// Stateless between questions: every [`Self::process`] call starts
/// from an empty evidence set.
pub struct ResearchLoop {
    planner: QueryPlanner,
    reflector: Reflector,
    synthesizer: Synthesizer,
    search: Arc<dyn SearchProvider>,
}

impl std::fmt::Debug for ResearchLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchLoop")
            .field("planner", &self.planner)
            .field("reflector", &self.reflector)
            .field("synthesizer", &self.synthesizer)
            .finish()
    }
}

impl ResearchLoop {
    /// Wire up the loop from a chat client, a search provider, and
    /// model settings.
    pub fn new(
        chat: Arc<dyn ChatClient>,
        search: Arc<dyn SearchProvider>,
        settings: &LlmSettings,
    ) -> Self {
        Self {
            planner: QueryPlanner::new(Arc::clone(&chat), settings.planner_model.clone()),
            reflector: Reflector::new(Arc::clone(&chat), settings.model.clone()),
            synthesizer: Synthesizer::new(chat, settings.model.clone()),
            search,
        }
    }

    /// Answer a question, returning only the final result shape.
    pub async fn process(&self, question: &str) -> FinalResult {
        self.run(question).await.result
    }

    /// Answer a question, returning the full outcome with round trace.
    pub async fn run(&self, question: &str) -> ResearchOutcome {
        let mut evidence: Vec<Document> = Vec::new();
        let mut rounds = Vec::new();

        for round in 1..=MAX_ROUNDS {
            let report = self.run_round(question, round, &mut evidence).await;
            let need_more = report.reflection.need_more;
            rounds.push(report);

            if !need_more {
                break;
            }
        }

        tracing::info!(
            rounds = rounds.len(),
            evidence = evidence.len(),
            "Research loop finished, synthesizing answer"
        );

        let synthesis = self.synthesizer.synthesize(question, &evidence).await;

        ResearchOutcome {
            result: synthesis.into(),
            rounds,
            evidence,
        }
    }

    /// Run one plan→search→reflect round against the accumulated
    /// evidence set.
    async fn run_round(
        &self,
        question: &str,
        round: usize,
        evidence: &mut Vec<Document>,
    ) -> RoundReport {
        let queries = self.planner.generate_queries(question).await;
        if queries.is_empty() {
            tracing::warn!(round, "No usable search queries, skipping search");
            return RoundReport {
                round,
                queries,
                new_documents: 0,
                reflection: Reflection::forced(
                    vec![question.to_string()],
                    "Failed to generate search queries",
                ),
            };
        }

        tracing::debug!(round, queries = ?queries, "Dispatching search queries");

        let docs = search::search_all(self.search.as_ref(), &queries).await;
        let new_documents = search::merge_by_url(evidence, docs);

        tracing::debug!(
            round,
            new_documents,
            total = evidence.len(),
            "Merged search results"
        );

        // A round that surfaced nothing new cannot change the judgment;
        // skip the evaluation and retry with the lead query.
        if new_documents == 0 {
            return RoundReport {
                round,
                new_documents,
                reflection: Reflection::forced(
                    queries.iter().take(1).cloned().collect(),
                    "No new search results found",
                ),
                queries,
            };
        }

        let reflection = self.reflector.reflect(question, evidence).await;

        tracing::debug!(
            round,
            need_more = reflection.need_more,
            confidence = reflection.confidence,
            "Round evaluated"
        );

        RoundReport {
            round,
            queries,
            new_documents,
            reflection,
        }
    }
}
