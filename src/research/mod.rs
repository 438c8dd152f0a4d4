//! Research pipeline: planning, evidence gathering, reflection, synthesis.
//!
//! The pipeline is organized around four components driven by the
//! [`controller::ResearchLoop`]:
//!
//! - [`planner::QueryPlanner`]: question → search queries
//! - [`reflector::Reflector`]: evidence → slot-based sufficiency judgment
//! - [`synthesizer::Synthesizer`]: evidence → short cited answer
//! - [`controller::ResearchLoop`]: bounded plan→search→reflect rounds

pub mod controller;
pub mod planner;
pub mod reflector;
pub mod synthesizer;

pub use controller::{ResearchLoop, ResearchOutcome, RoundReport};
pub use planner::QueryPlanner;
pub use reflector::Reflector;
pub use synthesizer::Synthesizer;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::search::Document;

/// Outcome of one sufficiency evaluation.
///
/// `slots` and `filled` are parallel arrays. The validation layer
/// guarantees `need_more` whenever any slot is unfilled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reflection {
    /// Named facts the answer must contain.
    pub slots: Vec<String>,
    /// Per-slot fill status, same length as `slots`.
    pub filled: Vec<bool>,
    /// Exact quoted text backing each filled slot.
    pub evidence: HashMap<String, String>,
    /// Whether another search round is warranted.
    pub need_more: bool,
    /// Confidence in the current evidence, clamped to [0, 1].
    pub confidence: f32,
    /// Brief explanation of what is missing or conflicting.
    pub reasoning: String,
    /// Suggested follow-up queries.
    pub new_queries: Vec<String>,
}

impl Reflection {
    /// Conservative default for a question: all listed slots unfilled,
    /// more evidence needed, the question itself as the only query.
    pub fn unfilled(slots: Vec<String>, question: &str, reasoning: impl Into<String>) -> Self {
        let filled = vec![false; slots.len()];
        Self {
            slots,
            filled,
            evidence: HashMap::new(),
            need_more: true,
            confidence: 0.0,
            reasoning: reasoning.into(),
            new_queries: vec![question.to_string()],
        }
    }

    /// Conservative single-slot default used by every failure path.
    pub fn fallback(question: &str, reasoning: impl Into<String>) -> Self {
        Self::unfilled(vec!["answer".to_string()], question, reasoning)
    }

    /// A forced "keep searching" result produced without an evaluation,
    /// used when a round yields nothing worth evaluating.
    pub fn forced(new_queries: Vec<String>, reasoning: impl Into<String>) -> Self {
        Self {
            slots: Vec::new(),
            filled: Vec::new(),
            evidence: HashMap::new(),
            need_more: true,
            confidence: 0.0,
            reasoning: reasoning.into(),
            new_queries,
        }
    }
}

/// A validated citation. `id` is a 1-based index into the evidence set
/// used for synthesis; `title` and `url` always come from the indexed
/// document, never from the model's own assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based evidence index.
    pub id: usize,
    /// Title of the cited document.
    pub title: String,
    /// URL of the cited document.
    pub url: String,
}

/// A validated synthesis outcome: a short answer (at most 80 words) with
/// the citations it actually references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synthesis {
    /// Answer text with bracketed citation markers.
    pub answer: String,
    /// Citations referenced by the answer text.
    pub citations: Vec<Citation>,
}

/// The externally visible result shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResult {
    /// Final answer text.
    pub answer: String,
    /// Citations backing the answer.
    pub citations: Vec<Citation>,
}

impl From<Synthesis> for FinalResult {
    fn from(synthesis: Synthesis) -> Self {
        Self {
            answer: synthesis.answer,
            citations: synthesis.citations,
        }
    }
}

/// Format evidence as numbered blocks for model prompts.
///
/// The numbering here defines the citation ids the synthesizer validates
/// against, so reflection and synthesis must use the same ordering.
pub(crate) fn format_evidence(docs: &[Document]) -> String {
    docs.iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "[{}] Title: {}\nURL: {}\nContent: {}\n",
                i + 1,
                doc.title,
                doc.url,
                doc.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
