//! Slot-based sufficiency evaluation.
//!
//! A reflection round runs in strictly ordered stages:
//!
//! 1. No-evidence short-circuit (no model call).
//! 2. Slot identification from the question alone, with a single-slot
//!    fallback on failure.
//! 3. Slot-filling assessment over the numbered evidence blocks.
//! 4. Validation: the raw assessment is overlaid onto conservative
//!    defaults field by field, trusting nothing from the model. In
//!    particular `need_more` can be forced true by an unfilled slot but
//!    never forced false.
//!
//! Any failure in stages 2-4 degrades to the conservative single-slot
//! shape, so the loop controller can always keep making progress.

use std::sync::Arc;

use serde_json::Value;

use crate::decode;
use crate::error::{ResearchError, ResearchResult};
use crate::llm::{ChatClient, ChatRequest, Message};
use crate::research::{Reflection, format_evidence};
use crate::search::Document;

const SLOT_SYSTEM_PROMPT: &str = "You are an analytical assistant that identifies required \
information slots. Return ONLY a SINGLE LINE of valid JSON with NO newlines or extra whitespace.";

const SLOT_IDENTIFICATION_PROMPT: &str = r#"Analyze this question and identify the key information slots that need to be filled for a complete answer.
A slot is a specific piece of information that must be found to answer the question fully.

Question: {question}

Return a SINGLE LINE of valid JSON with NO newlines. Format:
{"slots":["slot1","slot2"],"descriptions":["what slot1 means","what slot2 means"]}

Example 1:
Question: "What was the score of the 2022 World Cup final?"
{"slots":["argentina_score","france_score","match_date"],"descriptions":["Number of goals scored by Argentina","Number of goals scored by France","Date of the final match"]}

Example 2:
Question: "Who is the current CEO of Apple and when did they start?"
{"slots":["ceo_name","start_date"],"descriptions":["Name of Apple's current CEO","When they started as CEO"]}"#;

const ASSESS_SYSTEM_PROMPT: &str = "You are an analytical assistant that evaluates search \
results. You MUST return a SINGLE LINE of valid JSON with NO newlines or extra whitespace. \
Do not include any other text or explanation.";

const ASSESS_PROMPT: &str = r#"Analyze these search results to determine if we have enough information to answer the question.
For each required slot, find evidence in the search results that fills it.

Question: {question}

Required Slots:
{slots_info}

Search Results:
{documents}

IMPORTANT: Return a SINGLE LINE of valid JSON with NO newlines or extra whitespace. Format:
{
  "slots": ["slot1", "slot2"],
  "filled": [true/false, true/false],
  "evidence": {"slot1": "exact text from docs that fills slot1", "slot2": "exact text from docs that fills slot2"},
  "need_more": true/false,
  "confidence": 0.0-1.0,
  "reasoning": "Brief explanation of what's missing or conflicting",
  "new_queries": ["targeted query for missing slot"]
}"#;

/// Fallback slot description used when identification fails.
const FALLBACK_SLOT_DESCRIPTION: &str = "The complete answer to the question";

/// Sufficiency evaluator.
pub struct Reflector {
    client: Arc<dyn ChatClient>,
    model: String,
}

impl std::fmt::Debug for Reflector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reflector").field("model", &self.model).finish()
    }
}

impl Reflector {
    /// Create a reflector using the given client and model.
    pub fn new(client: Arc<dyn ChatClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Evaluate whether the accumulated evidence is sufficient.
    ///
    /// Never fails: every error path collapses to a conservative
    /// "need more, nothing filled, zero confidence" reflection.
    pub async fn reflect(&self, question: &str, evidence: &[Document]) -> Reflection {
        if evidence.is_empty() {
            return Reflection::fallback(question, "No search results to analyze");
        }

        match self.evaluate(question, evidence).await {
            Ok(reflection) => reflection,
            Err(e) => {
                tracing::warn!(error = %e, "Reflection failed, using conservative fallback");
                let reasoning = match e {
                    ResearchError::Decode(_) => "Error processing reflection response",
                    _ => "Error during reflection",
                };
                Reflection::fallback(question, reasoning)
            }
        }
    }

    async fn evaluate(
        &self,
        question: &str,
        evidence: &[Document],
    ) -> ResearchResult<Reflection> {
        let (slots, descriptions) = self.identify_slots(question).await;
        let slots_info = format_slots_info(&slots, &descriptions);
        let documents = format_evidence(evidence);

        let prompt = ASSESS_PROMPT
            .replace("{question}", question)
            .replace("{slots_info}", &slots_info)
            .replace("{documents}", &documents);

        let request = ChatRequest::new(vec![
            Message::system(ASSESS_SYSTEM_PROMPT),
            Message::user(prompt),
        ])
        .with_model(self.model.clone())
        .with_temperature(0.1);

        let content = self.client.complete(request).await?;
        let raw: Value = decode::decode_object(&content)?;

        Ok(validate_reflection(&raw, slots, question))
    }

    /// Identify required information slots for the question.
    ///
    /// Falls back to a single `answer` slot on any failure; slot
    /// identification must never fail the round outright.
    async fn identify_slots(&self, question: &str) -> (Vec<String>, Vec<String>) {
        let request = ChatRequest::new(vec![
            Message::system(SLOT_SYSTEM_PROMPT),
            Message::user(SLOT_IDENTIFICATION_PROMPT.replace("{question}", question)),
        ])
        .with_model(self.model.clone())
        .with_temperature(0.1);

        let outcome: ResearchResult<(Vec<String>, Vec<String>)> = async {
            let content = self.client.complete(request).await?;
            let raw: Value = decode::decode_object(&content)?;

            let slots = string_array(raw.get("slots"));
            let descriptions = string_array(raw.get("descriptions"));
            if slots.is_empty() || slots.len() != descriptions.len() {
                return Err(ResearchError::Reflection(
                    "Slot identification returned mismatched arrays".to_string(),
                ));
            }
            Ok((slots, descriptions))
        }
        .await;

        match outcome {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "Slot identification failed, using fallback slot");
                (
                    vec!["answer".to_string()],
                    vec![FALLBACK_SLOT_DESCRIPTION.to_string()],
                )
            }
        }
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Format slot/description pairs for the assessment prompt.
fn format_slots_info(slots: &[String], descriptions: &[String]) -> String {
    slots
        .iter()
        .zip(descriptions)
        .map(|(slot, desc)| format!("- {slot}: {desc}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Overlay a raw assessment onto conservative defaults.
///
/// Each field is accepted only when well-typed and internally
/// consistent; everything else keeps its default. `need_more` is the
/// model's value OR'd with "any slot unfilled", so validation can force
/// it true but never false.
fn validate_reflection(raw: &Value, slots: Vec<String>, question: &str) -> Reflection {
    let mut result = Reflection::unfilled(slots, question, "");

    if let Some(filled) = raw.get("filled").and_then(Value::as_array) {
        if filled.len() == result.slots.len() && filled.iter().all(Value::is_boolean) {
            result.filled = filled.iter().filter_map(Value::as_bool).collect();
        }
    }

    if let Some(evidence) = raw.get("evidence").and_then(Value::as_object) {
        result.evidence = evidence
            .iter()
            .filter(|(slot, _)| result.slots.contains(*slot))
            .filter_map(|(slot, quote)| {
                quote.as_str().map(|q| (slot.clone(), q.to_string()))
            })
            .collect();
    }

    if let Some(need_more) = raw.get("need_more").and_then(Value::as_bool) {
        result.need_more = need_more || !result.filled.iter().all(|f| *f);
    }

    if let Some(confidence) = raw.get("confidence").and_then(Value::as_f64) {
        #[allow(clippy::cast_possible_truncation, reason = "clamped to [0, 1]")]
        {
            result.confidence = (confidence as f32).clamp(0.0, 1.0);
        }
    }

    if let Some(reasoning) = raw.get("reasoning").and_then(Value::as_str) {
        if !reasoning.is_empty() {
            result.reasoning = reasoning.to_string();
        }
    }

    if let Some(queries) = raw.get("new_queries").and_then(Value::as_array) {
        let valid: Vec<String> = queries
            .iter()
            .filter_map(Value::as_str)
            .filter(|q| !q.is_empty())
            .map(String::from)
            .collect();
        if !valid.is_empty() {
            result.new_queries = valid;
        }
    }

    result
}
