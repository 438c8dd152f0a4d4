//! Answer synthesis with citation validation.
//!
//! The synthesizer reduces accumulated evidence to a short cited answer
//! and then enforces citation integrity: a citation survives only if its
//! id indexes a real evidence document AND the answer text actually
//! references it as `[id]`. Kept citations get their title/url rewritten
//! from the evidence, so a citation can never point at a source that was
//! not supplied.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;

use crate::decode;
use crate::llm::{ChatClient, ChatRequest, Message};
use crate::research::{Citation, Synthesis, format_evidence};
use crate::search::Document;

/// Maximum answer length in whitespace-delimited words.
const MAX_ANSWER_WORDS: usize = 80;

const SYSTEM_PROMPT: &str = "You are a technical writer that creates concise, well-cited \
answers. You MUST return a SINGLE LINE of valid JSON with NO newlines or extra whitespace. \
Do not include any other text or explanation.";

const SYNTHESIZE_PROMPT: &str = r#"Write a concise answer (MAXIMUM 80 words) to the following question using only the provided search results.

Question: {question}

Search Results:
{documents}

Requirements:
1. MUST be 80 words or less
2. MUST use citation numbers [1][2] etc. to cite sources
3. MUST be factual and based only on the provided sources
4. MUST be clear and well-structured
5. Focus on key differences and practical use cases

IMPORTANT: Return a SINGLE LINE of valid JSON with NO newlines or extra whitespace. Format:
{"answer":"Your concise answer with citations like [1][2]","citations":[{"id":1,"title":"Source Title","url":"https://..."}]}"#;

fn citation_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("valid regex literal"))
}

/// Answer synthesizer.
pub struct Synthesizer {
    client: Arc<dyn ChatClient>,
    model: String,
}

impl std::fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer")
            .field("model", &self.model)
            .finish()
    }
}

impl Synthesizer {
    /// Create a synthesizer using the given client and model.
    pub fn new(client: Arc<dyn ChatClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Produce a validated answer from the accumulated evidence.
    ///
    /// Never fails: model and parse errors degrade to fixed error
    /// answers with empty citation lists.
    pub async fn synthesize(&self, question: &str, evidence: &[Document]) -> Synthesis {
        if evidence.is_empty() {
            return Synthesis {
                answer: "Insufficient information to provide an answer.".to_string(),
                citations: Vec::new(),
            };
        }

        let prompt = SYNTHESIZE_PROMPT
            .replace("{question}", question)
            .replace("{documents}", &format_evidence(evidence));

        let request = ChatRequest::new(vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(prompt),
        ])
        .with_model(self.model.clone())
        .with_temperature(0.1);

        let content = match self.client.complete(request).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "Synthesis call failed");
                return Synthesis {
                    answer: "Error during synthesis".to_string(),
                    citations: Vec::new(),
                };
            }
        };

        match decode::decode_object::<Value>(&content) {
            Ok(raw) => validate_synthesis(&raw, evidence),
            Err(e) => {
                tracing::warn!(error = %e, raw = %content, "Synthesis response unparseable");
                Synthesis {
                    answer: "Error processing response".to_string(),
                    citations: Vec::new(),
                }
            }
        }
    }
}

/// Validate and normalize a raw synthesis payload.
fn validate_synthesis(raw: &Value, evidence: &[Document]) -> Synthesis {
    let mut result = Synthesis {
        answer: "Error processing response".to_string(),
        citations: Vec::new(),
    };

    if let Some(answer) = raw.get("answer").and_then(Value::as_str) {
        if !answer.is_empty() {
            result.answer = truncate_words(answer, MAX_ANSWER_WORDS);
        }
    }

    let valid = raw
        .get("citations")
        .and_then(Value::as_array)
        .map(|citations| {
            citations
                .iter()
                .filter_map(|c| validate_citation(c, evidence))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    // Keep only citations the answer text actually references.
    let referenced = referenced_ids(&result.answer);
    result.citations = valid
        .into_iter()
        .filter(|c| referenced.contains(&c.id))
        .collect();

    // Markers in the text with no surviving citation mean the model
    // cited sources it was never given; reject the whole answer.
    if result.citations.is_empty() && !referenced.is_empty() {
        result.answer = "Error: Invalid citations in response".to_string();
        result.citations = Vec::new();
    }

    result
}

/// Validate one citation element against the evidence set.
///
/// Requires an integer `id` in `1..=len(evidence)` and string
/// `title`/`url` fields; the returned citation carries the evidence
/// document's actual title and url.
fn validate_citation(raw: &Value, evidence: &[Document]) -> Option<Citation> {
    let id = usize::try_from(raw.get("id")?.as_i64()?).ok()?;
    raw.get("title")?.as_str()?;
    raw.get("url")?.as_str()?;

    if id < 1 || id > evidence.len() {
        return None;
    }

    let doc = &evidence[id - 1];
    Some(Citation {
        id,
        title: doc.title.clone(),
        url: doc.url.clone(),
    })
}

/// Collect the citation ids referenced as `[n]` in the answer text.
fn referenced_ids(answer: &str) -> HashSet<usize> {
    citation_marker_re()
        .captures_iter(answer)
        .filter_map(|cap| cap[1].parse::<usize>().ok())
        .collect()
}

/// Truncate to the first `limit` whitespace-delimited words, appending
/// an ellipsis marker when anything was cut.
fn truncate_words(answer: &str, limit: usize) -> String {
    let words: Vec<&str> = answer.split_whitespace().collect();
    if words.len() <= limit {
        answer.to_string()
    } else {
        format!("{}...", words[..limit].join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ResearchError, ResearchResult};
    use async_trait::async_trait;

    struct CannedChat {
        response: ResearchResult<String>,
    }

    #[async_trait]
    impl ChatClient for CannedChat {
        async fn complete(&self, _req: ChatRequest) -> ResearchResult<String> {
            match &self.response {
                Ok(content) => Ok(content.clone()),
                Err(_) => Err(ResearchError::Network("unreachable".to_string())),
            }
        }
    }

    fn synthesizer(response: ResearchResult<String>) -> Synthesizer {
        Synthesizer::new(Arc::new(CannedChat { response }), "test-model")
    }

    fn sample_docs() -> Vec<Document> {
        vec![
            Document {
                title: "HPA vs KEDA in Kubernetes".to_string(),
                url: "https://example.com/hpa-vs-keda".to_string(),
                snippet: "HPA is for CPU/memory scaling, KEDA for event-driven scaling.".to_string(),
            },
            Document {
                title: "Kubernetes Autoscaling Guide".to_string(),
                url: "https://example.com/k8s-autoscaling".to_string(),
                snippet: "Comparing different autoscaling options in Kubernetes.".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_empty_evidence_short_circuits() {
        let synth = synthesizer(Err(ResearchError::Network("should not be called".to_string())));
        let result = synth.synthesize("question", &[]).await;
        assert_eq!(result.answer, "Insufficient information to provide an answer.");
        assert!(result.citations.is_empty());
    }

    #[tokio::test]
    async fn test_valid_response_keeps_referenced_citations() {
        let synth = synthesizer(Ok(
            r#"{"answer":"HPA handles CPU scaling while KEDA is event-driven [1][2]","citations":[{"id":1,"title":"Wrong","url":"wrong"},{"id":2,"title":"Wrong","url":"wrong"}]}"#
                .to_string(),
        ));
        let result = synth.synthesize("Compare HPA and KEDA", &sample_docs()).await;

        assert_eq!(result.citations.len(), 2);
        // Title and url come from the evidence, not the model.
        assert_eq!(result.citations[0].title, "HPA vs KEDA in Kubernetes");
        assert_eq!(result.citations[0].url, "https://example.com/hpa-vs-keda");
    }

    #[tokio::test]
    async fn test_word_limit_enforced() {
        let long_answer = vec!["word"; 81].join(" ");
        let synth = synthesizer(Ok(format!(
            r#"{{"answer":"{long_answer}","citations":[{{"id":1,"title":"T","url":"u"}}]}}"#
        )));
        let result = synth.synthesize("question", &sample_docs()).await;

        let word_count = result.answer.split_whitespace().count();
        assert!(word_count <= MAX_ANSWER_WORDS);
        assert!(result.answer.ends_with("..."));
    }

    #[tokio::test]
    async fn test_unreferenced_citation_dropped() {
        let synth = synthesizer(Ok(
            r#"{"answer":"Only the first source matters [1]","citations":[{"id":1,"title":"A","url":"a"},{"id":2,"title":"B","url":"b"}]}"#
                .to_string(),
        ));
        let result = synth.synthesize("question", &sample_docs()).await;

        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].id, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_citation_rejected() {
        let synth = synthesizer(Ok(
            r#"{"answer":"Claim [7]","citations":[{"id":7,"title":"T","url":"u"}]}"#.to_string(),
        ));
        let result = synth.synthesize("question", &sample_docs()).await;

        // The only marker points at evidence that does not exist.
        assert_eq!(result.answer, "Error: Invalid citations in response");
        assert!(result.citations.is_empty());
    }

    #[tokio::test]
    async fn test_markers_without_valid_citations_rejected() {
        let synth = synthesizer(Ok(
            r#"{"answer":"Cited claim [1]","citations":[{"id":"one","title":"T","url":"u"}]}"#
                .to_string(),
        ));
        let result = synth.synthesize("question", &sample_docs()).await;

        assert_eq!(result.answer, "Error: Invalid citations in response");
        assert!(result.citations.is_empty());
    }

    #[tokio::test]
    async fn test_answer_without_markers_keeps_text() {
        let synth = synthesizer(Ok(
            r#"{"answer":"A plain uncited answer","citations":[{"id":1,"title":"T","url":"u"}]}"#
                .to_string(),
        ));
        let result = synth.synthesize("question", &sample_docs()).await;

        assert_eq!(result.answer, "A plain uncited answer");
        assert!(result.citations.is_empty());
    }

    #[tokio::test]
    async fn test_parse_failure_degrades() {
        let synth = synthesizer(Ok("not a payload".to_string()));
        let result = synth.synthesize("question", &sample_docs()).await;
        assert_eq!(result.answer, "Error processing response");
        assert!(result.citations.is_empty());
    }

    #[tokio::test]
    async fn test_call_failure_degrades() {
        let synth = synthesizer(Err(ResearchError::Network("down".to_string())));
        let result = synth.synthesize("question", &sample_docs()).await;
        assert_eq!(result.answer, "Error during synthesis");
        assert!(result.citations.is_empty());
    }

    #[test]
    fn test_truncate_words_exact_limit_untouched() {
        let text = vec!["w"; 80].join(" ");
        assert_eq!(truncate_words(&text, 80), text);
    }

    #[test]
    fn test_referenced_ids_extraction() {
        let ids = referenced_ids("First [1], then [2], then [2] again.");
        assert_eq!(ids, HashSet::from([1, 2]));
    }
}
