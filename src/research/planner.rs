//! Query planning: turn a question into a small set of search queries.

use std::sync::Arc;

use crate::decode;
use crate::llm::{ChatClient, ChatRequest, Message};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates search queries. \
Always respond with ONLY a JSON array of strings, nothing else.";

const PROMPT_TEMPLATE: &str = r#"Break the following question into 3 to 5 effective search queries that could be used in a web search engine.

Question:
{question}

Return ONLY a JSON array of strings, like this:
["query one", "query two", "query three"]
No other text, explanation, or thinking process should be included."#;

/// Query planner.
///
/// Planning is best-effort: every failure path (transport, auth, or an
/// unparseable response) degrades to an empty query list, which the
/// loop controller treats as "unable to plan this round" rather than a
/// hard failure of the run.
pub struct QueryPlanner {
    client: Arc<dyn ChatClient>,
    model: String,
}

impl std::fmt::Debug for QueryPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPlanner")
            .field("model", &self.model)
            .finish()
    }
}

impl QueryPlanner {
    /// Create a planner using the given client and model.
    pub fn new(client: Arc<dyn ChatClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Generate 3-5 search queries for the question.
    ///
    /// Returns an empty list on any failure; never errors.
    pub async fn generate_queries(&self, question: &str) -> Vec<String> {
        let request = ChatRequest::new(vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(PROMPT_TEMPLATE.replace("{question}", question)),
        ])
        .with_model(self.model.clone())
        .with_temperature(0.3);

        let content = match self.client.complete(request).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "Query generation call failed");
                return Vec::new();
            }
        };

        match decode::decode_string_array(&content) {
            Ok(queries) => {
                let queries: Vec<String> =
                    queries.into_iter().filter(|q| !q.trim().is_empty()).collect();
                tracing::debug!(count = queries.len(), "Generated search queries");
                queries
            }
            Err(e) => {
                tracing::warn!(error = %e, raw = %content, "Could not extract queries from response");
                Vec::new()
            }
        }
    }
}
