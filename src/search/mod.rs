//! Web search collaborator and evidence accumulation.
//!
//! [`SearchProvider`] abstracts the search API so the research loop can
//! run against test doubles. [`search_all`] fans a batch of queries out
//! concurrently and merges the results into a deduplicated,
//! order-preserving evidence list: first occurrence of a URL wins, and
//! merge order is query-list order then intra-query result order, so the
//! output is reproducible regardless of which dispatch completes first.

pub mod tavily;

pub use tavily::TavilyClient;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ResearchResult;

/// A retrieved web document. Identity is the exact `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Page title.
    pub title: String,
    /// Source URL.
    pub url: String,
    /// Content snippet returned by the search API.
    pub snippet: String,
}

/// Trait for search collaborators.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a single query and return its raw result list.
    async fn search(&self, query: &str) -> ResearchResult<Vec<Document>>;
}

/// Dispatch all queries and merge results, deduplicated by URL.
///
/// Queries are dispatched concurrently. A failing query degrades to zero
/// results for that query only; it never aborts the batch.
pub async fn search_all(provider: &dyn SearchProvider, queries: &[String]) -> Vec<Document> {
    let dispatches = queries.iter().map(|q| provider.search(q));
    let outcomes = futures::future::join_all(dispatches).await;

    let mut merged = Vec::new();
    for (query, outcome) in queries.iter().zip(outcomes) {
        match outcome {
            Ok(docs) => {
                merge_by_url(&mut merged, docs);
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Search query failed, skipping");
            }
        }
    }

    merged
}

/// Append `incoming` documents whose URL is not already present.
///
/// Returns the number of documents actually added. Existing entries are
/// never replaced, so the first occurrence of a URL wins.
pub fn merge_by_url(evidence: &mut Vec<Document>, incoming: Vec<Document>) -> usize {
    let mut seen: HashSet<String> = evidence.iter().map(|d| d.url.clone()).collect();
    let mut added = 0;
    for doc in incoming {
        if seen.insert(doc.url.clone()) {
            evidence.push(doc);
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResearchError;

    struct FixtureProvider {
        per_query: Vec<ResearchResult<Vec<Document>>>,
        cursor: std::sync::Mutex<usize>,
    }

    impl FixtureProvider {
        fn new(per_query: Vec<ResearchResult<Vec<Document>>>) -> Self {
            Self {
                per_query,
                cursor: std::sync::Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for FixtureProvider {
        async fn search(&self, _query: &str) -> ResearchResult<Vec<Document>> {
            let mut cursor = self.cursor.lock().unwrap();
            let index = *cursor;
            *cursor += 1;
            match self.per_query.get(index) {
                Some(Ok(docs)) => Ok(docs.clone()),
                Some(Err(_)) => Err(ResearchError::Search("simulated failure".to_string())),
                None => Ok(Vec::new()),
            }
        }
    }

    fn doc(url: &str) -> Document {
        Document {
            title: format!("Title for {url}"),
            url: url.to_string(),
            snippet: "snippet".to_string(),
        }
    }

    #[tokio::test]
    async fn test_search_all_dedups_across_queries() {
        let provider = FixtureProvider::new(vec![
            Ok(vec![doc("https://a.example"), doc("https://b.example")]),
            Ok(vec![doc("https://b.example"), doc("https://c.example")]),
        ]);

        let queries = vec!["q1".to_string(), "q2".to_string()];
        let merged = search_all(&provider, &queries).await;

        let urls: Vec<&str> = merged.iter().map(|d| d.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.example", "https://b.example", "https://c.example"]
        );
    }

    #[tokio::test]
    async fn test_search_all_survives_failing_query() {
        let provider = FixtureProvider::new(vec![
            Err(ResearchError::Search("rate limited".to_string())),
            Ok(vec![doc("https://only.example")]),
        ]);

        let queries = vec!["q1".to_string(), "q2".to_string()];
        let merged = search_all(&provider, &queries).await;

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].url, "https://only.example");
    }

    #[tokio::test]
    async fn test_search_all_all_failures_yields_empty() {
        let provider = FixtureProvider::new(vec![
            Err(ResearchError::Search("down".to_string())),
            Err(ResearchError::Search("down".to_string())),
        ]);

        let queries = vec!["q1".to_string(), "q2".to_string()];
        let merged = search_all(&provider, &queries).await;
        assert!(merged.is_empty());
    }

    #[test]
    fn test_merge_preserves_first_occurrence() {
        let mut evidence = vec![doc("https://a.example")];
        let added = merge_by_url(
            &mut evidence,
            vec![
                Document {
                    title: "Different title".to_string(),
                    url: "https://a.example".to_string(),
                    snippet: "other".to_string(),
                },
                doc("https://b.example"),
            ],
        );

        assert_eq!(added, 1);
        assert_eq!(evidence.len(), 2);
        assert_eq!(evidence[0].title, "Title for https://a.example");
    }
}
