//! Retrieval over the indexed manual.

use crate::embeddings::EmbeddingProvider;
use crate::keyword;
use crate::parser::Manual;
use crate::types::{KnowledgeChunk, SearchHit};
use crate::vector_index::VectorIndex;
use patriot_core::AppResult;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Default number of chunks returned by semantic search.
pub const DEFAULT_TOP_K: usize = 5;

/// Semantic and keyword search over one manual.
pub struct ManualRetriever {
    manual: Manual,
    index: Box<dyn VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl ManualRetriever {
    pub fn new(
        manual: Manual,
        index: Box<dyn VectorIndex>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            manual,
            index,
            provider,
        }
    }

    pub fn manual(&self) -> &Manual {
        &self.manual
    }

    /// Nearest chunks with their cosine similarity, closest first.
    pub async fn nearest_chunks(
        &self,
        query: &str,
        k: usize,
    ) -> AppResult<Vec<(KnowledgeChunk, f32)>> {
        let query_embedding = self.provider.embed(query).await?;
        self.index.search(&query_embedding, k)
    }

    /// Top `k` passages for a query, each suffixed with ` (Page N)`.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn semantic_search(&self, query: &str, k: usize) -> Vec<String> {
        match self.nearest_chunks(query, k).await {
            Ok(results) => {
                let passages: Vec<String> = results
                    .iter()
                    .filter_map(|(chunk, _)| with_page_reference(chunk))
                    .collect();
                tracing::info!(
                    "Found {} relevant sections for query: '{}'",
                    passages.len(),
                    query
                );
                passages
            }
            Err(e) => {
                tracing::error!("Error during semantic search: {}", e);
                Vec::new()
            }
        }
    }

    /// Scored search keeping hits whose cosine distance is at most `threshold`.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn search_with_score(&self, query: &str, k: usize, threshold: f32) -> Vec<SearchHit> {
        let results = match self.nearest_chunks(query, k).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!("Error during semantic search with scores: {}", e);
                return Vec::new();
            }
        };

        let hits: Vec<SearchHit> = results
            .into_iter()
            .filter_map(|(chunk, similarity)| {
                let score = 1.0 - similarity;
                if score > threshold {
                    return None;
                }
                let content = with_page_reference(&chunk)?;
                Some(SearchHit {
                    content,
                    score,
                    page: chunk.page_number(),
                    metadata: chunk.metadata,
                })
            })
            .collect();

        tracing::info!(
            "Found {} sections within distance {} for query: '{}'",
            hits.len(),
            threshold,
            query
        );
        hits
    }

    /// Substring search over the manual text.
    pub fn keyword_search(&self, query: &str) -> Vec<String> {
        keyword::keyword_search(&self.manual, query)
    }
}

fn with_page_reference(chunk: &KnowledgeChunk) -> Option<String> {
    let content = chunk.text.trim();
    if content.is_empty() {
        return None;
    }
    Some(format!("{} (Page {})", content, chunk.page_number()))
}

/// First `max_graphemes` graphemes of `text` on one line, with an ellipsis when cut.
pub fn preview(text: &str, max_graphemes: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let graphemes: Vec<&str> = flat.graphemes(true).collect();
    if graphemes.len() <= max_graphemes {
        return flat;
    }
    format!("{}...", graphemes[..max_graphemes].concat().trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::index::SqliteIndex;

    async fn retriever(chunks: &[(u32, &str)]) -> ManualRetriever {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(384));
        let mut index = SqliteIndex::in_memory().unwrap();

        for (position, (page, text)) in chunks.iter().enumerate() {
            let embedding = provider.embed(text).await.unwrap();
            index
                .upsert_chunk(&KnowledgeChunk {
                    id: format!("chunk-{}", position),
                    page: *page,
                    position: position as u32,
                    text: text.to_string(),
                    embedding: Some(embedding),
                    metadata: serde_json::json!({ "page": page }),
                })
                .unwrap();
        }

        let manual = Manual::from_pages(
            "manual.pdf",
            chunks.iter().map(|(_, t)| t.to_string()).collect(),
        );
        ManualRetriever::new(manual, Box::new(index), provider)
    }

    #[tokio::test]
    async fn test_semantic_search_adds_page_reference() {
        let r = retriever(&[
            (41, "  Engine coolant temperature warning light  "),
            (7, "Adjusting the rear seat headrests"),
        ])
        .await;

        let results = r.semantic_search("engine coolant temperature", 1).await;
        assert_eq!(
            results,
            vec!["Engine coolant temperature warning light (Page 42)".to_string()]
        );
    }

    #[tokio::test]
    async fn test_semantic_search_skips_blank_chunks() {
        let r = retriever(&[(0, "   "), (1, "Spare tire jack")]).await;
        let results = r.semantic_search("spare tire", 5).await;
        assert_eq!(results, vec!["Spare tire jack (Page 2)".to_string()]);
    }

    #[tokio::test]
    async fn test_search_with_score_filters_by_distance() {
        let r = retriever(&[
            (0, "Brake pad wear indicator squeal"),
            (1, "Radio presets and clock"),
        ])
        .await;

        let hits = r.search_with_score("brake pad wear indicator squeal", 5, 0.3).await;
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score < 0.01);
        assert_eq!(hits[0].page, 1);
        assert!(hits[0].content.ends_with("(Page 1)"));

        let all = r.search_with_score("brake pad wear indicator squeal", 5, 2.0).await;
        assert_eq!(all.len(), 2);
        assert!(all[0].score <= all[1].score);
    }

    #[tokio::test]
    async fn test_keyword_search_uses_manual_text() {
        let r = retriever(&[(0, "Fuel filler door\nUnleaded only")]).await;
        let hits = r.keyword_search("UNLEADED");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].contains("Fuel filler door"));
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short\ntext", 20), "short text");
        assert_eq!(preview("Check the engine oil level", 9), "Check the...");
        assert_eq!(preview("Température élevée", 4), "Temp...");
    }
}
