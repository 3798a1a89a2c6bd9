use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use docrag::search::ScoredDocument;
use docrag::{
    Config, HybridRanker, KeywordIndex, KnowledgeBase, Provenance, Retriever, RetrievalError,
    SearchResult, VectorStore,
};

use crate::helpers::fake_embeddings::{topic_corpus, VocabularyEmbedder, TOPIC_VOCABULARY};

struct Unavailable;

#[async_trait]
impl Retriever for Unavailable {
    async fn retrieve(&self, _query: &str, _limit: usize) -> docrag::Result<Vec<ScoredDocument>> {
        Err(RetrievalError::EmbeddingFailure("index offline".to_string()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

async fn topic_kb() -> Result<KnowledgeBase> {
    let kb = KnowledgeBase::new(
        Arc::new(VocabularyEmbedder::new(TOPIC_VOCABULARY)),
        &Config::default(),
    )?;
    kb.ingest(topic_corpus()).await?;
    Ok(kb)
}

fn ids(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn test_full_vector_weight_reproduces_similarity_ranking() -> Result<()> {
    let kb = topic_kb().await?;

    for query in ["framework components", "vector index", "type system compiler"] {
        let hybrid = kb.hybrid_search(query, 3, 1.0).await?;
        let similar = kb.similarity_search(query, 3).await?;
        assert_eq!(ids(&hybrid), ids(&similar), "query {:?}", query);
    }
    Ok(())
}

#[tokio::test]
async fn test_zero_vector_weight_reproduces_keyword_ranking() -> Result<()> {
    let kb = topic_kb().await?;

    for query in ["framework", "vector embeddings", "a"] {
        let keyword = kb.keyword_search(query, 3);
        let hybrid = kb.hybrid_search(query, 3, 0.0).await?;
        assert_eq!(
            ids(&hybrid[..keyword.len()]),
            ids(&keyword),
            "query {:?}",
            query
        );
        // Vector-only candidates trail with no contribution
        assert!(hybrid[keyword.len()..]
            .iter()
            .all(|r| r.score == 0.0 && r.provenance == Provenance::Vector));
    }
    Ok(())
}

#[tokio::test]
async fn test_scores_are_normalized_and_tagged() -> Result<()> {
    let kb = topic_kb().await?;

    let results = kb.hybrid_search("retrieval framework", 4, 0.7).await?;

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].id, "framework");
    assert_eq!(results[0].provenance, Provenance::Both);
    assert!(results
        .iter()
        .all(|r| (0.0..=1.0).contains(&r.score)));
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    Ok(())
}

#[tokio::test]
async fn test_invalid_weight_is_rejected() -> Result<()> {
    let kb = topic_kb().await?;

    for weight in [-0.5, 1.5, f32::NAN] {
        let err = kb.hybrid_search("framework", 3, weight).await.unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::InvalidParameter {
                name: "vector_weight",
                ..
            }
        ));
    }
    assert!(kb.hybrid_search("framework", 0, 0.5).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_degrades_to_surviving_ranking() -> Result<()> {
    let store = Arc::new(VectorStore::new(Arc::new(VocabularyEmbedder::new(
        TOPIC_VOCABULARY,
    ))));
    let documents = store.add_documents(topic_corpus()).await?;
    let keyword = Arc::new(KeywordIndex::new());
    keyword.add_documents(&documents);

    let vector_only = HybridRanker::new(store.clone(), Arc::new(Unavailable));
    let results = vector_only.hybrid_search("browser components", 2, 0.2).await?;
    assert_eq!(
        ids(&results),
        ids(&store.similarity_search("browser components", 2).await?)
    );
    assert!(results.iter().all(|r| r.provenance == Provenance::Vector));

    let keyword_only = HybridRanker::new(Arc::new(Unavailable), keyword.clone());
    let results = keyword_only.hybrid_search("compiler", 2, 0.8).await?;
    assert_eq!(ids(&results), ids(&keyword.search("compiler", 2)));

    let neither = HybridRanker::new(Arc::new(Unavailable), Arc::new(Unavailable));
    assert!(neither.hybrid_search("compiler", 2, 0.5).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_multi_search_runs_named_queries() -> Result<()> {
    let kb = topic_kb().await?;

    let results = kb
        .multi_search(
            &[
                ("frontend", "browser components"),
                ("storage", "vector database"),
                ("languages", "generics compiler"),
            ],
            2,
            Some(Duration::from_secs(10)),
        )
        .await?;

    assert_eq!(results.len(), 3);
    assert_eq!(results["frontend"].as_ref().unwrap()[0].id, "ui");
    assert_eq!(results["storage"].as_ref().unwrap()[0].id, "vectordb");
    assert_eq!(results["languages"].as_ref().unwrap()[0].id, "types");

    let snapshot = kb.metrics().snapshot();
    assert!(snapshot.search_requests_total >= 3.0);
    Ok(())
}
