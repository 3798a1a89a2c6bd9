use anyhow::Result;
use std::sync::Arc;

use docrag::search::cosine_similarity;
use docrag::{Config, KnowledgeBase, MetadataFilter, Provenance, SearchResult};

use crate::helpers::fake_embeddings::{
    duplicate_cluster_corpus, topic_corpus, VocabularyEmbedder, CLUSTER_VOCABULARY,
    TOPIC_VOCABULARY,
};

async fn knowledge_base(
    vocabulary: &[&str],
    corpus: Vec<docrag::DocumentChunk>,
) -> Result<KnowledgeBase> {
    let kb = KnowledgeBase::new(
        Arc::new(VocabularyEmbedder::new(vocabulary)),
        &Config::default(),
    )?;
    kb.ingest(corpus).await?;
    Ok(kb)
}

fn ids(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

fn from_cluster(results: &[SearchResult]) -> usize {
    results
        .iter()
        .filter(|r| r.metadata.source.as_deref() == Some("rust-book"))
        .count()
}

#[tokio::test]
async fn test_topic_specific_query_ranks_its_document_first() -> Result<()> {
    let kb = knowledge_base(TOPIC_VOCABULARY, topic_corpus()).await?;

    let results = kb
        .similarity_search("nearest vector embeddings in a database index", 2)
        .await?;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "vectordb");
    assert!(results[0].score > results[1].score);
    assert!(results.iter().all(|r| r.provenance == Provenance::Vector));

    // Strictly above every other document, not only the runner-up
    let all = kb
        .similarity_search("nearest vector embeddings in a database index", 4)
        .await?;
    assert!(all[1..].iter().all(|r| r.score < all[0].score));

    Ok(())
}

#[tokio::test]
async fn test_proper_nouns_have_a_single_keyword_hit() -> Result<()> {
    let corpus = vec![
        docrag::DocumentChunk::new(
            "engine",
            "Ada Lovelace published the first algorithm for Charles Babbage's Analytical Engine.",
        ),
        docrag::DocumentChunk::new("enigma", "Alan Turing worked on breaking the Enigma cipher."),
        docrag::DocumentChunk::new("eniac", "ENIAC was programmed by a team of six women."),
    ];
    let kb = knowledge_base(&["engine", "cipher"], corpus).await?;

    let results = kb.keyword_search("Lovelace Babbage", 10);

    assert_eq!(ids(&results), vec!["engine"]);
    assert!(results[0].score > 0.0);
    Ok(())
}

#[tokio::test]
async fn test_mmr_limits_near_duplicates() -> Result<()> {
    let kb = knowledge_base(CLUSTER_VOCABULARY, duplicate_cluster_corpus()).await?;
    let query = "rust ownership borrowing";

    let similar = kb.similarity_search(query, 3).await?;
    let diverse = kb.max_marginal_relevance_search(query, 3, 0.1).await?;

    assert_eq!(from_cluster(&similar), 3);
    assert!(from_cluster(&diverse) <= 2);
    assert!(from_cluster(&diverse) < from_cluster(&similar));
    assert!(ids(&diverse).contains(&"garden#0"));
    Ok(())
}

#[tokio::test]
async fn test_mmr_with_full_relevance_matches_similarity() -> Result<()> {
    let kb = knowledge_base(CLUSTER_VOCABULARY, duplicate_cluster_corpus()).await?;
    let query = "rust lifetimes memory";

    let similar = kb.similarity_search(query, 3).await?;
    let mmr = kb.max_marginal_relevance_search(query, 3, 1.0).await?;

    assert_eq!(ids(&mmr), ids(&similar));
    Ok(())
}

#[tokio::test]
async fn test_repeated_searches_are_identical() -> Result<()> {
    let kb = knowledge_base(TOPIC_VOCABULARY, topic_corpus()).await?;

    let first = kb.similarity_search("framework components", 4).await?;
    for _ in 0..5 {
        assert_eq!(kb.similarity_search("framework components", 4).await?, first);
    }
    for pair in first.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    Ok(())
}

#[tokio::test]
async fn test_filters_never_leak_excluded_documents() -> Result<()> {
    let kb = knowledge_base(TOPIC_VOCABULARY, topic_corpus()).await?;

    let not_storage = MetadataFilter::Not {
        filter: Box::new(MetadataFilter::field("topic", "storage")),
    };
    let results = kb
        .similarity_search_with_filter("vector database", 4, &not_storage)
        .await?;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.id != "vectordb"));

    let reviewed = MetadataFilter::HasField {
        key: "reviewed".to_string(),
    };
    let results = kb
        .similarity_search_with_filter("vector database", 4, &reviewed)
        .await?;
    assert_eq!(ids(&results), vec!["types"]);

    let nothing = MetadataFilter::source("missing.md");
    assert!(kb
        .similarity_search_with_filter("vector database", 4, &nothing)
        .await?
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn test_search_by_vector_uses_stored_vectors() -> Result<()> {
    let kb = knowledge_base(TOPIC_VOCABULARY, topic_corpus()).await?;
    let stored = kb.documents();
    let types = stored.iter().find(|d| d.id == "types").unwrap();

    let results = kb.similarity_search_by_vector(&types.vector, 1)?;

    assert_eq!(results[0].id, "types");
    assert!((cosine_similarity(&types.vector, &types.vector)? - 1.0).abs() < 1e-5);
    assert!((results[0].score - 1.0).abs() < 1e-5);
    Ok(())
}

#[tokio::test]
async fn test_results_carry_metadata_not_vectors() -> Result<()> {
    let kb = knowledge_base(TOPIC_VOCABULARY, topic_corpus()).await?;

    let results = kb.similarity_search("type compiler generics", 1).await?;
    let json = serde_json::to_value(&results[0])?;

    assert_eq!(json["id"], "types");
    assert_eq!(json["metadata"]["source"], "types.md");
    assert_eq!(json["metadata"]["topic"], "languages");
    assert_eq!(json["provenance"], "vector");
    assert!(json.get("vector").is_none());
    Ok(())
}
