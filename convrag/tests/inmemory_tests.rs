//! Property tests for in-memory vector store search ordering.

use convrag::{InMemoryVectorStore, IndexedFragment, RagError, VectorStore};
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

fn arb_fragment(dim: usize) -> impl Strategy<Value = IndexedFragment> {
    ("[a-z ]{5,30}", arb_normalized_embedding(dim))
        .prop_map(|(text, embedding)| IndexedFragment { text, embedding })
}

/// Searching returns at most `limit` hits, in descending cosine similarity,
/// and every stored fragment is reachable with a large enough limit.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_limit(
            fragments in proptest::collection::vec(arb_fragment(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            limit in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, all) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("conversation_1", DIM).await.unwrap();
                store.insert("conversation_1", &fragments).await.unwrap();
                let results = store.search("conversation_1", &query, limit).await.unwrap();
                let all = store.search("conversation_1", &query, usize::MAX).await.unwrap();
                (results, all)
            });

            prop_assert_eq!(results.len(), limit.min(fragments.len()));
            prop_assert_eq!(all.len(), fragments.len());

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}

#[tokio::test]
async fn insert_into_missing_collection_fails() {
    let store = InMemoryVectorStore::new();
    let fragment = IndexedFragment { text: "x".to_string(), embedding: vec![1.0] };
    let err = store.insert("conversation_1", &[fragment]).await.unwrap_err();
    assert!(matches!(err, RagError::CollectionNotFound { .. }));
}

#[tokio::test]
async fn equal_scores_keep_insertion_order() {
    let store = InMemoryVectorStore::new();
    store.create_collection("c", 2).await.unwrap();
    let fragments: Vec<IndexedFragment> = ["first", "second", "third"]
        .iter()
        .map(|t| IndexedFragment { text: t.to_string(), embedding: vec![1.0, 0.0] })
        .collect();
    store.insert("c", &fragments).await.unwrap();

    let hits = store.search("c", &[1.0, 0.0], 3).await.unwrap();
    let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn create_is_noop_and_drop_is_idempotent() {
    let store = InMemoryVectorStore::new();
    store.create_collection("c", 3).await.unwrap();
    store.create_collection("c", 5).await.unwrap();
    assert_eq!(store.collection_dimensions("c").await.unwrap(), Some(3));

    store.drop_collection("c").await.unwrap();
    store.drop_collection("c").await.unwrap();
    assert!(!store.has_collection("c").await.unwrap());
}
