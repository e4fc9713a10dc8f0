//! Data types for conversations, fragments, and query responses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one conversation's indexed document.
///
/// Supplied by the caller and trusted; it is the namespace key for the
/// conversation's vector store collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl ConversationId {
    /// The collection name holding this conversation's fragments.
    ///
    /// Stable for a given id: `conversation_{id}`.
    pub fn collection_name(&self) -> String {
        format!("conversation_{}", self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A contiguous slice of source text produced by a [`Chunker`](crate::Chunker).
///
/// Fragments are returned in document order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fragment {
    /// The fragment text.
    pub text: String,
}

impl Fragment {
    /// Create a fragment from any string-like value.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A [`Fragment`] paired with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedFragment {
    /// The fragment text.
    pub text: String,
    /// The embedding of `text`; its length must equal the collection dimension.
    pub embedding: Vec<f32>,
}

/// A stored fragment text returned by a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredFragment {
    /// The stored fragment text.
    pub text: String,
    /// Similarity to the query vector (higher is closer).
    pub score: f32,
}

/// The externally visible result of a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    /// The query as received.
    pub query: String,
    /// The generated answer.
    pub answer: String,
    /// The reranked fragments used to ground `answer`, most relevant first.
    pub contexts: Vec<String>,
}

/// Lifecycle state of a conversation's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// No collection exists for the conversation.
    Empty,
    /// A collection exists (possibly with zero fragments).
    Indexed,
}

/// Summary of one completed ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    /// The conversation that was (re)indexed.
    pub conversation_id: ConversationId,
    /// The collection the fragments were written to.
    pub collection: String,
    /// Number of fragments stored.
    pub fragment_count: usize,
    /// Embedding dimension of the collection.
    pub dimensions: usize,
}
