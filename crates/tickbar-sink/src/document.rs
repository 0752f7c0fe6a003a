//! Durable summary records in a document store.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use tickbar_aggregate::OhlcvSummary;
use tickbar_types::SinkError;

use crate::{Sink, SummaryDocument};

/// Index key direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Ascending.
    Ascending,
    /// Descending.
    Descending,
}

/// A compound index over document fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexSpec {
    /// Indexed fields, in key order.
    pub keys: Vec<(&'static str, SortOrder)>,
}

impl IndexSpec {
    /// Indexes used for summary documents: `(symbol, minute_start)` for
    /// lookups and `created_at` descending for recency scans.
    ///
    /// Neither index is unique; replays after a restart may insert duplicates.
    #[must_use]
    pub fn summary_indexes() -> Vec<Self> {
        vec![
            Self {
                keys: vec![
                    ("symbol", SortOrder::Ascending),
                    ("minute_start", SortOrder::Ascending),
                ],
            },
            Self {
                keys: vec![("created_at", SortOrder::Descending)],
            },
        ]
    }
}

/// Client for a store that accepts summary documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates the given indexes if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn ensure_indexes(&self, indexes: &[IndexSpec]) -> Result<(), SinkError>;

    /// Inserts one document, returning its store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert failed.
    async fn insert(&self, document: &SummaryDocument) -> Result<String, SinkError>;
}

/// Writes each summary as a [`SummaryDocument`].
#[derive(Debug, Clone)]
pub struct DocumentSink<S> {
    store: S,
}

impl<S: DocumentStore> DocumentSink<S> {
    /// Creates a sink over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: DocumentStore> Sink for DocumentSink<S> {
    fn name(&self) -> &str {
        "document"
    }

    async fn ready(&self) -> Result<(), SinkError> {
        self.store
            .ensure_indexes(&IndexSpec::summary_indexes())
            .await
    }

    async fn deliver(&self, summary: &OhlcvSummary) -> Result<(), SinkError> {
        let document = SummaryDocument::new(summary, Utc::now());
        let id = self.store.insert(&document).await?;
        tracing::debug!(symbol = %summary.symbol, id = %id, "summary document inserted");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryDocuments {
    documents: Vec<(String, SummaryDocument)>,
    indexes: Vec<IndexSpec>,
    unavailable: bool,
}

/// In-process [`DocumentStore`].
///
/// Clones share the same storage, so a handle kept outside the dispatcher
/// can inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<Mutex<MemoryDocuments>>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`SinkError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Returns all stored documents in insertion order.
    #[must_use]
    pub fn documents(&self) -> Vec<SummaryDocument> {
        self.lock()
            .documents
            .iter()
            .map(|(_, document)| document.clone())
            .collect()
    }

    /// Returns the indexes created so far.
    #[must_use]
    pub fn indexes(&self) -> Vec<IndexSpec> {
        self.lock().indexes.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryDocuments> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ensure_indexes(&self, indexes: &[IndexSpec]) -> Result<(), SinkError> {
        let mut inner = self.lock();
        if inner.unavailable {
            return Err(SinkError::Unavailable("document store offline".to_string()));
        }
        for index in indexes {
            if !inner.indexes.contains(index) {
                inner.indexes.push(index.clone());
            }
        }
        Ok(())
    }

    async fn insert(&self, document: &SummaryDocument) -> Result<String, SinkError> {
        let mut inner = self.lock();
        if inner.unavailable {
            return Err(SinkError::Unavailable("document store offline".to_string()));
        }
        let id = uuid::Uuid::new_v4().to_string();
        inner.documents.push((id.clone(), document.clone()));
        Ok(id)
    }
}
