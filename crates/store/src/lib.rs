//! Abstract document store interface for the CareLedger core.
//!
//! The production system runs against a managed document store that offers
//! per-collection atomic batch writes, equality queries with optional
//! server-side ordering, and server-assigned timestamps — but no
//! cross-collection transactions. This crate captures exactly that contract as
//! the [`DocumentStore`] trait so the business logic can be exercised against
//! the in-memory backend in [`memory`] with the same semantics, including the
//! possibility that a requested ordering has no backing index.
//!
//! ## Ordering and the index fallback
//!
//! Server-side ordering may be unavailable for any (collection, field) pair
//! because index availability cannot be assumed in the target store. Rather
//! than duplicating fallback handling at each call site,
//! [`query_with_order_fallback`] implements the two strategies once: try the
//! ordered query, and on [`StoreError::IndexUnavailable`] re-issue the fetch
//! unordered and stable-sort client-side.

pub mod error;
pub mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A stored document: the store-assigned id plus the JSON payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Equality-style filters supported by the store's query API.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Field equals the given value.
    Eq(String, Value),
    /// Field equals one of the given values.
    In(String, Vec<Value>),
}

impl Filter {
    /// Whether the given payload satisfies this filter.
    ///
    /// A missing field never matches; the store has no notion of null-equals-absent.
    pub fn matches(&self, data: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => data.get(field) == Some(expected),
            Filter::In(field, allowed) => data
                .get(field)
                .map(|actual| allowed.iter().any(|v| v == actual))
                .unwrap_or(false),
        }
    }
}

/// Sort direction for ordered queries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// An ordering request: sort by `field` in `direction`.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

/// A single operation within an atomic per-collection batch.
#[derive(Clone, Debug)]
pub enum WriteOp {
    /// Create or replace the document with the given id.
    Set { id: String, data: Value },
    /// Update the named top-level fields of an existing document.
    UpdateFields {
        id: String,
        fields: Vec<(String, Value)>,
    },
    /// Remove the document with the given id.
    Delete { id: String },
}

/// The document store contract the ledger core is written against.
///
/// Guarantees assumed by callers:
///
/// - [`apply_batch`](DocumentStore::apply_batch) is atomic within a single
///   collection: either every operation applies or none does.
/// - There are **no** cross-collection transactions.
/// - Ordered [`find`](DocumentStore::find) may fail with
///   [`StoreError::IndexUnavailable`]; unordered `find` never does.
/// - [`server_time`](DocumentStore::server_time) is the authoritative clock
///   for `createdAt`-style fields.
pub trait DocumentStore {
    /// Fetch a single document by id, or `None` if absent.
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Fetch all documents matching every filter, optionally server-ordered.
    fn find(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> StoreResult<Vec<Document>>;

    /// Insert a new document with a store-assigned id.
    fn insert(&self, collection: &str, data: Value) -> StoreResult<Document>;

    /// Create or replace the document with a caller-chosen id.
    fn set(&self, collection: &str, id: &str, data: Value) -> StoreResult<()>;

    /// Update the named top-level fields of an existing document.
    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: &[(String, Value)],
    ) -> StoreResult<()>;

    /// Delete a document by id.
    fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Apply a batch of writes atomically within one collection.
    fn apply_batch(&self, collection: &str, ops: Vec<WriteOp>) -> StoreResult<()>;

    /// The store's authoritative current time.
    fn server_time(&self) -> DateTime<Utc>;
}

/// Ordered query with a first-class index-missing fallback.
///
/// Attempts the server-ordered query; if the store reports
/// [`StoreError::IndexUnavailable`], re-issues the fetch unordered and
/// stable-sorts client-side by `sort_key`, reversing for descending order.
/// The stable sort preserves the store's relative order among equal keys.
///
/// `sort_key` must agree with the server's interpretation of `order.field`,
/// otherwise the two strategies diverge.
pub fn query_with_order_fallback<S, K, F>(
    store: &S,
    collection: &str,
    filters: &[Filter],
    order: &OrderBy,
    sort_key: F,
) -> StoreResult<Vec<Document>>
where
    S: DocumentStore + ?Sized,
    K: Ord,
    F: Fn(&Document) -> K,
{
    match store.find(collection, filters, Some(order)) {
        Ok(docs) => Ok(docs),
        Err(StoreError::IndexUnavailable { .. }) => {
            tracing::warn!(
                collection,
                field = %order.field,
                "ordered query has no index; falling back to client-side sort"
            );
            let mut docs = store.find(collection, filters, None)?;
            docs.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
            if order.direction == Direction::Descending {
                docs.reverse();
            }
            Ok(docs)
        }
        Err(e) => Err(e),
    }
}
