/// Errors surfaced by document store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The referenced document does not exist in the collection.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    /// An ordered query was requested but no matching index exists.
    ///
    /// Callers are expected to fall back to an unordered fetch plus a
    /// client-side sort; see `query_with_order_fallback`.
    #[error("no index available for ordering {collection} by '{field}'")]
    IndexUnavailable { collection: String, field: String },
    /// The store rejected or failed the operation (network, quota, outage).
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    /// A write payload was not a JSON object.
    #[error("document payload must be a JSON object")]
    InvalidPayload,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
