//! Helpers for moving records in and out of store documents.

use crate::constants::{FIELD_DATE, FIELD_VERSION};
use crate::error::{LedgerError, LedgerResult};
use careledger_store::Document;
use careledger_types::ReportVersion;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub(crate) fn decode_record<T: DeserializeOwned>(doc: &Document) -> LedgerResult<T> {
    serde_json::from_value(doc.data.clone()).map_err(LedgerError::Deserialization)
}

/// Decode a report version, carrying the store document id onto the record.
pub(crate) fn decode_version(doc: &Document) -> LedgerResult<ReportVersion> {
    let mut version: ReportVersion = decode_record(doc)?;
    version.id = doc.id.clone();
    Ok(version)
}

pub(crate) fn encode_record<T: Serialize>(record: &T) -> LedgerResult<Value> {
    serde_json::to_value(record).map_err(LedgerError::Serialization)
}

/// Sort key for ordering snapshot documents by their stored version number.
///
/// Documents with a missing or malformed version sort first, mirroring the
/// store's treatment of absent fields in ordered queries.
pub(crate) fn version_sort_key(doc: &Document) -> Option<u64> {
    doc.data.get(FIELD_VERSION).and_then(Value::as_u64)
}

/// Sort key for ordering appointment documents chronologically.
pub(crate) fn date_sort_key(doc: &Document) -> Option<DateTime<Utc>> {
    doc.data
        .get(FIELD_DATE)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}
