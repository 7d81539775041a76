//! In-memory document store backend.
//!
//! Used by tests and the local development loop. It honours the same contract
//! as the managed store: per-collection atomic batches, equality filters, and
//! optional server-side ordering that can be made to fail with
//! [`StoreError::IndexUnavailable`] so callers' fallback paths are exercised
//! as first-class paths rather than dead code.

use crate::error::{StoreError, StoreResult};
use crate::{Direction, Document, DocumentStore, Filter, OrderBy, WriteOp};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

type Collection = BTreeMap<String, Value>;

/// An in-process [`DocumentStore`].
///
/// Documents within a collection iterate in id order, which stands in for the
/// store's unspecified unordered-fetch order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Collection>>,
    missing_indexes: HashSet<(String, String)>,
}

impl MemoryStore {
    /// Create an empty store with every ordering index available.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the ordering index for `(collection, field)`.
    ///
    /// Subsequent ordered queries on that pair fail with
    /// [`StoreError::IndexUnavailable`], simulating a store deployment where
    /// the secondary index was never created.
    pub fn without_index(mut self, collection: &str, field: &str) -> Self {
        self.missing_indexes
            .insert((collection.to_owned(), field.to_owned()));
        self
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, Collection>>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store mutex poisoned".into()))
    }
}

/// Total order over optional JSON values for server-side sorting.
///
/// Absent fields sort first, then nulls, booleans, numbers, strings, and
/// finally composite values (compared by their JSON rendering).
fn compare_field_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(Value::Array(_)) | Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(_)), Some(Value::Array(_)))
        | (Some(Value::Object(_)), Some(Value::Object(_))) => {
            a.map(Value::to_string).cmp(&b.map(Value::to_string))
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn apply_op(collection: &mut Collection, collection_name: &str, op: WriteOp) -> StoreResult<()> {
    match op {
        WriteOp::Set { id, data } => {
            if !data.is_object() {
                return Err(StoreError::InvalidPayload);
            }
            collection.insert(id, data);
            Ok(())
        }
        WriteOp::UpdateFields { id, fields } => {
            let existing = collection.get_mut(&id).ok_or_else(|| StoreError::NotFound {
                collection: collection_name.to_owned(),
                id: id.clone(),
            })?;
            let object = existing.as_object_mut().ok_or(StoreError::InvalidPayload)?;
            for (field, value) in fields {
                object.insert(field, value);
            }
            Ok(())
        }
        WriteOp::Delete { id } => {
            collection.remove(&id).ok_or_else(|| StoreError::NotFound {
                collection: collection_name.to_owned(),
                id,
            })?;
            Ok(())
        }
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let inner = self.lock()?;
        Ok(inner.get(collection).and_then(|c| c.get(id)).map(|data| Document {
            id: id.to_owned(),
            data: data.clone(),
        }))
    }

    fn find(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> StoreResult<Vec<Document>> {
        if let Some(order) = order {
            let key = (collection.to_owned(), order.field.clone());
            if self.missing_indexes.contains(&key) {
                return Err(StoreError::IndexUnavailable {
                    collection: collection.to_owned(),
                    field: order.field.clone(),
                });
            }
        }

        let inner = self.lock()?;
        let mut docs: Vec<Document> = inner
            .get(collection)
            .map(|c| {
                c.iter()
                    .filter(|(_, data)| filters.iter().all(|f| f.matches(data)))
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order {
            docs.sort_by(|a, b| {
                compare_field_values(a.data.get(&order.field), b.data.get(&order.field))
            });
            if order.direction == Direction::Descending {
                docs.reverse();
            }
        }

        Ok(docs)
    }

    fn insert(&self, collection: &str, data: Value) -> StoreResult<Document> {
        if !data.is_object() {
            return Err(StoreError::InvalidPayload);
        }
        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut inner = self.lock()?;
        inner
            .entry(collection.to_owned())
            .or_default()
            .insert(id.clone(), data.clone());
        Ok(Document { id, data })
    }

    fn set(&self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        if !data.is_object() {
            return Err(StoreError::InvalidPayload);
        }
        let mut inner = self.lock()?;
        inner
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), data);
        Ok(())
    }

    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: &[(String, Value)],
    ) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let coll = inner
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            })?;
        apply_op(
            coll,
            collection,
            WriteOp::UpdateFields {
                id: id.to_owned(),
                fields: fields.to_vec(),
            },
        )
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let coll = inner
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            })?;
        apply_op(coll, collection, WriteOp::Delete { id: id.to_owned() })
    }

    fn apply_batch(&self, collection: &str, ops: Vec<WriteOp>) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let coll = inner.entry(collection.to_owned()).or_default();

        // All-or-nothing: stage against a copy, commit only on full success.
        let mut staged = coll.clone();
        for op in ops {
            apply_op(&mut staged, collection, op)?;
        }
        *coll = staged;
        Ok(())
    }

    fn server_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_upserts_and_get_round_trips() {
        let store = MemoryStore::new();
        store
            .set("patients", "p-1", json!({"name": "Kim"}))
            .expect("set should succeed");
        store
            .set("patients", "p-1", json!({"name": "Kim", "status": "ongoing"}))
            .expect("overwrite should succeed");

        let doc = store
            .get("patients", "p-1")
            .expect("get should succeed")
            .expect("document should exist");
        assert_eq!(doc.data["status"], "ongoing");
    }

    #[test]
    fn find_applies_all_filters() {
        let store = MemoryStore::new();
        for (id, status) in [("a-1", "pending"), ("a-2", "completed"), ("a-3", "ongoing")] {
            store
                .set(
                    "appointments",
                    id,
                    json!({"patientId": "p-1", "status": status}),
                )
                .expect("set should succeed");
        }
        store
            .set(
                "appointments",
                "a-9",
                json!({"patientId": "p-2", "status": "pending"}),
            )
            .expect("set should succeed");

        let open = store
            .find(
                "appointments",
                &[
                    Filter::Eq("patientId".into(), json!("p-1")),
                    Filter::In("status".into(), vec![json!("pending"), json!("ongoing")]),
                ],
                None,
            )
            .expect("find should succeed");
        let mut ids: Vec<_> = open.iter().map(|d| d.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a-1", "a-3"]);
    }

    #[test]
    fn ordered_find_fails_without_an_index() {
        let store = MemoryStore::new().without_index("reportVersions", "version");
        let err = store
            .find(
                "reportVersions",
                &[],
                Some(&OrderBy::ascending("version")),
            )
            .expect_err("ordered query should fail without an index");
        assert!(matches!(err, StoreError::IndexUnavailable { .. }));

        store
            .find("reportVersions", &[], None)
            .expect("unordered query should still succeed");
    }

    #[test]
    fn ordered_find_sorts_numbers_numerically() {
        let store = MemoryStore::new();
        for version in [10u32, 2, 1] {
            store
                .insert("reportVersions", json!({"version": version}))
                .expect("insert should succeed");
        }

        let docs = store
            .find("reportVersions", &[], Some(&OrderBy::ascending("version")))
            .expect("ordered find should succeed");
        let versions: Vec<u64> = docs
            .iter()
            .map(|d| d.data["version"].as_u64().expect("version should be a number"))
            .collect();
        assert_eq!(versions, vec![1, 2, 10]);
    }

    #[test]
    fn failed_batch_leaves_collection_untouched() {
        let store = MemoryStore::new();
        store
            .set("billing", "b-1", json!({"paid": false}))
            .expect("set should succeed");

        let err = store
            .apply_batch(
                "billing",
                vec![
                    WriteOp::UpdateFields {
                        id: "b-1".into(),
                        fields: vec![("paid".into(), json!(true))],
                    },
                    WriteOp::Delete { id: "missing".into() },
                ],
            )
            .expect_err("batch with a bad op should fail");
        assert!(matches!(err, StoreError::NotFound { .. }));

        let doc = store
            .get("billing", "b-1")
            .expect("get should succeed")
            .expect("document should exist");
        assert_eq!(
            doc.data["paid"], false,
            "partial batch must not have been applied"
        );
    }
}
