//! Report version store and renumbering service.
//!
//! Every save that would overwrite non-empty report content first snapshots
//! the pre-save state into the versions collection, tagged with a contiguous
//! sequence number. For a fixed patient the stored version numbers are exactly
//! `1..=N`; deleting a version triggers renumbering so subsequent reads always
//! observe contiguity. Snapshots themselves are never mutated in place.
//!
//! Ordered queries against the versions collection go through
//! [`query_with_order_fallback`] because the target store's secondary index on
//! the version field cannot be assumed to exist.

use crate::author::Author;
use crate::constants::{
    FIELD_PATIENT_ID, FIELD_REPORT, FIELD_VERSION, PATIENTS_COLLECTION,
    REPORT_VERSIONS_COLLECTION,
};
use crate::docs::{decode_record, decode_version, encode_record, version_sort_key};
use crate::error::{LedgerError, LedgerResult};
use careledger_store::{query_with_order_fallback, Document, DocumentStore, Filter, OrderBy, WriteOp};
use careledger_types::{PatientRecord, ReportContent, ReportVersion};
use serde_json::json;
use std::sync::Arc;

/// Persists and maintains the per-patient report version history.
#[derive(Clone, Debug)]
pub struct VersionStore<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> VersionStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn patient_filter(patient_id: &str) -> Filter {
        Filter::Eq(FIELD_PATIENT_ID.into(), json!(patient_id))
    }

    fn fetch_ascending(&self, patient_id: &str) -> LedgerResult<Vec<Document>> {
        let docs = query_with_order_fallback(
            self.store.as_ref(),
            REPORT_VERSIONS_COLLECTION,
            &[Self::patient_filter(patient_id)],
            &OrderBy::ascending(FIELD_VERSION),
            version_sort_key,
        )?;
        Ok(docs)
    }

    /// All stored versions for a patient, ascending by version number.
    pub fn list_versions(&self, patient_id: &str) -> LedgerResult<Vec<ReportVersion>> {
        self.fetch_ascending(patient_id)?
            .iter()
            .map(decode_version)
            .collect()
    }

    /// Look up a single version by its sequence number.
    pub fn find_by_number(
        &self,
        patient_id: &str,
        version: u32,
    ) -> LedgerResult<Option<ReportVersion>> {
        let docs = self.store.find(
            REPORT_VERSIONS_COLLECTION,
            &[
                Self::patient_filter(patient_id),
                Filter::Eq(FIELD_VERSION.into(), json!(version)),
            ],
            None,
        )?;
        docs.first().map(decode_version).transpose()
    }

    fn next_version_number(&self, patient_id: &str) -> LedgerResult<u32> {
        let docs = query_with_order_fallback(
            self.store.as_ref(),
            REPORT_VERSIONS_COLLECTION,
            &[Self::patient_filter(patient_id)],
            &OrderBy::descending(FIELD_VERSION),
            version_sort_key,
        )?;
        let highest = docs.first().and_then(version_sort_key).unwrap_or(0);
        u32::try_from(highest + 1).map_err(|_| {
            LedgerError::InvalidInput(format!(
                "stored version number out of range for patient {patient_id}"
            ))
        })
    }

    fn write_snapshot(
        &self,
        patient_id: &str,
        content: &ReportContent,
        created_by: &str,
        restored_from: Option<u32>,
    ) -> LedgerResult<u32> {
        let version = self.next_version_number(patient_id)?;
        let record = ReportVersion {
            id: String::new(),
            patient_id: patient_id.to_owned(),
            version,
            created_at: self.store.server_time(),
            created_by: created_by.to_owned(),
            data: content.clone(),
            restored_from,
        };
        self.store
            .insert(REPORT_VERSIONS_COLLECTION, encode_record(&record)?)?;
        tracing::info!(patient_id, version, ?restored_from, "report snapshot written");
        Ok(version)
    }

    /// Snapshot the given live report state as the next trailing version.
    ///
    /// Returns `None` without writing when the content has no semantic
    /// clinical fields set, so no-op saves never pollute the history.
    pub fn save_snapshot(
        &self,
        patient_id: &str,
        current: &ReportContent,
        author: &Author,
    ) -> LedgerResult<Option<u32>> {
        if !current.has_clinical_content() {
            tracing::debug!(patient_id, "live report is empty; skipping snapshot");
            return Ok(None);
        }
        Ok(Some(self.write_snapshot(
            patient_id,
            current,
            author.name(),
            None,
        )?))
    }

    /// Restore version-number contiguity for a patient's history.
    ///
    /// Fetches all versions (ascending, with the index fallback preserving
    /// relative order by previous version value via a stable sort) and
    /// compares against the expected `1..=N` sequence. Already-contiguous
    /// histories produce no writes, which makes re-invocation after a partial
    /// failure safe. Otherwise a single atomic batch rewrites only the
    /// documents whose number differs from their ascending position.
    pub fn renumber_sequentially(&self, patient_id: &str) -> LedgerResult<()> {
        let docs = self.fetch_ascending(patient_id)?;

        let mut ops = Vec::new();
        for (position, doc) in docs.iter().enumerate() {
            let expected = (position + 1) as u64;
            if version_sort_key(doc) != Some(expected) {
                ops.push(WriteOp::UpdateFields {
                    id: doc.id.clone(),
                    fields: vec![(FIELD_VERSION.into(), json!(expected))],
                });
            }
        }

        if ops.is_empty() {
            return Ok(());
        }

        tracing::info!(patient_id, rewritten = ops.len(), "renumbering report versions");
        self.store.apply_batch(REPORT_VERSIONS_COLLECTION, ops)?;
        Ok(())
    }

    /// Delete a single version document, then renumber the remainder.
    ///
    /// The deletion is not rolled back if renumbering fails; the sequence is
    /// then temporarily non-contiguous and the error is surfaced so the caller
    /// can retry renumbering later.
    pub fn delete_version(&self, patient_id: &str, version_id: &str) -> LedgerResult<()> {
        self.store.delete(REPORT_VERSIONS_COLLECTION, version_id)?;

        if let Err(e) = self.renumber_sequentially(patient_id) {
            tracing::warn!(
                patient_id,
                version_id,
                error = %e,
                "renumbering failed after version delete; sequence temporarily non-contiguous"
            );
            return Err(e);
        }
        Ok(())
    }

    /// Restore the live report to the state captured in `target_version`.
    ///
    /// The pre-restore live state is never silently discarded: when non-empty
    /// it is written as a new trailing version tagged with the version number
    /// it was displaced by, so it remains recoverable as the snapshot
    /// immediately preceding the restore. Returns the reloaded version list
    /// so callers observe a consistent view.
    pub fn restore_version(
        &self,
        patient_id: &str,
        target_version: u32,
        author: &Author,
    ) -> LedgerResult<Vec<ReportVersion>> {
        let target = self
            .find_by_number(patient_id, target_version)?
            .ok_or_else(|| LedgerError::VersionNotFound {
                patient_id: patient_id.to_owned(),
                version: target_version,
            })?;

        let patient_doc = self
            .store
            .get(PATIENTS_COLLECTION, patient_id)?
            .ok_or_else(|| LedgerError::PatientNotFound(patient_id.to_owned()))?;
        let patient: PatientRecord = decode_record(&patient_doc)?;

        if patient.report.has_clinical_content() {
            self.write_snapshot(
                patient_id,
                &patient.report,
                author.name(),
                Some(target.version),
            )?;
        }

        self.store.update_fields(
            PATIENTS_COLLECTION,
            patient_id,
            &[(FIELD_REPORT.into(), encode_record(&target.data)?)],
        )?;

        tracing::info!(patient_id, restored = target.version, "report restored");
        self.list_versions(patient_id)
    }
}
