//! Report history controller: list, view, restore, delete.
//!
//! Thin orchestration over the version store for the admin UI's version
//! history screen. All sequence invariants live in the version store; this
//! layer only shapes the data for display (most-recent first, snapshots
//! merged over the current record for read-only inspection).

use crate::author::Author;
use crate::constants::PATIENTS_COLLECTION;
use crate::docs::decode_record;
use crate::error::{LedgerError, LedgerResult};
use crate::versions::VersionStore;
use careledger_store::DocumentStore;
use careledger_types::{PatientRecord, ReportContent, ReportVersion};
use std::sync::Arc;

/// Version-history operations exposed to the admin surface.
#[derive(Clone, Debug)]
pub struct ReportHistoryService<S> {
    store: Arc<S>,
    versions: VersionStore<S>,
}

impl<S: DocumentStore> ReportHistoryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        let versions = VersionStore::new(Arc::clone(&store));
        Self { store, versions }
    }

    /// All versions for a patient, most recent first.
    pub fn list_versions(&self, patient_id: &str) -> LedgerResult<Vec<ReportVersion>> {
        let mut versions = self.versions.list_versions(patient_id)?;
        versions.reverse();
        Ok(versions)
    }

    /// A version's snapshot merged over the current record, for inspection.
    ///
    /// Snapshot fields win where they carry content; the current record shows
    /// through elsewhere. Nothing is written.
    pub fn view_version(&self, patient_id: &str, version: u32) -> LedgerResult<ReportContent> {
        let snapshot = self
            .versions
            .find_by_number(patient_id, version)?
            .ok_or_else(|| LedgerError::VersionNotFound {
                patient_id: patient_id.to_owned(),
                version,
            })?;

        let patient_doc = self
            .store
            .get(PATIENTS_COLLECTION, patient_id)?
            .ok_or_else(|| LedgerError::PatientNotFound(patient_id.to_owned()))?;
        let patient: PatientRecord = decode_record(&patient_doc)?;

        Ok(snapshot.data.merged_over(&patient.report))
    }

    /// Restore the live report to the given version number.
    ///
    /// Returns the reloaded version list, most recent first.
    pub fn restore_version(
        &self,
        patient_id: &str,
        version: u32,
        author: &Author,
    ) -> LedgerResult<Vec<ReportVersion>> {
        let mut versions = self.versions.restore_version(patient_id, version, author)?;
        versions.reverse();
        Ok(versions)
    }

    /// Delete the given version number and renumber the remainder.
    pub fn delete_version(&self, patient_id: &str, version: u32) -> LedgerResult<()> {
        let target = self
            .versions
            .find_by_number(patient_id, version)?
            .ok_or_else(|| LedgerError::VersionNotFound {
                patient_id: patient_id.to_owned(),
                version,
            })?;
        self.versions.delete_version(patient_id, &target.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_patient, test_author};
    use careledger_store::MemoryStore;

    fn report(diagnosis: &str, notes: &str) -> ReportContent {
        ReportContent {
            diagnosis: diagnosis.into(),
            clinical_notes: notes.into(),
            ..Default::default()
        }
    }

    fn service_with_history(store: &Arc<MemoryStore>) -> ReportHistoryService<MemoryStore> {
        seed_patient(store, "p-1", "GENERAL", None, report("live dx", "live notes"));
        let service = ReportHistoryService::new(Arc::clone(store));
        for dx in ["first", "second", "third"] {
            service
                .versions
                .save_snapshot("p-1", &report(dx, ""), &test_author())
                .expect("save should succeed");
        }
        service
    }

    #[test]
    fn listing_shows_the_most_recent_version_first() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with_history(&store);

        let listed = service
            .list_versions("p-1")
            .expect("listing should succeed");
        let numbers: Vec<u32> = listed.iter().map(|v| v.version).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[test]
    fn viewing_merges_the_snapshot_over_the_current_record() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with_history(&store);

        let merged = service
            .view_version("p-1", 2)
            .expect("view should succeed");
        assert_eq!(merged.diagnosis, "second");
        assert_eq!(
            merged.clinical_notes, "live notes",
            "blank snapshot fields show the current record"
        );
    }

    #[test]
    fn viewing_a_missing_version_reports_the_precondition_failure() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with_history(&store);

        let err = service
            .view_version("p-1", 42)
            .expect_err("missing version should fail");
        assert!(matches!(err, LedgerError::VersionNotFound { .. }));
    }

    #[test]
    fn deleting_by_version_number_renumbers_and_relists() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with_history(&store);

        service
            .delete_version("p-1", 2)
            .expect("delete should succeed");

        let listed = service
            .list_versions("p-1")
            .expect("listing should succeed");
        let history: Vec<(u32, String)> = listed
            .into_iter()
            .map(|v| (v.version, v.data.diagnosis))
            .collect();
        assert_eq!(
            history,
            vec![(2, "third".into()), (1, "first".into())]
        );
    }

    #[test]
    fn restore_returns_the_refreshed_list_most_recent_first() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with_history(&store);

        let listed = service
            .restore_version("p-1", 1, &test_author())
            .expect("restore should succeed");
        assert_eq!(listed.first().map(|v| v.version), Some(4));
        assert_eq!(
            listed.first().and_then(|v| v.restored_from),
            Some(1),
            "the displaced live state is tagged with its origin"
        );
    }
}
