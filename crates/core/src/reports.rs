//! Report save entry point.
//!
//! The admin UI's "save report" action maps to a single call here: snapshot
//! the pre-save live state, write the new content, and — when the save is
//! flagged as completing a session — run the completion workflow.

use crate::author::Author;
use crate::completion::{CompletionOutcome, CompletionWorkflow};
use crate::config::CoreConfig;
use crate::constants::{FIELD_REPORT, FIELD_TOTAL_SESSIONS_REQUIRED, PATIENTS_COLLECTION};
use crate::docs::{decode_record, encode_record};
use crate::error::{LedgerError, LedgerResult};
use crate::versions::VersionStore;
use careledger_store::DocumentStore;
use careledger_types::{PatientRecord, ReportContent};
use serde_json::{json, Value};
use std::sync::Arc;

/// What a report save did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveReportOutcome {
    /// Version number assigned to the pre-save snapshot, when one was taken.
    pub snapshot_version: Option<u32>,
    /// Present when the save also ran the completion workflow.
    pub completion: Option<CompletionOutcome>,
}

/// Orchestrates report saves over the version store and completion workflow.
#[derive(Clone, Debug)]
pub struct ReportService<S> {
    store: Arc<S>,
    versions: VersionStore<S>,
    completion: CompletionWorkflow<S>,
}

impl<S: DocumentStore> ReportService<S> {
    pub fn new(store: Arc<S>, cfg: Arc<CoreConfig>) -> Self {
        let versions = VersionStore::new(Arc::clone(&store));
        let completion = CompletionWorkflow::new(Arc::clone(&store), cfg);
        Self {
            store,
            versions,
            completion,
        }
    }

    /// Save new report content for a patient.
    ///
    /// The pre-save live state is snapshotted first (unless empty), then the
    /// live record is overwritten. A prescribed session total on the new
    /// content is carried onto the patient record. When the save is flagged
    /// `session_completed`, the completion workflow runs afterwards; its
    /// per-step outcome is returned rather than unwound on partial failure.
    pub fn save_report(
        &self,
        patient_id: &str,
        new_content: &ReportContent,
        author: &Author,
    ) -> LedgerResult<SaveReportOutcome> {
        let patient_doc = self
            .store
            .get(PATIENTS_COLLECTION, patient_id)?
            .ok_or_else(|| LedgerError::PatientNotFound(patient_id.to_owned()))?;
        let patient: PatientRecord = decode_record(&patient_doc)?;

        let snapshot_version = self
            .versions
            .save_snapshot(patient_id, &patient.report, author)?;

        let mut fields: Vec<(String, Value)> =
            vec![(FIELD_REPORT.into(), encode_record(new_content)?)];
        if let Some(total) = new_content.total_sessions_required {
            fields.push((FIELD_TOTAL_SESSIONS_REQUIRED.into(), json!(total)));
        }
        self.store
            .update_fields(PATIENTS_COLLECTION, patient_id, &fields)?;

        let completion = if new_content.session_completed {
            Some(self.completion.run(patient_id, new_content.report_date)?)
        } else {
            None
        };

        Ok(SaveReportOutcome {
            snapshot_version,
            completion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_appointment, seed_patient, test_author, test_cfg};
    use careledger_store::MemoryStore;
    use careledger_types::AppointmentStatus;
    use chrono::{TimeZone, Utc};

    fn report(diagnosis: &str) -> ReportContent {
        ReportContent {
            diagnosis: diagnosis.into(),
            ..Default::default()
        }
    }

    fn service(store: &Arc<MemoryStore>) -> ReportService<MemoryStore> {
        ReportService::new(Arc::clone(store), test_cfg())
    }

    fn live_report(store: &MemoryStore, patient_id: &str) -> ReportContent {
        let patient: PatientRecord = decode_record(
            &store
                .get(PATIENTS_COLLECTION, patient_id)
                .expect("get should succeed")
                .expect("patient should exist"),
        )
        .expect("patient should decode");
        patient.report
    }

    #[test]
    fn saving_snapshots_the_previous_state_and_overwrites_the_live_record() {
        let store = Arc::new(MemoryStore::new());
        seed_patient(&store, "p-1", "GENERAL", None, report("old dx"));

        let outcome = service(&store)
            .save_report("p-1", &report("new dx"), &test_author())
            .expect("save should succeed");

        assert_eq!(outcome.snapshot_version, Some(1));
        assert_eq!(outcome.completion, None);
        assert_eq!(live_report(&store, "p-1").diagnosis, "new dx");
    }

    #[test]
    fn saving_over_an_empty_report_creates_no_version() {
        let store = Arc::new(MemoryStore::new());
        seed_patient(&store, "p-1", "GENERAL", None, ReportContent::default());

        let outcome = service(&store)
            .save_report("p-1", &report("first dx"), &test_author())
            .expect("save should succeed");

        assert_eq!(
            outcome.snapshot_version, None,
            "an empty pre-save state must not pollute the history"
        );
    }

    #[test]
    fn a_prescribed_total_is_carried_onto_the_patient() {
        let store = Arc::new(MemoryStore::new());
        seed_patient(&store, "p-1", "GENERAL", None, ReportContent::default());

        let content = ReportContent {
            diagnosis: "dx".into(),
            total_sessions_required: Some(8),
            ..Default::default()
        };
        service(&store)
            .save_report("p-1", &content, &test_author())
            .expect("save should succeed");

        let patient: PatientRecord = decode_record(
            &store
                .get(PATIENTS_COLLECTION, "p-1")
                .expect("get should succeed")
                .expect("patient should exist"),
        )
        .expect("patient should decode");
        assert_eq!(patient.total_sessions_required, Some(8));
    }

    #[test]
    fn a_session_completed_save_runs_the_workflow() {
        let store = Arc::new(MemoryStore::new());
        seed_patient(&store, "p-1", "DYES", Some(5), report("old dx"));
        seed_appointment(
            &store,
            "a-1",
            "p-1",
            AppointmentStatus::Ongoing,
            Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap(),
        );

        let content = ReportContent {
            diagnosis: "new dx".into(),
            session_completed: true,
            ..Default::default()
        };
        let outcome = service(&store)
            .save_report("p-1", &content, &test_author())
            .expect("save should succeed");

        assert_eq!(outcome.snapshot_version, Some(1));
        let completion = outcome.completion.expect("workflow should have run");
        assert_eq!(completion.appointment_id.as_deref(), Some("a-1"));
        assert!(completion.transition.is_applied());
        assert_eq!(completion.remaining_sessions, Some(3));
    }

    #[test]
    fn saving_for_an_unknown_patient_fails() {
        let store = Arc::new(MemoryStore::new());
        let err = service(&store)
            .save_report("ghost", &report("dx"), &test_author())
            .expect_err("unknown patient should fail");
        assert!(matches!(err, LedgerError::PatientNotFound(_)));
    }
}
