//! The session completion workflow.
//!
//! Triggered when an admin saves a report flagged as completing a treatment
//! session. The workflow runs as an explicit saga: locate the open
//! appointment, transition it, update the session ledger, create billing for
//! auto-billed patient types, and sweep the patient's overall status. The
//! target store has no cross-collection transactions, so each step is
//! independently fallible, individually logged, and never rolled back by a
//! later step's failure; the per-step outcome record lets repair tooling
//! target exactly the step that failed.

use crate::config::CoreConfig;
use crate::constants::{
    APPOINTMENTS_COLLECTION, BILLING_COLLECTION, FIELD_DATE, FIELD_PATIENT_ID,
    FIELD_REMAINING_SESSIONS, FIELD_STATUS, PATIENTS_COLLECTION,
};
use crate::docs::{date_sort_key, decode_record, encode_record};
use crate::error::LedgerResult;
use crate::sessions::{compute_remaining_with, LedgerUpdate, SessionLedger};
use careledger_store::{query_with_order_fallback, DocumentStore, Filter, OrderBy};
use careledger_types::{
    Appointment, AppointmentStatus, BillingRecord, PatientRecord, PatientStatus,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::Arc;

/// The result of one workflow step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step ran and changed state.
    Applied,
    /// The step had nothing to do; the reason says why.
    Skipped(String),
    /// The step failed; the failure was logged and later steps still ran.
    Failed(String),
}

impl StepOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied)
    }

    fn skipped(reason: &str) -> Self {
        StepOutcome::Skipped(reason.to_owned())
    }
}

/// Per-step record of a completion workflow run.
///
/// Callers must treat the workflow as best effort and eventually consistent:
/// an `Applied` appointment transition next to a `Failed` billing step is a
/// valid outcome, repaired later via [`CompletionWorkflow::resync_patient_statuses`]
/// or a re-run of the billing step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// The appointment the workflow operated on, when one was located.
    pub appointment_id: Option<String>,
    pub locate: StepOutcome,
    pub transition: StepOutcome,
    pub ledger: StepOutcome,
    pub billing: StepOutcome,
    pub status_sweep: StepOutcome,
    /// Remaining sessions after the ledger step, when it applied.
    pub remaining_sessions: Option<u32>,
}

impl CompletionOutcome {
    fn all_skipped(reason: &str) -> Self {
        Self {
            appointment_id: None,
            locate: StepOutcome::skipped(reason),
            transition: StepOutcome::skipped(reason),
            ledger: StepOutcome::skipped(reason),
            billing: StepOutcome::skipped(reason),
            status_sweep: StepOutcome::skipped(reason),
            remaining_sessions: None,
        }
    }
}

/// A patient record corrected by the manual re-sync sweep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientResync {
    pub patient_id: String,
    pub remaining_sessions: Option<u32>,
    pub status: PatientStatus,
}

/// Orchestrates the appointment/ledger/billing/status cascade for one
/// completed treatment session.
#[derive(Clone, Debug)]
pub struct CompletionWorkflow<S> {
    store: Arc<S>,
    cfg: Arc<CoreConfig>,
    ledger: SessionLedger<S>,
}

impl<S: DocumentStore> CompletionWorkflow<S> {
    pub fn new(store: Arc<S>, cfg: Arc<CoreConfig>) -> Self {
        let ledger = SessionLedger::new(Arc::clone(&store), Arc::clone(&cfg));
        Self { store, cfg, ledger }
    }

    /// Run the workflow for one report save.
    ///
    /// `report_date` narrows the appointment search to that exact calendar
    /// day; without it the most recent open appointment is completed. A
    /// missing patient or no open appointment is a silent no-op, not an
    /// error. Returns `Err` only when the initial patient read fails at the
    /// store level; step-level failures are captured in the outcome.
    pub fn run(
        &self,
        patient_id: &str,
        report_date: Option<NaiveDate>,
    ) -> LedgerResult<CompletionOutcome> {
        let Some(patient_doc) = self.store.get(PATIENTS_COLLECTION, patient_id)? else {
            tracing::debug!(patient_id, "patient not found; nothing to complete");
            return Ok(CompletionOutcome::all_skipped("patient not found"));
        };
        let patient: PatientRecord = decode_record(&patient_doc)?;

        let mut outcome = CompletionOutcome::all_skipped("no open appointment");

        // Step 1: locate the appointment this session belongs to.
        let appointment = match self.locate_open_appointment(patient_id, report_date) {
            Ok(Some(appointment)) => appointment,
            Ok(None) => {
                tracing::debug!(patient_id, "no open appointment; nothing to complete");
                return Ok(outcome);
            }
            Err(e) => {
                tracing::warn!(patient_id, error = %e, "failed to locate open appointment");
                // An aborted lookup is not a no-op; the downstream skips say so.
                outcome = CompletionOutcome::all_skipped("appointment lookup failed");
                outcome.locate = StepOutcome::Failed(e.to_string());
                return Ok(outcome);
            }
        };
        outcome.locate = StepOutcome::Applied;
        outcome.appointment_id = Some(appointment.appointment_id.clone());

        // Step 2: transition the appointment to completed.
        outcome.transition = match self.store.update_fields(
            APPOINTMENTS_COLLECTION,
            &appointment.appointment_id,
            &[(
                FIELD_STATUS.into(),
                json!(AppointmentStatus::Completed.as_str()),
            )],
        ) {
            Ok(()) => StepOutcome::Applied,
            Err(e) => {
                tracing::warn!(
                    patient_id,
                    appointment_id = %appointment.appointment_id,
                    error = %e,
                    "failed to transition appointment"
                );
                StepOutcome::Failed(e.to_string())
            }
        };

        // Step 3: record the session use against the ledger.
        outcome.ledger = match self.ledger.record_session_use(patient_id) {
            Ok(LedgerUpdate::NotApplicable) => {
                StepOutcome::skipped("no session total prescribed")
            }
            Ok(LedgerUpdate::Updated { remaining, .. }) => {
                outcome.remaining_sessions = Some(remaining);
                StepOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(patient_id, error = %e, "session ledger update failed");
                StepOutcome::Failed(e.to_string())
            }
        };

        // Step 4: conditional auto-billing, keyed by appointment id.
        outcome.billing = if patient.patient_type != self.cfg.auto_billing_patient_type() {
            StepOutcome::Skipped(format!(
                "patient type '{}' is not auto-billed",
                patient.patient_type
            ))
        } else {
            match self.create_billing_once(&patient, &appointment) {
                Ok(true) => StepOutcome::Applied,
                Ok(false) => StepOutcome::skipped("billing record already exists"),
                Err(e) => {
                    tracing::warn!(
                        patient_id,
                        appointment_id = %appointment.appointment_id,
                        error = %e,
                        "billing creation failed"
                    );
                    StepOutcome::Failed(e.to_string())
                }
            }
        };

        // Step 5: overall patient status sweep.
        outcome.status_sweep = match self.sweep_patient_status(patient_id) {
            Ok(step) => step,
            Err(e) => {
                tracing::warn!(patient_id, error = %e, "patient status sweep failed");
                StepOutcome::Failed(e.to_string())
            }
        };

        Ok(outcome)
    }

    /// Find the open appointment a completed session belongs to.
    ///
    /// Open appointments are fetched most-recent first; with an explicit
    /// report date only an appointment on that calendar day qualifies.
    fn locate_open_appointment(
        &self,
        patient_id: &str,
        report_date: Option<NaiveDate>,
    ) -> LedgerResult<Option<Appointment>> {
        let open_statuses = vec![
            json!(AppointmentStatus::Pending.as_str()),
            json!(AppointmentStatus::Ongoing.as_str()),
        ];
        let docs = query_with_order_fallback(
            self.store.as_ref(),
            APPOINTMENTS_COLLECTION,
            &[
                Filter::Eq(FIELD_PATIENT_ID.into(), json!(patient_id)),
                Filter::In(FIELD_STATUS.into(), open_statuses),
            ],
            &OrderBy::descending(FIELD_DATE),
            date_sort_key,
        )?;

        for doc in &docs {
            let appointment: Appointment = decode_record(doc)?;
            match report_date {
                Some(date) if appointment.date.date_naive() != date => continue,
                _ => return Ok(Some(appointment)),
            }
        }
        Ok(None)
    }

    /// Create the billing record for this appointment unless one exists.
    ///
    /// Returns `Ok(true)` when a record was created. Auto-billed sessions are
    /// marked paid immediately, bypassing the pending-payment queue.
    fn create_billing_once(
        &self,
        patient: &PatientRecord,
        appointment: &Appointment,
    ) -> LedgerResult<bool> {
        if self
            .store
            .get(BILLING_COLLECTION, &appointment.appointment_id)?
            .is_some()
        {
            return Ok(false);
        }

        let record = BillingRecord {
            appointment_id: appointment.appointment_id.clone(),
            patient_id: patient.patient_id.clone(),
            amount: self.cfg.session_rate(),
            paid: true,
            created_at: self.store.server_time(),
        };
        self.store.set(
            BILLING_COLLECTION,
            &appointment.appointment_id,
            encode_record(&record)?,
        )?;
        tracing::info!(
            patient_id = %patient.patient_id,
            appointment_id = %appointment.appointment_id,
            amount = record.amount,
            "auto-billing record created"
        );
        Ok(true)
    }

    /// Mark the patient completed once every appointment is settled.
    ///
    /// Idempotent: re-running against an already-completed patient is a
    /// skip, not a write.
    pub fn sweep_patient_status(&self, patient_id: &str) -> LedgerResult<StepOutcome> {
        let docs = self.store.find(
            APPOINTMENTS_COLLECTION,
            &[Filter::Eq(FIELD_PATIENT_ID.into(), json!(patient_id))],
            None,
        )?;
        if docs.is_empty() {
            return Ok(StepOutcome::skipped("no appointments booked"));
        }
        for doc in &docs {
            let appointment: Appointment = decode_record(doc)?;
            if !appointment.status.is_settled() {
                return Ok(StepOutcome::skipped("open appointments remain"));
            }
        }

        let Some(patient_doc) = self.store.get(PATIENTS_COLLECTION, patient_id)? else {
            return Ok(StepOutcome::skipped("patient not found"));
        };
        let patient: PatientRecord = decode_record(&patient_doc)?;
        if patient.status == PatientStatus::Completed {
            return Ok(StepOutcome::skipped("patient already completed"));
        }

        self.store.update_fields(
            PATIENTS_COLLECTION,
            patient_id,
            &[(
                FIELD_STATUS.into(),
                json!(PatientStatus::Completed.as_str()),
            )],
        )?;
        tracing::info!(patient_id, "all appointments settled; patient marked completed");
        Ok(StepOutcome::Applied)
    }

    /// Manual repair sweep: rescan every patient against their appointments.
    ///
    /// Recomputes `remainingSessions` and overall status from scratch and
    /// writes only the records that drifted, returning what changed. This is
    /// the repair path for partially-failed workflow runs.
    pub fn resync_patient_statuses(&self) -> LedgerResult<Vec<PatientResync>> {
        let patient_docs = self.store.find(PATIENTS_COLLECTION, &[], None)?;
        let mut changed = Vec::new();

        for doc in &patient_docs {
            let patient: PatientRecord = match decode_record(doc) {
                Ok(patient) => patient,
                Err(e) => {
                    tracing::warn!(id = %doc.id, error = %e, "skipping unparseable patient record");
                    continue;
                }
            };

            let appointment_docs = self.store.find(
                APPOINTMENTS_COLLECTION,
                &[Filter::Eq(
                    FIELD_PATIENT_ID.into(),
                    json!(patient.patient_id),
                )],
                None,
            )?;

            let mut completed_count = 0u32;
            let mut all_settled = true;
            let mut any_booked = false;
            for appointment_doc in &appointment_docs {
                let appointment: Appointment = match decode_record(appointment_doc) {
                    Ok(appointment) => appointment,
                    Err(e) => {
                        tracing::warn!(id = %appointment_doc.id, error = %e, "skipping unparseable appointment");
                        continue;
                    }
                };
                any_booked = true;
                if appointment.status == AppointmentStatus::Completed {
                    completed_count += 1;
                }
                if !appointment.status.is_settled() {
                    all_settled = false;
                }
            }

            let expected_remaining = patient.total_sessions_required.map(|total| {
                compute_remaining_with(total, completed_count, self.cfg.session_reservation())
            });

            let mut expected_status = patient.status;
            if patient.status != PatientStatus::Cancelled
                && ((any_booked && all_settled) || expected_remaining == Some(0))
            {
                expected_status = PatientStatus::Completed;
            }

            let mut fields: Vec<(String, Value)> = Vec::new();
            if let Some(remaining) = expected_remaining {
                if patient.remaining_sessions != Some(remaining) {
                    fields.push((FIELD_REMAINING_SESSIONS.into(), json!(remaining)));
                }
            }
            if expected_status != patient.status {
                fields.push((FIELD_STATUS.into(), json!(expected_status.as_str())));
            }
            if fields.is_empty() {
                continue;
            }

            self.store
                .update_fields(PATIENTS_COLLECTION, &patient.patient_id, &fields)?;
            tracing::info!(patient_id = %patient.patient_id, "patient record re-synced");
            changed.push(PatientResync {
                patient_id: patient.patient_id.clone(),
                remaining_sessions: expected_remaining.or(patient.remaining_sessions),
                status: expected_status,
            });
        }

        Ok(changed)
    }
}
