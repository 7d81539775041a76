//! The treatment session ledger.
//!
//! Tracks how many treatment sessions a patient is still entitled to. The
//! remaining count is derived from the prescribed total and the number of
//! completed appointments, but persisted on the patient record for fast reads;
//! this module owns the recomputation and the side effect of marking the
//! patient completed when the count reaches zero.

use crate::config::CoreConfig;
use crate::constants::{
    APPOINTMENTS_COLLECTION, CURRENT_SESSION_RESERVATION, FIELD_PATIENT_ID,
    FIELD_REMAINING_SESSIONS, FIELD_STATUS, PATIENTS_COLLECTION,
};
use crate::docs::decode_record;
use crate::error::{LedgerError, LedgerResult};
use careledger_store::{DocumentStore, Filter};
use careledger_types::{AppointmentStatus, PatientRecord, PatientStatus};
use serde_json::{json, Value};
use std::sync::Arc;

/// Remaining sessions with the default current-session reservation.
///
/// Computes `max(0, total − CURRENT_SESSION_RESERVATION − completed_count)`.
/// See [`CURRENT_SESSION_RESERVATION`] for why one session is reserved before
/// historically completed ones are counted.
pub const fn compute_remaining(total: u32, completed_count: u32) -> u32 {
    compute_remaining_with(total, completed_count, CURRENT_SESSION_RESERVATION)
}

/// Remaining sessions with an explicit reservation, never negative.
pub const fn compute_remaining_with(total: u32, completed_count: u32, reservation: u32) -> u32 {
    total.saturating_sub(reservation).saturating_sub(completed_count)
}

/// Result of asking the ledger to record a session use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerUpdate {
    /// The patient has no prescribed session total; nothing was updated.
    ///
    /// Missing data is reported as not applicable rather than treated as zero.
    NotApplicable,
    /// The remaining count was recomputed and persisted.
    Updated {
        remaining: u32,
        /// True when the update also marked the patient as completed.
        patient_completed: bool,
    },
}

/// Computes and persists a patient's remaining-session counter.
#[derive(Clone, Debug)]
pub struct SessionLedger<S> {
    store: Arc<S>,
    cfg: Arc<CoreConfig>,
}

impl<S: DocumentStore> SessionLedger<S> {
    pub fn new(store: Arc<S>, cfg: Arc<CoreConfig>) -> Self {
        Self { store, cfg }
    }

    /// Number of this patient's appointments already in the completed state.
    pub fn completed_session_count(&self, patient_id: &str) -> LedgerResult<u32> {
        let completed = self.store.find(
            APPOINTMENTS_COLLECTION,
            &[
                Filter::Eq(FIELD_PATIENT_ID.into(), json!(patient_id)),
                Filter::Eq(
                    FIELD_STATUS.into(),
                    json!(AppointmentStatus::Completed.as_str()),
                ),
            ],
            None,
        )?;
        Ok(completed.len() as u32)
    }

    /// Recompute and persist the patient's remaining-session count.
    ///
    /// Returns [`LedgerUpdate::NotApplicable`] without touching the record
    /// when no session total has been prescribed. When the recomputed count
    /// reaches zero the patient's status is set to completed in the same
    /// update.
    pub fn record_session_use(&self, patient_id: &str) -> LedgerResult<LedgerUpdate> {
        let doc = self
            .store
            .get(PATIENTS_COLLECTION, patient_id)?
            .ok_or_else(|| LedgerError::PatientNotFound(patient_id.to_owned()))?;
        let patient: PatientRecord = decode_record(&doc)?;

        let Some(total) = patient.total_sessions_required else {
            tracing::debug!(patient_id, "no session total prescribed; ledger not applicable");
            return Ok(LedgerUpdate::NotApplicable);
        };

        let completed = self.completed_session_count(patient_id)?;
        let remaining =
            compute_remaining_with(total, completed, self.cfg.session_reservation());

        let mut fields: Vec<(String, Value)> =
            vec![(FIELD_REMAINING_SESSIONS.into(), json!(remaining))];
        let patient_completed = remaining == 0;
        if patient_completed {
            fields.push((FIELD_STATUS.into(), json!(PatientStatus::Completed.as_str())));
        }
        self.store
            .update_fields(PATIENTS_COLLECTION, patient_id, &fields)?;

        tracing::info!(patient_id, total, completed, remaining, "session ledger updated");
        Ok(LedgerUpdate::Updated {
            remaining,
            patient_completed,
        })
    }
}
