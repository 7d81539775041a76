//! Stored record types: patients, appointments, report versions, billing.
//!
//! All records serialize with camelCase field names, matching the wire format
//! of the managed document store the admin application runs against.

use crate::report::ReportContent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a patient's course of treatment.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    Pending,
    Ongoing,
    Completed,
    Cancelled,
}

impl PatientStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a single booked appointment.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Ongoing,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether this appointment still counts as open (completable).
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Ongoing)
    }

    /// Whether this appointment has reached a terminal state.
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered patient, including the live (editable) clinical report.
///
/// `remaining_sessions` is derived from the appointment history but persisted
/// for fast reads; only the session ledger and explicit admin edits mutate it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub patient_id: String,
    pub name: String,
    pub status: PatientStatus,
    /// Free-form patient category; one configured value triggers auto-billing.
    #[serde(default)]
    pub patient_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sessions_required: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_sessions: Option<u32>,
    /// The live clinical report; overwritten on save, snapshotted beforehand.
    #[serde(default)]
    pub report: ReportContent,
    pub registered_at: DateTime<Utc>,
}

/// A single booked appointment for a patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub appointment_id: String,
    pub patient_id: String,
    pub status: AppointmentStatus,
    pub date: DateTime<Utc>,
    pub doctor: String,
}

/// An immutable snapshot of a patient's report at a point in time.
///
/// For a fixed patient the stored `version` values are exactly `1..=N` where
/// `N` is the number of snapshots; the renumbering service actively restores
/// this after deletions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportVersion {
    /// Store-assigned document id; not part of the stored payload.
    #[serde(skip)]
    pub id: String,
    pub patient_id: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub data: ReportContent,
    /// Set when this snapshot captured the live state displaced by a restore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_from: Option<u32>,
}

/// A billing entry for one completed session, keyed by appointment id.
///
/// At most one record ever exists per appointment; the appointment id is the
/// idempotence key for the auto-billing step of the completion workflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingRecord {
    pub appointment_id: String,
    pub patient_id: String,
    /// Fixed per-session rate, in the clinic's minor currency unit.
    pub amount: u32,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_as_lowercase_strings() {
        let json = serde_json::to_string(&PatientStatus::Ongoing).expect("status should serialize");
        assert_eq!(json, "\"ongoing\"");

        let status: AppointmentStatus =
            serde_json::from_str("\"cancelled\"").expect("status should deserialize");
        assert_eq!(status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn appointment_status_open_and_settled_partition() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Ongoing,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ] {
            assert_ne!(status.is_open(), status.is_settled());
        }
    }

    #[test]
    fn report_version_id_is_not_part_of_the_payload() {
        let version = ReportVersion {
            id: "doc-123".into(),
            patient_id: "p-1".into(),
            version: 1,
            created_at: Utc::now(),
            created_by: "Dr Han".into(),
            data: ReportContent::default(),
            restored_from: None,
        };

        let value = serde_json::to_value(&version).expect("version should serialize");
        assert!(value.get("id").is_none());
        assert!(value.get("restoredFrom").is_none());

        let back: ReportVersion =
            serde_json::from_value(value).expect("version should deserialize");
        assert_eq!(back.id, "", "id comes from the store document, not the payload");
        assert_eq!(back.version, 1);
    }
}
