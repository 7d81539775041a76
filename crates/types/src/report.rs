//! Clinical report content and its emptiness predicate.
//!
//! The report is the editable clinical document attached to each patient.
//! Its field set is explicit rather than an opaque map because the version
//! store needs a *semantic* emptiness check: a save where the clinician typed
//! nothing must not pollute the version history, but a meaningful zero or
//! `false` must never be mistaken for "empty".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The editable content of a patient's clinical report.
///
/// `session_completed` is a control flag on the save action, not clinical
/// content; it is carried here because the original record stores it alongside
/// the report fields, but it is ignored by [`ReportContent::has_clinical_content`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportContent {
    /// Primary diagnosis text.
    #[serde(default)]
    pub diagnosis: String,
    /// Free-form clinical notes for this visit.
    #[serde(default)]
    pub clinical_notes: String,
    /// Planned course of treatment.
    #[serde(default)]
    pub treatment_plan: String,
    /// Prescriptions issued during the session.
    #[serde(default)]
    pub prescriptions: Vec<String>,
    /// Date of the session this report describes, if the clinician supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_date: Option<NaiveDate>,
    /// Total treatment sessions prescribed, settable at report edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sessions_required: Option<u32>,
    /// Whether saving this report should also mark a treatment session as completed.
    #[serde(default)]
    pub session_completed: bool,
}

impl ReportContent {
    /// Returns `true` if at least one semantic field carries content.
    ///
    /// Blank or whitespace-only strings, empty prescription lists, and unset
    /// options do not count. The `session_completed` flag never counts: it
    /// describes the save action, not the report.
    pub fn has_clinical_content(&self) -> bool {
        !self.diagnosis.trim().is_empty()
            || !self.clinical_notes.trim().is_empty()
            || !self.treatment_plan.trim().is_empty()
            || self.prescriptions.iter().any(|p| !p.trim().is_empty())
            || self.report_date.is_some()
            || self.total_sessions_required.is_some()
    }

    /// Merge this content over `base`, field by field.
    ///
    /// Used for read-only inspection of a stored snapshot in the context of the
    /// current record: each field of `self` wins where it carries content,
    /// otherwise the corresponding field of `base` shows through.
    pub fn merged_over(&self, base: &ReportContent) -> ReportContent {
        fn pick_text(snapshot: &str, base: &str) -> String {
            if snapshot.trim().is_empty() {
                base.to_owned()
            } else {
                snapshot.to_owned()
            }
        }

        ReportContent {
            diagnosis: pick_text(&self.diagnosis, &base.diagnosis),
            clinical_notes: pick_text(&self.clinical_notes, &base.clinical_notes),
            treatment_plan: pick_text(&self.treatment_plan, &base.treatment_plan),
            prescriptions: if self.prescriptions.iter().any(|p| !p.trim().is_empty()) {
                self.prescriptions.clone()
            } else {
                base.prescriptions.clone()
            },
            report_date: self.report_date.or(base.report_date),
            total_sessions_required: self.total_sessions_required.or(base.total_sessions_required),
            session_completed: self.session_completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_report_has_no_clinical_content() {
        assert!(!ReportContent::default().has_clinical_content());
    }

    #[test]
    fn whitespace_and_blank_prescriptions_do_not_count_as_content() {
        let report = ReportContent {
            diagnosis: "   ".into(),
            clinical_notes: "\t\n".into(),
            prescriptions: vec!["".into(), "  ".into()],
            ..Default::default()
        };
        assert!(!report.has_clinical_content());
    }

    #[test]
    fn session_completed_flag_alone_is_not_content() {
        let report = ReportContent {
            session_completed: true,
            ..Default::default()
        };
        assert!(!report.has_clinical_content());
    }

    #[test]
    fn any_single_semantic_field_counts_as_content() {
        let with_diagnosis = ReportContent {
            diagnosis: "lumbar strain".into(),
            ..Default::default()
        };
        assert!(with_diagnosis.has_clinical_content());

        let with_date = ReportContent {
            report_date: Some(NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date")),
            ..Default::default()
        };
        assert!(with_date.has_clinical_content());

        let with_total = ReportContent {
            total_sessions_required: Some(0),
            ..Default::default()
        };
        assert!(
            with_total.has_clinical_content(),
            "an explicit zero is meaningful, not empty"
        );
    }

    #[test]
    fn merged_over_prefers_snapshot_fields_with_content() {
        let base = ReportContent {
            diagnosis: "current diagnosis".into(),
            clinical_notes: "current notes".into(),
            prescriptions: vec!["ibuprofen".into()],
            total_sessions_required: Some(10),
            ..Default::default()
        };
        let snapshot = ReportContent {
            diagnosis: "older diagnosis".into(),
            ..Default::default()
        };

        let merged = snapshot.merged_over(&base);
        assert_eq!(merged.diagnosis, "older diagnosis");
        assert_eq!(merged.clinical_notes, "current notes");
        assert_eq!(merged.prescriptions, vec!["ibuprofen".to_owned()]);
        assert_eq!(merged.total_sessions_required, Some(10));
    }

    #[test]
    fn report_content_round_trips_through_camel_case_json() {
        let report = ReportContent {
            diagnosis: "cervical sprain".into(),
            report_date: Some(NaiveDate::from_ymd_opt(2026, 1, 5).expect("valid date")),
            total_sessions_required: Some(8),
            session_completed: true,
            ..Default::default()
        };

        let value = serde_json::to_value(&report).expect("report should serialize");
        assert!(value.get("clinicalNotes").is_some());
        assert!(value.get("sessionCompleted").is_some());

        let back: ReportContent = serde_json::from_value(value).expect("report should deserialize");
        assert_eq!(back, report);
    }
}
