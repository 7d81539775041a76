//! Domain value types for the CareLedger treatment-session subsystem.
//!
//! This crate defines the records shared between the session ledger, the
//! report version store, and the completion workflow: patients, appointments,
//! report versions, billing records, and the report content itself. It is
//! deliberately free of storage concerns so the same types can back both the
//! production document store and in-memory test doubles.

pub mod records;
pub mod report;

pub use records::{
    Appointment, AppointmentStatus, BillingRecord, PatientRecord, PatientStatus, ReportVersion,
};
pub use report::ReportContent;

/// Validation failure for the constrained text types below.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    #[error("text must contain at least one non-whitespace character")]
    Empty,
}

/// A trimmed string guaranteed to carry visible content.
///
/// Identity fields recorded into the audit trail (author names in
/// particular) must never be blank; routing them through this wrapper pushes
/// the check to construction time so the rest of the workspace can rely on
/// it. Deserialization applies the same rule, so a blank name cannot sneak
/// in through a stored document either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trim the input and wrap it, rejecting whitespace-only strings.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        match input.as_ref().trim() {
            "" => Err(TextError::Empty),
            trimmed => Ok(Self(trimmed.to_owned())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        NonEmptyText::new(String::deserialize(deserializer)?).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_accepts_content() {
        let text = NonEmptyText::new("  Dr Han  ").expect("text should be accepted");
        assert_eq!(text.as_str(), "Dr Han");
    }

    #[test]
    fn non_empty_text_rejects_whitespace_only_input() {
        let err = NonEmptyText::new("   \t").expect_err("whitespace should be rejected");
        assert!(matches!(err, TextError::Empty));
    }

    #[test]
    fn non_empty_text_enforces_the_rule_on_deserialization() {
        let err = serde_json::from_str::<NonEmptyText>("\"  \"")
            .expect_err("blank stored text should be rejected");
        assert!(err.to_string().contains("non-whitespace"));
    }
}
