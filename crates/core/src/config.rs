//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core
//! services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in
//! multi-threaded runtimes and test harnesses.

use crate::constants::{
    CURRENT_SESSION_RESERVATION, DEFAULT_AUTO_BILLING_PATIENT_TYPE, DEFAULT_SESSION_RATE,
};
use crate::error::{LedgerError, LedgerResult};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    auto_billing_patient_type: String,
    session_rate: u32,
    session_reservation: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `session_reservation` overrides [`CURRENT_SESSION_RESERVATION`]; pass
    /// the constant unless product has ruled on the reservation question.
    pub fn new(
        auto_billing_patient_type: impl Into<String>,
        session_rate: u32,
        session_reservation: u32,
    ) -> LedgerResult<Self> {
        let auto_billing_patient_type = auto_billing_patient_type.into();
        if auto_billing_patient_type.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "auto_billing_patient_type cannot be empty".into(),
            ));
        }

        Ok(Self {
            auto_billing_patient_type,
            session_rate,
            session_reservation,
        })
    }

    /// Configuration with the clinic's standing defaults.
    pub fn with_defaults() -> Self {
        Self {
            auto_billing_patient_type: DEFAULT_AUTO_BILLING_PATIENT_TYPE.to_owned(),
            session_rate: DEFAULT_SESSION_RATE,
            session_reservation: CURRENT_SESSION_RESERVATION,
        }
    }

    pub fn auto_billing_patient_type(&self) -> &str {
        &self.auto_billing_patient_type
    }

    pub fn session_rate(&self) -> u32 {
        self.session_rate
    }

    pub fn session_reservation(&self) -> u32 {
        self.session_reservation
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}
