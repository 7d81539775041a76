use careledger_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("patient not found: {0}")]
    PatientNotFound(String),
    #[error("report version {version} not found for patient {patient_id}")]
    VersionNotFound { patient_id: String, version: u32 },
    #[error("document store error: {0}")]
    Store(#[from] StoreError),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
