//! Constants used throughout the CareLedger core crate.
//!
//! Collection and field names mirror the wire format of the managed document
//! store; keeping them here ensures consistency across services.

/// Collection holding patient records (document id = patient id).
pub const PATIENTS_COLLECTION: &str = "patients";

/// Collection holding booked appointments (document id = appointment id).
pub const APPOINTMENTS_COLLECTION: &str = "appointments";

/// Collection holding immutable report snapshots (store-assigned ids).
pub const REPORT_VERSIONS_COLLECTION: &str = "reportVersions";

/// Collection holding billing records (document id = appointment id).
pub const BILLING_COLLECTION: &str = "billingRecords";

/// Sessions reserved for the in-progress visit when computing the remaining
/// count: `remaining = total − CURRENT_SESSION_RESERVATION − completed`.
///
/// The reservation treats the *current* session as already spent before
/// counting historically completed ones. Whether that is intended product
/// behaviour is an open product question (see DESIGN.md); the value is kept
/// as a named constant, overridable via `CoreConfig`, rather than resolved
/// either way.
pub const CURRENT_SESSION_RESERVATION: u32 = 1;

/// Patient category that receives fixed-rate, auto-paid billing per session.
pub const DEFAULT_AUTO_BILLING_PATIENT_TYPE: &str = "DYES";

/// Default per-session billing rate, in the clinic's minor currency unit.
pub const DEFAULT_SESSION_RATE: u32 = 50_000;

/// Wire field names shared by queries and partial updates.
pub const FIELD_PATIENT_ID: &str = "patientId";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_DATE: &str = "date";
pub const FIELD_VERSION: &str = "version";
pub const FIELD_REPORT: &str = "report";
pub const FIELD_REMAINING_SESSIONS: &str = "remainingSessions";
pub const FIELD_TOTAL_SESSIONS_REQUIRED: &str = "totalSessionsRequired";
