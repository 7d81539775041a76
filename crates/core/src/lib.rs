//! # CareLedger Core
//!
//! Business logic for the clinic's treatment session ledger and versioned
//! report audit trail:
//!
//! - Session ledger: remaining-session counting with the current-session
//!   reservation ([`sessions`])
//! - Version store and renumbering: contiguous, append-only report snapshot
//!   history with point-in-time restore ([`versions`])
//! - Completion workflow: the appointment/ledger/billing/status cascade run
//!   when a session-completing report is saved ([`completion`])
//! - Report history controller and the report save entry point ([`history`],
//!   [`reports`])
//!
//! Everything is written against the abstract [`careledger_store::DocumentStore`],
//! which offers per-collection atomic batches but no cross-collection
//! transactions; the workflow design (explicit saga, repair sweep) follows
//! from that constraint.
//!
//! **No API concerns**: authentication, HTTP servers, rendering, and
//! notification delivery belong to the surrounding application.

pub mod author;
pub mod completion;
pub mod config;
pub mod constants;
mod docs;
pub mod error;
pub mod history;
pub mod reports;
pub mod sessions;
pub mod versions;

pub use author::Author;
pub use completion::{CompletionOutcome, CompletionWorkflow, PatientResync, StepOutcome};
pub use config::CoreConfig;
pub use error::{LedgerError, LedgerResult};
pub use history::ReportHistoryService;
pub use reports::{ReportService, SaveReportOutcome};
pub use sessions::{compute_remaining, compute_remaining_with, LedgerUpdate, SessionLedger};
pub use versions::VersionStore;
