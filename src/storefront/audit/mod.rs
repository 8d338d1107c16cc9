//! Append-only login audit log.

pub mod auditor;
pub mod entry;
pub mod store;

pub use auditor::{Clock, DayBoundary, FailureTally, LoginAuditor, SystemClock};
pub use entry::{AuditEntry, Outcome, UNKNOWN_IDENTITY};
pub use store::{AuditError, AuditStore, FileAuditStore, MemoryAuditStore};
