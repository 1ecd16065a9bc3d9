//! Store trait definitions

use chrono::NaiveDate;
use presence_api::DailyTally;
use presence_util::StaffId;
use serde::{Deserialize, Serialize};

use crate::{AuditEvent, StoreResult};

/// Result of one confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    Confirmed,
    Missed,
}

/// Main store trait
pub trait Store: Send + Sync {
    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Confirmation accounting

    /// Count one outcome for a staff member on a day
    fn record_outcome(
        &self,
        staff_id: &StaffId,
        day: NaiveDate,
        outcome: ConfirmationOutcome,
    ) -> StoreResult<()>;

    /// Get the tally for a staff member on a day (zeroes if none recorded)
    fn get_tally(&self, staff_id: &StaffId, day: NaiveDate) -> StoreResult<DailyTally>;

    // Health

    fn is_healthy(&self) -> bool;
}
