use lp_types::{Admin, AdminId, Pledge, PledgeId};

use crate::error::LedgerError;
use crate::journal::JournalEntry;

/// Read boundary for indexers, projections, and invariant checks.
///
/// Every method is pure; values are returned by copy so implementations can
/// sit behind a lock.
pub trait LedgerReader {
    fn get_pledge(&self, id: PledgeId) -> Result<Pledge, LedgerError>;

    fn get_admin(&self, id: AdminId) -> Result<Admin, LedgerError>;

    fn number_of_pledges(&self) -> usize;

    fn number_of_admins(&self) -> usize;

    /// Every pledge row, in id order.
    fn pledges(&self) -> Vec<Pledge>;

    /// Every admin record, in id order.
    fn admins(&self) -> Vec<Admin>;

    fn journal(&self) -> Vec<JournalEntry>;
}
