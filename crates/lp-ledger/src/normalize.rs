use tracing::{debug, warn};

use lp_types::{PledgeId, PledgeShape};

use crate::engine::Tx;
use crate::error::LedgerResult;
use crate::journal::MoveReason;

impl Tx<'_> {
    /// Bring a pledge up to date with cancellations and elapsed deadlines.
    ///
    /// A pledge touching a canceled project rolls back to its nearest live
    /// ancestor, which may in turn commit if its own deadline has passed. A
    /// pledge whose proposal deadline has passed commits to the intended
    /// project. The result is a fixed point, so normalizing it again changes
    /// nothing.
    pub(crate) fn normalize_pledge(&mut self, pledge: PledgeId) -> LedgerResult<PledgeId> {
        let mut id = pledge;
        let p = self.pledge(id)?;
        if !p.is_pledged() || p.amount == 0 {
            return Ok(id);
        }

        if let Some(canceled) = self.canceled_admin(&p)? {
            let Some(origin) = p.old_pledge else {
                return Ok(id);
            };
            let Some(target) = self.nearest_live_ancestor(origin)? else {
                return Ok(id);
            };
            self.apply_move(id, target, p.amount, MoveReason::Rollback)?;
            warn!(from = %id, to = %target, amount = p.amount, %canceled, "pledge rolled back");
            id = target;
        }

        let p = self.pledge(id)?;
        if let (Some(project), Some(deadline)) = (p.intended_project, p.commit_time) {
            if self.now.has_reached(deadline) && p.amount > 0 {
                let shape = PledgeShape::owned_by(project, p.token.clone());
                let to = self.move_funds(id, shape, p.amount, MoveReason::Commit)?;
                debug!(from = %id, %to, %project, amount = p.amount, "proposal committed");
                id = to;
            }
        }
        Ok(id)
    }
}

