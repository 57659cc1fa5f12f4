//! Authority rules for moving funds between admins.
//!
//! Each rule maps (source pledge, sender, receiver) to the shape the moved
//! funds should take; [`Tx::move_funds`] then decides which row receives
//! them.

use tracing::debug;

use lp_types::{Address, Admin, AdminId, AdminKind, Amount, Pledge, PledgeId, PledgeShape};

use crate::engine::Tx;
use crate::error::{LedgerError, LedgerResult};
use crate::journal::MoveReason;

impl Tx<'_> {
    pub(crate) fn transfer(
        &mut self,
        caller: &Address,
        sender: AdminId,
        pledge: PledgeId,
        amount: Amount,
        receiver: AdminId,
    ) -> LedgerResult<PledgeId> {
        let sender_admin = self.admin(sender)?;
        if !sender_admin.is_controlled_by(caller) {
            return Err(LedgerError::unauthorized(caller, format!("act as {sender}")));
        }
        let receiver_admin = self.admin(receiver)?;

        let id = self.normalize_pledge(pledge)?;
        let p = self.pledge(id)?;
        if !p.is_pledged() {
            return Err(LedgerError::InvalidState(format!(
                "{id} is {}, only pledged funds can be transferred",
                p.state
            )));
        }
        if amount > p.amount {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: p.amount,
            });
        }
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let shape = if sender == p.owner {
            self.owner_transfer_shape(&p, &receiver_admin)?
        } else if let Some(k) = p.delegate_index(sender) {
            self.delegate_transfer_shape(&p, k, caller, &receiver_admin)?
        } else {
            return Err(LedgerError::unauthorized(
                caller,
                format!("transfer {id} as {sender}"),
            ));
        };
        debug!(pledge = %id, %sender, %receiver, amount, "transfer");
        self.move_funds(id, shape, amount, MoveReason::Transfer)
    }

    /// Shape for funds the owner sends to `receiver`.
    pub(crate) fn owner_transfer_shape(
        &self,
        p: &Pledge,
        receiver: &Admin,
    ) -> LedgerResult<PledgeShape> {
        let base = p.shape();
        if receiver.id == p.owner {
            return Ok(base.delegated(Vec::new()));
        }
        match receiver.kind {
            AdminKind::Giver => Ok(PledgeShape::owned_by(receiver.id, p.token.clone())),
            AdminKind::Delegate => {
                // Naming a delegate already in the chain while a project is
                // pending vetoes the proposal and keeps the chain up to it.
                let chain = match (p.intended_project, p.delegate_index(receiver.id)) {
                    (Some(_), Some(i)) => p.delegation_chain[..=i].to_vec(),
                    _ => vec![receiver.id],
                };
                Ok(base.delegated(chain))
            }
            AdminKind::Project => {
                self.ensure_live_project(receiver.id)?;
                let deadline = self.now.saturating_add(receiver.commit_time);
                Ok(base.delegated(Vec::new()).proposing(receiver.id, deadline))
            }
        }
    }

    /// Shape for funds the delegate at position `k` sends to `receiver`.
    fn delegate_transfer_shape(
        &self,
        p: &Pledge,
        k: usize,
        caller: &Address,
        receiver: &Admin,
    ) -> LedgerResult<PledgeShape> {
        let base = p.shape();
        if receiver.id == p.owner {
            return Ok(base.delegated(Vec::new()));
        }
        match receiver.kind {
            AdminKind::Giver => Err(LedgerError::unauthorized(
                caller,
                format!("hand {} to giver {} as a delegate", p.id, receiver.id),
            )),
            AdminKind::Delegate => {
                let chain = match p.delegate_index(receiver.id) {
                    Some(i) if i <= k => p.delegation_chain[..=i].to_vec(),
                    _ => {
                        let mut chain = p.delegation_chain[..=k].to_vec();
                        chain.push(receiver.id);
                        chain
                    }
                };
                if chain.len() > self.config.max_delegates {
                    return Err(LedgerError::TooManyDelegates {
                        limit: self.config.max_delegates,
                    });
                }
                Ok(base.delegated(chain))
            }
            AdminKind::Project => {
                self.ensure_live_project(receiver.id)?;
                let chain = p.delegation_chain[..=k].to_vec();
                let mut window = receiver.commit_time;
                for delegate in &chain {
                    window = window.max(self.admin(*delegate)?.commit_time);
                }
                let deadline = self.now.saturating_add(window);
                Ok(base.delegated(chain).proposing(receiver.id, deadline))
            }
        }
    }

    fn ensure_live_project(&self, project: AdminId) -> LedgerResult<()> {
        match self.canceled_in_lineage(project)? {
            Some(canceled) => Err(LedgerError::ProjectCanceled(canceled)),
            None => Ok(()),
        }
    }
}
