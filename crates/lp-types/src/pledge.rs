use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::{AdminId, PledgeId, TokenId};
use crate::temporal::Timestamp;

/// Amount in the token's smallest unit.
pub type Amount = u128;

/// Settlement state of a pledge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PledgeState {
    /// Held in the ledger; can be transferred and normalized.
    Pledged,
    /// Withdrawn and waiting for the vault to confirm or cancel.
    Paying,
    /// Paid out by the vault. Terminal.
    Paid,
}

impl fmt::Display for PledgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pledged => "Pledged",
            Self::Paying => "Paying",
            Self::Paid => "Paid",
        };
        f.write_str(s)
    }
}

/// Everything that distinguishes one pledge row from another except its id,
/// amount, and lineage.
///
/// Moving funds means moving an amount from one shape to another.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PledgeShape {
    pub owner: AdminId,
    pub delegation_chain: Vec<AdminId>,
    pub intended_project: Option<AdminId>,
    pub commit_time: Option<Timestamp>,
    pub token: TokenId,
    pub state: PledgeState,
}

impl PledgeShape {
    /// A plain `Pledged` shape held by `owner` with no delegates.
    pub fn owned_by(owner: AdminId, token: TokenId) -> Self {
        Self {
            owner,
            delegation_chain: Vec::new(),
            intended_project: None,
            commit_time: None,
            token,
            state: PledgeState::Pledged,
        }
    }

    /// Replace the delegation chain, clearing any pending proposal.
    pub fn delegated(mut self, chain: Vec<AdminId>) -> Self {
        self.delegation_chain = chain;
        self.intended_project = None;
        self.commit_time = None;
        self
    }

    /// Propose `project` as the next owner, committing at `deadline`.
    pub fn proposing(mut self, project: AdminId, deadline: Timestamp) -> Self {
        self.intended_project = Some(project);
        self.commit_time = Some(deadline);
        self
    }

    /// Same shape in a different settlement state.
    pub fn in_state(mut self, state: PledgeState) -> Self {
        self.state = state;
        self
    }
}

/// Immutable snapshot of an amount, its owner/delegation state, and lineage.
///
/// Only `amount` changes after creation (and `state`, for payments being
/// settled); every other change mints or reuses a different row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pledge {
    pub id: PledgeId,
    pub amount: Amount,
    pub token: TokenId,
    pub owner: AdminId,
    pub delegation_chain: Vec<AdminId>,
    pub intended_project: Option<AdminId>,
    pub commit_time: Option<Timestamp>,
    /// The pledge this one was carved out of; `None` for a donation root.
    pub old_pledge: Option<PledgeId>,
    pub state: PledgeState,
}

impl Pledge {
    /// Build a pledge row from a shape.
    pub fn from_shape(
        id: PledgeId,
        amount: Amount,
        shape: PledgeShape,
        old_pledge: Option<PledgeId>,
    ) -> Self {
        Self {
            id,
            amount,
            token: shape.token,
            owner: shape.owner,
            delegation_chain: shape.delegation_chain,
            intended_project: shape.intended_project,
            commit_time: shape.commit_time,
            old_pledge,
            state: shape.state,
        }
    }

    /// The shape of this pledge.
    pub fn shape(&self) -> PledgeShape {
        PledgeShape {
            owner: self.owner,
            delegation_chain: self.delegation_chain.clone(),
            intended_project: self.intended_project,
            commit_time: self.commit_time,
            token: self.token.clone(),
            state: self.state,
        }
    }

    pub fn is_pledged(&self) -> bool {
        self.state == PledgeState::Pledged
    }

    /// Returns `true` for an original donation.
    pub fn is_root(&self) -> bool {
        self.old_pledge.is_none()
    }

    /// Position of `admin` in the delegation chain.
    pub fn delegate_index(&self, admin: AdminId) -> Option<usize> {
        self.delegation_chain.iter().position(|d| *d == admin)
    }

    /// Owner, delegates, and intended project, in that order.
    pub fn involved_admins(&self) -> impl Iterator<Item = AdminId> + '_ {
        std::iter::once(self.owner)
            .chain(self.delegation_chain.iter().copied())
            .chain(self.intended_project)
    }
}
