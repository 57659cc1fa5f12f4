use std::collections::BTreeMap;

use serde::Serialize;

use lp_types::{AdminId, Amount, Pledge, PledgeId, PledgeState, TokenId};

use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Funds attached to one admin in one token, by the role the admin plays.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Holdings {
    pub admin: AdminId,
    pub token: TokenId,
    /// Pledged funds the admin owns outright.
    pub owned: Amount,
    /// Pledged funds the admin can redirect as a delegate.
    pub delegated: Amount,
    /// Pledged funds proposed to the admin and not yet committed.
    pub proposed: Amount,
    /// Withdrawn funds waiting on the vault.
    pub paying: Amount,
    pub paid: Amount,
}

fn row<'a>(
    rows: &'a mut BTreeMap<(AdminId, TokenId), Holdings>,
    admin: AdminId,
    token: &TokenId,
) -> &'a mut Holdings {
    rows.entry((admin, token.clone())).or_insert_with(|| Holdings {
        admin,
        token: token.clone(),
        owned: 0,
        delegated: 0,
        proposed: 0,
        paying: 0,
        paid: 0,
    })
}

/// Deterministic projection builders.
pub struct ProjectionBuilder;

impl ProjectionBuilder {
    /// Per-admin, per-token holdings, ordered by admin then token. Sums
    /// across donation roots saturate at `Amount::MAX`.
    pub fn holdings<R: LedgerReader>(reader: &R) -> Vec<Holdings> {
        let mut rows: BTreeMap<(AdminId, TokenId), Holdings> = BTreeMap::new();
        for pledge in reader.pledges() {
            if pledge.amount == 0 {
                continue;
            }
            match pledge.state {
                PledgeState::Pledged => {
                    let h = row(&mut rows, pledge.owner, &pledge.token);
                    h.owned = h.owned.saturating_add(pledge.amount);
                    for delegate in &pledge.delegation_chain {
                        let h = row(&mut rows, *delegate, &pledge.token);
                        h.delegated = h.delegated.saturating_add(pledge.amount);
                    }
                    if let Some(project) = pledge.intended_project {
                        let h = row(&mut rows, project, &pledge.token);
                        h.proposed = h.proposed.saturating_add(pledge.amount);
                    }
                }
                PledgeState::Paying => {
                    let h = row(&mut rows, pledge.owner, &pledge.token);
                    h.paying = h.paying.saturating_add(pledge.amount);
                }
                PledgeState::Paid => {
                    let h = row(&mut rows, pledge.owner, &pledge.token);
                    h.paid = h.paid.saturating_add(pledge.amount);
                }
            }
        }
        rows.into_values().collect()
    }

    /// `pledge` followed by each ancestor up to its root.
    pub fn lineage<R: LedgerReader>(
        reader: &R,
        pledge: PledgeId,
        limit: usize,
    ) -> Result<Vec<Pledge>, LedgerError> {
        let mut lineage = vec![reader.get_pledge(pledge)?];
        while let Some(parent) = lineage.last().and_then(|p| p.old_pledge) {
            if lineage.len() > limit {
                return Err(LedgerError::DepthExceeded { limit });
            }
            lineage.push(reader.get_pledge(parent)?);
        }
        Ok(lineage)
    }
}
