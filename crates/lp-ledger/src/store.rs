use std::collections::HashMap;

use lp_types::{Amount, Pledge, PledgeId, PledgeShape, PledgeState};

use crate::error::{LedgerError, LedgerResult};

/// Dedupe key: a shape plus the pledge it was carved from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PledgeKey {
    shape: PledgeShape,
    old_pledge: Option<PledgeId>,
}

impl PledgeKey {
    fn of(pledge: &Pledge) -> Self {
        Self {
            shape: pledge.shape(),
            old_pledge: pledge.old_pledge,
        }
    }
}

/// Append-only table of pledge rows.
///
/// Rows are never removed; a zero-amount row is inert. Rows minted through
/// [`PledgeStore::find_or_create`] are indexed by shape and origin so that
/// repeated moves into the same shape land in the same row.
#[derive(Clone, Debug, Default)]
pub struct PledgeStore {
    pledges: Vec<Pledge>,
    index: HashMap<PledgeKey, PledgeId>,
}

impl PledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.pledges.len()
    }

    pub fn get(&self, id: PledgeId) -> LedgerResult<&Pledge> {
        id.index()
            .and_then(|i| self.pledges.get(i))
            .ok_or(LedgerError::PledgeNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pledge> {
        self.pledges.iter()
    }

    /// Append a new, unindexed row. Used for exclusive payment pledges.
    pub fn create(
        &mut self,
        amount: Amount,
        shape: PledgeShape,
        old_pledge: Option<PledgeId>,
    ) -> PledgeId {
        let id = PledgeId::from_index(self.pledges.len());
        self.pledges
            .push(Pledge::from_shape(id, amount, shape, old_pledge));
        id
    }

    /// Id of the indexed row with this shape and origin, if one exists.
    pub fn find(&self, shape: &PledgeShape, old_pledge: Option<PledgeId>) -> Option<PledgeId> {
        let key = PledgeKey {
            shape: shape.clone(),
            old_pledge,
        };
        self.index.get(&key).copied()
    }

    /// Return the row with this shape and origin, creating an empty one if
    /// none exists.
    pub fn find_or_create(&mut self, shape: PledgeShape, old_pledge: Option<PledgeId>) -> PledgeId {
        let key = PledgeKey { shape, old_pledge };
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = self.create(0, key.shape.clone(), old_pledge);
        self.index.insert(key, id);
        id
    }

    pub fn set_amount(&mut self, id: PledgeId, amount: Amount) -> LedgerResult<()> {
        self.get_mut(id)?.amount = amount;
        Ok(())
    }

    /// Change a row's settlement state, keeping the index consistent.
    pub fn set_state(&mut self, id: PledgeId, state: PledgeState) -> LedgerResult<()> {
        let pledge = self.get_mut(id)?;
        let old_key = PledgeKey::of(pledge);
        pledge.state = state;
        let new_key = PledgeKey::of(pledge);

        if self.index.get(&old_key) == Some(&id) {
            self.index.remove(&old_key);
            self.index.entry(new_key).or_insert(id);
        }
        Ok(())
    }

    /// Move `amount` from one row to another.
    pub fn move_amount(&mut self, from: PledgeId, to: PledgeId, amount: Amount) -> LedgerResult<()> {
        let available = self.get(from)?.amount;
        if amount > available {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available,
            });
        }
        let credited = self
            .get(to)?
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.set_amount(from, available - amount)?;
        self.set_amount(to, credited)
    }

    fn get_mut(&mut self, id: PledgeId) -> LedgerResult<&mut Pledge> {
        id.index()
            .and_then(|i| self.pledges.get_mut(i))
            .ok_or(LedgerError::PledgeNotFound(id))
    }
}
