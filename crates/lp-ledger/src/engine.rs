use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use lp_types::{
    Address, Admin, AdminId, AdminKind, AdminUpdate, Amount, Clock, PaymentRequest, Pledge,
    PledgeId, PledgeShape, PledgeState, PluginId, Timestamp, TokenId,
};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::journal::{Journal, JournalEntry, LedgerEvent, MoveReason};
use crate::plugin::{
    AfterHook, HookResult, HookRole, HookSide, PluginHook, PluginRegistry, TransferEvent,
};
use crate::registry::{AdminProfile, AdminRegistry};
use crate::store::PledgeStore;
use crate::traits::LedgerReader;

/// Everything an operation may change.
#[derive(Clone, Debug, Default)]
pub(crate) struct LedgerState {
    pub(crate) admins: AdminRegistry,
    pub(crate) pledges: PledgeStore,
    pub(crate) plugins: PluginRegistry,
    pub(crate) journal: Journal,
}

/// The pledge ownership and delegation ledger.
///
/// Every public operation is all-or-nothing: it runs against a working copy
/// of the state, and the copy replaces the live state only when the whole
/// operation succeeds. Plugin after-hooks are delivered once the copy is in
/// place, or held for [`LiquidPledging::take_after_hooks`] when the ledger
/// is part of a larger unit of work.
#[derive(Clone)]
pub struct LiquidPledging {
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    /// Address allowed to settle payments.
    vault: Address,
    state: LedgerState,
    defer_hooks: bool,
    pending_hooks: Vec<AfterHook>,
}

impl fmt::Debug for LiquidPledging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiquidPledging")
            .field("config", &self.config)
            .field("vault", &self.vault)
            .field("admins", &self.state.admins.count())
            .field("pledges", &self.state.pledges.count())
            .field("pending_hooks", &self.pending_hooks.len())
            .finish()
    }
}

impl LiquidPledging {
    pub fn new(config: LedgerConfig, clock: Arc<dyn Clock>, vault: Address) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            vault,
            state: LedgerState::default(),
            defer_hooks: false,
            pending_hooks: Vec::new(),
        })
    }

    /// Hold after-hooks of committed operations until the caller takes them
    /// with [`take_after_hooks`](Self::take_after_hooks).
    pub fn with_deferred_hooks(mut self) -> Self {
        self.defer_hooks = true;
        self
    }

    /// After-hooks owed for operations committed since the last call, in
    /// the order the movements happened.
    pub fn take_after_hooks(&mut self) -> Vec<AfterHook> {
        std::mem::take(&mut self.pending_hooks)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn vault(&self) -> Address {
        self.vault
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ---- admins ------------------------------------------------------

    pub fn add_giver(&mut self, caller: &Address, profile: AdminProfile) -> LedgerResult<AdminId> {
        self.transact(|tx| tx.add_admin(caller, AdminKind::Giver, profile, None))
    }

    pub fn add_delegate(&mut self, caller: &Address, profile: AdminProfile) -> LedgerResult<AdminId> {
        self.transact(|tx| tx.add_admin(caller, AdminKind::Delegate, profile, None))
    }

    pub fn add_project(
        &mut self,
        caller: &Address,
        profile: AdminProfile,
        parent: Option<AdminId>,
    ) -> LedgerResult<AdminId> {
        self.transact(|tx| tx.add_admin(caller, AdminKind::Project, profile, parent))
    }

    /// Change an admin's metadata or hand over control. Pledges already in
    /// flight keep their absolute deadlines.
    pub fn update_admin(
        &mut self,
        caller: &Address,
        admin: AdminId,
        update: AdminUpdate,
    ) -> LedgerResult<()> {
        self.transact(|tx| {
            let current = tx.admin(admin)?;
            if !current.is_controlled_by(caller) {
                return Err(LedgerError::unauthorized(caller, format!("update {admin}")));
            }
            if update.is_empty() {
                return Ok(());
            }
            tx.state.admins.update(admin, &update)?;
            tx.record(LedgerEvent::AdminUpdated { admin })?;
            info!(%admin, "admin updated");
            Ok(())
        })
    }

    pub fn register_plugin(
        &mut self,
        caller: &Address,
        plugin: Arc<dyn PluginHook>,
    ) -> LedgerResult<PluginId> {
        self.transact(|tx| {
            let name = plugin.name().to_string();
            let id = tx.state.plugins.register(plugin);
            tx.record(LedgerEvent::PluginRegistered {
                plugin: id,
                name: name.clone(),
            })?;
            info!(plugin = %id, %name, by = %caller, "plugin registered");
            Ok(id)
        })
    }

    /// Cancel a project. The caller must control the project or one of its
    /// ancestors. Pledges are rolled back lazily by [`Self::normalize`].
    pub fn cancel_project(&mut self, caller: &Address, project: AdminId) -> LedgerResult<()> {
        self.transact(|tx| {
            let admin = tx.admin(project)?;
            if !admin.is_project() {
                return Err(LedgerError::WrongAdminKind {
                    id: project,
                    expected: AdminKind::Project,
                    actual: admin.kind,
                });
            }
            let depth = tx.config.max_project_depth;
            if !tx.state.admins.is_controlled_in_lineage(project, caller, depth)? {
                return Err(LedgerError::unauthorized(caller, format!("cancel {project}")));
            }
            tx.state.admins.cancel(project)?;
            tx.record(LedgerEvent::ProjectCanceled {
                project,
                by: *caller,
            })?;
            info!(%project, by = %caller, "project canceled");
            Ok(())
        })
    }

    // ---- funds -------------------------------------------------------

    /// Donate `amount` of `token` from `giver` and hand it to `receiver`
    /// under the owner transfer rules. Returns the pledge the funds land in.
    pub fn donate(
        &mut self,
        caller: &Address,
        giver: AdminId,
        receiver: AdminId,
        token: TokenId,
        amount: Amount,
    ) -> LedgerResult<PledgeId> {
        self.transact(|tx| tx.donate(caller, giver, receiver, token, amount))
    }

    /// Move `amount` out of `pledge`, acting as admin `sender`.
    pub fn transfer(
        &mut self,
        caller: &Address,
        sender: AdminId,
        pledge: PledgeId,
        amount: Amount,
        receiver: AdminId,
    ) -> LedgerResult<PledgeId> {
        self.transact(|tx| tx.transfer(caller, sender, pledge, amount, receiver))
    }

    /// Several transfers from the same sender to the same receiver, applied
    /// as one operation.
    pub fn m_transfer(
        &mut self,
        caller: &Address,
        sender: AdminId,
        moves: &[(PledgeId, Amount)],
        receiver: AdminId,
    ) -> LedgerResult<Vec<PledgeId>> {
        self.transact(|tx| {
            moves
                .iter()
                .map(|(pledge, amount)| tx.transfer(caller, sender, *pledge, *amount, receiver))
                .collect()
        })
    }

    pub fn withdraw(
        &mut self,
        caller: &Address,
        pledge: PledgeId,
        amount: Amount,
    ) -> LedgerResult<PaymentRequest> {
        self.transact(|tx| tx.withdraw(caller, pledge, amount))
    }

    pub fn m_withdraw(
        &mut self,
        caller: &Address,
        withdrawals: &[(PledgeId, Amount)],
    ) -> LedgerResult<Vec<PaymentRequest>> {
        self.transact(|tx| {
            withdrawals
                .iter()
                .map(|(pledge, amount)| tx.withdraw(caller, *pledge, *amount))
                .collect()
        })
    }

    /// Return funds of a non-root pledge to its nearest ancestor that does
    /// not involve a canceled project.
    pub fn cancel_pledge(
        &mut self,
        caller: &Address,
        pledge: PledgeId,
        amount: Amount,
    ) -> LedgerResult<PledgeId> {
        self.transact(|tx| tx.cancel_pledge(caller, pledge, amount))
    }

    /// Commit an elapsed proposal or roll back a pledge touching a canceled
    /// project. Callable by anyone; idempotent.
    pub fn normalize(&mut self, pledge: PledgeId) -> LedgerResult<PledgeId> {
        self.transact(|tx| tx.normalize_pledge(pledge))
    }

    pub fn m_normalize(&mut self, pledges: &[PledgeId]) -> LedgerResult<Vec<PledgeId>> {
        self.transact(|tx| pledges.iter().map(|p| tx.normalize_pledge(*p)).collect())
    }

    // ---- settlement callbacks ------------------------------------------

    /// Mark a `Paying` pledge `Paid`. Only the vault may call this.
    pub fn confirm_payment(
        &mut self,
        caller: &Address,
        pledge: PledgeId,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.transact(|tx| {
            tx.require_vault(caller)?;
            let p = tx.paying_pledge(pledge, amount)?;
            tx.state.pledges.set_state(p.id, PledgeState::Paid)?;
            tx.record(LedgerEvent::PaymentConfirmed { pledge, amount })?;
            info!(%pledge, amount, "payment confirmed");
            Ok(())
        })
    }

    /// Return a `Paying` pledge's funds to the pledged row it came from.
    /// Only the vault may call this.
    pub fn cancel_payment(
        &mut self,
        caller: &Address,
        pledge: PledgeId,
        amount: Amount,
    ) -> LedgerResult<PledgeId> {
        self.transact(|tx| {
            tx.require_vault(caller)?;
            let p = tx.paying_pledge(pledge, amount)?;
            let shape = p.shape().in_state(PledgeState::Pledged);
            let restored = tx.move_funds(p.id, shape, amount, MoveReason::CancelPayment)?;
            let restored = tx.normalize_pledge(restored)?;
            tx.record(LedgerEvent::PaymentCanceled {
                pledge,
                restored,
                amount,
            })?;
            info!(%pledge, %restored, amount, "payment canceled");
            Ok(restored)
        })
    }

    // ---- internals -----------------------------------------------------

    fn transact<T>(&mut self, op: impl FnOnce(&mut Tx<'_>) -> LedgerResult<T>) -> LedgerResult<T> {
        let mut tx = Tx {
            config: &self.config,
            now: self.clock.now(),
            vault: self.vault,
            state: self.state.clone(),
            after: Vec::new(),
        };
        let out = op(&mut tx)?;
        let Tx { state, after, .. } = tx;
        self.state = state;
        if self.defer_hooks {
            self.pending_hooks.extend(after);
        } else {
            after.into_iter().for_each(AfterHook::deliver);
        }
        Ok(out)
    }
}

impl LedgerReader for LiquidPledging {
    fn get_pledge(&self, id: PledgeId) -> LedgerResult<Pledge> {
        self.state.pledges.get(id).cloned()
    }

    fn get_admin(&self, id: AdminId) -> LedgerResult<Admin> {
        self.state.admins.get(id).cloned()
    }

    fn number_of_pledges(&self) -> usize {
        self.state.pledges.count()
    }

    fn number_of_admins(&self) -> usize {
        self.state.admins.count()
    }

    fn pledges(&self) -> Vec<Pledge> {
        self.state.pledges.iter().cloned().collect()
    }

    fn admins(&self) -> Vec<Admin> {
        self.state.admins.iter().cloned().collect()
    }

    fn journal(&self) -> Vec<JournalEntry> {
        self.state.journal.entries().to_vec()
    }
}

impl LiquidPledging {
    /// Check the journal hash chain end to end.
    pub fn verify_journal(&self) -> LedgerResult<()> {
        self.state.journal.verify()
    }
}

/// Working copy of the ledger for one operation.
pub(crate) struct Tx<'a> {
    pub(crate) config: &'a LedgerConfig,
    pub(crate) now: Timestamp,
    vault: Address,
    pub(crate) state: LedgerState,
    /// Post-commit plugin notifications.
    after: Vec<AfterHook>,
}

impl Tx<'_> {
    pub(crate) fn admin(&self, id: AdminId) -> LedgerResult<Admin> {
        self.state.admins.get(id).cloned()
    }

    pub(crate) fn pledge(&self, id: PledgeId) -> LedgerResult<Pledge> {
        self.state.pledges.get(id).cloned()
    }

    pub(crate) fn record(&mut self, event: LedgerEvent) -> LedgerResult<()> {
        self.state.journal.append(self.now, event)?;
        Ok(())
    }

    /// First canceled project among `admin` and its ancestors.
    pub(crate) fn canceled_in_lineage(&self, admin: AdminId) -> LedgerResult<Option<AdminId>> {
        self.state
            .admins
            .canceled_in_lineage(admin, self.config.max_project_depth)
    }

    fn add_admin(
        &mut self,
        caller: &Address,
        kind: AdminKind,
        profile: AdminProfile,
        parent: Option<AdminId>,
    ) -> LedgerResult<AdminId> {
        if let Some(plugin) = profile.plugin {
            self.state.plugins.get(plugin)?;
        }
        let id = self.state.admins.insert(
            kind,
            *caller,
            profile,
            parent,
            self.config.max_project_depth,
        )?;
        self.record(LedgerEvent::AdminAdded {
            admin: id,
            kind,
            controller: *caller,
        })?;
        info!(admin = %id, %kind, controller = %caller, "admin added");
        Ok(id)
    }

    fn donate(
        &mut self,
        caller: &Address,
        giver: AdminId,
        receiver: AdminId,
        token: TokenId,
        amount: Amount,
    ) -> LedgerResult<PledgeId> {
        if giver.is_zero() || receiver.is_zero() {
            return Err(LedgerError::ZeroId);
        }
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let giver_admin = self.admin(giver)?;
        if !giver_admin.is_giver() {
            return Err(LedgerError::WrongAdminKind {
                id: giver,
                expected: AdminKind::Giver,
                actual: giver_admin.kind,
            });
        }
        let receiver_admin = self.admin(receiver)?;

        let root = self
            .state
            .pledges
            .find_or_create(PledgeShape::owned_by(giver, token.clone()), None);
        let credited = self
            .state
            .pledges
            .get(root)?
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.state.pledges.set_amount(root, credited)?;
        self.record(LedgerEvent::Donated {
            giver,
            root,
            token: token.clone(),
            amount,
        })?;
        info!(%giver, %root, %token, amount, by = %caller, "donation received");

        let source = self.pledge(root)?;
        let shape = self.owner_transfer_shape(&source, &receiver_admin)?;
        self.move_funds(root, shape, amount, MoveReason::Transfer)
    }

    fn withdraw(
        &mut self,
        caller: &Address,
        pledge: PledgeId,
        amount: Amount,
    ) -> LedgerResult<PaymentRequest> {
        let raw = self.pledge(pledge)?;
        if self.admin(raw.owner)?.is_project() {
            if let Some(canceled) = self.canceled_in_lineage(raw.owner)? {
                return Err(LedgerError::ProjectCanceled(canceled));
            }
        }

        let id = self.normalize_pledge(pledge)?;
        let p = self.pledge(id)?;
        if !p.is_pledged() {
            return Err(LedgerError::InvalidState(format!(
                "{id} is {}, only pledged funds can be withdrawn",
                p.state
            )));
        }
        let owner = self.admin(p.owner)?;
        if !owner.is_project() {
            return Err(LedgerError::InvalidState(format!(
                "{id} is owned by {} {}, only projects can withdraw",
                owner.kind, owner.id
            )));
        }
        if !owner.is_controlled_by(caller) {
            return Err(LedgerError::unauthorized(caller, format!("withdraw from {id}")));
        }
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if amount > p.amount {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: p.amount,
            });
        }

        let parent = self.parent_with_room(id)?;
        let shape = PledgeShape {
            intended_project: None,
            commit_time: None,
            state: PledgeState::Paying,
            ..p.shape()
        };
        let paying = self.state.pledges.create(0, shape, Some(parent));
        self.apply_move(id, paying, amount, MoveReason::Withdraw)?;

        let request = PaymentRequest {
            pledge: paying,
            amount,
            token: p.token.clone(),
            payee: owner.controller,
        };
        self.record(LedgerEvent::PaymentRequested {
            pledge: paying,
            amount,
            payee: owner.controller,
        })?;
        info!(from = %id, pledge = %paying, amount, payee = %owner.controller, "withdrawal requested");
        Ok(request)
    }

    fn cancel_pledge(
        &mut self,
        caller: &Address,
        pledge: PledgeId,
        amount: Amount,
    ) -> LedgerResult<PledgeId> {
        let id = self.normalize_pledge(pledge)?;
        let p = self.pledge(id)?;
        if !p.is_pledged() {
            return Err(LedgerError::InvalidState(format!(
                "{id} is {}, only pledged funds can be canceled",
                p.state
            )));
        }
        let Some(origin) = p.old_pledge else {
            return Err(LedgerError::InvalidState(format!(
                "{id} is an original donation and cannot be canceled"
            )));
        };
        let depth = self.config.max_project_depth;
        if !self
            .state
            .admins
            .is_controlled_in_lineage(p.owner, caller, depth)?
        {
            return Err(LedgerError::unauthorized(caller, format!("cancel {id}")));
        }
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if amount > p.amount {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: p.amount,
            });
        }
        let target = self.nearest_live_ancestor(origin)?.ok_or_else(|| {
            LedgerError::InvalidState(format!("{id} has no ancestor to return funds to"))
        })?;
        self.apply_move(id, target, amount, MoveReason::CancelPledge)?;
        Ok(target)
    }

    fn require_vault(&self, caller: &Address) -> LedgerResult<()> {
        if *caller != self.vault {
            return Err(LedgerError::unauthorized(caller, "settle payments"));
        }
        Ok(())
    }

    /// A `Paying` pledge whose amount matches the payment exactly.
    fn paying_pledge(&self, pledge: PledgeId, amount: Amount) -> LedgerResult<Pledge> {
        let p = self.pledge(pledge)?;
        if p.state != PledgeState::Paying {
            return Err(LedgerError::InvalidState(format!(
                "{pledge} is {}, expected Paying",
                p.state
            )));
        }
        if p.amount != amount {
            return Err(LedgerError::InvalidState(format!(
                "{pledge} holds {}, payment is for {amount}",
                p.amount
            )));
        }
        Ok(p)
    }

    // ---- fund movement -------------------------------------------------

    /// Move `amount` out of `from` into the pledge with `shape`.
    ///
    /// Same shape is a no-op. An ancestor already holding `shape` takes the
    /// funds back; otherwise the row with `shape` carved from `from` is found
    /// or created. When `from` already sits at the lineage bound the new row
    /// is carved from its closest ancestor with room. Returns the destination.
    pub(crate) fn move_funds(
        &mut self,
        from: PledgeId,
        shape: PledgeShape,
        amount: Amount,
        reason: MoveReason,
    ) -> LedgerResult<PledgeId> {
        let source = self.pledge(from)?;
        if source.shape() == shape {
            return Ok(from);
        }
        let to = match self.ancestor_with_shape(&source, &shape)? {
            Some(ancestor) => ancestor,
            None => {
                let parent = self.parent_with_room(from)?;
                self.state.pledges.find_or_create(shape, Some(parent))
            }
        };
        self.apply_move(from, to, amount, reason)?;
        Ok(to)
    }

    /// Run plugin checks, move the amount, and journal the movement.
    pub(crate) fn apply_move(
        &mut self,
        from: PledgeId,
        to: PledgeId,
        amount: Amount,
        reason: MoveReason,
    ) -> LedgerResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let source = self.pledge(from)?;
        let dest = self.pledge(to)?;
        self.run_before_hooks(&source, &dest, amount)?;
        self.state.pledges.move_amount(from, to, amount)?;
        self.record(LedgerEvent::Moved {
            from,
            to,
            amount,
            reason,
        })?;
        debug!(%from, %to, amount, ?reason, "funds moved");
        Ok(())
    }

    fn run_before_hooks(&mut self, source: &Pledge, dest: &Pledge, amount: Amount) -> LedgerResult<()> {
        for (side, pledge) in [(HookSide::Source, source), (HookSide::Destination, dest)] {
            for (admin, role) in roles(pledge) {
                let Some(plugin_id) = self.state.admins.get(admin)?.plugin else {
                    continue;
                };
                let plugin = Arc::clone(self.state.plugins.get(plugin_id)?);
                let event = TransferEvent {
                    admin,
                    side,
                    role,
                    from_pledge: source.id,
                    to_pledge: dest.id,
                    from_owner: source.owner,
                    to_owner: dest.owner,
                    amount,
                };
                if let HookResult::Reject { reason } = plugin.before_transfer(&event) {
                    return Err(LedgerError::PluginRejected {
                        plugin: plugin_id,
                        reason,
                    });
                }
                self.after.push(AfterHook::new(plugin, event));
            }
        }
        Ok(())
    }

    /// Nearest ancestor of `pledge` (excluding itself) with `shape`.
    fn ancestor_with_shape(
        &self,
        pledge: &Pledge,
        shape: &PledgeShape,
    ) -> LedgerResult<Option<PledgeId>> {
        let mut cursor = pledge.old_pledge;
        let mut hops = 0;
        while let Some(id) = cursor {
            hops += 1;
            if hops > self.config.max_lineage_depth {
                return Err(LedgerError::DepthExceeded {
                    limit: self.config.max_lineage_depth,
                });
            }
            let ancestor = self.state.pledges.get(id)?;
            if ancestor.shape() == *shape {
                return Ok(Some(id));
            }
            cursor = ancestor.old_pledge;
        }
        Ok(None)
    }

    /// Number of `old_pledge` hops from `pledge` to its root.
    pub(crate) fn lineage_depth(&self, pledge: PledgeId) -> LedgerResult<usize> {
        let mut cursor = self.state.pledges.get(pledge)?.old_pledge;
        let mut hops = 0;
        while let Some(id) = cursor {
            hops += 1;
            if hops > self.config.max_lineage_depth {
                return Err(LedgerError::DepthExceeded {
                    limit: self.config.max_lineage_depth,
                });
            }
            cursor = self.state.pledges.get(id)?.old_pledge;
        }
        Ok(hops)
    }

    /// `pledge` itself, or its closest ancestor whose children stay within
    /// `max_lineage_depth` hops of the root.
    fn parent_with_room(&self, pledge: PledgeId) -> LedgerResult<PledgeId> {
        let depth = self.lineage_depth(pledge)?;
        let mut parent = pledge;
        for _ in self.config.max_lineage_depth.saturating_sub(1)..depth {
            match self.state.pledges.get(parent)?.old_pledge {
                Some(up) => parent = up,
                None => break,
            }
        }
        Ok(parent)
    }

    /// Starting at `start`, the first pledged ancestor whose owner and
    /// intended project are not canceled.
    pub(crate) fn nearest_live_ancestor(&self, start: PledgeId) -> LedgerResult<Option<PledgeId>> {
        let mut cursor = Some(start);
        let mut hops = 0;
        while let Some(id) = cursor {
            hops += 1;
            if hops > self.config.max_lineage_depth + 1 {
                return Err(LedgerError::DepthExceeded {
                    limit: self.config.max_lineage_depth,
                });
            }
            let candidate = self.pledge(id)?;
            if candidate.is_pledged() && self.canceled_admin(&candidate)?.is_none() {
                return Ok(Some(id));
            }
            cursor = candidate.old_pledge;
        }
        Ok(None)
    }

    /// The canceled project, if any, behind the pledge's owner or intended
    /// project.
    pub(crate) fn canceled_admin(&self, pledge: &Pledge) -> LedgerResult<Option<AdminId>> {
        if let Some(canceled) = self.canceled_in_lineage(pledge.owner)? {
            return Ok(Some(canceled));
        }
        match pledge.intended_project {
            Some(project) => self.canceled_in_lineage(project),
            None => Ok(None),
        }
    }
}

/// Admins appearing on a pledge, with the role each plays.
fn roles(pledge: &Pledge) -> Vec<(AdminId, HookRole)> {
    let mut roles = vec![(pledge.owner, HookRole::Owner)];
    roles.extend(
        pledge
            .delegation_chain
            .iter()
            .map(|d| (*d, HookRole::Delegate)),
    );
    if let Some(project) = pledge.intended_project {
        roles.push((project, HookRole::IntendedProject));
    }
    roles
}
