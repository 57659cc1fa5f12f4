use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::debug;

use lp_ledger::{
    AdminProfile, AfterHook, Holdings, InvariantChecker, JournalEntry, LedgerReader, LedgerResult,
    LiquidPledging, PluginHook, ProjectionBuilder,
};
use lp_types::{
    Address, Admin, AdminId, AdminUpdate, Amount, Clock, PaymentRequest, Pledge, PledgeId,
    PledgeState, PluginId, SystemClock, Timestamp, TokenId,
};
use lp_vault::{
    Capability, CapabilityKind, Payment, PaymentId, PaymentStatus, Vault, VaultError, VaultEvent,
};

use crate::config::PledgingConfig;
use crate::error::SdkResult;
use crate::report::{TokenReconciliation, VerificationReport};

#[derive(Clone, Debug)]
struct Inner {
    ledger: LiquidPledging,
    vault: Vault,
}

/// A pledge ledger wired to its vault.
///
/// Every method applies to both halves or to neither: it runs against a
/// working copy and the copy replaces the live state only on success.
/// Plugins hear about committed movements after the swap.
#[derive(Debug)]
pub struct Pledging {
    inner: RwLock<Inner>,
}

impl Pledging {
    pub fn new(config: PledgingConfig, clock: Arc<dyn Clock>) -> SdkResult<Self> {
        let vault = Vault::new(config.vault)?;
        let ledger =
            LiquidPledging::new(config.ledger, clock, vault.address())?.with_deferred_hooks();
        Ok(Self {
            inner: RwLock::new(Inner { ledger, vault }),
        })
    }

    /// Create an instance driven by wall-clock time.
    pub fn with_system_clock(config: PledgingConfig) -> SdkResult<Self> {
        Self::new(config, Arc::new(SystemClock))
    }

    // ---- admins ----

    pub fn add_giver(&self, caller: &Address, profile: AdminProfile) -> SdkResult<AdminId> {
        self.transact(|inner| Ok(inner.ledger.add_giver(caller, profile)?))
    }

    pub fn add_delegate(&self, caller: &Address, profile: AdminProfile) -> SdkResult<AdminId> {
        self.transact(|inner| Ok(inner.ledger.add_delegate(caller, profile)?))
    }

    pub fn add_project(
        &self,
        caller: &Address,
        profile: AdminProfile,
        parent: Option<AdminId>,
    ) -> SdkResult<AdminId> {
        self.transact(|inner| Ok(inner.ledger.add_project(caller, profile, parent)?))
    }

    pub fn update_admin(&self, caller: &Address, admin: AdminId, update: AdminUpdate) -> SdkResult<()> {
        self.transact(|inner| Ok(inner.ledger.update_admin(caller, admin, update)?))
    }

    pub fn register_plugin(&self, caller: &Address, plugin: Arc<dyn PluginHook>) -> SdkResult<PluginId> {
        self.transact(|inner| Ok(inner.ledger.register_plugin(caller, plugin)?))
    }

    pub fn cancel_project(&self, caller: &Address, project: AdminId) -> SdkResult<()> {
        self.transact(|inner| Ok(inner.ledger.cancel_project(caller, project)?))
    }

    // ---- pledges ----

    /// Deposit `amount` into the vault and credit it to `giver`, then hand
    /// it to `receiver`.
    pub fn donate(
        &self,
        caller: &Address,
        giver: AdminId,
        receiver: AdminId,
        token: TokenId,
        amount: Amount,
    ) -> SdkResult<PledgeId> {
        self.transact(|inner| {
            inner.vault.deposit(&token, amount)?;
            Ok(inner.ledger.donate(caller, giver, receiver, token, amount)?)
        })
    }

    pub fn transfer(
        &self,
        caller: &Address,
        sender: AdminId,
        pledge: PledgeId,
        amount: Amount,
        receiver: AdminId,
    ) -> SdkResult<PledgeId> {
        self.transact(|inner| Ok(inner.ledger.transfer(caller, sender, pledge, amount, receiver)?))
    }

    pub fn m_transfer(
        &self,
        caller: &Address,
        sender: AdminId,
        moves: &[(PledgeId, Amount)],
        receiver: AdminId,
    ) -> SdkResult<Vec<PledgeId>> {
        self.transact(|inner| Ok(inner.ledger.m_transfer(caller, sender, moves, receiver)?))
    }

    pub fn cancel_pledge(&self, caller: &Address, pledge: PledgeId, amount: Amount) -> SdkResult<PledgeId> {
        self.transact(|inner| Ok(inner.ledger.cancel_pledge(caller, pledge, amount)?))
    }

    pub fn normalize(&self, pledge: PledgeId) -> SdkResult<PledgeId> {
        self.transact(|inner| Ok(inner.ledger.normalize(pledge)?))
    }

    pub fn m_normalize(&self, pledges: &[PledgeId]) -> SdkResult<Vec<PledgeId>> {
        self.transact(|inner| Ok(inner.ledger.m_normalize(pledges)?))
    }

    // ---- payments ----

    /// Withdraw from a project-owned pledge and authorize the payment in
    /// the vault. Under autopay the payment is settled on both sides before
    /// this returns.
    pub fn withdraw(&self, caller: &Address, pledge: PledgeId, amount: Amount) -> SdkResult<Payment> {
        self.transact(|inner| {
            inner.ensure_autopay_funds(&[(pledge, amount)])?;
            let request = inner.ledger.withdraw(caller, pledge, amount)?;
            inner.authorize(&request)
        })
    }

    pub fn m_withdraw(&self, caller: &Address, withdrawals: &[(PledgeId, Amount)]) -> SdkResult<Vec<Payment>> {
        self.transact(|inner| {
            inner.ensure_autopay_funds(withdrawals)?;
            let requests = inner.ledger.m_withdraw(caller, withdrawals)?;
            requests.iter().map(|request| inner.authorize(request)).collect()
        })
    }

    pub fn confirm_payment(&self, caller: &Address, payment: PaymentId) -> SdkResult<Payment> {
        self.transact(|inner| {
            let payment = inner.vault.confirm_payment(caller, payment)?;
            inner.settle_confirmed(&payment)?;
            Ok(payment)
        })
    }

    /// Cancel a pending payment and return its funds to the pledge they
    /// were withdrawn from.
    pub fn cancel_payment(&self, caller: &Address, payment: PaymentId) -> SdkResult<Payment> {
        self.transact(|inner| {
            let payment = inner.vault.cancel_payment(caller, payment)?;
            inner.settle_canceled(&payment)?;
            Ok(payment)
        })
    }

    pub fn multi_confirm(&self, caller: &Address, payments: &[PaymentId]) -> SdkResult<Vec<Payment>> {
        self.transact(|inner| {
            let payments = inner.vault.multi_confirm(caller, payments)?;
            for payment in &payments {
                inner.settle_confirmed(payment)?;
            }
            Ok(payments)
        })
    }

    pub fn multi_cancel(&self, caller: &Address, payments: &[PaymentId]) -> SdkResult<Vec<Payment>> {
        self.transact(|inner| {
            let payments = inner.vault.multi_cancel(caller, payments)?;
            for payment in &payments {
                inner.settle_canceled(payment)?;
            }
            Ok(payments)
        })
    }

    // ---- vault administration ----

    /// Pull funds out of the vault to the escape-hatch destination. The
    /// ledger is not told; [`Self::verify`] accounts for escaped funds.
    pub fn escape_funds(&self, caller: &Address, token: &TokenId, amount: Amount) -> SdkResult<()> {
        self.transact(|inner| Ok(inner.vault.escape_funds(caller, token, amount)?))
    }

    pub fn set_autopay(&self, caller: &Address, enabled: bool) -> SdkResult<()> {
        self.transact(|inner| Ok(inner.vault.set_autopay(caller, enabled)?))
    }

    pub fn grant(&self, caller: &Address, to: Address, capability: Capability) -> SdkResult<()> {
        self.transact(|inner| Ok(inner.vault.grant(caller, to, capability)?))
    }

    pub fn revoke(&self, caller: &Address, from: Address, kind: CapabilityKind) -> SdkResult<()> {
        self.transact(|inner| Ok(inner.vault.revoke(caller, from, kind)?))
    }

    pub fn add_escape_hatch_caller(&self, caller: &Address, who: Address) -> SdkResult<()> {
        self.transact(|inner| Ok(inner.vault.add_escape_hatch_caller(caller, who)?))
    }

    pub fn remove_escape_hatch_caller(&self, caller: &Address, who: Address) -> SdkResult<()> {
        self.transact(|inner| Ok(inner.vault.remove_escape_hatch_caller(caller, who)?))
    }

    // ---- reads ----

    pub fn vault_address(&self) -> Address {
        self.read().vault.address()
    }

    pub fn now(&self) -> Timestamp {
        self.read().ledger.now()
    }

    pub fn balance(&self, token: &TokenId) -> Amount {
        self.read().vault.balance(token)
    }

    pub fn escaped(&self, token: &TokenId) -> Amount {
        self.read().vault.escaped(token)
    }

    pub fn payment(&self, id: PaymentId) -> SdkResult<Payment> {
        Ok(self.read().vault.payment(id)?.clone())
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.read().vault.payments().to_vec()
    }

    pub fn vault_events(&self) -> Vec<VaultEvent> {
        self.read().vault.events().to_vec()
    }

    pub fn holdings(&self) -> Vec<Holdings> {
        ProjectionBuilder::holdings(&self.read().ledger)
    }

    /// `pledge` and its ancestors, newest first.
    pub fn lineage(&self, pledge: PledgeId) -> SdkResult<Vec<Pledge>> {
        let inner = self.read();
        let limit = inner.ledger.config().max_lineage_depth;
        Ok(ProjectionBuilder::lineage(&inner.ledger, pledge, limit)?)
    }

    /// Check ledger invariants, the journal chain, and that the vault holds
    /// what the ledger says is outstanding.
    pub fn verify(&self) -> VerificationReport {
        let inner = self.read();
        let invariants = InvariantChecker::check(&inner.ledger, inner.ledger.config());

        let mut outstanding: BTreeMap<TokenId, Amount> = inner
            .vault
            .tokens()
            .into_iter()
            .map(|token| (token, 0))
            .collect();
        for pledge in inner.ledger.pledges() {
            if matches!(pledge.state, PledgeState::Pledged | PledgeState::Paying) {
                let total = outstanding.entry(pledge.token.clone()).or_insert(0);
                *total = total.saturating_add(pledge.amount);
            }
        }
        let tokens = outstanding
            .into_iter()
            .map(|(token, outstanding)| TokenReconciliation {
                vault_balance: inner.vault.balance(&token),
                escaped: inner.vault.escaped(&token),
                outstanding,
                token,
            })
            .collect();

        VerificationReport { invariants, tokens }
    }

    // ---- internals ----

    /// Neither half is ever left partially updated, so a poisoned lock
    /// still guards consistent state.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `op` to a working copy and swap it in on success. Plugin
    /// after-hooks are delivered once the lock is released, so they may read
    /// through `self`; a failed operation delivers none.
    fn transact<T>(&self, op: impl FnOnce(&mut Inner) -> SdkResult<T>) -> SdkResult<T> {
        let mut live = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut working = live.clone();
        let out = op(&mut working)?;
        let hooks = working.ledger.take_after_hooks();
        *live = working;
        drop(live);
        if !hooks.is_empty() {
            debug!(count = hooks.len(), "delivering plugin after-hooks");
        }
        hooks.into_iter().for_each(AfterHook::deliver);
        Ok(out)
    }
}

impl Inner {
    /// Under autopay a withdrawal settles immediately, so the vault must
    /// already hold the funds. Checked up front so a rejected payment never
    /// reaches the ledger's plugins.
    fn ensure_autopay_funds(&self, withdrawals: &[(PledgeId, Amount)]) -> SdkResult<()> {
        if !self.vault.autopay() {
            return Ok(());
        }
        let mut wanted: BTreeMap<TokenId, Amount> = BTreeMap::new();
        for (pledge, amount) in withdrawals {
            let token = self.ledger.get_pledge(*pledge)?.token;
            let total = wanted.entry(token).or_insert(0);
            *total = total.checked_add(*amount).ok_or(VaultError::Overflow)?;
        }
        for (token, requested) in wanted {
            let available = self.vault.balance(&token);
            if requested > available {
                return Err(VaultError::InsufficientFunds {
                    token,
                    requested,
                    available,
                }
                .into());
            }
        }
        Ok(())
    }

    fn authorize(&mut self, request: &PaymentRequest) -> SdkResult<Payment> {
        let payment = self.vault.authorize_payment(request)?;
        if payment.status == PaymentStatus::Confirmed {
            debug!(payment = %payment.id, "autopay settled");
            self.settle_confirmed(&payment)?;
        }
        Ok(payment)
    }

    fn settle_confirmed(&mut self, payment: &Payment) -> LedgerResult<()> {
        let vault = self.vault.address();
        self.ledger
            .confirm_payment(&vault, payment.pledge, payment.amount)
    }

    fn settle_canceled(&mut self, payment: &Payment) -> LedgerResult<PledgeId> {
        let vault = self.vault.address();
        self.ledger
            .cancel_payment(&vault, payment.pledge, payment.amount)
    }
}

impl LedgerReader for Pledging {
    fn get_pledge(&self, id: PledgeId) -> LedgerResult<Pledge> {
        self.read().ledger.get_pledge(id)
    }

    fn get_admin(&self, id: AdminId) -> LedgerResult<Admin> {
        self.read().ledger.get_admin(id)
    }

    fn number_of_pledges(&self) -> usize {
        self.read().ledger.number_of_pledges()
    }

    fn number_of_admins(&self) -> usize {
        self.read().ledger.number_of_admins()
    }

    fn pledges(&self) -> Vec<Pledge> {
        self.read().ledger.pledges()
    }

    fn admins(&self) -> Vec<Admin> {
        self.read().ledger.admins()
    }

    fn journal(&self) -> Vec<JournalEntry> {
        self.read().ledger.journal()
    }
}
