use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use lp_types::{Address, Amount, PaymentRequest, TokenId};

use crate::capability::{Capability, CapabilityKind, CapabilitySet};
use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::payment::{Payment, PaymentId, PaymentStatus};

/// Something that happened in the vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    Deposited {
        token: TokenId,
        amount: Amount,
    },
    PaymentAuthorized {
        payment: PaymentId,
        amount: Amount,
    },
    PaymentConfirmed {
        payment: PaymentId,
        payee: Address,
        amount: Amount,
    },
    PaymentCanceled {
        payment: PaymentId,
    },
    EscapeHatchCalled {
        token: TokenId,
        amount: Amount,
        by: Address,
        destination: Address,
    },
    AutopaySet {
        enabled: bool,
    },
    CapabilityGranted {
        to: Address,
        capability: Capability,
    },
    CapabilityRevoked {
        from: Address,
        kind: CapabilityKind,
    },
    EscapeCallerAdded {
        caller: Address,
    },
    EscapeCallerRemoved {
        caller: Address,
    },
}

/// Escrow holding settled value.
///
/// Payments move `Pending -> Confirmed | Canceled`. Every public operation
/// is all-or-nothing.
#[derive(Clone, Debug)]
pub struct Vault {
    address: Address,
    owner: Address,
    escape_hatch_destination: Address,
    escape_hatch_callers: BTreeSet<Address>,
    autopay: bool,
    capabilities: CapabilitySet,
    balances: BTreeMap<TokenId, Amount>,
    escaped: BTreeMap<TokenId, Amount>,
    payments: Vec<Payment>,
    events: Vec<VaultEvent>,
}

impl Vault {
    pub fn new(config: VaultConfig) -> VaultResult<Self> {
        config.validate()?;
        Ok(Self {
            address: config.address,
            owner: config.owner,
            escape_hatch_destination: config.escape_hatch_destination,
            escape_hatch_callers: config.escape_hatch_callers.into_iter().collect(),
            autopay: config.autopay,
            capabilities: CapabilitySet::new(),
            balances: BTreeMap::new(),
            escaped: BTreeMap::new(),
            payments: Vec::new(),
            events: Vec::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn autopay(&self) -> bool {
        self.autopay
    }

    pub fn balance(&self, token: &TokenId) -> Amount {
        self.balances.get(token).copied().unwrap_or(0)
    }

    /// Total sent out through the escape hatch.
    pub fn escaped(&self, token: &TokenId) -> Amount {
        self.escaped.get(token).copied().unwrap_or(0)
    }

    /// Every token the vault has ever held.
    pub fn tokens(&self) -> Vec<TokenId> {
        let mut tokens: BTreeSet<TokenId> = self.balances.keys().cloned().collect();
        tokens.extend(self.escaped.keys().cloned());
        tokens.into_iter().collect()
    }

    pub fn payment(&self, id: PaymentId) -> VaultResult<&Payment> {
        id.index()
            .and_then(|i| self.payments.get(i))
            .ok_or(VaultError::PaymentNotFound(id))
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    pub fn capabilities_of(&self, who: &Address) -> Vec<Capability> {
        self.capabilities.of(who)
    }

    pub fn is_escape_hatch_caller(&self, who: &Address) -> bool {
        *who == self.owner || self.escape_hatch_callers.contains(who)
    }

    // ---- funds -------------------------------------------------------

    pub fn deposit(&mut self, token: &TokenId, amount: Amount) -> VaultResult<()> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let balance = self
            .balance(token)
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        self.balances.insert(token.clone(), balance);
        self.events.push(VaultEvent::Deposited {
            token: token.clone(),
            amount,
        });
        debug!(%token, amount, balance, "deposit");
        Ok(())
    }

    /// Record a payment requested by the ledger. With autopay enabled the
    /// payment is confirmed immediately.
    pub fn authorize_payment(&mut self, request: &PaymentRequest) -> VaultResult<Payment> {
        if request.amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.transact(|vault| {
            let id = PaymentId::from_index(vault.payments.len());
            vault.payments.push(Payment::pending(id, request));
            vault.events.push(VaultEvent::PaymentAuthorized {
                payment: id,
                amount: request.amount,
            });
            info!(payment = %id, pledge = %request.pledge, amount = request.amount, "payment authorized");
            if vault.autopay {
                vault.settle(id)?;
            }
            vault.payment(id).cloned()
        })
    }

    pub fn confirm_payment(&mut self, caller: &Address, id: PaymentId) -> VaultResult<Payment> {
        self.transact(|vault| vault.confirm_one(caller, id))
    }

    pub fn cancel_payment(&mut self, caller: &Address, id: PaymentId) -> VaultResult<Payment> {
        self.transact(|vault| vault.cancel_one(caller, id))
    }

    pub fn multi_confirm(&mut self, caller: &Address, ids: &[PaymentId]) -> VaultResult<Vec<Payment>> {
        self.transact(|vault| ids.iter().map(|id| vault.confirm_one(caller, *id)).collect())
    }

    pub fn multi_cancel(&mut self, caller: &Address, ids: &[PaymentId]) -> VaultResult<Vec<Payment>> {
        self.transact(|vault| ids.iter().map(|id| vault.cancel_one(caller, *id)).collect())
    }

    /// Send `amount` of `token` to the escape-hatch destination, bypassing
    /// settlement. Pledges are not touched.
    pub fn escape_funds(&mut self, caller: &Address, token: &TokenId, amount: Amount) -> VaultResult<()> {
        if !self.is_escape_hatch_caller(caller) {
            return Err(VaultError::unauthorized(caller, "call the escape hatch"));
        }
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let available = self.balance(token);
        if amount > available {
            return Err(VaultError::InsufficientFunds {
                token: token.clone(),
                requested: amount,
                available,
            });
        }
        let escaped = self
            .escaped(token)
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        self.balances.insert(token.clone(), available - amount);
        self.escaped.insert(token.clone(), escaped);
        self.events.push(VaultEvent::EscapeHatchCalled {
            token: token.clone(),
            amount,
            by: *caller,
            destination: self.escape_hatch_destination,
        });
        warn!(
            %token,
            amount,
            by = %caller,
            destination = %self.escape_hatch_destination,
            "escape hatch called"
        );
        Ok(())
    }

    // ---- administration ----------------------------------------------

    pub fn set_autopay(&mut self, caller: &Address, enabled: bool) -> VaultResult<()> {
        if *caller != self.owner && !self.capabilities.holds(caller, CapabilityKind::SetAutopay) {
            return Err(VaultError::unauthorized(caller, "set autopay"));
        }
        self.autopay = enabled;
        self.events.push(VaultEvent::AutopaySet { enabled });
        info!(enabled, by = %caller, "autopay set");
        Ok(())
    }

    pub fn grant(&mut self, caller: &Address, to: Address, capability: Capability) -> VaultResult<()> {
        self.require_owner(caller, "grant capabilities")?;
        self.capabilities.grant(to, capability);
        self.events
            .push(VaultEvent::CapabilityGranted { to, capability });
        info!(%to, kind = %capability.kind(), "capability granted");
        Ok(())
    }

    pub fn revoke(&mut self, caller: &Address, from: Address, kind: CapabilityKind) -> VaultResult<()> {
        self.require_owner(caller, "revoke capabilities")?;
        if !self.capabilities.revoke(&from, kind) {
            return Err(VaultError::InvalidState(format!("{from} does not hold {kind}")));
        }
        self.events.push(VaultEvent::CapabilityRevoked { from, kind });
        info!(%from, %kind, "capability revoked");
        Ok(())
    }

    pub fn add_escape_hatch_caller(&mut self, caller: &Address, who: Address) -> VaultResult<()> {
        self.require_owner(caller, "manage escape hatch callers")?;
        if self.escape_hatch_callers.insert(who) {
            self.events.push(VaultEvent::EscapeCallerAdded { caller: who });
        }
        Ok(())
    }

    pub fn remove_escape_hatch_caller(&mut self, caller: &Address, who: Address) -> VaultResult<()> {
        self.require_owner(caller, "manage escape hatch callers")?;
        if self.escape_hatch_callers.remove(&who) {
            self.events.push(VaultEvent::EscapeCallerRemoved { caller: who });
        }
        Ok(())
    }

    // ---- internals -----------------------------------------------------

    fn transact<T>(&mut self, op: impl FnOnce(&mut Vault) -> VaultResult<T>) -> VaultResult<T> {
        let mut working = self.clone();
        let out = op(&mut working)?;
        *self = working;
        Ok(out)
    }

    fn require_owner(&self, caller: &Address, action: &str) -> VaultResult<()> {
        if *caller != self.owner {
            return Err(VaultError::unauthorized(caller, action));
        }
        Ok(())
    }

    fn confirm_one(&mut self, caller: &Address, id: PaymentId) -> VaultResult<Payment> {
        let amount = self.payment(id)?.amount;
        if !self.capabilities.can_confirm(caller, amount) {
            return Err(VaultError::unauthorized(caller, format!("confirm {id}")));
        }
        self.settle(id)?;
        self.payment(id).cloned()
    }

    fn cancel_one(&mut self, caller: &Address, id: PaymentId) -> VaultResult<Payment> {
        self.payment(id)?;
        if !self.capabilities.holds(caller, CapabilityKind::CancelPayment) {
            return Err(VaultError::unauthorized(caller, format!("cancel {id}")));
        }
        let payment = self.pending_mut(id)?;
        payment.status = PaymentStatus::Canceled;
        self.events.push(VaultEvent::PaymentCanceled { payment: id });
        info!(payment = %id, by = %caller, "payment canceled");
        self.payment(id).cloned()
    }

    /// Pay a pending payment out of the balance.
    fn settle(&mut self, id: PaymentId) -> VaultResult<()> {
        let payment = self.pending_mut(id)?.clone();
        let available = self.balance(&payment.token);
        if payment.amount > available {
            return Err(VaultError::InsufficientFunds {
                token: payment.token,
                requested: payment.amount,
                available,
            });
        }
        self.balances
            .insert(payment.token.clone(), available - payment.amount);
        self.pending_mut(id)?.status = PaymentStatus::Confirmed;
        self.events.push(VaultEvent::PaymentConfirmed {
            payment: id,
            payee: payment.payee,
            amount: payment.amount,
        });
        info!(payment = %id, payee = %payment.payee, amount = payment.amount, "payment confirmed");
        Ok(())
    }

    fn pending_mut(&mut self, id: PaymentId) -> VaultResult<&mut Payment> {
        let payment = id
            .index()
            .and_then(|i| self.payments.get_mut(i))
            .ok_or(VaultError::PaymentNotFound(id))?;
        if !payment.is_pending() {
            return Err(VaultError::InvalidState(format!(
                "{id} is {}, expected Pending",
                payment.status
            )));
        }
        Ok(payment)
    }
}
