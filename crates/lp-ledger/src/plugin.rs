use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lp_types::{AdminId, Amount, PledgeId, PluginId};

use crate::error::{LedgerError, LedgerResult};

/// Which end of a fund movement the hooked admin sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookSide {
    /// The admin appears on the pledge funds leave.
    Source,
    /// The admin appears on the pledge funds arrive at.
    Destination,
}

/// The position the hooked admin holds on that pledge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookRole {
    Owner,
    Delegate,
    IntendedProject,
}

/// A single fund movement as seen by one admin's plugin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    /// The admin whose plugin is being called.
    pub admin: AdminId,
    pub side: HookSide,
    pub role: HookRole,
    pub from_pledge: PledgeId,
    pub to_pledge: PledgeId,
    pub from_owner: AdminId,
    pub to_owner: AdminId,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookResult {
    Allow,
    Reject { reason: String },
}

/// External logic attached to an admin and consulted on every movement of
/// funds through a pledge that admin appears on.
///
/// `before_transfer` runs inside the operation and can veto it; a rejection
/// aborts the whole operation. `after_transfer` runs once the operation has
/// been committed.
pub trait PluginHook: Send + Sync {
    fn name(&self) -> &str;
    fn before_transfer(&self, event: &TransferEvent) -> HookResult;
    fn after_transfer(&self, event: &TransferEvent);
}

/// An `after_transfer` call owed to a plugin for a committed movement.
#[derive(Clone)]
pub struct AfterHook {
    plugin: Arc<dyn PluginHook>,
    event: TransferEvent,
}

impl AfterHook {
    pub(crate) fn new(plugin: Arc<dyn PluginHook>, event: TransferEvent) -> Self {
        Self { plugin, event }
    }

    pub fn event(&self) -> &TransferEvent {
        &self.event
    }

    pub fn deliver(self) {
        self.plugin.after_transfer(&self.event);
    }
}

impl fmt::Debug for AfterHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterHook")
            .field("plugin", &self.plugin.name())
            .field("event", &self.event)
            .finish()
    }
}

/// Plugin that allows everything.
pub struct NoOpPlugin;

impl PluginHook for NoOpPlugin {
    fn name(&self) -> &str {
        "noop"
    }

    fn before_transfer(&self, _event: &TransferEvent) -> HookResult {
        HookResult::Allow
    }

    fn after_transfer(&self, _event: &TransferEvent) {}
}

/// Registered plugins, addressed by sequential [`PluginId`].
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn PluginHook>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn PluginHook>) -> PluginId {
        self.plugins.push(plugin);
        PluginId::from_index(self.plugins.len() - 1)
    }

    pub fn get(&self, id: PluginId) -> LedgerResult<&Arc<dyn PluginHook>> {
        id.index()
            .and_then(|i| self.plugins.get(i))
            .ok_or(LedgerError::PluginNotFound(id))
    }

    pub fn contains(&self, id: PluginId) -> bool {
        self.get(id).is_ok()
    }

    pub fn count(&self) -> usize {
        self.plugins.len()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.name()))
            .finish()
    }
}
