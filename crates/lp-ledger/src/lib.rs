//! Pledge ownership and delegation ledger.
//!
//! This crate is the heart of liquid pledging. It provides:
//! - `AdminRegistry` for givers, delegates, and nested projects
//! - `PledgeStore`, the append-only pledge table with its dedupe index
//! - `LiquidPledging`, the transactional engine (donate, transfer, withdraw,
//!   normalize, cancellation, settlement callbacks)
//! - `PluginHook` boundary for external transfer checks
//! - A BLAKE3 hash-chained journal of every committed event
//! - `LedgerReader` trait, projection builders, and an invariant checker

pub mod config;
pub mod engine;
pub mod error;
pub mod journal;
mod normalize;
pub mod plugin;
pub mod projection;
pub mod registry;
pub mod store;
mod transfer;
pub mod traits;
pub mod validation;

pub use config::LedgerConfig;
pub use engine::LiquidPledging;
pub use error::{LedgerError, LedgerResult};
pub use journal::{verify_entries, Journal, JournalEntry, LedgerEvent, MoveReason};
pub use plugin::{
    AfterHook, HookResult, HookRole, HookSide, NoOpPlugin, PluginHook, PluginRegistry,
    TransferEvent,
};
pub use projection::{Holdings, ProjectionBuilder};
pub use registry::{AdminProfile, AdminRegistry};
pub use store::PledgeStore;
pub use traits::LedgerReader;
pub use validation::{InvariantChecker, InvariantReport, Violation, ViolationKind};

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use lp_types::{
        Address, AdminId, AdminUpdate, Amount, ManualClock, PledgeId, PledgeState, Timestamp,
        TokenId,
    };
    use proptest::prelude::*;

    use super::*;

    const DAY: u64 = 86_400;
    const ONE: Amount = 1_000_000_000_000_000_000;

    fn addr(label: &str) -> Address {
        Address::derive(label)
    }

    fn eth() -> TokenId {
        TokenId::new("ETH").unwrap()
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    struct Fixture {
        lp: LiquidPledging,
        clock: ManualClock,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_config(LedgerConfig::default())
        }

        fn with_config(config: LedgerConfig) -> Self {
            let clock = ManualClock::new(Timestamp::from_secs(1_000));
            let lp = LiquidPledging::new(config, Arc::new(clock.clone()), addr("vault")).unwrap();
            Self { lp, clock }
        }

        fn giver(&mut self, label: &str) -> AdminId {
            self.lp
                .add_giver(&addr(label), AdminProfile::named(label))
                .unwrap()
        }

        fn delegate(&mut self, label: &str, commit: u64) -> AdminId {
            self.lp
                .add_delegate(
                    &addr(label),
                    AdminProfile::named(label).with_commit_time(secs(commit)),
                )
                .unwrap()
        }

        fn project(&mut self, label: &str, commit: u64, parent: Option<AdminId>) -> AdminId {
            self.lp
                .add_project(
                    &addr(label),
                    AdminProfile::named(label).with_commit_time(secs(commit)),
                    parent,
                )
                .unwrap()
        }

        fn pledge(&self, id: PledgeId) -> lp_types::Pledge {
            self.lp.get_pledge(id).unwrap()
        }

        fn assert_invariants(&self) {
            let report = InvariantChecker::check(&self.lp, self.lp.config());
            assert!(report.is_valid(), "{:?}", report.violations);
        }
    }

    #[test]
    fn owner_veto_resets_chain_to_new_delegate() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let a = f.delegate("a", 0);
        let b = f.delegate("b", 0);
        let c = f.delegate("c", 0);
        let x = f.project("x", DAY, None);

        let p = f.lp.donate(&addr("alice"), g, a, eth(), 100).unwrap();
        assert_eq!(f.pledge(p).delegation_chain, vec![a]);
        let p = f.lp.transfer(&addr("a"), a, p, 100, b).unwrap();
        assert_eq!(f.pledge(p).delegation_chain, vec![a, b]);
        let p = f.lp.transfer(&addr("b"), b, p, 100, x).unwrap();
        assert_eq!(f.pledge(p).intended_project, Some(x));

        let vetoed = f.lp.transfer(&addr("alice"), g, p, 100, c).unwrap();
        let pledge = f.pledge(vetoed);
        assert_eq!(pledge.delegation_chain, vec![c]);
        assert_eq!(pledge.intended_project, None);
        assert_eq!(pledge.commit_time, None);
        assert_eq!(pledge.amount, 100);
        assert_eq!(f.pledge(p).amount, 0);
        f.assert_invariants();
    }

    #[test]
    fn owner_veto_to_chained_delegate_returns_to_earlier_pledge() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let a = f.delegate("a", 0);
        let b = f.delegate("b", 0);
        let x = f.project("x", DAY, None);

        let with_a = f.lp.donate(&addr("alice"), g, a, eth(), 100).unwrap();
        let with_b = f.lp.transfer(&addr("a"), a, with_a, 100, b).unwrap();
        let proposed = f.lp.transfer(&addr("b"), b, with_b, 60, x).unwrap();

        let back = f.lp.transfer(&addr("alice"), g, proposed, 60, a).unwrap();
        assert_eq!(back, with_a);
        assert_eq!(f.pledge(with_a).amount, 60);
        assert_eq!(f.pledge(with_b).amount, 40);
        assert_eq!(f.pledge(proposed).amount, 0);
        f.assert_invariants();
    }

    #[test]
    fn delegate_redirect_revokes_later_delegates() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let a = f.delegate("a", 0);
        let b = f.delegate("b", 0);
        let c = f.delegate("c", 0);

        let p = f.lp.donate(&addr("alice"), g, a, eth(), 10).unwrap();
        let p = f.lp.transfer(&addr("a"), a, p, 10, b).unwrap();
        let p = f.lp.transfer(&addr("a"), a, p, 10, c).unwrap();
        assert_eq!(f.pledge(p).delegation_chain, vec![a, c]);

        // Naming an earlier delegate truncates the chain there.
        let p = f.lp.transfer(&addr("c"), c, p, 10, a).unwrap();
        assert_eq!(f.pledge(p).delegation_chain, vec![a]);
    }

    #[test]
    fn delegate_cannot_hand_funds_to_another_giver() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let other = f.giver("bob");
        let a = f.delegate("a", 0);
        let p = f.lp.donate(&addr("alice"), g, a, eth(), 10).unwrap();
        let err = f.lp.transfer(&addr("a"), a, p, 10, other).unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
    }

    #[test]
    fn owner_can_hand_ownership_to_another_giver() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let other = f.giver("bob");
        let root = f.lp.donate(&addr("alice"), g, g, eth(), 10).unwrap();
        let moved = f.lp.transfer(&addr("alice"), g, root, 4, other).unwrap();
        let pledge = f.pledge(moved);
        assert_eq!(pledge.owner, other);
        assert_eq!(pledge.old_pledge, Some(root));
        f.assert_invariants();
    }

    #[test]
    fn chain_length_is_bounded() {
        let mut f = Fixture::with_config(LedgerConfig {
            max_delegates: 2,
            ..LedgerConfig::default()
        });
        let g = f.giver("alice");
        let a = f.delegate("a", 0);
        let b = f.delegate("b", 0);
        let c = f.delegate("c", 0);
        let p = f.lp.donate(&addr("alice"), g, a, eth(), 10).unwrap();
        let p = f.lp.transfer(&addr("a"), a, p, 10, b).unwrap();
        let err = f.lp.transfer(&addr("b"), b, p, 10, c).unwrap_err();
        assert_eq!(err, LedgerError::TooManyDelegates { limit: 2 });
    }

    #[test]
    fn cancellation_of_ancestor_rolls_funds_back_to_giver() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let q = f.project("q", 0, None);
        let p = f.project("p", 0, Some(q));

        let proposed = f.lp.donate(&addr("alice"), g, p, eth(), 1_000).unwrap();
        let owned = f.lp.normalize(proposed).unwrap();
        assert_eq!(f.pledge(owned).owner, p);
        assert_eq!(f.pledge(owned).amount, 1_000);

        let err = f.lp.cancel_project(&addr("p"), q).unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
        f.lp.cancel_project(&addr("q"), q).unwrap();
        assert_eq!(
            f.lp.cancel_project(&addr("q"), q),
            Err(LedgerError::AlreadyCanceled(q))
        );

        assert_eq!(
            f.lp.withdraw(&addr("p"), owned, 10).unwrap_err(),
            LedgerError::ProjectCanceled(q)
        );

        let back = f.lp.normalize(owned).unwrap();
        let root = f.pledge(back);
        assert_eq!(root.owner, g);
        assert!(root.is_root());
        assert_eq!(root.amount, 1_000);
        assert_eq!(f.pledge(owned).amount, 0);
        assert_eq!(f.lp.normalize(back).unwrap(), back);
        f.assert_invariants();
    }

    #[test]
    fn transfers_to_canceled_projects_fail() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let q = f.project("q", 0, None);
        let p = f.project("p", 0, Some(q));
        f.lp.cancel_project(&addr("q"), q).unwrap();
        let root = f.lp.donate(&addr("alice"), g, g, eth(), 5).unwrap();
        assert_eq!(
            f.lp.transfer(&addr("alice"), g, root, 5, p),
            Err(LedgerError::ProjectCanceled(q))
        );
        assert_eq!(f.pledge(root).amount, 5);
    }

    #[test]
    fn commit_time_is_longest_window_involved() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let a = f.delegate("a", DAY);
        let b = f.delegate("b", 3 * DAY);
        let x = f.project("x", 0, None);

        let p = f.lp.donate(&addr("alice"), g, a, eth(), 50).unwrap();
        let p = f.lp.transfer(&addr("a"), a, p, 50, b).unwrap();
        let proposed = f.lp.transfer(&addr("b"), b, p, 50, x).unwrap();
        assert_eq!(
            f.pledge(proposed).commit_time,
            Some(Timestamp::from_secs(1_000 + 3 * DAY))
        );

        f.clock.advance(secs(3 * DAY - 1));
        assert_eq!(f.lp.normalize(proposed).unwrap(), proposed);

        f.clock.advance(secs(1));
        let committed = f.lp.normalize(proposed).unwrap();
        let pledge = f.pledge(committed);
        assert_eq!(pledge.owner, x);
        assert!(pledge.delegation_chain.is_empty());
        assert_eq!(pledge.old_pledge, Some(proposed));
        f.assert_invariants();
    }

    #[test]
    fn later_commit_time_changes_do_not_move_deadlines() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let x = f.project("x", DAY, None);
        let proposed = f.lp.donate(&addr("alice"), g, x, eth(), 5).unwrap();

        let err = f
            .lp
            .update_admin(&addr("alice"), x, AdminUpdate::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));

        f.lp
            .update_admin(
                &addr("x"),
                x,
                AdminUpdate {
                    commit_time: Some(secs(10 * DAY)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(f.lp.get_admin(x).unwrap().commit_time, secs(10 * DAY));
        assert_eq!(
            f.pledge(proposed).commit_time,
            Some(Timestamp::from_secs(1_000 + DAY))
        );
    }

    #[test]
    fn project_nesting_stops_at_twenty() {
        let mut f = Fixture::new();
        let mut parent = None;
        for level in 1..=20 {
            let id = f.project(&format!("level-{level}"), 0, parent);
            parent = Some(id);
        }
        let err = f
            .lp
            .add_project(&addr("too-deep"), AdminProfile::named("too-deep"), parent)
            .unwrap_err();
        assert_eq!(err, LedgerError::DepthExceeded { limit: 20 });
        assert_eq!(f.lp.number_of_admins(), 20);
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let x = f.project("x", 0, None);
        let proposed = f.lp.donate(&addr("alice"), g, x, eth(), 5).unwrap();
        let once = f.lp.normalize(proposed).unwrap();
        let pledges = f.lp.number_of_pledges();
        let journal = f.lp.journal().len();
        let twice = f.lp.normalize(once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(f.lp.number_of_pledges(), pledges);
        assert_eq!(f.lp.journal().len(), journal);
    }

    #[test]
    fn split_proposal_with_giver_override() {
        let mut f = Fixture::new();
        let g = f.giver("giver");
        let d1 = f.delegate("delegate1", 0);
        let p1 = f.project("project1", DAY, None);
        let p2 = f.project("project2", 0, None);

        let root = f.lp.donate(&addr("giver"), g, g, eth(), ONE).unwrap();
        let delegated = f
            .lp
            .transfer(&addr("giver"), g, root, ONE / 2, d1)
            .unwrap();
        let to_p1 = f
            .lp
            .transfer(&addr("delegate1"), d1, delegated, ONE / 5, p1)
            .unwrap();
        let to_p2 = f
            .lp
            .transfer(&addr("giver"), g, to_p1, ONE / 10, p2)
            .unwrap();

        assert_eq!(f.pledge(delegated).amount, 3 * ONE / 10);
        assert_eq!(f.pledge(delegated).delegation_chain, vec![d1]);
        assert_eq!(f.pledge(to_p1).amount, ONE / 10);
        assert_eq!(f.pledge(to_p1).intended_project, Some(p1));
        assert_eq!(f.pledge(to_p2).amount, ONE / 10);
        assert_eq!(f.pledge(to_p2).intended_project, Some(p2));

        // project1's window is still open; project2 has none.
        assert_eq!(f.lp.normalize(to_p1).unwrap(), to_p1);
        let owned = f.lp.normalize(to_p2).unwrap();
        assert_eq!(f.pledge(owned).owner, p2);
        assert_eq!(f.pledge(owned).amount, ONE / 10);

        let lineage = ProjectionBuilder::lineage(&f.lp, owned, 64).unwrap();
        let ids: Vec<_> = lineage.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![owned, to_p2, to_p1, delegated, root]);
        f.assert_invariants();
    }

    #[test]
    fn withdraw_and_settle() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let x = f.project("x", 0, None);
        let proposed = f.lp.donate(&addr("alice"), g, x, eth(), 100).unwrap();

        assert!(matches!(
            f.lp.withdraw(&addr("mallory"), proposed, 30),
            Err(LedgerError::Unauthorized { .. })
        ));
        let request = f.lp.withdraw(&addr("x"), proposed, 30).unwrap();
        assert_eq!(request.amount, 30);
        assert_eq!(request.payee, addr("x"));
        let paying = f.pledge(request.pledge);
        assert_eq!(paying.state, PledgeState::Paying);
        assert_eq!(paying.owner, x);
        let owned = paying.old_pledge.unwrap();
        assert_eq!(f.pledge(owned).amount, 70);

        assert!(matches!(
            f.lp.confirm_payment(&addr("x"), request.pledge, 30),
            Err(LedgerError::Unauthorized { .. })
        ));
        f.lp.confirm_payment(&addr("vault"), request.pledge, 30).unwrap();
        assert_eq!(f.pledge(request.pledge).state, PledgeState::Paid);
        assert!(matches!(
            f.lp.confirm_payment(&addr("vault"), request.pledge, 30),
            Err(LedgerError::InvalidState(_))
        ));

        let second = f.lp.withdraw(&addr("x"), owned, 20).unwrap();
        assert_ne!(second.pledge, request.pledge);
        let restored = f
            .lp
            .cancel_payment(&addr("vault"), second.pledge, 20)
            .unwrap();
        assert_eq!(restored, owned);
        assert_eq!(f.pledge(owned).amount, 70);
        assert_eq!(f.pledge(second.pledge).amount, 0);
        f.assert_invariants();

        let holdings = ProjectionBuilder::holdings(&f.lp);
        let row = holdings.iter().find(|h| h.admin == x).unwrap();
        assert_eq!(row.owned, 70);
        assert_eq!(row.paid, 30);
    }

    #[test]
    fn only_projects_withdraw() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let root = f.lp.donate(&addr("alice"), g, g, eth(), 10).unwrap();
        assert!(matches!(
            f.lp.withdraw(&addr("alice"), root, 5),
            Err(LedgerError::InvalidState(_))
        ));
    }

    #[test]
    fn donate_validates_inputs() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let a = f.delegate("a", 0);
        let who = addr("alice");
        assert_eq!(
            f.lp.donate(&who, AdminId(0), a, eth(), 1),
            Err(LedgerError::ZeroId)
        );
        assert_eq!(
            f.lp.donate(&who, g, AdminId(0), eth(), 1),
            Err(LedgerError::ZeroId)
        );
        assert_eq!(f.lp.donate(&who, g, a, eth(), 0), Err(LedgerError::ZeroAmount));
        assert!(matches!(
            f.lp.donate(&who, a, g, eth(), 1),
            Err(LedgerError::WrongAdminKind { .. })
        ));
        assert_eq!(f.lp.number_of_pledges(), 0);
    }

    #[test]
    fn transfer_checks_authority_and_funds() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let a = f.delegate("a", 0);
        let b = f.delegate("b", 0);
        let p = f.lp.donate(&addr("alice"), g, a, eth(), 10).unwrap();

        assert!(matches!(
            f.lp.transfer(&addr("mallory"), a, p, 1, b),
            Err(LedgerError::Unauthorized { .. })
        ));
        // b controls itself but holds no position on the pledge.
        assert!(matches!(
            f.lp.transfer(&addr("b"), b, p, 1, a),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert_eq!(
            f.lp.transfer(&addr("a"), a, p, 11, b),
            Err(LedgerError::InsufficientFunds {
                requested: 11,
                available: 10
            })
        );
        assert_eq!(
            f.lp.transfer(&addr("a"), a, p, 0, b),
            Err(LedgerError::ZeroAmount)
        );
        assert_eq!(f.lp.transfer(&addr("a"), a, p, 10, a).unwrap(), p);
    }

    #[test]
    fn batch_transfer_is_all_or_nothing() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let a = f.delegate("a", 0);
        let first = f.lp.donate(&addr("alice"), g, g, eth(), 10).unwrap();
        let pledges = f.lp.number_of_pledges();

        let err = f
            .lp
            .m_transfer(&addr("alice"), g, &[(first, 5), (first, 6)], a)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(f.pledge(first).amount, 10);
        assert_eq!(f.lp.number_of_pledges(), pledges);

        let moved = f
            .lp
            .m_transfer(&addr("alice"), g, &[(first, 5), (first, 5)], a)
            .unwrap();
        assert_eq!(moved[0], moved[1]);
        assert_eq!(f.pledge(moved[0]).amount, 10);
    }

    #[test]
    fn cancel_pledge_returns_funds_to_origin() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let a = f.delegate("a", 0);
        let root = f.lp.donate(&addr("alice"), g, g, eth(), 10).unwrap();
        let delegated = f.lp.transfer(&addr("alice"), g, root, 4, a).unwrap();

        assert!(matches!(
            f.lp.cancel_pledge(&addr("a"), delegated, 4),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert!(matches!(
            f.lp.cancel_pledge(&addr("alice"), root, 1),
            Err(LedgerError::InvalidState(_))
        ));
        let back = f.lp.cancel_pledge(&addr("alice"), delegated, 4).unwrap();
        assert_eq!(back, root);
        assert_eq!(f.pledge(root).amount, 10);
    }

    struct CapPlugin {
        limit: Amount,
        seen: Mutex<Vec<TransferEvent>>,
    }

    impl PluginHook for CapPlugin {
        fn name(&self) -> &str {
            "cap"
        }

        fn before_transfer(&self, event: &TransferEvent) -> HookResult {
            if event.amount > self.limit {
                HookResult::Reject {
                    reason: format!("{} exceeds {}", event.amount, self.limit),
                }
            } else {
                HookResult::Allow
            }
        }

        fn after_transfer(&self, event: &TransferEvent) {
            self.seen.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn plugin_rejection_rolls_back_everything() {
        let mut f = Fixture::new();
        let plugin = Arc::new(CapPlugin {
            limit: 50,
            seen: Mutex::new(Vec::new()),
        });
        let plugin_id = f.lp.register_plugin(&addr("ops"), plugin.clone()).unwrap();
        let g = f.giver("alice");
        let x = f
            .lp
            .add_project(
                &addr("x"),
                AdminProfile::named("x").with_plugin(plugin_id),
                None,
            )
            .unwrap();
        let journal = f.lp.journal().len();

        let err = f.lp.donate(&addr("alice"), g, x, eth(), 100).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::PluginRejected { plugin, .. } if plugin == plugin_id
        ));
        assert_eq!(f.lp.number_of_pledges(), 0);
        assert_eq!(f.lp.journal().len(), journal);
        assert!(plugin.seen.lock().unwrap().is_empty());

        f.lp.donate(&addr("alice"), g, x, eth(), 40).unwrap();
        let seen = plugin.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].admin, x);
        assert_eq!(seen[0].side, HookSide::Destination);
        assert_eq!(seen[0].role, HookRole::IntendedProject);
    }

    #[test]
    fn deferred_after_hooks_wait_for_the_caller() {
        let clock = ManualClock::new(Timestamp::from_secs(1_000));
        let mut lp = LiquidPledging::new(LedgerConfig::default(), Arc::new(clock), addr("vault"))
            .unwrap()
            .with_deferred_hooks();
        let plugin = Arc::new(CapPlugin {
            limit: 50,
            seen: Mutex::new(Vec::new()),
        });
        let plugin_id = lp.register_plugin(&addr("ops"), plugin.clone()).unwrap();
        let g = lp.add_giver(&addr("alice"), AdminProfile::named("alice")).unwrap();
        let x = lp
            .add_project(&addr("x"), AdminProfile::named("x").with_plugin(plugin_id), None)
            .unwrap();

        assert!(lp.donate(&addr("alice"), g, x, eth(), 80).is_err());
        assert!(lp.take_after_hooks().is_empty());

        lp.donate(&addr("alice"), g, x, eth(), 40).unwrap();
        assert!(plugin.seen.lock().unwrap().is_empty());
        let hooks = lp.take_after_hooks();
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].event().admin, x);
        hooks.into_iter().for_each(AfterHook::deliver);
        assert_eq!(plugin.seen.lock().unwrap().len(), 1);
        assert!(lp.take_after_hooks().is_empty());
    }

    /// Rejects every movement while closed.
    #[derive(Default)]
    struct GatePlugin {
        closed: AtomicBool,
    }

    impl PluginHook for GatePlugin {
        fn name(&self) -> &str {
            "gate"
        }

        fn before_transfer(&self, _event: &TransferEvent) -> HookResult {
            if self.closed.load(Ordering::SeqCst) {
                HookResult::Reject {
                    reason: "gate closed".into(),
                }
            } else {
                HookResult::Allow
            }
        }

        fn after_transfer(&self, _event: &TransferEvent) {}
    }

    #[test]
    fn rejected_rollback_leaves_pledge_in_place() {
        let mut f = Fixture::new();
        let gate = Arc::new(GatePlugin::default());
        let gate_id = f.lp.register_plugin(&addr("ops"), gate.clone()).unwrap();
        let g = f
            .lp
            .add_giver(&addr("alice"), AdminProfile::named("alice").with_plugin(gate_id))
            .unwrap();
        let q = f.project("q", DAY, None);

        let proposed = f.lp.donate(&addr("alice"), g, q, eth(), 100).unwrap();
        f.lp.cancel_project(&addr("q"), q).unwrap();
        gate.closed.store(true, Ordering::SeqCst);
        let journal = f.lp.journal().len();

        let err = f.lp.normalize(proposed).unwrap_err();
        assert!(matches!(err, LedgerError::PluginRejected { plugin, .. } if plugin == gate_id));
        assert_eq!(f.pledge(proposed).amount, 100);
        assert_eq!(f.pledge(proposed).intended_project, Some(q));
        assert_eq!(f.lp.journal().len(), journal);

        gate.closed.store(false, Ordering::SeqCst);
        let back = f.lp.normalize(proposed).unwrap();
        assert!(f.pledge(back).is_root());
        assert_eq!(f.pledge(back).amount, 100);
        f.assert_invariants();
    }

    #[test]
    fn rejected_commit_keeps_the_proposal() {
        let mut f = Fixture::new();
        let gate = Arc::new(GatePlugin::default());
        let gate_id = f.lp.register_plugin(&addr("ops"), gate.clone()).unwrap();
        let g = f.giver("alice");
        let x = f
            .lp
            .add_project(
                &addr("x"),
                AdminProfile::named("x")
                    .with_commit_time(secs(DAY))
                    .with_plugin(gate_id),
                None,
            )
            .unwrap();

        let proposed = f.lp.donate(&addr("alice"), g, x, eth(), 100).unwrap();
        f.clock.advance(secs(DAY));
        gate.closed.store(true, Ordering::SeqCst);

        let err = f.lp.normalize(proposed).unwrap_err();
        assert!(matches!(err, LedgerError::PluginRejected { plugin, .. } if plugin == gate_id));
        let pledge = f.pledge(proposed);
        assert_eq!(pledge.owner, g);
        assert_eq!(pledge.intended_project, Some(x));
        assert_eq!(pledge.amount, 100);
        assert!(matches!(
            f.lp.withdraw(&addr("x"), proposed, 10),
            Err(LedgerError::PluginRejected { .. })
        ));

        gate.closed.store(false, Ordering::SeqCst);
        let owned = f.lp.normalize(proposed).unwrap();
        assert_eq!(f.pledge(owned).owner, x);
        assert_eq!(f.pledge(owned).amount, 100);
        f.assert_invariants();
    }

    #[test]
    fn proposal_to_subproject_of_canceled_project_rolls_back() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let q = f.project("q", 0, None);
        let p = f.project("p", DAY, Some(q));

        let proposed = f.lp.donate(&addr("alice"), g, p, eth(), 500).unwrap();
        assert_eq!(f.pledge(proposed).intended_project, Some(p));
        let root = f.pledge(proposed).old_pledge.unwrap();

        f.lp.cancel_project(&addr("q"), q).unwrap();
        // The deadline has passed too; rollback wins over commit.
        f.clock.advance(secs(2 * DAY));
        let back = f.lp.normalize(proposed).unwrap();
        assert_eq!(back, root);
        let pledge = f.pledge(back);
        assert_eq!(pledge.owner, g);
        assert_eq!(pledge.intended_project, None);
        assert_eq!(pledge.amount, 500);
        assert_eq!(f.pledge(proposed).amount, 0);
        assert!(ProjectionBuilder::holdings(&f.lp).iter().all(|h| h.admin == g));
        f.assert_invariants();
    }

    #[test]
    fn repeated_reproposals_stay_movable_at_the_lineage_bound() {
        let mut f = Fixture::new();
        let limit = f.lp.config().max_lineage_depth;
        let g = f.giver("alice");
        let d = f.delegate("d", 0);
        let x = f.project("x", DAY, None);
        let y = f.project("y", DAY, None);

        let mut p = f.lp.donate(&addr("alice"), g, d, eth(), 100).unwrap();
        let mut last = ("x", x);
        for round in 0..limit + 8 {
            f.clock.advance(secs(1));
            last = if round % 2 == 0 { ("x", x) } else { ("y", y) };
            p = f.lp.transfer(&addr("d"), d, p, 100, last.1).unwrap();
            assert_eq!(f.pledge(p).intended_project, Some(last.1));
        }
        let lineage = ProjectionBuilder::lineage(&f.lp, p, limit).unwrap();
        assert!(lineage.len() <= limit + 1);
        f.assert_invariants();

        // The owner can still pull part of it home before the deadline.
        let home = f.lp.transfer(&addr("alice"), g, p, 40, g).unwrap();
        assert!(f.pledge(home).is_root());
        assert_eq!(f.pledge(home).amount, 40);

        f.clock.advance(secs(2 * DAY));
        let (label, project) = last;
        let owned = f.lp.normalize(p).unwrap();
        assert_eq!(f.pledge(owned).owner, project);
        assert_eq!(f.pledge(owned).amount, 60);
        assert_eq!(f.lp.normalize(owned).unwrap(), owned);

        let request = f.lp.withdraw(&addr(label), owned, 25).unwrap();
        assert_eq!(f.pledge(request.pledge).state, PledgeState::Paying);
        let restored = f
            .lp
            .cancel_payment(&addr("vault"), request.pledge, 25)
            .unwrap();
        assert_eq!(restored, owned);
        assert_eq!(f.pledge(owned).amount, 60);

        f.lp.cancel_pledge(&addr(label), owned, 10).unwrap();
        assert_eq!(f.pledge(owned).amount, 50);
        f.assert_invariants();
    }

    #[test]
    fn holdings_saturate_across_donation_roots() {
        let mut f = Fixture::new();
        let alice = f.giver("alice");
        let bob = f.giver("bob");
        let x = f.project("x", 0, None);
        let big = Amount::MAX / 2 + 1;

        for (label, giver) in [("alice", alice), ("bob", bob)] {
            let proposed = f.lp.donate(&addr(label), giver, x, eth(), big).unwrap();
            f.lp.normalize(proposed).unwrap();
        }
        let holdings = ProjectionBuilder::holdings(&f.lp);
        let project = holdings.iter().find(|h| h.admin == x).unwrap();
        assert_eq!(project.owned, Amount::MAX);
        f.assert_invariants();
    }

    #[test]
    fn unknown_plugin_is_rejected_at_registration() {
        let mut f = Fixture::new();
        let err = f
            .lp
            .add_giver(
                &addr("alice"),
                AdminProfile::named("alice").with_plugin(lp_types::PluginId(9)),
            )
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn journal_chain_covers_every_operation() {
        let mut f = Fixture::new();
        let g = f.giver("alice");
        let x = f.project("x", 0, None);
        let p = f.lp.donate(&addr("alice"), g, x, eth(), 10).unwrap();
        f.lp.normalize(p).unwrap();
        assert!(f.lp.verify_journal().is_ok());
        let journal = f.lp.journal();
        assert!(matches!(journal[0].event, LedgerEvent::AdminAdded { .. }));
        assert!(journal
            .iter()
            .any(|e| matches!(e.event, LedgerEvent::Moved { reason: MoveReason::Commit, .. })));
    }

    #[derive(Clone, Debug)]
    enum Op {
        Donate { giver: usize, receiver: usize, amount: Amount },
        Transfer { pledge: usize, sender: usize, receiver: usize, amount: Amount },
        Withdraw { pledge: usize, amount: Amount },
        Normalize { pledge: usize },
        Cancel { project: usize },
        Advance { secs: u64 },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..2usize, 0..7usize, 1..1_000u128)
                .prop_map(|(giver, receiver, amount)| Op::Donate { giver, receiver, amount }),
            (0..32usize, 0..7usize, 0..7usize, 1..500u128).prop_map(
                |(pledge, sender, receiver, amount)| Op::Transfer {
                    pledge,
                    sender,
                    receiver,
                    amount
                }
            ),
            (0..32usize, 1..200u128).prop_map(|(pledge, amount)| Op::Withdraw { pledge, amount }),
            (0..32usize).prop_map(|pledge| Op::Normalize { pledge }),
            (4..7usize).prop_map(|project| Op::Cancel { project }),
            (0..3 * DAY).prop_map(|secs| Op::Advance { secs }),
        ]
    }

    proptest! {
        #[test]
        fn conservation_holds_for_any_operation_sequence(ops in prop::collection::vec(op(), 1..40)) {
            let mut f = Fixture::new();
            let labels = ["g0", "g1", "d0", "d1", "p0", "p1", "p2"];
            let mut ids = Vec::new();
            ids.push(f.giver(labels[0]));
            ids.push(f.giver(labels[1]));
            ids.push(f.delegate(labels[2], DAY));
            ids.push(f.delegate(labels[3], 2 * DAY));
            let p0 = f.project(labels[4], 0, None);
            ids.push(p0);
            ids.push(f.project(labels[5], DAY, Some(p0)));
            ids.push(f.project(labels[6], 0, None));

            for op in ops {
                let count = f.lp.number_of_pledges();
                let pick = |i: usize| PledgeId::from_index(i % count.max(1));
                let _ = match op {
                    Op::Donate { giver, receiver, amount } => f
                        .lp
                        .donate(&addr(labels[giver]), ids[giver], ids[receiver], eth(), amount)
                        .map(|_| ()),
                    Op::Transfer { pledge, sender, receiver, amount } if count > 0 => f
                        .lp
                        .transfer(&addr(labels[sender]), ids[sender], pick(pledge), amount, ids[receiver])
                        .map(|_| ()),
                    Op::Withdraw { pledge, amount } if count > 0 => {
                        let owner = f.pledge(pick(pledge)).owner;
                        let label = labels[ids.iter().position(|id| *id == owner).unwrap()];
                        f.lp.withdraw(&addr(label), pick(pledge), amount).map(|_| ())
                    }
                    Op::Normalize { pledge } if count > 0 => f.lp.normalize(pick(pledge)).map(|_| ()),
                    Op::Cancel { project } => f.lp.cancel_project(&addr(labels[project]), ids[project]),
                    Op::Advance { secs: by } => {
                        f.clock.advance(secs(by));
                        Ok(())
                    }
                    _ => Ok(()),
                };
                let report = InvariantChecker::check(&f.lp, f.lp.config());
                prop_assert!(report.is_valid(), "{:?}", report.violations);
            }
        }
    }
}
