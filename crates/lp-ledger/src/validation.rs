use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use lp_types::{Admin, AdminId, AdminKind, Amount, Pledge, PledgeId};

use crate::config::LedgerConfig;
use crate::journal::{verify_entries, LedgerEvent};
use crate::traits::LedgerReader;

/// Result of an invariant check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvariantReport {
    pub admins_checked: usize,
    pub pledges_checked: usize,
    pub journal_entries: usize,
    pub violations: Vec<Violation>,
}

impl InvariantReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    Conservation,
    OwnerKind,
    DelegationChain,
    Proposal,
    ProjectDepth,
    LineageDepth,
    Journal,
}

/// Whole-ledger invariant checker.
pub struct InvariantChecker;

impl InvariantChecker {
    pub fn check<R: LedgerReader>(reader: &R, config: &LedgerConfig) -> InvariantReport {
        let admins = reader.admins();
        let pledges = reader.pledges();
        let journal = reader.journal();
        let mut violations = Vec::new();

        let by_id: HashMap<AdminId, &Admin> = admins.iter().map(|a| (a.id, a)).collect();

        for admin in &admins {
            check_project_depth(admin, &by_id, config, &mut violations);
        }
        for pledge in &pledges {
            check_pledge_shape(pledge, &by_id, config, &mut violations);
        }

        // Conservation: everything descending from a root adds up to what was
        // donated into it.
        let mut donated: BTreeMap<PledgeId, Amount> = BTreeMap::new();
        for entry in &journal {
            if let LedgerEvent::Donated { root, amount, .. } = &entry.event {
                let total = donated.entry(*root).or_default();
                *total = total.saturating_add(*amount);
            }
        }
        let mut held: BTreeMap<PledgeId, Amount> = BTreeMap::new();
        for pledge in &pledges {
            match root_of(pledge, &pledges, config.max_lineage_depth) {
                Some(root) => {
                    let total = held.entry(root).or_default();
                    *total = total.saturating_add(pledge.amount);
                }
                None => violations.push(Violation {
                    kind: ViolationKind::LineageDepth,
                    description: format!(
                        "{} is more than {} hops from its root",
                        pledge.id, config.max_lineage_depth
                    ),
                }),
            }
        }
        let roots: HashSet<PledgeId> = donated.keys().chain(held.keys()).copied().collect();
        for root in roots {
            let expected = donated.get(&root).copied().unwrap_or(0);
            let actual = held.get(&root).copied().unwrap_or(0);
            if expected != actual {
                violations.push(Violation {
                    kind: ViolationKind::Conservation,
                    description: format!(
                        "tree rooted at {root} holds {actual}, donations total {expected}"
                    ),
                });
            }
        }

        if let Err(e) = verify_entries(&journal) {
            violations.push(Violation {
                kind: ViolationKind::Journal,
                description: e.to_string(),
            });
        }

        InvariantReport {
            admins_checked: admins.len(),
            pledges_checked: pledges.len(),
            journal_entries: journal.len(),
            violations,
        }
    }
}

fn check_project_depth(
    admin: &Admin,
    by_id: &HashMap<AdminId, &Admin>,
    config: &LedgerConfig,
    violations: &mut Vec<Violation>,
) {
    let mut depth = 0;
    let mut cursor = Some(admin.id);
    while let Some(id) = cursor {
        depth += 1;
        if depth > config.max_project_depth {
            violations.push(Violation {
                kind: ViolationKind::ProjectDepth,
                description: format!(
                    "{} nests deeper than {}",
                    admin.id, config.max_project_depth
                ),
            });
            return;
        }
        cursor = by_id.get(&id).and_then(|a| a.parent_project);
    }
}

fn check_pledge_shape(
    pledge: &Pledge,
    by_id: &HashMap<AdminId, &Admin>,
    config: &LedgerConfig,
    violations: &mut Vec<Violation>,
) {
    let kind_of = |id: &AdminId| by_id.get(id).map(|a| a.kind);

    if !matches!(
        kind_of(&pledge.owner),
        Some(AdminKind::Giver | AdminKind::Project)
    ) {
        violations.push(Violation {
            kind: ViolationKind::OwnerKind,
            description: format!("{} is owned by {}, not a giver or project", pledge.id, pledge.owner),
        });
    }

    let chain = &pledge.delegation_chain;
    if chain.len() > config.max_delegates {
        violations.push(Violation {
            kind: ViolationKind::DelegationChain,
            description: format!("{} has {} delegates", pledge.id, chain.len()),
        });
    }
    let unique: HashSet<&AdminId> = chain.iter().collect();
    if unique.len() != chain.len() {
        violations.push(Violation {
            kind: ViolationKind::DelegationChain,
            description: format!("{} lists a delegate twice", pledge.id),
        });
    }
    if let Some(bad) = chain
        .iter()
        .find(|d| kind_of(d) != Some(AdminKind::Delegate))
    {
        violations.push(Violation {
            kind: ViolationKind::DelegationChain,
            description: format!("{} chains {bad}, which is not a delegate", pledge.id),
        });
    }

    let proposal_ok = match (pledge.intended_project, pledge.commit_time) {
        (Some(project), Some(_)) => kind_of(&project) == Some(AdminKind::Project),
        (None, None) => true,
        _ => false,
    };
    if !proposal_ok {
        violations.push(Violation {
            kind: ViolationKind::Proposal,
            description: format!(
                "{} has intended project {:?} with deadline {:?}",
                pledge.id, pledge.intended_project, pledge.commit_time
            ),
        });
    }
}

/// Root of a pledge's lineage, or `None` if the walk exceeds `limit` hops.
fn root_of(pledge: &Pledge, pledges: &[Pledge], limit: usize) -> Option<PledgeId> {
    let mut current = pledge;
    for _ in 0..=limit {
        match current.old_pledge {
            None => return Some(current.id),
            Some(parent) => current = pledges.get(parent.index()?)?,
        }
    }
    None
}
