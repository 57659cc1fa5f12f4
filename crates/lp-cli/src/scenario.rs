use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lp_sdk::{
    Address, AdminId, AdminProfile, AdminUpdate, Capability, CapabilityKind, ManualClock,
    PaymentId, PledgeId, Pledging, PledgingConfig, SdkResult, Timestamp, TokenId,
};

/// A scripted sequence of operations replayed against a fresh ledger.
///
/// Actors are plain labels (`"alice"`, `"vault-owner"`); each label maps to
/// a stable address through [`Address::derive`]. Amounts are integers in
/// the token's smallest unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    /// Clock start, in seconds.
    #[serde(default)]
    pub start: u64,
    /// Record failing steps and continue instead of aborting.
    #[serde(default)]
    pub keep_going: bool,
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    AddGiver {
        #[serde(rename = "as")]
        actor: String,
        name: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        commit_time: u64,
    },
    AddDelegate {
        #[serde(rename = "as")]
        actor: String,
        name: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        commit_time: u64,
    },
    AddProject {
        #[serde(rename = "as")]
        actor: String,
        name: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        commit_time: u64,
        #[serde(default)]
        parent: Option<AdminId>,
    },
    UpdateAdmin {
        #[serde(rename = "as")]
        actor: String,
        admin: AdminId,
        #[serde(default)]
        controller: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        commit_time: Option<u64>,
    },
    CancelProject {
        #[serde(rename = "as")]
        actor: String,
        project: AdminId,
    },
    Donate {
        #[serde(rename = "as")]
        actor: String,
        giver: AdminId,
        receiver: AdminId,
        token: TokenId,
        amount: u64,
    },
    Transfer {
        #[serde(rename = "as")]
        actor: String,
        sender: AdminId,
        pledge: PledgeId,
        amount: u64,
        receiver: AdminId,
    },
    Withdraw {
        #[serde(rename = "as")]
        actor: String,
        pledge: PledgeId,
        amount: u64,
    },
    CancelPledge {
        #[serde(rename = "as")]
        actor: String,
        pledge: PledgeId,
        amount: u64,
    },
    Normalize {
        pledges: Vec<PledgeId>,
    },
    ConfirmPayment {
        #[serde(rename = "as")]
        actor: String,
        payments: Vec<PaymentId>,
    },
    CancelPayment {
        #[serde(rename = "as")]
        actor: String,
        payments: Vec<PaymentId>,
    },
    Grant {
        #[serde(rename = "as")]
        actor: String,
        to: String,
        capability: CapabilityKind,
        /// Only meaningful for `confirm_payment`.
        #[serde(default)]
        max_amount: Option<u64>,
    },
    Revoke {
        #[serde(rename = "as")]
        actor: String,
        from: String,
        capability: CapabilityKind,
    },
    SetAutopay {
        #[serde(rename = "as")]
        actor: String,
        enabled: bool,
    },
    AddEscapeHatchCaller {
        #[serde(rename = "as")]
        actor: String,
        who: String,
    },
    EscapeFunds {
        #[serde(rename = "as")]
        actor: String,
        token: TokenId,
        amount: u64,
    },
    /// Move the scenario clock forward.
    Advance {
        secs: u64,
    },
}

impl Step {
    pub fn op(&self) -> &'static str {
        match self {
            Self::AddGiver { .. } => "add_giver",
            Self::AddDelegate { .. } => "add_delegate",
            Self::AddProject { .. } => "add_project",
            Self::UpdateAdmin { .. } => "update_admin",
            Self::CancelProject { .. } => "cancel_project",
            Self::Donate { .. } => "donate",
            Self::Transfer { .. } => "transfer",
            Self::Withdraw { .. } => "withdraw",
            Self::CancelPledge { .. } => "cancel_pledge",
            Self::Normalize { .. } => "normalize",
            Self::ConfirmPayment { .. } => "confirm_payment",
            Self::CancelPayment { .. } => "cancel_payment",
            Self::Grant { .. } => "grant",
            Self::Revoke { .. } => "revoke",
            Self::SetAutopay { .. } => "set_autopay",
            Self::AddEscapeHatchCaller { .. } => "add_escape_hatch_caller",
            Self::EscapeFunds { .. } => "escape_funds",
            Self::Advance { .. } => "advance",
        }
    }

    /// Apply the step. Returns a short description of what it produced.
    fn apply(&self, lp: &Pledging, clock: &ManualClock) -> SdkResult<String> {
        let out = match self {
            Self::AddGiver {
                actor,
                name,
                url,
                commit_time,
            } => lp
                .add_giver(&actor_address(actor), profile(name, url, *commit_time))?
                .to_string(),
            Self::AddDelegate {
                actor,
                name,
                url,
                commit_time,
            } => lp
                .add_delegate(&actor_address(actor), profile(name, url, *commit_time))?
                .to_string(),
            Self::AddProject {
                actor,
                name,
                url,
                commit_time,
                parent,
            } => lp
                .add_project(&actor_address(actor), profile(name, url, *commit_time), *parent)?
                .to_string(),
            Self::UpdateAdmin {
                actor,
                admin,
                controller,
                name,
                url,
                commit_time,
            } => {
                let update = AdminUpdate {
                    controller: controller.as_deref().map(actor_address),
                    name: name.clone(),
                    url: url.clone(),
                    commit_time: commit_time.map(Duration::from_secs),
                };
                lp.update_admin(&actor_address(actor), *admin, update)?;
                admin.to_string()
            }
            Self::CancelProject { actor, project } => {
                lp.cancel_project(&actor_address(actor), *project)?;
                project.to_string()
            }
            Self::Donate {
                actor,
                giver,
                receiver,
                token,
                amount,
            } => lp
                .donate(
                    &actor_address(actor),
                    *giver,
                    *receiver,
                    token.clone(),
                    u128::from(*amount),
                )?
                .to_string(),
            Self::Transfer {
                actor,
                sender,
                pledge,
                amount,
                receiver,
            } => lp
                .transfer(
                    &actor_address(actor),
                    *sender,
                    *pledge,
                    u128::from(*amount),
                    *receiver,
                )?
                .to_string(),
            Self::Withdraw {
                actor,
                pledge,
                amount,
            } => {
                let payment = lp.withdraw(&actor_address(actor), *pledge, u128::from(*amount))?;
                format!("{} ({})", payment.id, payment.status)
            }
            Self::CancelPledge {
                actor,
                pledge,
                amount,
            } => lp
                .cancel_pledge(&actor_address(actor), *pledge, u128::from(*amount))?
                .to_string(),
            Self::Normalize { pledges } => join(lp.m_normalize(pledges)?),
            Self::ConfirmPayment { actor, payments } => {
                let done = lp.multi_confirm(&actor_address(actor), payments)?;
                join(done.into_iter().map(|p| p.id))
            }
            Self::CancelPayment { actor, payments } => {
                let done = lp.multi_cancel(&actor_address(actor), payments)?;
                join(done.into_iter().map(|p| p.id))
            }
            Self::Grant {
                actor,
                to,
                capability,
                max_amount,
            } => {
                let capability = match capability {
                    CapabilityKind::ConfirmPayment => Capability::ConfirmPayment {
                        max_amount: max_amount.map(u128::from),
                    },
                    CapabilityKind::CancelPayment => Capability::CancelPayment,
                    CapabilityKind::SetAutopay => Capability::SetAutopay,
                };
                lp.grant(&actor_address(actor), actor_address(to), capability)?;
                format!("{} to {to}", capability.kind())
            }
            Self::Revoke {
                actor,
                from,
                capability,
            } => {
                lp.revoke(&actor_address(actor), actor_address(from), *capability)?;
                format!("{capability} from {from}")
            }
            Self::SetAutopay { actor, enabled } => {
                lp.set_autopay(&actor_address(actor), *enabled)?;
                enabled.to_string()
            }
            Self::AddEscapeHatchCaller { actor, who } => {
                lp.add_escape_hatch_caller(&actor_address(actor), actor_address(who))?;
                who.clone()
            }
            Self::EscapeFunds {
                actor,
                token,
                amount,
            } => {
                lp.escape_funds(&actor_address(actor), token, u128::from(*amount))?;
                format!("{amount} {token}")
            }
            Self::Advance { secs } => {
                clock.advance(Duration::from_secs(*secs));
                lp.now().to_string()
            }
        };
        Ok(out)
    }
}

/// Address an actor label stands for. A `0x`-prefixed label is taken as a
/// literal address.
pub fn actor_address(label: &str) -> Address {
    Address::from_hex(label).unwrap_or_else(|_| Address::derive(label))
}

fn profile(name: &str, url: &str, commit_time: u64) -> AdminProfile {
    AdminProfile::named(name)
        .with_url(url)
        .with_commit_time(Duration::from_secs(commit_time))
}

fn join<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A step that failed under `keep_going`.
#[derive(Clone, Debug, Serialize)]
pub struct StepFailure {
    pub index: usize,
    pub op: &'static str,
    pub error: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct StepResult {
    pub index: usize,
    pub op: &'static str,
    pub result: String,
}

/// A replayed scenario: the final state plus what each step did.
pub struct Outcome {
    pub ledger: Pledging,
    pub applied: Vec<StepResult>,
    pub failures: Vec<StepFailure>,
}

impl Scenario {
    /// Load a scenario, choosing the format from the file extension.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let is_toml = path.extension().is_some_and(|ext| ext == "toml");
        if is_toml {
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
        } else {
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
        }
    }

    pub fn run(&self, config: PledgingConfig) -> anyhow::Result<Outcome> {
        let clock = ManualClock::new(Timestamp::from_secs(self.start));
        let ledger = Pledging::new(config, Arc::new(clock.clone()))?;
        let mut applied = Vec::new();
        let mut failures = Vec::new();

        for (index, step) in self.steps.iter().enumerate() {
            match step.apply(&ledger, &clock) {
                Ok(result) => {
                    info!(step = index, op = step.op(), %result, "step applied");
                    applied.push(StepResult {
                        index,
                        op: step.op(),
                        result,
                    });
                }
                Err(e) if self.keep_going => {
                    warn!(step = index, op = step.op(), error = %e, "step failed");
                    failures.push(StepFailure {
                        index,
                        op: step.op(),
                        error: e.to_string(),
                    });
                }
                Err(e) => bail!("step {index} ({}) failed: {e}", step.op()),
            }
        }

        Ok(Outcome {
            ledger,
            applied,
            failures,
        })
    }
}

/// Load the optional configuration file, falling back to defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PledgingConfig> {
    let Some(path) = path else {
        return Ok(PledgingConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    PledgingConfig::from_toml_str(&text).with_context(|| format!("parsing {}", path.display()))
}
