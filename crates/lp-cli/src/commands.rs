use anyhow::bail;
use colored::Colorize;
use serde_json::json;

use lp_sdk::{LedgerReader, PledgeState, PledgingConfig, VerificationReport};

use crate::cli::*;
use crate::scenario::{load_config, Outcome, Scenario};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args, cli.format),
        Command::Verify(args) => cmd_verify(args, cli.format),
        Command::Journal(args) => cmd_journal(args, cli.format),
        Command::Config => cmd_config(),
    }
}

fn replay(args: &ScenarioArgs) -> anyhow::Result<Outcome> {
    let config = load_config(args.config.as_deref())?;
    let scenario = Scenario::load(&args.scenario)?;
    scenario.run(config)
}

fn cmd_run(args: ScenarioArgs, format: OutputFormat) -> anyhow::Result<()> {
    let outcome = replay(&args)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state_json(&outcome))?),
        OutputFormat::Text => print_state(&outcome),
    }
    Ok(())
}

fn cmd_verify(args: ScenarioArgs, format: OutputFormat) -> anyhow::Result<()> {
    let outcome = replay(&args)?;
    let report = outcome.ledger.verify();
    match format {
        OutputFormat::Json => {
            let mut doc = state_json(&outcome);
            doc["verification"] = serde_json::to_value(&report)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Text => {
            print_state(&outcome);
            print_report(&report);
        }
    }
    if !report.is_valid() {
        bail!(
            "verification failed: {} invariant violation(s), {} unbalanced token(s)",
            report.invariants.violations.len(),
            report.unbalanced().count()
        );
    }
    Ok(())
}

fn cmd_journal(args: ScenarioArgs, format: OutputFormat) -> anyhow::Result<()> {
    let outcome = replay(&args)?;
    let journal = outcome.ledger.journal();
    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = journal
                .iter()
                .map(|e| json!({ "seq": e.seq, "at": e.at, "hash": e.hash_hex(), "event": e.event }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            for entry in &journal {
                println!(
                    "{:>4}  {}  {}  {:?}",
                    entry.seq.to_string().yellow(),
                    entry.hash_hex()[..12].dimmed(),
                    entry.at,
                    entry.event
                );
            }
            println!("{} {} entries", "✓".green().bold(), journal.len());
        }
    }
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    print!("{}", PledgingConfig::default().to_toml_string()?);
    Ok(())
}

fn state_json(outcome: &Outcome) -> serde_json::Value {
    let lp = &outcome.ledger;
    json!({
        "now": lp.now(),
        "applied": outcome.applied,
        "failures": outcome.failures,
        "admins": lp.admins(),
        "pledges": lp.pledges(),
        "payments": lp.payments(),
        "holdings": lp.holdings(),
    })
}

fn print_state(outcome: &Outcome) {
    let lp = &outcome.ledger;
    let status = if outcome.failures.is_empty() {
        "✓".green().bold()
    } else {
        "!".yellow().bold()
    };
    println!(
        "{} {} steps applied, {} failed ({})",
        status,
        outcome.applied.len(),
        outcome.failures.len(),
        lp.now()
    );
    for failure in &outcome.failures {
        println!("  {} step {} ({}): {}", "✗".red(), failure.index, failure.op, failure.error);
    }

    println!("\n{}", "Admins".bold());
    for admin in lp.admins() {
        let mut line = format!(
            "  {:<10} {:<8} {:<16} controller {}",
            admin.id.to_string().yellow(),
            admin.kind,
            admin.name,
            admin.controller
        );
        if let Some(parent) = admin.parent_project {
            line.push_str(&format!("  parent {parent}"));
        }
        if admin.canceled {
            line.push_str(&format!("  {}", "canceled".red()));
        }
        println!("{line}");
    }

    println!("\n{}", "Pledges".bold());
    for pledge in lp.pledges() {
        if pledge.amount == 0 && pledge.state == PledgeState::Pledged {
            continue;
        }
        let state = match pledge.state {
            PledgeState::Pledged => pledge.state.to_string().green(),
            PledgeState::Paying => pledge.state.to_string().yellow(),
            PledgeState::Paid => pledge.state.to_string().dimmed(),
        };
        let mut line = format!(
            "  {:<11} {:>12} {:<5} {:<8} owner {}",
            pledge.id.to_string().yellow(),
            pledge.amount,
            pledge.token,
            state,
            pledge.owner
        );
        if !pledge.delegation_chain.is_empty() {
            let chain: Vec<String> = pledge.delegation_chain.iter().map(|d| d.to_string()).collect();
            line.push_str(&format!("  delegates [{}]", chain.join(", ")));
        }
        if let (Some(project), Some(deadline)) = (pledge.intended_project, pledge.commit_time) {
            line.push_str(&format!("  proposed {project} until {deadline}"));
        }
        if let Some(old) = pledge.old_pledge {
            line.push_str(&format!("  from {}", old.to_string().dimmed()));
        }
        println!("{line}");
    }

    let payments = lp.payments();
    if !payments.is_empty() {
        println!("\n{}", "Payments".bold());
        for payment in payments {
            println!(
                "  {:<11} {:>12} {:<5} {:<9} {} -> {}",
                payment.id.to_string().yellow(),
                payment.amount,
                payment.token,
                payment.status,
                payment.pledge,
                payment.payee
            );
        }
    }
}

fn print_report(report: &VerificationReport) {
    println!("\n{}", "Verification".bold());
    let inv = &report.invariants;
    println!(
        "  Checked {} admins, {} pledges, {} journal entries",
        inv.admins_checked, inv.pledges_checked, inv.journal_entries
    );
    if inv.is_valid() {
        println!("  Invariants: {}", "hold".green());
    } else {
        for violation in &inv.violations {
            println!("  {} {:?}: {}", "✗".red(), violation.kind, violation.description);
        }
    }
    for token in &report.tokens {
        let mark = if token.is_balanced() {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "  {} {:<5} vault {} + escaped {} vs outstanding {}",
            mark, token.token, token.vault_balance, token.escaped, token.outstanding
        );
    }
    if report.is_valid() {
        println!("{} Ledger and vault verified", "✓".green().bold());
    }
}
