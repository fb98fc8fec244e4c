//! `dnsblock allow` - add allow rules and rewrite the allow list.

use anyhow::Result;
use colored::Colorize;
use dnsblock_core::rules::parse_rule_domain;
use dnsblock_core::{Domain, InsertOutcome, Rule};
use tracing::warn;

use super::Context;
use crate::cli::args::DomainsArgs;
use crate::output;

pub async fn execute(ctx: Context, args: DomainsArgs) -> Result<()> {
    let domains = args
        .domains
        .iter()
        .map(|name| parse_rule_domain(name))
        .collect::<Result<Vec<Domain>, _>>()?;

    let mut loader = ctx.load_allowed().await?;
    for domain in domains {
        let outcomes = loader.allow_rule(&Rule::new(domain.clone(), "")).await?;
        for (name, outcome) in outcomes {
            report(&domain, &name, &outcome);
        }
    }

    // Block lists are loaded only to surface rules the new entries override.
    ctx.load_blocked(&mut loader).await?;
    let (engine, load_report) = loader.finish();

    // CNAME-derived rules are recomputed on load, so only source rules are kept.
    let lines = engine.allows().serialize_source_domains();
    output::write_file(&ctx.config.files.allowed, &output::plain_list(lines)).await?;

    if !load_report.conflicts.is_empty() {
        warn!(
            conflicts = load_report.conflicts.len(),
            "block lists contain allowed names; run `dnsblock simplify` to drop them"
        );
    }
    Ok(())
}

fn report(origin: &Domain, name: &Domain, outcome: &InsertOutcome) {
    let alias = if name == origin {
        String::new()
    } else {
        format!(" (alias of {origin})").dimmed().to_string()
    };
    match outcome {
        InsertOutcome::Added { .. } => println!("{} {name}{alias}", "allowed".green().bold()),
        InsertOutcome::AlreadyCovered { .. } => {
            println!("{} {name}{alias} is already allowed", "skipped".yellow().bold());
        }
        InsertOutcome::Shadowed { by } => {
            println!(
                "{} {name}{alias} is already allowed through {by}",
                "skipped".yellow().bold()
            );
        }
    }
}
