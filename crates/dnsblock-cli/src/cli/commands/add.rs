//! `dnsblock add` and `dnsblock addgen` - block new domains.

use anyhow::Result;
use colored::Colorize;
use dnsblock_core::engine::BlockDecision;
use dnsblock_core::rules::parse_rule_domain;
use dnsblock_core::{Domain, PolicyEngine, Rule};

use super::Context;
use crate::cli::args::{AddgenArgs, DomainsArgs};

pub async fn execute(ctx: Context, args: DomainsArgs) -> Result<()> {
    let engine = block_domains(&ctx, &args.domains).await?;
    ctx.write_block_list(&engine).await
}

pub async fn addgen(ctx: Context, args: AddgenArgs) -> Result<()> {
    let engine = block_domains(&ctx, &args.domains).await?;
    ctx.write_block_list(&engine).await?;
    super::zone::write_zones(&ctx, &engine, args.out.as_deref()).await
}

/// Load the policy and offer every name in `names` as a block rule.
///
/// All names are validated before anything is changed.
async fn block_domains(ctx: &Context, names: &[String]) -> Result<PolicyEngine> {
    let domains = names
        .iter()
        .map(|name| parse_rule_domain(name))
        .collect::<Result<Vec<Domain>, _>>()?;

    let mut loader = ctx.load_allowed().await?;
    ctx.load_blocked(&mut loader).await?;

    for domain in domains {
        let decision = loader.block_rule(&Rule::new(domain.clone(), ""));
        report(&domain, &decision);
    }

    let (engine, _) = loader.finish();
    Ok(engine)
}

fn report(domain: &Domain, decision: &BlockDecision) {
    match decision {
        BlockDecision::Added { pruned: 0 } => {
            println!("{} {}", "blocked".red().bold(), domain);
        }
        BlockDecision::Added { pruned } => {
            println!(
                "{} {} {}",
                "blocked".red().bold(),
                domain,
                format!("(replaces {pruned} narrower rules)").dimmed()
            );
        }
        BlockDecision::AlreadyCovered { .. } | BlockDecision::Allowed { .. } => {
            if let Some(reason) = decision.rejection(domain) {
                println!("{} {}", "skipped".yellow().bold(), reason);
            }
        }
    }
}
