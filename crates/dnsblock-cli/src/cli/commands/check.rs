//! `dnsblock check` - verdicts for names and their CNAME targets.

use anyhow::Result;
use colored::{ColoredString, Colorize};
use dnsblock_core::advisory::{trace_aliases, AliasTrace};
use dnsblock_core::{ChainEnd, Domain, Verdict};
use serde::Serialize;

use super::Context;
use crate::cli::args::DomainsArgs;
use crate::output::OutputFormat;

#[derive(Debug, Serialize)]
struct CheckReport {
    domain: Domain,
    #[serde(flatten)]
    trace: AliasTrace,
}

pub async fn execute(ctx: Context, args: DomainsArgs) -> Result<()> {
    let domains = args
        .domains
        .iter()
        .map(|name| Domain::parse(name))
        .collect::<Result<Vec<_>, _>>()?;

    let engine = ctx.load_policy().await?;
    let aliases = ctx.alias_resolver()?;

    let mut reports = Vec::with_capacity(domains.len());
    for domain in domains {
        let trace = trace_aliases(&engine, aliases.as_ref(), &domain).await;
        reports.push(CheckReport { domain, trace });
    }

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        OutputFormat::Pretty => {
            for report in &reports {
                print_report(report);
            }
        }
    }
    Ok(())
}

fn print_report(report: &CheckReport) {
    for (hop, entry) in report.trace.hops.iter().enumerate() {
        let name = if hop == 0 {
            entry.name.to_string().bold()
        } else {
            format!("  -> {}", entry.name).normal()
        };
        println!("{name}  {}", describe(&entry.verdict));
    }

    match &report.trace.end {
        Some(ChainEnd::Cycle(name)) => println!("  {} {name}", "alias cycle at".yellow()),
        Some(ChainEnd::HopLimit) => println!("  {}", "alias chain too long".yellow()),
        Some(ChainEnd::Unresolved(code)) => println!("  {} {code}", "unresolved:".yellow()),
        _ => {}
    }

    for name in report.trace.blocked_behind_allowed() {
        println!(
            "  {} {name} is blocked although {} is allowed",
            "!".red().bold(),
            report.domain
        );
    }
}

fn describe(verdict: &Verdict) -> ColoredString {
    match verdict {
        Verdict::Allowed(rule) => format!("allowed by {}", rule.serialize()).green(),
        Verdict::Blocked(rule) => format!("blocked by {}", rule.serialize()).red(),
        Verdict::Unlisted => "unlisted".dimmed(),
    }
}
