//! `dnsblock advise` - consolidation hints for the block list.

use anyhow::Result;
use colored::Colorize;
use dnsblock_core::advisory::consolidation_hints;

use super::Context;
use crate::cli::args::AdviseArgs;
use crate::output::OutputFormat;

pub async fn execute(ctx: Context, args: AdviseArgs) -> Result<()> {
    let engine = ctx.load_policy().await?;
    let threshold = args.threshold.unwrap_or(ctx.config.advisory.threshold);
    let hints = consolidation_hints(engine.blocks(), threshold);

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&hints)?);
        }
        OutputFormat::Pretty => {
            if hints.is_empty() {
                println!("No node has more than {threshold} blocked children.");
                return Ok(());
            }
            println!("{}", "Consider blocking these parents:".bold().underline());
            for hint in &hints {
                println!("  {:>6}  {}", hint.children.to_string().yellow(), hint.domain);
            }
        }
    }
    Ok(())
}
