//! `dnsblock list` - print the consolidated rules.

use anyhow::Result;

use super::Context;
use crate::cli::args::ListArgs;

pub async fn execute(ctx: Context, args: ListArgs) -> Result<()> {
    let engine = ctx.load_policy().await?;
    let lines = if args.allowed {
        engine.allows().serialize_allowed_domains()
    } else {
        engine.blocks().serialize_blocked_domains()
    };

    for line in lines {
        println!("{line}");
    }
    Ok(())
}
