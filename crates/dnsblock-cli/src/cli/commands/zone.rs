//! `dnsblock zone` - BIND zone stanzas for every block rule.

use anyhow::Result;
use dnsblock_core::{PolicyEngine, Rule};
use std::path::Path;
use tracing::info;

use super::Context;
use crate::cli::args::ZoneArgs;
use crate::output::{self, bind};

pub async fn execute(ctx: Context, args: ZoneArgs) -> Result<()> {
    let engine = ctx.load_policy().await?;
    write_zones(&ctx, &engine, args.out.as_deref()).await
}

/// Write stanzas to `out`, or to the configured zones file.
pub async fn write_zones(ctx: &Context, engine: &PolicyEngine, out: Option<&Path>) -> Result<()> {
    let path = out.unwrap_or(&ctx.config.files.zones);
    let rules: Vec<Rule> = engine.blocks().rules().collect();

    let text = bind::zone_stanzas(&rules, &ctx.config.zone.zone_file);
    output::write_file(path, &text).await?;

    info!(zones = rules.len(), path = %path.display(), "zone stanzas written");
    Ok(())
}
