//! `dnsblock rpz` - response-policy-zone master file.

use anyhow::Result;
use dnsblock_core::Rule;
use tracing::info;

use super::Context;
use crate::cli::args::RpzArgs;
use crate::output::{self, rpz};

pub async fn execute(ctx: Context, args: RpzArgs) -> Result<()> {
    let engine = ctx.load_policy().await?;
    let rules: Vec<Rule> = engine.blocks().rules().collect();

    let origin = args.origin.as_deref().unwrap_or(&ctx.config.zone.rpz_origin);
    let serial = rpz::serial_for(chrono::Utc::now().date_naive())?;
    let text = rpz::rpz_zone(&rules, origin, ctx.config.zone.rpz_ttl, serial)?;

    let path = args.out.as_deref().unwrap_or(&ctx.config.files.rpz);
    output::write_file(path, &text).await?;

    info!(rules = rules.len(), serial, path = %path.display(), "rpz written");
    Ok(())
}
