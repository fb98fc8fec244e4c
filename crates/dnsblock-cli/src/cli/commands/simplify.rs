//! `dnsblock simplify` - rewrite the primary block list.
//!
//! Narrower rules under a broader one disappear, duplicates collapse, and
//! the list comes out in a stable order.

use anyhow::Result;
use tracing::info;

use super::Context;

pub async fn execute(ctx: Context) -> Result<()> {
    let engine = ctx.load_policy().await?;
    ctx.write_block_list(&engine).await?;

    info!(
        rules = engine.blocks().len(),
        path = %ctx.config.files.blocked.display(),
        "block list rewritten"
    );
    Ok(())
}
