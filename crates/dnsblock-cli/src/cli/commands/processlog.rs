//! `dnsblock processlog` - filter a DNS query log.

use anyhow::{bail, Context as _, Result};
use dnsblock_core::{LogFilter, ReverseCache, UnmatchedLines};
use std::path::Path;
use tokio::io::{AsyncBufRead, BufReader};

use super::Context;
use crate::cli::args::ProcesslogArgs;

pub async fn execute(ctx: Context, args: ProcesslogArgs) -> Result<()> {
    let settings = &ctx.config.log_filter;
    let concurrency = args.concurrency.unwrap_or(settings.concurrency);
    if concurrency == 0 {
        bail!("--concurrency must be at least 1");
    }
    let unmatched = if args.pass_unmatched {
        UnmatchedLines::Pass
    } else {
        settings.unmatched
    };

    let engine = ctx.load_policy().await?;

    let cache = ReverseCache::new(ctx.name_resolver()?);
    for (ip, hostname) in settings.known_hosts()? {
        cache.seed(ip, hostname);
    }

    let reader = open_log(&args.log).await?;
    LogFilter::new(engine.blocks(), &cache)
        .unmatched(unmatched)
        .run(reader, tokio::io::stdout(), concurrency)
        .await?;
    Ok(())
}

async fn open_log(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open query log {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}
