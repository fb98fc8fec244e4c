//! dnsblock - maintain DNS block and allow lists
//!
//! Consolidates block lists, emits BIND zone stanzas and RPZ zones, and
//! filters DNS query logs against the policy.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dnsblock_cli::run().await
}
