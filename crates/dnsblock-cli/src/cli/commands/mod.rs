//! Command implementations.

pub mod add;
pub mod advise;
pub mod allow;
pub mod check;
pub mod list;
pub mod processlog;
pub mod rpz;
pub mod simplify;
pub mod zone;

use anyhow::{Context as _, Result};
use dnsblock_core::{AliasResolver, NameResolver, PolicyEngine, PolicyLoader};
use dnsblock_resolver::{HickoryResolver, ResolverSettings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::output::{self, OutputFormat};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Configuration with command-line overrides applied.
    pub config: Config,

    /// Output format for diagnostic commands.
    pub output_format: OutputFormat,

    /// Disable colors.
    pub no_color: bool,
}

impl Context {
    /// Resolver for CNAME hops and reverse lookups.
    ///
    /// Falls back to public nameservers when the system configuration
    /// cannot be read.
    pub fn name_resolver(&self) -> Result<Arc<dyn NameResolver>> {
        let settings = ResolverSettings {
            timeout: self.config.resolver.timeout(),
            attempts: self.config.resolver.attempts,
        };
        let resolver = match HickoryResolver::from_system(&settings) {
            Ok(resolver) => resolver,
            Err(e) => {
                warn!(error = %e, "system resolver unavailable, using public nameservers");
                HickoryResolver::with_public_servers(&settings)?
            }
        };
        Ok(Arc::new(resolver))
    }

    /// Alias walker, unless alias following is disabled.
    pub fn alias_resolver(&self) -> Result<Option<AliasResolver>> {
        if !self.config.resolver.follow_aliases {
            return Ok(None);
        }
        let aliases = AliasResolver::new(self.name_resolver()?)
            .with_max_hops(self.config.resolver.max_alias_hops);
        Ok(Some(aliases))
    }

    /// A loader with the allow list already loaded.
    pub async fn load_allowed(&self) -> Result<PolicyLoader> {
        let mut loader = PolicyLoader::new(self.alias_resolver()?);
        let path = &self.config.files.allowed;
        match read_optional(path).await? {
            Some(text) => loader.load_allow_list(&path.display().to_string(), &text).await?,
            None => debug!(path = %path.display(), "no allow list"),
        }
        Ok(loader)
    }

    /// Load every block list into `loader`.
    pub async fn load_blocked(&self, loader: &mut PolicyLoader) -> Result<()> {
        for path in self.block_lists() {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read block list {}", path.display()))?;
            loader.load_block_list(&path.display().to_string(), &text);
        }
        Ok(())
    }

    /// Allow list, then block lists.
    pub async fn load_policy(&self) -> Result<PolicyEngine> {
        let mut loader = self.load_allowed().await?;
        self.load_blocked(&mut loader).await?;
        let (engine, report) = loader.finish();
        debug!(report = ?report, "policy loaded");
        Ok(engine)
    }

    /// Rewrite the primary block list from `engine`.
    pub async fn write_block_list(&self, engine: &PolicyEngine) -> Result<()> {
        let lines = engine.blocks().serialize_blocked_domains();
        output::write_file(&self.config.files.blocked, &output::plain_list(lines)).await
    }

    fn block_lists(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.config.files.blocked).chain(&self.config.files.extra_blocked)
    }
}

/// Read a file that may legitimately be absent.
async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}
