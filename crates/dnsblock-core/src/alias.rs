//! Alias-chain resolution.
//!
//! Follows a name's CNAME records one hop at a time through a
//! [`NameResolver`] until an address record, a dead end, a repeated name,
//! or the hop bound is reached.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::Domain;
use crate::error::ResolveFailure;

/// Default bound on the number of CNAME hops followed.
pub const DEFAULT_MAX_HOPS: usize = 16;

/// What the resolver found at one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hop {
    /// The name has an address record.
    Address,
    /// The name is an alias for another name.
    Alias(Domain),
    /// Neither an address nor an alias.
    End,
}

/// External name resolution used by the engine.
///
/// Implementations carry their own timeout and retry budget; a lookup that
/// exhausts it returns [`ResolveFailure::Timeout`].
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Look up the records at `name` and classify them.
    async fn next_hop(&self, name: &Domain) -> Result<Hop, ResolveFailure>;

    /// Reverse-resolve an address to a hostname.
    async fn reverse(&self, ip: IpAddr) -> Result<String, ResolveFailure>;
}

/// Why a chain walk stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "detail")]
pub enum ChainEnd {
    /// The last name has an address record.
    Address,
    /// The last name has neither address nor alias.
    DeadEnd,
    /// The last name aliases a name already on the chain.
    Cycle(Domain),
    /// The hop bound was reached.
    HopLimit,
    /// The resolver failed at the last name.
    Unresolved(String),
}

/// Names visited while following CNAMEs, starting with the queried name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasChain {
    names: Vec<Domain>,
    end: ChainEnd,
}

impl AliasChain {
    /// Every name visited, in order. Never empty.
    #[must_use]
    pub fn names(&self) -> &[Domain] {
        &self.names
    }

    /// Consume the chain, keeping only the names.
    #[must_use]
    pub fn into_names(self) -> Vec<Domain> {
        self.names
    }

    /// Why the walk stopped.
    #[must_use]
    pub const fn end(&self) -> &ChainEnd {
        &self.end
    }

    /// The name the walk started from.
    #[must_use]
    pub fn origin(&self) -> &Domain {
        &self.names[0]
    }

    /// Names reached through at least one CNAME.
    #[must_use]
    pub fn aliases(&self) -> &[Domain] {
        &self.names[1..]
    }
}

/// Walks CNAME chains with a visited-name guard and a hop bound.
#[derive(Clone)]
pub struct AliasResolver {
    resolver: Arc<dyn NameResolver>,
    max_hops: usize,
}

impl AliasResolver {
    /// Create a resolver with the default hop bound.
    pub fn new(resolver: Arc<dyn NameResolver>) -> Self {
        Self {
            resolver,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Override the hop bound (at least one hop is always allowed).
    #[must_use]
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops.max(1);
        self
    }

    /// The underlying resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<dyn NameResolver> {
        &self.resolver
    }

    /// Follow `domain` through its CNAMEs.
    ///
    /// Each call owns its visited set, so independent chains may be walked
    /// concurrently.
    pub async fn resolve_chain(&self, domain: &Domain) -> AliasChain {
        let mut names = vec![domain.clone()];
        let mut visited: HashSet<Domain> = HashSet::from([domain.clone()]);
        let mut current = domain.clone();

        let end = loop {
            if names.len() > self.max_hops {
                warn!(origin = %domain, hops = self.max_hops, "alias chain hop limit reached");
                break ChainEnd::HopLimit;
            }

            match self.resolver.next_hop(&current).await {
                Ok(Hop::Address) => break ChainEnd::Address,
                Ok(Hop::End) => break ChainEnd::DeadEnd,
                Ok(Hop::Alias(target)) => {
                    if !visited.insert(target.clone()) {
                        warn!(origin = %domain, at = %current, target = %target, "alias cycle");
                        break ChainEnd::Cycle(target);
                    }
                    debug!(from = %current, to = %target, "following alias");
                    names.push(target.clone());
                    current = target;
                }
                Err(failure) => {
                    debug!(name = %current, error = %failure, "alias lookup failed");
                    break ChainEnd::Unresolved(failure.code().to_owned());
                }
            }
        };

        AliasChain { names, end }
    }
}

impl std::fmt::Debug for AliasResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliasResolver")
            .field("max_hops", &self.max_hops)
            .finish_non_exhaustive()
    }
}
