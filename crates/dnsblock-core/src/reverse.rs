//! Reverse-DNS cache for the log filter.
//!
//! One entry per client address for the lifetime of a run. Lookups for an
//! address already in flight await the first lookup instead of issuing a
//! second query. Failures are cached too, rendered as `"<ip> <code>"`.

use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::alias::NameResolver;
use crate::error::PolicyError;

/// Address to hostname cache backed by a [`NameResolver`].
pub struct ReverseCache {
    resolver: Arc<dyn NameResolver>,
    entries: DashMap<IpAddr, Arc<OnceCell<String>>>,
    lookups: AtomicUsize,
}

impl ReverseCache {
    /// Create an empty cache.
    pub fn new(resolver: Arc<dyn NameResolver>) -> Self {
        Self {
            resolver,
            entries: DashMap::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Pre-populate an entry. Seeded addresses never reach the resolver.
    pub fn seed(&self, ip: IpAddr, hostname: impl Into<String>) {
        self.entries
            .insert(ip, Arc::new(OnceCell::from(hostname.into())));
    }

    /// Hostname for `ip`, resolving it on first use.
    pub async fn hostname(&self, ip: IpAddr) -> String {
        let cell = self
            .entries
            .entry(ip)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();

        cell.get_or_init(|| async {
            self.lookups.fetch_add(1, Ordering::Relaxed);
            match self.resolver.reverse(ip).await {
                Ok(hostname) => hostname,
                Err(failure) => {
                    let sentinel = format!("{ip} {}", failure.code());
                    let err = PolicyError::ResolutionFailure {
                        name: ip.to_string(),
                        source: failure,
                    };
                    debug!(error = %err, "reverse lookup failed");
                    sentinel
                }
            }
        })
        .await
        .clone()
    }

    /// Number of external reverse lookups issued so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Number of cached addresses, including ones still resolving.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ReverseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverseCache")
            .field("entries", &self.entries.len())
            .field("lookups", &self.lookups())
            .finish_non_exhaustive()
    }
}
