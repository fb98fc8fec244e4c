//! [`NameResolver`] backed by the system's DNS configuration.

use async_trait::async_trait;
use dnsblock_core::{Domain, Hop, NameResolver, ResolveFailure};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{ResolveError, TokioResolver};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{ResolverError, Result};

/// Timeout and retry budget for every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Per-query timeout.
    pub timeout: Duration,
    /// Attempts per query.
    pub attempts: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            attempts: 2,
        }
    }
}

impl ResolverSettings {
    /// Wall-clock bound for one lookup including retries.
    #[must_use]
    pub fn budget(&self) -> Duration {
        let attempts = u32::try_from(self.attempts.max(1)).unwrap_or(u32::MAX);
        self.timeout.saturating_mul(attempts)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(ResolverError::Settings("timeout must be positive".into()));
        }
        if self.attempts == 0 {
            return Err(ResolverError::Settings("attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Hickory-based resolver used for CNAME hops and PTR lookups.
pub struct HickoryResolver {
    inner: TokioResolver,
    budget: Duration,
}

impl HickoryResolver {
    /// Create a resolver from the system configuration (`/etc/resolv.conf`
    /// or the platform equivalent).
    pub fn from_system(settings: &ResolverSettings) -> Result<Self> {
        settings.validate()?;

        let mut builder = TokioResolver::builder_tokio()?;
        let opts = builder.options_mut();
        opts.timeout = settings.timeout;
        opts.attempts = settings.attempts;

        debug!(
            timeout_ms = settings.timeout.as_millis(),
            attempts = settings.attempts,
            "system resolver configured"
        );
        Ok(Self {
            inner: builder.build(),
            budget: settings.budget(),
        })
    }

    /// Create a resolver that queries Cloudflare's public nameservers.
    pub fn with_public_servers(settings: &ResolverSettings) -> Result<Self> {
        settings.validate()?;

        let mut builder = TokioResolver::builder_with_config(
            ResolverConfig::cloudflare(),
            TokioConnectionProvider::default(),
        );
        let opts = builder.options_mut();
        opts.timeout = settings.timeout;
        opts.attempts = settings.attempts;

        Ok(Self {
            inner: builder.build(),
            budget: settings.budget(),
        })
    }

    /// Wall-clock bound applied to each lookup.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        self.budget
    }
}

impl std::fmt::Debug for HickoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryResolver")
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

/// Answer records for one query. A name without records of the type
/// answers with an empty list.
#[async_trait]
trait RecordSource: Sync {
    async fn records(
        &self,
        query: &str,
        record_type: RecordType,
    ) -> std::result::Result<Vec<Record>, ResolveFailure>;
}

#[async_trait]
impl RecordSource for HickoryResolver {
    async fn records(
        &self,
        query: &str,
        record_type: RecordType,
    ) -> std::result::Result<Vec<Record>, ResolveFailure> {
        let lookup = tokio::time::timeout(self.budget, self.inner.lookup(query, record_type))
            .await
            .map_err(|_| ResolveFailure::Timeout)?;

        match lookup {
            Ok(lookup) => Ok(lookup.records().to_vec()),
            Err(e) => {
                trace!(query, record_type = %record_type, error = %e, "forward lookup failed");
                match failure_from(&e) {
                    ResolveFailure::NotFound => Ok(Vec::new()),
                    other => Err(other),
                }
            }
        }
    }
}

/// Ask for the CNAME first so an alias is seen even when its target has no
/// address, then for A and AAAA.
async fn next_hop_from<S: RecordSource + ?Sized>(
    source: &S,
    name: &Domain,
) -> std::result::Result<Hop, ResolveFailure> {
    let query = format!("{name}.");
    for record_type in [RecordType::CNAME, RecordType::A, RecordType::AAAA] {
        let records = source.records(&query, record_type).await?;
        match classify_records(name, &records)? {
            Hop::End => {}
            hop => return Ok(hop),
        }
    }
    Ok(Hop::End)
}

#[async_trait]
impl NameResolver for HickoryResolver {
    async fn next_hop(&self, name: &Domain) -> std::result::Result<Hop, ResolveFailure> {
        next_hop_from(self, name).await
    }

    async fn reverse(&self, ip: IpAddr) -> std::result::Result<String, ResolveFailure> {
        let lookup = tokio::time::timeout(self.budget, self.inner.reverse_lookup(ip))
            .await
            .map_err(|_| ResolveFailure::Timeout)?
            .map_err(|e| {
                trace!(ip = %ip, error = %e, "reverse lookup failed");
                failure_from(&e)
            })?;

        lookup
            .iter()
            .next()
            .map(|ptr| ptr.to_string().trim_end_matches('.').to_owned())
            .ok_or(ResolveFailure::NotFound)
    }
}

/// Decide the next hop from the answer records for `name`.
///
/// A CNAME owned by `name` wins over address records, which the resolver
/// includes when it has already chased the alias.
fn classify_records(name: &Domain, records: &[Record]) -> std::result::Result<Hop, ResolveFailure> {
    let owned = |record: &&Record| same_name(record.name(), name);

    if let Some(target) = records.iter().filter(owned).find_map(|r| match r.data() {
        RData::CNAME(cname) => Some(&cname.0),
        _ => None,
    }) {
        return Domain::parse(&target.to_ascii())
            .map(Hop::Alias)
            .map_err(|e| ResolveFailure::Failed(e.to_string()));
    }

    let has_address = records
        .iter()
        .filter(owned)
        .any(|r| matches!(r.data(), RData::A(_) | RData::AAAA(_)));
    Ok(if has_address { Hop::Address } else { Hop::End })
}

fn same_name(owner: &Name, domain: &Domain) -> bool {
    owner
        .to_ascii()
        .trim_end_matches('.')
        .eq_ignore_ascii_case(&domain.to_string())
}

fn failure_from(error: &ResolveError) -> ResolveFailure {
    if error.is_nx_domain() || error.is_no_records_found() {
        ResolveFailure::NotFound
    } else {
        ResolveFailure::Failed(error.to_string())
    }
}
