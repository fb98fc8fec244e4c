//! Error types for the dnsblock policy engine.

use thiserror::Error;

/// Errors reported by the policy engine.
///
/// None of these abort a run: every variant describes a single record
/// (rule line, log line, lookup) that was skipped or degraded.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// A rule line or query name does not satisfy the domain grammar.
    #[error("invalid domain syntax: '{input}' ({reason})")]
    InvalidDomainSyntax {
        /// The offending text.
        input: String,
        /// Which part of the grammar it violated.
        reason: &'static str,
    },

    /// An existing rule already makes the new one redundant.
    #[error("{domain} is already covered by {by}")]
    AlreadyCovered {
        /// Domain that was offered.
        domain: String,
        /// Rule that covers it.
        by: String,
    },

    /// A block rule was refused because an allow rule covers the domain.
    #[error("{domain} not blocked: allowed by {allowed_by}")]
    ConflictWithAllowlist {
        /// Domain that was offered for blocking.
        domain: String,
        /// Allow rule that protects it.
        allowed_by: String,
    },

    /// An external lookup failed; the caller degrades to a sentinel.
    #[error("resolution failed for {name}: {source}")]
    ResolutionFailure {
        /// Name or address that was looked up.
        name: String,
        /// Underlying resolver failure.
        #[source]
        source: ResolveFailure,
    },

    /// A query-log line matched the query pattern but not the client pattern.
    #[error("malformed query log line {line_number}: {line}")]
    MalformedLogLine {
        /// 1-based input line number.
        line_number: usize,
        /// The raw line.
        line: String,
    },

    /// Allow rules were offered after block loading started.
    #[error("allow rules must be loaded before block rules ({source_name})")]
    AllowAfterBlock {
        /// Name of the allow source that arrived late.
        source_name: String,
    },

    /// IO error while streaming log lines.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure modes of the external name resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    /// NXDOMAIN or no records of the requested type.
    #[error("name not found")]
    NotFound,

    /// The lookup exceeded its time budget.
    #[error("lookup timed out")]
    Timeout,

    /// Any other resolver error (SERVFAIL, refused, transport).
    #[error("lookup failed: {0}")]
    Failed(String),
}

impl ResolveFailure {
    /// Stable code used when a failure is rendered in place of a hostname.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "ENOTFOUND",
            Self::Timeout => "ETIMEOUT",
            Self::Failed(_) => "ESERVFAIL",
        }
    }
}
