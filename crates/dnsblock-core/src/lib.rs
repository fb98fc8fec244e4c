//! dnsblock-core: hierarchical domain block/allow policy.
//!
//! Two reversed-label tries encode the rules:
//! - the **block index** is broadest-wins: blocking `ads.example` covers every
//!   name beneath it and discards narrower block rules;
//! - the **allow index** is most-specific-wins and ancestor-inclusive:
//!   allowing `www.example.com` also trusts `example.com`, but not
//!   `ftp.www.example.com`.
//!
//! Allow rules are loaded first and propagated across CNAME chains; block
//! candidates that an allow rule covers are refused. The loaded policy then
//! drives a DNS query-log filter and a few read-only diagnostics.
//!
//! # Example
//!
//! ```rust,ignore
//! use dnsblock_core::{PolicyLoader, Domain};
//!
//! let mut loader = PolicyLoader::new(None);
//! loader.load_allow_list("hosts_allowed.txt", "www.wikipedia.org # dictionary\n").await?;
//! loader.load_block_list("hosts_blocked.txt", "adserver.net\n");
//! let (engine, report) = loader.finish();
//! assert!(engine.blocks().is_blocked(&Domain::parse("www.adserver.net")?));
//! ```
//!
//! Network access goes through the [`NameResolver`] trait; this crate never
//! opens a socket itself.

pub mod advisory;
pub mod alias;
pub mod domain;
pub mod engine;
pub mod error;
pub mod index;
pub mod loader;
pub mod logfilter;
pub mod reverse;
pub mod rules;
pub mod trie;

#[cfg(test)]
mod testing;

// Re-exports for convenience.
pub use alias::{AliasChain, AliasResolver, ChainEnd, Hop, NameResolver};
pub use domain::Domain;
pub use engine::{BlockDecision, PolicyEngine, Verdict};
pub use error::{PolicyError, ResolveFailure};
pub use index::{AllowIndex, BlockIndex};
pub use loader::{Conflict, LoadReport, PolicyLoader};
pub use logfilter::{FilterStats, Filtered, LogFilter, UnmatchedLines};
pub use reverse::ReverseCache;
pub use rules::{parse_rule_line, parse_rule_text};
pub use trie::{InsertOutcome, LabelTrie, Rule};

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
