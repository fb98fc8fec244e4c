//! dnsblock-resolver: live DNS lookups for the dnsblock policy engine.
//!
//! Implements [`dnsblock_core::NameResolver`] on top of `hickory-resolver`,
//! using the system nameservers. Every lookup is bounded by the configured
//! timeout and attempt count; exhausted budgets surface as
//! [`dnsblock_core::ResolveFailure::Timeout`].

pub mod error;
pub mod hickory;

pub use error::{Result, ResolverError};
pub use hickory::{HickoryResolver, ResolverSettings};
