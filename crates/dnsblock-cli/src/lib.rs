//! # dnsblock-cli
//!
//! Command-line front end for the dnsblock policy engine.
//!
//! ## Features
//!
//! - **List maintenance**: `simplify`, `add`, `allow` rewrite the rule files in canonical form
//! - **Resolver output**: BIND `zone` stanzas and a response policy zone (`rpz`)
//! - **Diagnostics**: `check` follows CNAME chains, `advise` suggests consolidations
//! - **Query logs**: `processlog` reduces a BIND query log to blocked lookups

pub mod cli;
pub mod config;
pub mod logging;
pub mod output;

pub use cli::run;
