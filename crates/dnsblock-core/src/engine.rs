//! The policy engine: one block index and one allow index, reconciled.

use serde::Serialize;
use tracing::debug;

use crate::domain::Domain;
use crate::error::PolicyError;
use crate::index::{AllowIndex, BlockIndex};
use crate::trie::{InsertOutcome, Rule};

/// Outcome of offering a block rule to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockDecision {
    /// Stored; `pruned` narrower block rules were subsumed.
    Added {
        /// Rules subsumed by the new one.
        pruned: usize,
    },
    /// An existing block rule already covers the domain.
    AlreadyCovered {
        /// The covering block rule's domain.
        by: Domain,
    },
    /// An allow rule covers the domain, so it was not blocked.
    Allowed {
        /// The allow rule.
        by: Rule,
    },
}

impl BlockDecision {
    /// True when a new block rule was stored.
    #[must_use]
    pub const fn is_added(&self) -> bool {
        matches!(self, Self::Added { .. })
    }

    /// The error-taxonomy form of a rejected block, if it was rejected.
    #[must_use]
    pub fn rejection(&self, domain: &Domain) -> Option<PolicyError> {
        match self {
            Self::Added { .. } => None,
            Self::AlreadyCovered { by } => Some(PolicyError::AlreadyCovered {
                domain: domain.to_string(),
                by: by.to_string(),
            }),
            Self::Allowed { by } => Some(PolicyError::ConflictWithAllowlist {
                domain: domain.to_string(),
                allowed_by: by.domain.to_string(),
            }),
        }
    }
}

/// Combined classification of a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "verdict", content = "rule")]
pub enum Verdict {
    /// An allow rule covers the name. Takes precedence over blocking.
    Allowed(Rule),
    /// A block rule covers the name.
    Blocked(Rule),
    /// Neither index has an opinion.
    Unlisted,
}

/// Owns the block and allow indexes for one run.
#[derive(Debug, Default)]
pub struct PolicyEngine {
    blocks: BlockIndex,
    allows: AllowIndex,
}

impl PolicyEngine {
    /// Create an engine with empty indexes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Block `domain` unless an allow rule covers it.
    pub fn block(&mut self, domain: &Domain, comment: impl Into<String>) -> BlockDecision {
        if let Some(rule) = self.allows.allowed_by(domain) {
            debug!(domain = %domain, allowed_by = %rule, "block refused by allow list");
            return BlockDecision::Allowed { by: rule };
        }

        match self.blocks.block(domain, comment) {
            InsertOutcome::Added { pruned } => BlockDecision::Added { pruned },
            InsertOutcome::AlreadyCovered { by } | InsertOutcome::Shadowed { by } => {
                BlockDecision::AlreadyCovered { by }
            }
        }
    }

    /// Store an allow rule for `domain` (no alias propagation).
    pub fn allow(&mut self, domain: &Domain, comment: impl Into<String>) -> InsertOutcome {
        self.allows.allow(domain, comment)
    }

    /// Classify `domain` against both indexes.
    #[must_use]
    pub fn check(&self, domain: &Domain) -> Verdict {
        if let Some(rule) = self.allows.allowed_by(domain) {
            return Verdict::Allowed(rule);
        }
        self.blocks
            .blocked_by(domain)
            .map_or(Verdict::Unlisted, Verdict::Blocked)
    }

    /// The block index.
    #[must_use]
    pub const fn blocks(&self) -> &BlockIndex {
        &self.blocks
    }

    /// The allow index.
    #[must_use]
    pub const fn allows(&self) -> &AllowIndex {
        &self.allows
    }
}
