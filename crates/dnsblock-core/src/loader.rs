//! Rule loading with allow/block reconciliation.
//!
//! Allow lists are loaded first; every allow rule is propagated across its
//! CNAME chain. Block lists follow, and each block candidate is checked
//! against the finished allow index before it reaches the block index.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::alias::AliasResolver;
use crate::domain::Domain;
use crate::engine::{BlockDecision, PolicyEngine};
use crate::error::PolicyError;
use crate::rules::parse_rule_text;
use crate::trie::{InsertOutcome, Rule};
use crate::Result;

/// A block candidate refused because an allow rule covers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// Domain offered for blocking.
    pub domain: Domain,
    /// Allow rule that protects it.
    pub allowed_by: Domain,
}

/// Counters for everything offered to a loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Rules stored (allow and block).
    pub added: usize,
    /// Rules already covered by an existing rule.
    pub covered: usize,
    /// Narrower block rules discarded by broader ones.
    pub pruned: usize,
    /// Lines that failed the rule grammar.
    pub invalid: usize,
    /// Allow rules stored for CNAME targets.
    pub alias_rules: usize,
    /// Block candidates refused by the allow list.
    pub conflicts: Vec<Conflict>,
}

/// Feeds rule files into a [`PolicyEngine`] in the required order.
#[derive(Debug)]
pub struct PolicyLoader {
    engine: PolicyEngine,
    aliases: Option<AliasResolver>,
    report: LoadReport,
    blocks_started: bool,
}

impl PolicyLoader {
    /// Create a loader over an empty engine.
    ///
    /// Without an [`AliasResolver`] allow rules are not propagated to
    /// CNAME targets.
    #[must_use]
    pub fn new(aliases: Option<AliasResolver>) -> Self {
        Self {
            engine: PolicyEngine::new(),
            aliases,
            report: LoadReport::default(),
            blocks_started: false,
        }
    }

    /// Load an allow list. Must precede every block list.
    pub async fn load_allow_list(&mut self, source: &str, text: &str) -> Result<()> {
        self.ensure_allow_phase(source)?;
        let before = self.report.clone();

        for (line_number, parsed) in parse_rule_text(text) {
            match parsed {
                Ok(rule) => {
                    self.allow_rule(&rule).await?;
                }
                Err(e) => self.invalid(source, line_number, &e),
            }
        }

        info!(
            source,
            added = self.report.added - before.added,
            covered = self.report.covered - before.covered,
            aliases = self.report.alias_rules - before.alias_rules,
            invalid = self.report.invalid - before.invalid,
            "loaded allow list"
        );
        Ok(())
    }

    /// Allow `rule.domain` and every name on its alias chain.
    ///
    /// CNAME targets get a comment pointing back at the originating rule.
    /// Returns the outcome for each name, origin first.
    pub async fn allow_rule(&mut self, rule: &Rule) -> Result<Vec<(Domain, InsertOutcome)>> {
        self.ensure_allow_phase(&rule.domain.to_string())?;

        let chain = match &self.aliases {
            Some(aliases) => aliases.resolve_chain(&rule.domain).await.into_names(),
            None => vec![rule.domain.clone()],
        };

        let mut outcomes = Vec::with_capacity(chain.len());
        for (hop, name) in chain.into_iter().enumerate() {
            let comment = if hop == 0 {
                rule.comment.clone()
            } else {
                rule.alias_comment()
            };
            let outcome = self.engine.allow(&name, comment);
            match &outcome {
                InsertOutcome::Added { .. } => {
                    self.report.added += 1;
                    if hop > 0 {
                        self.report.alias_rules += 1;
                        debug!(alias = %name, origin = %rule.domain, "allowed alias target");
                    }
                }
                InsertOutcome::AlreadyCovered { .. } | InsertOutcome::Shadowed { .. } => {
                    self.report.covered += 1;
                }
            }
            outcomes.push((name, outcome));
        }
        Ok(outcomes)
    }

    /// Load a block list. Lines are checked against the allow index first.
    pub fn load_block_list(&mut self, source: &str, text: &str) {
        self.blocks_started = true;
        let before = self.report.clone();

        for (line_number, parsed) in parse_rule_text(text) {
            match parsed {
                Ok(rule) => {
                    self.block_rule(&rule);
                }
                Err(e) => self.invalid(source, line_number, &e),
            }
        }

        info!(
            source,
            added = self.report.added - before.added,
            covered = self.report.covered - before.covered,
            pruned = self.report.pruned - before.pruned,
            conflicts = self.report.conflicts.len() - before.conflicts.len(),
            invalid = self.report.invalid - before.invalid,
            "loaded block list"
        );
    }

    /// Offer a single block rule.
    pub fn block_rule(&mut self, rule: &Rule) -> BlockDecision {
        self.blocks_started = true;
        let decision = self.engine.block(&rule.domain, rule.comment.clone());
        match &decision {
            BlockDecision::Added { pruned } => {
                self.report.added += 1;
                self.report.pruned += pruned;
            }
            BlockDecision::AlreadyCovered { .. } => self.report.covered += 1,
            BlockDecision::Allowed { by } => {
                if let Some(err) = decision.rejection(&rule.domain) {
                    warn!(error = %err, "block rule conflicts with allow list");
                }
                self.report.conflicts.push(Conflict {
                    domain: rule.domain.clone(),
                    allowed_by: by.domain.clone(),
                });
            }
        }
        decision
    }

    /// The engine as loaded so far.
    #[must_use]
    pub const fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    /// Counters so far.
    #[must_use]
    pub const fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Hand over the loaded engine and the final report.
    #[must_use]
    pub fn finish(self) -> (PolicyEngine, LoadReport) {
        (self.engine, self.report)
    }

    fn ensure_allow_phase(&self, source: &str) -> Result<()> {
        if self.blocks_started {
            return Err(PolicyError::AllowAfterBlock {
                source_name: source.to_owned(),
            });
        }
        Ok(())
    }

    fn invalid(&mut self, source: &str, line_number: usize, err: &PolicyError) {
        self.report.invalid += 1;
        warn!(source, line = line_number, error = %err, "skipping rule line");
    }
}
