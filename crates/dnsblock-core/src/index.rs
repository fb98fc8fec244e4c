//! Block and allow indexes.
//!
//! Both wrap a [`LabelTrie`]; the block index uses [`Broadest`] precedence
//! (a parent blocks every descendant), the allow index [`MostSpecific`]
//! (a stored name and all of its ancestors are allowed, unlisted
//! descendants are not).

use tracing::debug;

use crate::domain::Domain;
use crate::trie::{Broadest, InsertOutcome, LabelTrie, MostSpecific, Rule, Rules};

/// Block rules with broadest-wins semantics.
#[derive(Debug, Default)]
pub struct BlockIndex {
    trie: LabelTrie<Broadest>,
}

impl BlockIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a block rule for `domain`.
    ///
    /// Fails with [`InsertOutcome::AlreadyCovered`] when the domain or one of
    /// its ancestors is already blocked. A successful insert discards any
    /// narrower rules beneath the domain.
    pub fn block(&mut self, domain: &Domain, comment: impl Into<String>) -> InsertOutcome {
        let outcome = self.trie.insert(domain, comment);
        match &outcome {
            InsertOutcome::Added { pruned } if *pruned > 0 => {
                debug!(domain = %domain, pruned, "block rule subsumed narrower rules");
            }
            InsertOutcome::AlreadyCovered { by } => {
                debug!(domain = %domain, by = %by, "already blocked");
            }
            _ => {}
        }
        outcome
    }

    /// The rule blocking `domain`, if any: the shallowest terminal on its path.
    #[must_use]
    pub fn blocked_by(&self, domain: &Domain) -> Option<Rule> {
        self.trie.lookup(domain)
    }

    /// True when `domain` or one of its ancestors is blocked.
    #[must_use]
    pub fn is_blocked(&self, domain: &Domain) -> bool {
        self.blocked_by(domain).is_some()
    }

    /// Block rules in structural order.
    #[must_use]
    pub fn rules(&self) -> Rules<'_> {
        self.trie.rules()
    }

    /// Block rules as source lines (`domain` followed by its comment).
    #[must_use]
    pub fn serialize_blocked_domains(&self) -> Vec<String> {
        self.rules().map(|rule| rule.serialize()).collect()
    }

    /// Number of block rules.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.trie.len()
    }

    /// True when nothing is blocked.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub(crate) const fn trie(&self) -> &LabelTrie<Broadest> {
        &self.trie
    }
}

/// Allow rules with most-specific-wins, ancestor-inclusive semantics.
#[derive(Debug, Default)]
pub struct AllowIndex {
    trie: LabelTrie<MostSpecific>,
}

impl AllowIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an allow rule for `domain`.
    ///
    /// Intermediate nodes for every ancestor are created and kept. Fails with
    /// [`InsertOutcome::Shadowed`] when a narrower allow rule already exists
    /// beneath the domain, or [`InsertOutcome::AlreadyCovered`] when the
    /// domain or one of its ancestors already has an allow rule. An allowed
    /// name never gains rules beneath it, so its unlisted descendants stay
    /// unlisted.
    pub fn allow(&mut self, domain: &Domain, comment: impl Into<String>) -> InsertOutcome {
        let outcome = self.trie.insert(domain, comment);
        if !outcome.is_added() {
            debug!(domain = %domain, outcome = ?outcome, "allow rule not stored");
        }
        outcome
    }

    /// The allow rule that grants trust to `domain`.
    ///
    /// Every label of `domain` must exist in the index. If the name is only
    /// an ancestor of stored rules, the first narrower rule is reported.
    #[must_use]
    pub fn allowed_by(&self, domain: &Domain) -> Option<Rule> {
        self.trie.lookup(domain)
    }

    /// True when `domain` is allowed, directly or as an ancestor of an allowed name.
    #[must_use]
    pub fn is_allowed(&self, domain: &Domain) -> bool {
        self.trie.node(domain).is_some()
    }

    /// Allow rules in structural order.
    #[must_use]
    pub fn rules(&self) -> Rules<'_> {
        self.trie.rules()
    }

    /// Allow rules as source lines.
    #[must_use]
    pub fn serialize_allowed_domains(&self) -> Vec<String> {
        self.rules().map(|rule| rule.serialize()).collect()
    }

    /// Allow rules as source lines, leaving out rules derived from CNAME
    /// chains. Those are recomputed on every load.
    #[must_use]
    pub fn serialize_source_domains(&self) -> Vec<String> {
        self.rules()
            .filter(|rule| !rule.is_alias())
            .map(|rule| rule.serialize())
            .collect()
    }

    /// Number of allow rules.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.trie.len()
    }

    /// True when nothing is allowed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Domain {
        Domain::parse(s).unwrap()
    }

    #[test]
    fn blocked_domain_covers_itself_and_descendants_only() {
        let mut index = BlockIndex::new();
        assert!(index.block(&d("ads.example"), "").is_added());

        assert!(index.is_blocked(&d("ads.example")));
        assert!(index.is_blocked(&d("www.ads.example")));
        assert!(index.is_blocked(&d("a.b.c.ads.example")));
        assert!(!index.is_blocked(&d("example")));
        assert!(!index.is_blocked(&d("bads.example")));
        assert!(!index.is_blocked(&d("ads.example.net")));
    }

    #[test]
    fn narrower_block_after_broader_is_covered() {
        let mut index = BlockIndex::new();
        index.block(&d("example.net"), "");
        assert_eq!(
            index.block(&d("ads.example.net"), ""),
            InsertOutcome::AlreadyCovered { by: d("example.net") }
        );
        assert_eq!(index.blocked_by(&d("ads.example.net")).unwrap().domain, d("example.net"));
    }

    #[test]
    fn broader_block_after_narrower_subsumes() {
        let mut index = BlockIndex::new();
        index.block(&d("ads.example.net"), "");
        assert_eq!(index.block(&d("example.net"), ""), InsertOutcome::Added { pruned: 1 });
        assert_eq!(index.len(), 1);
        assert_eq!(index.blocked_by(&d("ads.example.net")).unwrap().domain, d("example.net"));
    }

    #[test]
    fn serialization_order_ignores_insertion_order() {
        let domains = [
            "promotie.ads",
            "publicitate.ads",
            "reclame.ads",
            "neptune.appads.com",
            "adserver.net",
        ];
        // Insertion order must not matter.
        for order in [[4, 2, 0, 3, 1], [0, 1, 2, 3, 4], [3, 4, 1, 2, 0]] {
            let mut index = BlockIndex::new();
            for i in order {
                index.block(&d(domains[i]), "");
            }
            assert_eq!(index.serialize_blocked_domains(), domains);
        }
    }

    #[test]
    fn serialized_rules_carry_comments() {
        let mut index = BlockIndex::new();
        index.block(&d("tracker.example"), " # telemetry");
        index.block(&d("adserver.net"), "");
        assert_eq!(
            index.serialize_blocked_domains(),
            ["tracker.example # telemetry", "adserver.net"]
        );
    }

    #[test]
    fn allowed_domain_and_every_ancestor_are_allowed() {
        let mut index = AllowIndex::new();
        index.allow(&d("www.example.com"), " # site");

        assert!(index.is_allowed(&d("www.example.com")));
        assert!(index.is_allowed(&d("example.com")));
        assert!(index.is_allowed(&d("com")));
        assert!(!index.is_allowed(&d("ftp.www.example.com")));
        assert!(!index.is_allowed(&d("mail.example.com")));

        let rule = index.allowed_by(&d("example.com")).unwrap();
        assert_eq!(rule.domain, d("www.example.com"));
        assert_eq!(rule.comment, " # site");
    }

    #[test]
    fn allowing_ancestor_of_existing_rule_fails() {
        let mut index = AllowIndex::new();
        index.allow(&d("a.b.example"), "");
        assert_eq!(
            index.allow(&d("example"), ""),
            InsertOutcome::Shadowed { by: d("a.b.example") }
        );
        // Still allowed through the narrower rule.
        assert!(index.is_allowed(&d("example")));
        assert_eq!(index.serialize_allowed_domains(), ["a.b.example"]);
    }

    #[test]
    fn source_serialization_skips_alias_rules() {
        let mut index = AllowIndex::new();
        let origin = Rule::new(d("www.shop.example"), " # shop");
        index.allow(&origin.domain, origin.comment.clone());
        index.allow(&d("edge.cdn.net"), origin.alias_comment());

        assert_eq!(index.serialize_allowed_domains().len(), 2);
        assert_eq!(index.serialize_source_domains(), ["www.shop.example # shop"]);
    }

    #[test]
    fn duplicate_allow_is_covered() {
        let mut index = AllowIndex::new();
        index.allow(&d("example.org"), "");
        assert_eq!(
            index.allow(&d("example.org"), " # again"),
            InsertOutcome::AlreadyCovered { by: d("example.org") }
        );
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn narrower_allow_under_allowed_name_is_covered() {
        let mut index = AllowIndex::new();
        index.allow(&d("example.org"), " # parent");
        assert_eq!(
            index.allow(&d("cdn.example.org"), " # child"),
            InsertOutcome::AlreadyCovered { by: d("example.org") }
        );
        assert_eq!(index.allowed_by(&d("example.org")).unwrap().comment, " # parent");
        assert!(!index.is_allowed(&d("cdn.example.org")));
        assert_eq!(index.len(), 1);
    }
}
