//! Reversed-label trie shared by the block and allow indexes.
//!
//! Names are stored TLD first, so `ads.example.com` lives at
//! `com -> example -> ads`. A node that carries a rule is *terminal*.
//! The two indexes differ only in their [`Precedence`]: what an insert
//! does when it meets existing rules, and what a lookup needs to match.

use serde::Serialize;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use crate::domain::Domain;

/// Comment prefix marking rules derived from another rule's CNAME chain.
const ALIAS_PREFIX: &str = " # alias of ";

/// What an insert does about rules above or below the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// An ancestor rule rejects the insert; a successful insert drops
    /// every narrower rule beneath it.
    PruneNarrower,
    /// Intermediate nodes are shared and never pruned. The insert is
    /// rejected when a rule already exists above or beneath the target, so
    /// a terminal node never gains descendants.
    RejectIfNarrower,
}

/// What a lookup needs in order to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The first terminal node met on the way down matches.
    FirstRule,
    /// Every label of the queried name must have a node; terminal or not.
    FullPath,
}

/// Precedence semantics for a [`LabelTrie`].
pub trait Precedence {
    /// Insert behaviour.
    const INSERTION: Insertion;
    /// Lookup behaviour.
    const LOOKUP: Lookup;
}

/// Broadest rule wins: a parent rule covers all of its descendants.
#[derive(Debug, Clone, Copy, Default)]
pub struct Broadest;

impl Precedence for Broadest {
    const INSERTION: Insertion = Insertion::PruneNarrower;
    const LOOKUP: Lookup = Lookup::FirstRule;
}

/// Most specific rule is authoritative; ancestors of a stored name match too.
#[derive(Debug, Clone, Copy, Default)]
pub struct MostSpecific;

impl Precedence for MostSpecific {
    const INSERTION: Insertion = Insertion::RejectIfNarrower;
    const LOOKUP: Lookup = Lookup::FullPath;
}

/// A stored rule: a domain plus the free-form comment from its source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    /// The domain the rule applies to.
    pub domain: Domain,
    /// Comment text kept verbatim, including its leading whitespace.
    pub comment: String,
}

impl Rule {
    /// Create a rule.
    pub fn new(domain: Domain, comment: impl Into<String>) -> Self {
        Self {
            domain,
            comment: comment.into(),
        }
    }

    /// Source-line form: the domain immediately followed by its comment.
    #[must_use]
    pub fn serialize(&self) -> String {
        format!("{}{}", self.domain, self.comment)
    }

    /// Comment for a rule derived from this one for a CNAME target:
    /// `" # alias of <domain><comment>"`.
    #[must_use]
    pub fn alias_comment(&self) -> String {
        format!("{ALIAS_PREFIX}{}{}", self.domain, self.comment)
    }

    /// True when the rule was derived through [`Rule::alias_comment`].
    #[must_use]
    pub fn is_alias(&self) -> bool {
        self.comment.starts_with(ALIAS_PREFIX)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.domain)
    }
}

/// Result of offering a rule to a trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The rule was stored. `pruned` narrower rules were discarded.
    Added {
        /// Rules subsumed by the new one.
        pruned: usize,
    },
    /// A rule at or above this name already exists.
    AlreadyCovered {
        /// The existing rule's domain.
        by: Domain,
    },
    /// A narrower rule beneath this name already exists.
    Shadowed {
        /// One of the narrower rules.
        by: Domain,
    },
}

impl InsertOutcome {
    /// True when the rule was stored.
    #[must_use]
    pub const fn is_added(&self) -> bool {
        matches!(self, Self::Added { .. })
    }
}

/// One trie node: children by label plus an optional rule comment.
#[derive(Debug, Default)]
pub(crate) struct Node {
    pub(crate) children: BTreeMap<String, Node>,
    pub(crate) comment: Option<String>,
}

impl Node {
    fn is_terminal(&self) -> bool {
        self.comment.is_some()
    }

    fn count_rules(&self) -> usize {
        usize::from(self.is_terminal())
            + self.children.values().map(Self::count_rules).sum::<usize>()
    }

    /// First rule strictly beneath this node, in enumeration order.
    fn first_rule_below(&self, path: &[String]) -> Option<Rule> {
        Rules::below(self, path.to_vec()).next()
    }
}

/// Reversed-label trie parameterised by its [`Precedence`].
#[derive(Debug)]
pub struct LabelTrie<P> {
    root: Node,
    len: usize,
    _precedence: PhantomData<P>,
}

impl<P> Default for LabelTrie<P> {
    fn default() -> Self {
        Self {
            root: Node::default(),
            len: 0,
            _precedence: PhantomData,
        }
    }
}

impl<P: Precedence> LabelTrie<P> {
    /// Create an empty trie.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rules.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when no rules are stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offer a rule for `domain`.
    ///
    /// Under either policy a rule above `domain` rejects the insert before
    /// any node is created.
    pub fn insert(&mut self, domain: &Domain, comment: impl Into<String>) -> InsertOutcome {
        let depth = domain.label_count();
        let mut node = &mut self.root;

        for (level, label) in domain.reversed_labels().enumerate() {
            if node.is_terminal() {
                return InsertOutcome::AlreadyCovered {
                    by: domain.suffix(level),
                };
            }
            node = node.children.entry(label.to_owned()).or_default();
        }

        if node.is_terminal() {
            return InsertOutcome::AlreadyCovered {
                by: domain.suffix(depth),
            };
        }

        let pruned = match P::INSERTION {
            Insertion::PruneNarrower => {
                let pruned = node.count_rules();
                node.children.clear();
                pruned
            }
            Insertion::RejectIfNarrower => {
                let path: Vec<String> = domain.reversed_labels().map(str::to_owned).collect();
                if let Some(rule) = node.first_rule_below(&path) {
                    return InsertOutcome::Shadowed { by: rule.domain };
                }
                0
            }
        };

        node.comment = Some(comment.into());
        self.len = self.len + 1 - pruned;
        InsertOutcome::Added { pruned }
    }

    /// Find the rule that matches `domain` under this trie's lookup policy.
    ///
    /// With [`Lookup::FullPath`] a name whose node is only structural matches
    /// through the first narrower rule stored beneath it.
    #[must_use]
    pub fn lookup(&self, domain: &Domain) -> Option<Rule> {
        let mut node = &self.root;
        for (level, label) in domain.reversed_labels().enumerate() {
            node = node.children.get(label)?;
            if P::LOOKUP == Lookup::FirstRule {
                if let Some(comment) = &node.comment {
                    return Some(Rule::new(domain.suffix(level + 1), comment.clone()));
                }
            }
        }

        match P::LOOKUP {
            Lookup::FirstRule => None,
            Lookup::FullPath => node.comment.as_ref().map_or_else(
                || {
                    let path: Vec<String> = domain.reversed_labels().map(str::to_owned).collect();
                    node.first_rule_below(&path)
                },
                |comment| Some(Rule::new(domain.clone(), comment.clone())),
            ),
        }
    }

    /// True when a rule is stored for exactly this domain.
    #[must_use]
    pub fn contains_rule(&self, domain: &Domain) -> bool {
        self.node(domain).is_some_and(Node::is_terminal)
    }

    /// All rules in structural order: at every level, child subtrees are
    /// expanded before the level's own terminal children, labels ascending.
    ///
    /// The walk is lazy and recomputed on every call.
    #[must_use]
    pub fn rules(&self) -> Rules<'_> {
        Rules::below(&self.root, Vec::new())
    }

    pub(crate) fn node(&self, domain: &Domain) -> Option<&Node> {
        domain
            .reversed_labels()
            .try_fold(&self.root, |node, label| node.children.get(label))
    }

    pub(crate) const fn root(&self) -> &Node {
        &self.root
    }
}

/// Lazy depth-first enumeration of the rules in a trie.
pub struct Rules<'a> {
    stack: Vec<Frame<'a>>,
}

struct Frame<'a> {
    path: Vec<String>,
    branches: btree_map::Iter<'a, String, Node>,
    leaves: btree_map::Iter<'a, String, Node>,
}

impl<'a> Frame<'a> {
    fn new(node: &'a Node, path: Vec<String>) -> Self {
        Self {
            path,
            branches: node.children.iter(),
            leaves: node.children.iter(),
        }
    }
}

impl<'a> Rules<'a> {
    fn below(node: &'a Node, path: Vec<String>) -> Self {
        Self {
            stack: vec![Frame::new(node, path)],
        }
    }
}

impl Iterator for Rules<'_> {
    type Item = Rule;

    fn next(&mut self) -> Option<Rule> {
        loop {
            let frame = self.stack.last_mut()?;

            let branch = frame
                .branches
                .find(|(_, child)| !child.children.is_empty())
                .map(|(label, child)| {
                    let mut path = frame.path.clone();
                    path.push(label.clone());
                    (child, path)
                });
            if let Some((child, path)) = branch {
                self.stack.push(Frame::new(child, path));
                continue;
            }

            let leaf = frame.leaves.find_map(|(label, child)| {
                child.comment.as_ref().map(|comment| (label, comment))
            });
            if let Some((label, comment)) = leaf {
                let mut path = frame.path.clone();
                path.push(label.clone());
                return Some(Rule::new(Domain::from_reversed(&path), comment.clone()));
            }

            self.stack.pop();
        }
    }
}
