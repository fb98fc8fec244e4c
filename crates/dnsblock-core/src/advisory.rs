//! Read-only diagnostics over a loaded policy.

use serde::Serialize;

use crate::alias::{AliasResolver, ChainEnd};
use crate::domain::Domain;
use crate::engine::{PolicyEngine, Verdict};
use crate::index::BlockIndex;
use crate::trie::Node;

/// Default child count above which a node is worth consolidating.
pub const DEFAULT_THRESHOLD: usize = 5;

/// A node with many direct children in the block index.
///
/// Blocking `domain` itself would subsume every rule beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidationHint {
    /// Number of immediate children.
    pub children: usize,
    /// The node's dot-joined path.
    pub domain: Domain,
}

/// Nodes below the root whose immediate child count exceeds `threshold`.
///
/// Sorted by child count, largest first, then by name.
#[must_use]
pub fn consolidation_hints(blocks: &BlockIndex, threshold: usize) -> Vec<ConsolidationHint> {
    let mut hints = Vec::new();
    let mut path = Vec::new();
    for (label, child) in &blocks.trie().root().children {
        path.push(label.as_str());
        collect_hints(child, &mut path, threshold, &mut hints);
        path.pop();
    }

    hints.sort_by(|a, b| {
        b.children
            .cmp(&a.children)
            .then_with(|| a.domain.to_string().cmp(&b.domain.to_string()))
    });
    hints
}

fn collect_hints<'a>(
    node: &'a Node,
    path: &mut Vec<&'a str>,
    threshold: usize,
    hints: &mut Vec<ConsolidationHint>,
) {
    if node.children.len() > threshold {
        hints.push(ConsolidationHint {
            children: node.children.len(),
            domain: Domain::from_reversed(path.as_slice()),
        });
    }
    for (label, child) in &node.children {
        path.push(label);
        collect_hints(child, path, threshold, hints);
        path.pop();
    }
}

/// Verdict for one name on an alias chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasVerdict {
    /// The name.
    pub name: Domain,
    /// How the policy classifies it.
    pub verdict: Verdict,
}

/// Verdicts along a name's alias chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasTrace {
    /// The queried name first, then every CNAME target.
    pub hops: Vec<AliasVerdict>,
    /// Why the walk stopped; `None` when aliases were not followed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<ChainEnd>,
}

impl AliasTrace {
    /// CNAME targets that are blocked although the queried name is allowed.
    ///
    /// Such a name resolves to nothing for clients even though it is trusted.
    #[must_use]
    pub fn blocked_behind_allowed(&self) -> Vec<&Domain> {
        match self.hops.split_first() {
            Some((origin, aliases)) if matches!(origin.verdict, Verdict::Allowed(_)) => aliases
                .iter()
                .filter(|hop| matches!(hop.verdict, Verdict::Blocked(_)))
                .map(|hop| &hop.name)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Classify `domain` and, when a resolver is given, every name it aliases.
pub async fn trace_aliases(
    engine: &PolicyEngine,
    aliases: Option<&AliasResolver>,
    domain: &Domain,
) -> AliasTrace {
    let (names, end) = match aliases {
        Some(aliases) => {
            let chain = aliases.resolve_chain(domain).await;
            let end = chain.end().clone();
            (chain.into_names(), Some(end))
        }
        None => (vec![domain.clone()], None),
    };

    let hops = names
        .into_iter()
        .map(|name| AliasVerdict {
            verdict: engine.check(&name),
            name,
        })
        .collect();
    AliasTrace { hops, end }
}
