//! Validated, lowercased domain names.
//!
//! A [`Domain`] keeps its labels in presentation order (`www`, `example`,
//! `com`). The tries walk them in reverse so that names sharing a suffix
//! share a path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PolicyError;
use crate::Result;

/// Longest presentation-format name accepted (RFC 1035, without the root dot).
const MAX_NAME_LEN: usize = 253;

/// Longest single label accepted.
const MAX_LABEL_LEN: usize = 63;

/// A non-empty sequence of lowercase labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Domain {
    labels: Vec<String>,
}

impl Domain {
    /// Parse and normalise a domain name.
    ///
    /// Accepts labels of `[a-z0-9_-]+` (case-insensitive) joined by dots, with
    /// one optional trailing root dot. Single-label names are allowed here;
    /// rule files apply the stricter two-label grammar in [`crate::rules`].
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let name = trimmed.strip_suffix('.').unwrap_or(trimmed);

        if name.is_empty() {
            return Err(invalid(input, "empty name"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(invalid(input, "name longer than 253 characters"));
        }

        let mut labels = Vec::new();
        for label in name.split('.') {
            if label.is_empty() {
                return Err(invalid(input, "empty label"));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(invalid(input, "label longer than 63 characters"));
            }
            if !label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            {
                return Err(invalid(input, "label contains characters outside [a-z0-9_-]"));
            }
            labels.push(label.to_ascii_lowercase());
        }

        Ok(Self { labels })
    }

    /// Rebuild a domain from labels ordered most-significant first
    /// (the order a trie path is walked in).
    pub(crate) fn from_reversed<S: AsRef<str>>(path: &[S]) -> Self {
        Self {
            labels: path.iter().rev().map(|l| l.as_ref().to_owned()).collect(),
        }
    }

    /// Labels in presentation order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels.
    #[must_use]
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Labels from the TLD down to the leftmost label.
    pub fn reversed_labels(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.labels.iter().rev().map(String::as_str)
    }

    /// The rightmost `count` labels as a domain.
    ///
    /// `count` is clamped to `1..=label_count()`.
    #[must_use]
    pub fn suffix(&self, count: usize) -> Self {
        let count = count.clamp(1, self.labels.len());
        Self {
            labels: self.labels[self.labels.len() - count..].to_vec(),
        }
    }

    /// The immediate parent, or `None` for a single-label name.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        (self.labels.len() > 1).then(|| self.suffix(self.labels.len() - 1))
    }

    /// All proper suffixes, nearest parent first, down to the TLD.
    ///
    /// `www.example.com` yields `example.com`, then `com`.
    pub fn ancestors(&self) -> impl Iterator<Item = Self> + '_ {
        (1..self.labels.len()).rev().map(|n| self.suffix(n))
    }

    /// True when `self` is a proper suffix of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.labels.len() > self.labels.len() && other.labels.ends_with(&self.labels)
    }

    /// True when the name reads like a dotted-quad IPv4 address.
    #[must_use]
    pub fn looks_like_ipv4(&self) -> bool {
        self.labels.len() == 4
            && self
                .labels
                .iter()
                .all(|l| !l.is_empty() && l.len() <= 3 && l.bytes().all(|b| b.is_ascii_digit()))
    }
}

fn invalid(input: &str, reason: &'static str) -> PolicyError {
    PolicyError::InvalidDomainSyntax {
        input: input.to_owned(),
        reason,
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.labels.join("."))
    }
}

impl FromStr for Domain {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Domain {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.to_string()
    }
}
