//! Rule-file line parsing.
//!
//! One record per line: `<domain>[<comment>]`, where the comment is
//! everything from the first whitespace to the end of the line, kept
//! verbatim so that lists round-trip. Blank lines and `#` lines are skipped.

use crate::domain::Domain;
use crate::error::PolicyError;
use crate::trie::Rule;
use crate::Result;

/// Minimum number of labels for a rule domain.
pub const MIN_RULE_LABELS: usize = 2;

/// Names that never make sense as rules.
const RESERVED_NAMES: [&str; 2] = ["localhost", "localhost.localdomain"];

/// Parse one rule-file line.
///
/// Returns `None` for blank and comment lines. Only leading whitespace and
/// the line terminator are removed; the comment keeps trailing whitespace.
pub fn parse_rule_line(line: &str) -> Option<Result<Rule>> {
    let line = line.trim_start().trim_end_matches(['\r', '\n']);
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (name, comment) = line
        .find(char::is_whitespace)
        .map_or((line, ""), |at| line.split_at(at));

    Some(parse_rule_domain(name).map(|domain| Rule::new(domain, comment)))
}

/// Validate a domain against the rule grammar.
///
/// Stricter than [`Domain::parse`]: at least two labels, no dotted-quad
/// addresses, no `localhost` names.
pub fn parse_rule_domain(name: &str) -> Result<Domain> {
    let domain = Domain::parse(name)?;

    let reason = if domain.label_count() < MIN_RULE_LABELS {
        Some("rules need at least two labels")
    } else if domain.looks_like_ipv4() {
        Some("looks like an IPv4 address")
    } else if RESERVED_NAMES.contains(&domain.to_string().as_str()) {
        Some("reserved local name")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(PolicyError::InvalidDomainSyntax {
            input: name.to_owned(),
            reason,
        }),
        None => Ok(domain),
    }
}

/// Parse every record line of a rule file, with 1-based line numbers.
pub fn parse_rule_text(text: &str) -> impl Iterator<Item = (usize, Result<Rule>)> + '_ {
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| parse_rule_line(line).map(|parsed| (index + 1, parsed)))
}
