//! BIND `named.conf` zone stanzas, one per block rule.

use dnsblock_core::Rule;

/// `zone "<domain>" { type master; file "<zone_file>"; };` for each rule.
pub fn zone_stanzas<'a>(rules: impl IntoIterator<Item = &'a Rule>, zone_file: &str) -> String {
    rules
        .into_iter()
        .map(|rule| {
            format!(
                "zone \"{}\" {{ type master; file \"{zone_file}\"; }};\n",
                rule.domain
            )
        })
        .collect()
}
