//! Response-policy-zone master file.
//!
//! Every block rule becomes two NXDOMAIN policy records under the RPZ
//! origin: one for the name and a wildcard for everything beneath it.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use dnsblock_core::Rule;
use hickory_proto::rr::rdata::{CNAME, NS, SOA};
use hickory_proto::rr::{Name, RData, Record};
use std::fmt::Write;

const SOA_REFRESH: i32 = 3600;
const SOA_RETRY: i32 = 600;
const SOA_EXPIRE: i32 = 86_400;

/// Zone serial in `YYYYMMDDnn` form, revision 01.
pub fn serial_for(date: NaiveDate) -> Result<u32> {
    let serial = date.format("%Y%m%d01").to_string();
    serial
        .parse()
        .with_context(|| format!("serial {serial} does not fit in 32 bits"))
}

/// Render the RPZ master file.
pub fn rpz_zone<'a>(
    rules: impl IntoIterator<Item = &'a Rule>,
    origin: &str,
    ttl: u32,
    serial: u32,
) -> Result<String> {
    let origin = Name::parse(origin, None).with_context(|| format!("invalid RPZ origin {origin}"))?;
    let localhost = Name::parse("localhost.", None)?;

    let soa = SOA::new(
        localhost.clone(),
        Name::parse("root.localhost.", None)?,
        serial,
        SOA_REFRESH,
        SOA_RETRY,
        SOA_EXPIRE,
        ttl,
    );

    let mut out = String::new();
    writeln!(out, "$TTL {ttl}")?;
    writeln!(out, "{}", Record::from_rdata(origin.clone(), ttl, RData::SOA(soa)))?;
    writeln!(out, "{}", Record::from_rdata(origin.clone(), ttl, RData::NS(NS(localhost))))?;

    for rule in rules {
        let name = Name::parse(&rule.domain.to_string(), Some(&origin))
            .with_context(|| format!("cannot place {} under {origin}", rule.domain))?;
        let wildcard = Name::from_ascii(format!("*.{name}"))?;
        for owner in [name, wildcard] {
            let record = Record::from_rdata(owner, ttl, RData::CNAME(CNAME(Name::root())));
            writeln!(out, "{record}")?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnsblock_core::Domain;

    fn fields(line: &str) -> Vec<&str> {
        line.split_whitespace().collect()
    }

    #[test]
    fn serial_from_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(serial_for(date).unwrap(), 2_026_101_601);
    }

    #[test]
    fn policy_records_for_each_rule() {
        let rules = [Rule::new(Domain::parse("ads.example").unwrap(), " # ads")];
        let zone = rpz_zone(&rules, "rpz.adblock.", 3600, 2_026_101_601).unwrap();
        let lines: Vec<&str> = zone.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "$TTL 3600");
        assert_eq!(&fields(lines[1])[..4], ["rpz.adblock.", "3600", "IN", "SOA"]);
        assert!(lines[1].contains("2026101601"));
        assert_eq!(fields(lines[2]), ["rpz.adblock.", "3600", "IN", "NS", "localhost."]);
        assert_eq!(
            fields(lines[3]),
            ["ads.example.rpz.adblock.", "3600", "IN", "CNAME", "."]
        );
        assert_eq!(
            fields(lines[4]),
            ["*.ads.example.rpz.adblock.", "3600", "IN", "CNAME", "."]
        );
    }

    #[test]
    fn empty_policy_has_only_header() {
        let zone = rpz_zone(std::iter::empty(), "rpz.adblock.", 60, 1).unwrap();
        assert_eq!(zone.lines().count(), 3);
    }

    #[test]
    fn malformed_origin_is_rejected() {
        assert!(rpz_zone(std::iter::empty(), "bad..origin.", 60, 1).is_err());
    }
}
