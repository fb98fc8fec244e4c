//! DNS query-log filtering.
//!
//! Each line carrying an `A` query is either suppressed (`blocked: <domain>`)
//! or rewritten into a summary with the client's reverse-resolved name:
//!
//! ```text
//! 16-Oct-2026 10:00:01.123 client: localhost, query: shavar.prod.mozaws.net
//! ```
//!
//! Reverse lookups for consecutive lines run concurrently up to a bound, but
//! output is always written in input order.

use futures_util::StreamExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::OnceLock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_stream::wrappers::SplitStream;
use tracing::{debug, info, warn};

use crate::domain::Domain;
use crate::error::PolicyError;
use crate::index::BlockIndex;
use crate::reverse::ReverseCache;
use crate::Result;

/// What to do with lines that carry no `A` query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedLines {
    /// Leave them out of the output.
    #[default]
    Drop,
    /// Copy them to the output unchanged.
    Pass,
}

/// The result of filtering one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filtered {
    /// The queried name is blocked: `blocked: <domain>`.
    Blocked(String),
    /// `<timestamp> client: <hostname>, query: <domain>`.
    Summary(String),
    /// A line without an `A` query, copied verbatim.
    Passed(String),
    /// A line without an `A` query, left out.
    Dropped,
    /// The query matched but the client fields did not.
    Malformed,
}

impl Filtered {
    /// The output line, if any.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Blocked(line) | Self::Summary(line) | Self::Passed(line) => Some(line),
            Self::Dropped | Self::Malformed => None,
        }
    }
}

/// Counters for one filter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    /// Lines read.
    pub lines: usize,
    /// Lines suppressed as blocked.
    pub blocked: usize,
    /// Lines rewritten into summaries.
    pub summarised: usize,
    /// Unmatched lines passed through.
    pub passed: usize,
    /// Unmatched lines dropped.
    pub dropped: usize,
    /// Malformed lines.
    pub malformed: usize,
    /// External reverse lookups issued.
    pub reverse_lookups: usize,
}

impl FilterStats {
    fn record(&mut self, filtered: &Filtered) {
        self.lines += 1;
        match filtered {
            Filtered::Blocked(_) => self.blocked += 1,
            Filtered::Summary(_) => self.summarised += 1,
            Filtered::Passed(_) => self.passed += 1,
            Filtered::Dropped => self.dropped += 1,
            Filtered::Malformed => self.malformed += 1,
        }
    }
}

/// `query: <name> IN A`, with `AAAA` and other types excluded.
fn query_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"query:\s((?:[A-Za-z0-9_](?:[A-Za-z0-9_-]*[A-Za-z0-9_])?\.)+[A-Za-z0-9_](?:[A-Za-z0-9_-]*[A-Za-z0-9_])?)\.?\sIN\sA(?:\s|$)",
        )
        .expect("query pattern is valid")
    })
}

/// Timestamp, then `client [@0x...] <ip>#<port> ... query: <name> IN A`.
fn client_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(.+?)\sclient\s(?:@\S+\s)?([0-9A-Fa-f:.]+)#\d+\s.*?query:\s\S+\sIN\sA(?:\s|$)",
        )
        .expect("client pattern is valid")
    })
}

fn queried_name(line: &str) -> Option<&str> {
    query_pattern()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn client_fields(line: &str) -> Option<(&str, IpAddr)> {
    let caps = client_pattern().captures(line)?;
    let timestamp = caps.get(1)?.as_str();
    let ip = caps.get(2)?.as_str().parse().ok()?;
    Some((timestamp, ip))
}

/// Filters query-log lines against a [`BlockIndex`].
#[derive(Debug)]
pub struct LogFilter<'a> {
    blocks: &'a BlockIndex,
    cache: &'a ReverseCache,
    unmatched: UnmatchedLines,
}

impl<'a> LogFilter<'a> {
    /// Create a filter that drops unmatched lines.
    #[must_use]
    pub const fn new(blocks: &'a BlockIndex, cache: &'a ReverseCache) -> Self {
        Self {
            blocks,
            cache,
            unmatched: UnmatchedLines::Drop,
        }
    }

    /// Choose what happens to lines without an `A` query.
    #[must_use]
    pub const fn unmatched(mut self, unmatched: UnmatchedLines) -> Self {
        self.unmatched = unmatched;
        self
    }

    /// Filter a single line. `line_number` is only used for reporting.
    ///
    /// Blocked names never trigger a reverse lookup.
    pub async fn filter_line(&self, line_number: usize, line: &str) -> Filtered {
        let Some(name) = queried_name(line) else {
            return match self.unmatched {
                UnmatchedLines::Pass => Filtered::Passed(line.to_owned()),
                UnmatchedLines::Drop => Filtered::Dropped,
            };
        };

        let domain = match Domain::parse(name) {
            Ok(domain) => domain,
            Err(e) => {
                debug!(line = line_number, error = %e, "unusable query name");
                return self.malformed(line_number, line);
            }
        };

        if let Some(rule) = self.blocks.blocked_by(&domain) {
            debug!(domain = %domain, by = %rule, "suppressed query");
            return Filtered::Blocked(format!("blocked: {domain}"));
        }

        let Some((timestamp, ip)) = client_fields(line) else {
            return self.malformed(line_number, line);
        };
        let hostname = self.cache.hostname(ip).await;
        Filtered::Summary(format!("{timestamp} client: {hostname}, query: {domain}"))
    }

    /// Filter a whole log.
    ///
    /// Up to `concurrency` lines are in flight at once (1 means strictly
    /// sequential); output lines are written in input order. Read and write
    /// errors abort the run, per-line problems never do. Bytes that are not
    /// UTF-8 are replaced with U+FFFD.
    pub async fn run<R, W>(&self, reader: R, mut writer: W, concurrency: usize) -> Result<FilterStats>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let lookups_before = self.cache.lookups();
        let mut stats = FilterStats::default();

        let mut results = std::pin::pin!(SplitStream::new(reader.split(b'\n'))
            .enumerate()
            .map(|(index, line)| async move {
                let line = decode_line(index + 1, line?);
                Ok::<_, PolicyError>(self.filter_line(index + 1, &line).await)
            })
            .buffered(concurrency.max(1)));

        while let Some(filtered) = results.next().await {
            let filtered = filtered?;
            stats.record(&filtered);
            if let Some(out) = filtered.output() {
                writer.write_all(out.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
        }
        writer.flush().await?;

        stats.reverse_lookups = self.cache.lookups() - lookups_before;
        info!(
            lines = stats.lines,
            blocked = stats.blocked,
            summarised = stats.summarised,
            malformed = stats.malformed,
            lookups = stats.reverse_lookups,
            "query log filtered"
        );
        Ok(stats)
    }

    fn malformed(&self, line_number: usize, line: &str) -> Filtered {
        let err = PolicyError::MalformedLogLine {
            line_number,
            line: line.to_owned(),
        };
        warn!(error = %err, "skipping query log line");
        Filtered::Malformed
    }
}

/// One raw log line as text, without its line terminator.
fn decode_line(line_number: usize, mut bytes: Vec<u8>) -> String {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    String::from_utf8(bytes).unwrap_or_else(|e| {
        debug!(line = line_number, "query log line is not valid UTF-8");
        String::from_utf8_lossy(e.as_bytes()).into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedResolver;
    use std::sync::Arc;
    use std::time::Duration;

    const MOZAWS: &str = "16-Oct-2026 10:00:01.123 client 127.0.0.1#53211 (shavar.prod.mozaws.net): query: shavar.prod.mozaws.net IN A + (127.0.0.1)";

    fn d(s: &str) -> Domain {
        Domain::parse(s).unwrap()
    }

    fn query(time: &str, ip: &str, name: &str) -> String {
        format!("16-Oct-2026 {time} client @0x7f3a2c0 {ip}#40001 ({name}): query: {name} IN A +E(0)K (10.0.0.1)")
    }

    #[tokio::test]
    async fn summary_uses_seeded_hostname() {
        let resolver = Arc::new(ScriptedResolver::new());
        let cache = ReverseCache::new(resolver.clone());
        cache.seed("127.0.0.1".parse().unwrap(), "localhost");
        let blocks = BlockIndex::new();

        let filtered = LogFilter::new(&blocks, &cache).filter_line(1, MOZAWS).await;
        assert_eq!(
            filtered.output(),
            Some("16-Oct-2026 10:00:01.123 client: localhost, query: shavar.prod.mozaws.net")
        );
        assert_eq!(resolver.reverse_calls(), 0);
    }

    #[tokio::test]
    async fn blocked_query_is_suppressed_without_lookup() {
        let resolver = Arc::new(ScriptedResolver::new().host("10.0.0.5", "tv.lan"));
        let cache = ReverseCache::new(resolver.clone());
        let mut blocks = BlockIndex::new();
        blocks.block(&d("ads.example"), "");

        let line = query("10:00:02.000", "10.0.0.5", "www.ads.example");
        let filtered = LogFilter::new(&blocks, &cache).filter_line(1, &line).await;
        assert_eq!(filtered, Filtered::Blocked("blocked: www.ads.example".into()));
        assert_eq!(resolver.reverse_calls(), 0);
        assert_eq!(resolver.forward_calls(), 0);
    }

    #[tokio::test]
    async fn unmatched_lines_follow_policy() {
        let cache = ReverseCache::new(Arc::new(ScriptedResolver::new()));
        let blocks = BlockIndex::new();
        let aaaa = "16-Oct-2026 10:00:03.000 client 10.0.0.5#1 (x.example): query: x.example IN AAAA +";

        let drop = LogFilter::new(&blocks, &cache);
        assert_eq!(drop.filter_line(1, aaaa).await, Filtered::Dropped);

        let pass = LogFilter::new(&blocks, &cache).unmatched(UnmatchedLines::Pass);
        assert_eq!(pass.filter_line(1, aaaa).await.output(), Some(aaaa));
    }

    #[tokio::test]
    async fn missing_client_is_malformed() {
        let cache = ReverseCache::new(Arc::new(ScriptedResolver::new()));
        let blocks = BlockIndex::new();
        let filtered = LogFilter::new(&blocks, &cache)
            .filter_line(7, "garbage query: ok.example IN A +")
            .await;
        assert_eq!(filtered, Filtered::Malformed);
    }

    #[tokio::test]
    async fn ipv6_client_is_summarised() {
        let resolver = Arc::new(ScriptedResolver::new().host("fd00::5", "phone.lan"));
        let cache = ReverseCache::new(resolver);
        let blocks = BlockIndex::new();

        let line = query("10:00:04.000", "fd00::5", "example.org");
        let filtered = LogFilter::new(&blocks, &cache).filter_line(1, &line).await;
        assert_eq!(
            filtered.output(),
            Some("16-Oct-2026 10:00:04.000 client: phone.lan, query: example.org")
        );
    }

    #[tokio::test]
    async fn run_preserves_input_order() {
        let resolver = Arc::new(
            ScriptedResolver::new()
                .host("10.0.0.1", "slow.lan")
                .delay("10.0.0.1", Duration::from_millis(80))
                .host("10.0.0.2", "fast.lan"),
        );
        let cache = ReverseCache::new(resolver.clone());
        let mut blocks = BlockIndex::new();
        blocks.block(&d("tracker.example"), "");

        let input = [
            query("10:00:00.001", "10.0.0.1", "one.example"),
            query("10:00:00.002", "10.0.0.2", "two.example"),
            query("10:00:00.003", "10.0.0.2", "tracker.example"),
            "not a query line".to_owned(),
            "16-Oct-2026 10:00:00.004 queries: query: broken.example IN A +".to_owned(),
            query("10:00:00.005", "10.0.0.1", "three.example"),
        ]
        .join("\n");

        let mut output = Vec::new();
        let stats = LogFilter::new(&blocks, &cache)
            .run(input.as_bytes(), &mut output, 4)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap().lines().collect::<Vec<_>>(),
            [
                "16-Oct-2026 10:00:00.001 client: slow.lan, query: one.example",
                "16-Oct-2026 10:00:00.002 client: fast.lan, query: two.example",
                "blocked: tracker.example",
                "16-Oct-2026 10:00:00.005 client: slow.lan, query: three.example",
            ]
        );
        assert_eq!(
            stats,
            FilterStats {
                lines: 6,
                blocked: 1,
                summarised: 3,
                passed: 0,
                dropped: 1,
                malformed: 1,
                reverse_lookups: 2,
            }
        );
        assert_eq!(resolver.reverse_calls(), 2);
    }

    #[tokio::test]
    async fn sequential_run_matches_concurrent_run() {
        let resolver = Arc::new(
            ScriptedResolver::new()
                .host("10.0.0.1", "a.lan")
                .delay("10.0.0.1", Duration::from_millis(20))
                .host("10.0.0.2", "b.lan"),
        );
        let blocks = BlockIndex::new();
        let input = [
            query("10:00:00.001", "10.0.0.1", "one.example"),
            query("10:00:00.002", "10.0.0.2", "two.example"),
        ]
        .join("\n");

        let mut sequential = Vec::new();
        let cache = ReverseCache::new(resolver.clone());
        LogFilter::new(&blocks, &cache)
            .run(input.as_bytes(), &mut sequential, 1)
            .await
            .unwrap();

        let mut concurrent = Vec::new();
        let cache = ReverseCache::new(resolver);
        LogFilter::new(&blocks, &cache)
            .run(input.as_bytes(), &mut concurrent, 8)
            .await
            .unwrap();

        assert_eq!(sequential, concurrent);
    }

    #[tokio::test]
    async fn undecodable_line_does_not_stop_the_run() {
        let cache = ReverseCache::new(Arc::new(ScriptedResolver::new()));
        cache.seed("127.0.0.1".parse().unwrap(), "localhost");
        let blocks = BlockIndex::new();

        let mut input = b"\xff\xfe not text\r\n".to_vec();
        input.extend_from_slice(
            b"16-Oct-2026 10:00:05.000 client 127.0.0.1#5 (a.example): query: a.example IN A +\r\n",
        );

        let mut output = Vec::new();
        let stats = LogFilter::new(&blocks, &cache)
            .run(input.as_slice(), &mut output, 2)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "16-Oct-2026 10:00:05.000 client: localhost, query: a.example\n"
        );
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.summarised, 1);
    }

    #[test]
    fn decoding_strips_carriage_return_and_replaces_bad_bytes() {
        assert_eq!(decode_line(1, b"plain\r".to_vec()), "plain");
        assert_eq!(decode_line(2, b"a\xffb".to_vec()), "a\u{fffd}b");
    }
}
