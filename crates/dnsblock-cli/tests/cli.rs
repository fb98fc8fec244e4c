//! End-to-end tests for the `dnsblock` binary.
//!
//! Every run works inside a temporary directory with alias following
//! disabled, so nothing touches the network.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn workspace(blocked: &str, allowed: Option<&str>) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hosts_blocked.txt"), blocked).unwrap();
    if let Some(allowed) = allowed {
        fs::write(dir.path().join("hosts_allowed.txt"), allowed).unwrap();
    }
    dir
}

fn dnsblock(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dnsblock").unwrap();
    cmd.current_dir(dir)
        .env("DNSBLOCK_CONFIG", dir.join("config.toml"))
        .env_remove("RUST_LOG")
        .args(["--no-aliases", "--no-color"]);
    cmd
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

#[test]
fn simplify_prunes_and_orders_the_block_list() {
    let dir = workspace("b.example\nads.b.example\na.example\nb.example\n", None);

    dnsblock(dir.path()).arg("simplify").assert().success();

    assert_eq!(read(dir.path(), "hosts_blocked.txt"), "a.example\nb.example\n");
}

#[test]
fn simplify_drops_allowed_names() {
    let dir = workspace("tracker.example\ncdn.example\n", Some("cdn.example\n"));

    dnsblock(dir.path()).arg("simplify").assert().success();

    assert_eq!(read(dir.path(), "hosts_blocked.txt"), "tracker.example\n");
}

#[test]
fn add_reports_allow_list_conflicts() {
    let dir = workspace("ads.example\n", Some("good.example\n"));

    dnsblock(dir.path())
        .args(["add", "good.example", "tracker.example", "www.ads.example"])
        .assert()
        .success()
        .stdout(predicate::str::contains("good.example not blocked: allowed by good.example"))
        .stdout(predicate::str::contains("blocked tracker.example"))
        .stdout(predicate::str::contains("www.ads.example is already covered by ads.example"));

    assert_eq!(
        read(dir.path(), "hosts_blocked.txt"),
        "ads.example\ntracker.example\n"
    );
}

#[test]
fn add_rejects_invalid_names_without_writing() {
    let dir = workspace("ads.example\n", None);

    dnsblock(dir.path())
        .args(["add", "fine.example", "not a domain"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid domain syntax"));

    assert_eq!(read(dir.path(), "hosts_blocked.txt"), "ads.example\n");
}

#[test]
fn allow_writes_the_allow_list() {
    let dir = workspace("ads.example\n", Some("b.example\n"));

    dnsblock(dir.path())
        .args(["allow", "a.example"])
        .assert()
        .success()
        .stdout(predicate::str::contains("allowed a.example"));

    assert_eq!(read(dir.path(), "hosts_allowed.txt"), "a.example\nb.example\n");
}

#[test]
fn allow_drops_alias_derived_entries_from_the_allow_list() {
    let dir = workspace(
        "ads.example\n",
        Some("a.example # shop\nold.edgecdn.net # alias of a.example # shop\n"),
    );

    dnsblock(dir.path()).args(["allow", "b.example"]).assert().success();

    assert_eq!(
        read(dir.path(), "hosts_allowed.txt"),
        "a.example # shop\nb.example\n"
    );
}

#[test]
fn zone_writes_one_stanza_per_rule() {
    let dir = workspace("ads.example\ntracker.example\n", None);

    dnsblock(dir.path()).arg("zone").assert().success();

    assert_eq!(
        read(dir.path(), "zones.adblock"),
        "zone \"ads.example\" { type master; file \"/etc/bind/adblock/db.adblock\"; };\n\
         zone \"tracker.example\" { type master; file \"/etc/bind/adblock/db.adblock\"; };\n"
    );
}

#[test]
fn addgen_blocks_then_regenerates_zones() {
    let dir = workspace("ads.example\n", None);

    dnsblock(dir.path())
        .args(["addgen", "tracker.example", "--out", "custom.zones"])
        .assert()
        .success();

    assert_eq!(read(dir.path(), "hosts_blocked.txt"), "ads.example\ntracker.example\n");
    let zones = read(dir.path(), "custom.zones");
    assert!(zones.contains("zone \"tracker.example\""));
    assert!(!dir.path().join("zones.adblock").exists());
}

#[test]
fn rpz_points_rules_at_the_root() {
    let dir = workspace("ads.example\n", None);

    dnsblock(dir.path()).arg("rpz").assert().success();

    let rpz = read(dir.path(), "db.rpz.adblock");
    assert!(rpz.starts_with("$TTL"));
    assert!(rpz.contains("SOA"));
    assert!(rpz.contains("ads.example.rpz.adblock."));
    assert!(rpz.contains("*.ads.example.rpz.adblock."));
    assert!(rpz.contains("CNAME"));
}

#[test]
fn list_prints_block_or_allow_rules() {
    let dir = workspace("z.example\nads.z.example\n", Some("ok.example\n"));

    dnsblock(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout("z.example\n");

    dnsblock(dir.path())
        .args(["list", "--allowed"])
        .assert()
        .success()
        .stdout("ok.example\n");
}

#[test]
fn check_reports_json_verdicts() {
    let dir = workspace("ads.example\n", None);

    dnsblock(dir.path())
        .args(["--output", "json", "check", "www.ads.example", "news.example"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"verdict\": \"blocked\""))
        .stdout(predicate::str::contains("\"verdict\": \"unlisted\""));
}

#[test]
fn advise_finds_crowded_parents() {
    let blocked: String = (0..7).map(|i| format!("a{i}.cdn.example\n")).collect();
    let dir = workspace(&blocked, None);

    dnsblock(dir.path())
        .args(["advise", "--threshold", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cdn.example"));

    dnsblock(dir.path())
        .args(["advise", "--threshold", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No node has more than 10"));
}

#[test]
fn processlog_summarises_and_suppresses() {
    let dir = workspace("ads.example\n", None);
    let log = "\
16-Oct-2026 10:00:01.123 client 127.0.0.1#53211 (shavar.prod.mozaws.net): query: shavar.prod.mozaws.net IN A + (127.0.0.1)
16-Oct-2026 10:00:02.000 client 127.0.0.1#53212 (www.ads.example): query: www.ads.example IN A + (127.0.0.1)
16-Oct-2026 10:00:03.000 client 127.0.0.1#53213 (x.example): query: x.example IN AAAA + (127.0.0.1)
";
    fs::write(dir.path().join("query.log"), log).unwrap();

    dnsblock(dir.path())
        .args(["processlog", "query.log"])
        .assert()
        .success()
        .stdout(
            "16-Oct-2026 10:00:01.123 client: localhost, query: shavar.prod.mozaws.net\n\
             blocked: www.ads.example\n",
        );
}

#[test]
fn processlog_can_pass_unmatched_lines() {
    let dir = workspace("ads.example\n", None);
    let aaaa = "16-Oct-2026 10:00:03.000 client 127.0.0.1#53213 (x.example): query: x.example IN AAAA + (127.0.0.1)";
    fs::write(dir.path().join("query.log"), format!("{aaaa}\n")).unwrap();

    dnsblock(dir.path())
        .args(["processlog", "--pass-unmatched", "query.log"])
        .assert()
        .success()
        .stdout(format!("{aaaa}\n"));
}

#[test]
fn missing_block_list_is_fatal() {
    let dir = tempfile::tempdir().unwrap();

    dnsblock(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read block list"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = workspace("ads.example\n", None);
    fs::write(dir.path().join("config.toml"), "[log_filter]\nconcurrency = 0\n").unwrap();

    dnsblock(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency must be at least 1"));
}
