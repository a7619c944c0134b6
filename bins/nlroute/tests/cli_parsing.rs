//! CLI argument parsing tests for the nlroute command.
//!
//! These tests verify that command-line arguments are correctly parsed
//! without requiring network access or root privileges.

use assert_cmd::Command;
use predicates::prelude::*;

fn nlroute_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nlroute"))
}

mod global_flags {
    use super::*;

    #[test]
    fn test_help() {
        nlroute_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Routing control over rtnetlink"))
            .stdout(predicate::str::contains("--json"));
    }

    #[test]
    fn test_version() {
        nlroute_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("nlroute"));
    }

    #[test]
    fn test_invalid_subcommand() {
        nlroute_cmd()
            .arg("invalid_command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn test_missing_subcommand() {
        nlroute_cmd().assert().failure();
    }
}

mod addr_command {
    use super::*;

    #[test]
    fn test_addr_help() {
        nlroute_cmd()
            .args(["addr", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Manage IP addresses"));
    }

    #[test]
    fn test_addr_add_requires_dev() {
        nlroute_cmd()
            .args(["addr", "add", "5.0.2.4/32"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--dev"));
    }

    #[test]
    fn test_addr_add_rejects_bad_prefix() {
        nlroute_cmd()
            .args(["addr", "add", "5.0.2.4/40", "--dev", "lo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid prefix length"));
    }

    #[test]
    fn test_addr_alias() {
        nlroute_cmd().args(["a", "del", "--help"]).assert().success();
    }
}

mod route_command {
    use super::*;

    #[test]
    fn test_route_add_help() {
        nlroute_cmd()
            .args(["route", "add", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--src"))
            .stdout(predicate::str::contains("--via"))
            .stdout(predicate::str::contains("--mtu"))
            .stdout(predicate::str::contains("--advmss"))
            .stdout(predicate::str::contains("--exclusive"));
    }

    #[test]
    fn test_route_add_requires_src() {
        nlroute_cmd()
            .args(["route", "add", "10.8.0.0/16"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--src"));
    }

    #[test]
    fn test_route_get_rejects_bad_address() {
        nlroute_cmd()
            .args(["route", "get", "not-an-ip"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid"));
    }

    #[test]
    fn test_route_del_has_no_exclusive() {
        nlroute_cmd()
            .args(["route", "del", "10.8.0.0/16", "--src", "10.0.0.1", "--exclusive"])
            .assert()
            .failure();
    }
}

mod rule_command {
    use super::*;

    #[test]
    fn test_rule_add_requires_table() {
        nlroute_cmd()
            .args(["rule", "add"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--table"));
    }

    #[test]
    fn test_rule_del_help() {
        nlroute_cmd()
            .args(["rule", "del", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--priority"));
    }
}

mod show_and_monitor {
    use super::*;

    #[test]
    fn test_show_rejects_unknown_object() {
        nlroute_cmd()
            .args(["show", "routes"])
            .assert()
            .failure();
    }

    #[test]
    fn test_monitor_rejects_unknown_event_type() {
        nlroute_cmd()
            .args(["monitor", "neigh"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }

    #[test]
    fn test_monitor_help() {
        nlroute_cmd()
            .args(["monitor", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--timestamp"));
    }
}
