//! Tests for check-proxy and top-level parsing.

use super::parse;
use crate::cli::commands::run_check_proxy;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_check_proxy() {
    match parse(&["ytd", "check-proxy", "http://10.0.0.1:3128"]) {
        CliCommand::CheckProxy { proxy } => assert_eq!(proxy, "http://10.0.0.1:3128"),
        _ => panic!("expected CheckProxy"),
    }
}

#[test]
fn check_proxy_verdicts() {
    assert!(run_check_proxy("http://10.0.0.1:3128"));
    assert!(run_check_proxy(""));
    assert!(!run_check_proxy("10.0.0.1:3128"));
}

#[test]
fn cli_parse_unknown_subcommand_fails() {
    assert!(Cli::try_parse_from(["ytd", "pause", "1"]).is_err());
    assert!(Cli::try_parse_from(["ytd"]).is_err());
}
