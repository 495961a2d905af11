//! CLI help output specs.

use crate::prelude::*;

#[test]
fn reasonchip_help_shows_usage() {
    cli().args(["--help"]).assert().passes().stdout_has("Usage:");
}

#[test]
fn reasonchip_help_lists_every_subcommand() {
    cli()
        .args(["--help"])
        .assert()
        .passes()
        .stdout_has("run")
        .stdout_has("worker")
        .stdout_has("serve")
        .stdout_has("dispatch");
}

#[test]
fn reasonchip_run_help_shows_usage() {
    cli().args(["run", "--help"]).assert().passes().stdout_has("Usage:");
}

#[test]
fn missing_subcommand_is_a_command_line_error() {
    cli().assert().fails_with(2);
}
