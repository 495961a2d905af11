//! A workflow requesting a restart is rebound and run as a fresh
//! top-level call, exercised through the CLI.

use crate::prelude::*;

#[test]
fn a_restart_rebinds_into_the_requested_workflow() {
    cli()
        .args(["run", "demo.restart", "--set", "name=restarted"])
        .assert()
        .passes()
        .stdout_has("hello, restarted");
}
