//! Relative name resolution, exercised through the CLI rather than
//! the engine crate directly (which already covers `resolve()` with
//! unit tests and proptest properties).

use crate::prelude::*;

#[test]
fn a_sibling_workflow_resolves_via_a_single_leading_dot() {
    cli()
        .args(["run", "demo.chain", "--set", "name=relative"])
        .assert()
        .passes()
        .stdout_has("hello, relative");
}
