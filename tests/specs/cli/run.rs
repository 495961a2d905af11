//! `reasonchip run` specs: the embedded happy path.

use crate::prelude::*;

#[test]
fn runs_the_built_in_demo_hello_workflow() {
    cli()
        .args(["run", "demo.hello", "--set", "name=ada"])
        .assert()
        .passes()
        .stdout_has("hello, ada");
}

#[test]
fn defaults_to_world_with_no_variables() {
    cli().args(["run", "demo.hello"]).assert().passes().stdout_has("hello, world");
}

#[test]
fn vars_file_and_set_compose_right_biased() {
    let dir = tempfile::tempdir().expect("tempdir");
    let vars_path = dir.path().join("vars.json");
    std::fs::write(&vars_path, r#"{"name": "from-file"}"#).expect("write vars file");

    // --set is applied after --vars, so it wins.
    cli()
        .args(["run", "demo.hello", "--vars", vars_path.to_str().expect("utf8 path"), "--set", "name=from-set"])
        .assert()
        .passes()
        .stdout_has("hello, from-set");
}

#[test]
fn an_unknown_collection_name_is_module_not_found() {
    cli()
        .args(["run", "demo.hello", "--collection", "nope=/tmp/wherever"])
        .assert()
        .fails_with(4);
}

#[test]
fn a_malformed_collection_flag_is_a_command_line_error() {
    cli().args(["run", "demo.hello", "--collection", "no-equals-sign"]).assert().fails_with(1);
}

#[test]
fn a_failing_workflow_exits_with_the_error_code() {
    cli().args(["run", "demo.fail"]).assert().fails_with(5);
}
