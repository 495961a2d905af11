//! `reasonchip dispatch` specs, including an end-to-end broker+worker
//! round trip over the wire, rather than in-process.

use std::process::{Child, Command as StdCommand};
use std::time::Duration;

use crate::prelude::*;

#[test]
fn exactly_one_of_broker_or_amqp_url_is_required() {
    cli()
        .args(["dispatch", "demo.hello"])
        .assert()
        .fails_with(1)
        .stderr_has("one of --broker or --amqp-url is required");
}

#[test]
fn broker_and_amqp_url_together_is_a_clap_usage_error() {
    cli()
        .args(["dispatch", "demo.hello", "--broker", "tcp://x", "--amqp-url", "amqp://x"])
        .assert()
        .fails_with(2);
}

/// Kills its wrapped child on drop so a failing assertion above this
/// guard in a test body doesn't leak a broker/worker process.
struct KillOnDrop(Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

#[test]
fn a_dispatched_run_reaches_a_worker_through_the_broker_and_returns_its_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    let worker_sock = dir.path().join("worker.sock");
    let client_sock = dir.path().join("client.sock");

    let broker_bin = assert_cmd::cargo::cargo_bin("reasonchip-broker");
    let worker_listen = format!("socket://{}", worker_sock.display());
    let client_listen = format!("socket://{}", client_sock.display());

    let broker = KillOnDrop(
        StdCommand::new(broker_bin)
            .args(["--worker-listen", &worker_listen, "--client-listen", &client_listen])
            .spawn()
            .expect("spawn reasonchip-broker"),
    );

    // Give the broker a moment to bind both sockets.
    std::thread::sleep(Duration::from_millis(300));

    let reasonchip_bin = assert_cmd::cargo::cargo_bin("reasonchip");
    let worker = KillOnDrop(
        StdCommand::new(&reasonchip_bin)
            .args(["worker", "--broker", &worker_listen, "--tasks", "2"])
            .spawn()
            .expect("spawn reasonchip worker"),
    );

    // Give the worker a moment to connect and REGISTER.
    std::thread::sleep(Duration::from_millis(300));

    cli()
        .args(["dispatch", "demo.hello", "--broker", &client_listen, "--set", "name=dispatched", "--timeout-secs", "10"])
        .assert()
        .passes()
        .stdout_has("hello, dispatched");

    drop(worker);
    drop(broker);
}
