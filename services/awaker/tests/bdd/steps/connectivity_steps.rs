//! BDD step definitions for connectivity feature

use std::sync::Arc;
use std::time::Duration;

use cucumber::{given, then, when};

use awaker::config::ConnectivityConfig;
use awaker::connectivity::{ConnectivityMachine, ConnectivityState};
use awaker::health::{DbStatus, HttpHealthProbe, Probe};
use awaker::io::{HttpClient, HttpResponse};
use awaker::AwakerError;

use crate::world::AwakerWorld;

const HEALTHY: &str =
    r#"{"status":"healthy","database":"connected","totalTables":12,"accessibleTables":12}"#;
const DEGRADED: &str =
    r#"{"status":"degraded","database":"connected","totalTables":12,"accessibleTables":8}"#;

/// A mock HTTP client that returns a fixed response for GET requests
struct FixedGetClient {
    response: Result<HttpResponse, String>,
}

#[async_trait::async_trait]
impl HttpClient for FixedGetClient {
    async fn get(&self, _url: &str) -> awaker::Result<HttpResponse> {
        match &self.response {
            Ok(r) => Ok(r.clone()),
            Err(msg) => Err(AwakerError::Http(msg.clone())),
        }
    }
}

fn parse_state(s: &str) -> ConnectivityState {
    match s.trim() {
        "checking" => ConnectivityState::Checking,
        "connected" => ConnectivityState::Connected,
        "disconnected" => ConnectivityState::Disconnected,
        "reconnecting" => ConnectivityState::Reconnecting,
        "recovered" => ConnectivityState::Recovered,
        other => panic!("Unknown state: {}", other),
    }
}

async fn run_probe(world: &mut AwakerWorld, response: Result<HttpResponse, String>) {
    let probe = HttpHealthProbe::new(
        "http://api.test",
        Duration::from_secs(5),
        Arc::new(FixedGetClient { response }),
    );
    let outcome = probe.probe().await;
    world.db_status = Some(DbStatus::from_outcome(&outcome));

    let machine = world.machine.as_mut().expect("monitor not set");
    machine.apply_probe(&outcome, 0);
    world.states_seen.push(machine.state());
}

fn ok(body: &str) -> Result<HttpResponse, String> {
    Ok(HttpResponse {
        status: 200,
        body: body.to_string(),
    })
}

fn unavailable() -> Result<HttpResponse, String> {
    Ok(HttpResponse {
        status: 503,
        body: "Service Unavailable".to_string(),
    })
}

#[given("a fresh connectivity monitor")]
fn fresh_monitor(world: &mut AwakerWorld) {
    let machine = ConnectivityMachine::new(ConnectivityConfig::default());
    world.states_seen = vec![machine.state()];
    world.machine = Some(machine);
}

#[when("a probe succeeds")]
async fn probe_succeeds(world: &mut AwakerWorld) {
    run_probe(world, ok(HEALTHY)).await;
}

#[when("a probe reports a degraded database")]
async fn probe_degraded(world: &mut AwakerWorld) {
    run_probe(world, ok(DEGRADED)).await;
}

#[when("a probe fails")]
async fn probe_fails(world: &mut AwakerWorld) {
    run_probe(world, unavailable()).await;
}

#[when("a probe cannot reach the server")]
async fn probe_unreachable(world: &mut AwakerWorld) {
    run_probe(world, Err("connection refused".to_string())).await;
}

#[when(expr = "{int} probes fail")]
async fn probes_fail(world: &mut AwakerWorld, count: u32) {
    for _ in 0..count {
        run_probe(world, unavailable()).await;
    }
}

#[when("the user retries and the probe succeeds")]
async fn manual_retry_succeeds(world: &mut AwakerWorld) {
    let machine = world.machine.as_mut().expect("monitor not set");
    machine.begin_manual_retry();
    world.states_seen.push(machine.state());
    run_probe(world, ok(HEALTHY)).await;
}

#[when("the recovered window elapses")]
fn recovered_window_elapses(world: &mut AwakerWorld) {
    let machine = world.machine.as_mut().expect("monitor not set");
    machine.expire_recovered();
    world.states_seen.push(machine.state());
}

#[then(expr = "the connectivity state is {string}")]
fn state_is(world: &mut AwakerWorld, expected: String) {
    let machine = world.machine.as_ref().expect("monitor not set");
    assert_eq!(machine.state(), parse_state(&expected));
}

#[then(expr = "the retry count is {int}")]
fn retry_count_is(world: &mut AwakerWorld, expected: u32) {
    let machine = world.machine.as_ref().expect("monitor not set");
    assert_eq!(machine.status().retry_count, expected);
}

#[then(expr = "the next probe is due in {int} seconds")]
fn next_probe_due(world: &mut AwakerWorld, seconds: u64) {
    let machine = world.machine.as_ref().expect("monitor not set");
    assert_eq!(machine.next_poll_delay(), Duration::from_secs(seconds));
}

#[then(expr = "the recovered state expires after {int} seconds")]
fn recovered_expires(world: &mut AwakerWorld, seconds: u64) {
    let machine = world.machine.as_ref().expect("monitor not set");
    assert_eq!(machine.recovered_expiry(), Some(Duration::from_secs(seconds)));
}

#[then(expr = "the states seen are {string}")]
fn states_seen(world: &mut AwakerWorld, expected: String) {
    let expected: Vec<_> = expected.split(',').map(parse_state).collect();
    assert_eq!(world.states_seen, expected);
}

#[then(expr = "the database status is {string}")]
fn database_status(world: &mut AwakerWorld, expected: String) {
    let status = world.db_status.expect("no probe ran");
    assert_eq!(status.to_string(), expected);
}
