//! BDD step definitions for the probe run feature

use std::sync::Arc;
use std::time::Duration;

use cucumber::{given, then, when};

use watchpost::config::{Config, SuppressionConfig};
use watchpost::notifier::Notifier;
use watchpost::{FailureRecord, WatchpostBuilder};

use crate::world::{FixedClock, Scripted, WatchpostWorld};

#[given(expr = "endpoint {string} answers with status {int}")]
fn endpoint_answers(world: &mut WatchpostWorld, endpoint: String, status: u16) {
    world.script(
        &endpoint,
        Scripted::Respond {
            status,
            body: String::new(),
        },
    );
}

#[given(expr = "endpoint {string} answers with status {int} and body {string}")]
fn endpoint_answers_with_body(
    world: &mut WatchpostWorld,
    endpoint: String,
    status: u16,
    body: String,
) {
    world.script(&endpoint, Scripted::Respond { status, body });
}

#[given(expr = "endpoint {string} times out on connect")]
fn endpoint_connect_timeout(world: &mut WatchpostWorld, endpoint: String) {
    world.script(&endpoint, Scripted::ConnectTimeout);
}

#[given(expr = "endpoint {string} times out on read")]
fn endpoint_read_timeout(world: &mut WatchpostWorld, endpoint: String) {
    world.script(&endpoint, Scripted::ReadTimeout);
}

#[given(expr = "endpoint {string} requires the text {string}")]
fn endpoint_requires_text(world: &mut WatchpostWorld, endpoint: String, text: String) {
    world
        .rules
        .entry(endpoint)
        .or_default()
        .required_strings
        .push(text);
}

#[given(expr = "{int} workers")]
fn workers(world: &mut WatchpostWorld, count: usize) {
    world.workers = Some(count);
}

#[when(expr = "a run is performed at time {int}")]
async fn run_performed(world: &mut WatchpostWorld, now: i64) {
    let config = Config {
        endpoints: world.endpoints.clone(),
        workers: world.workers.unwrap_or(1),
        rules: world.rules.clone(),
        suppression: world.window_seconds.map(|seconds| SuppressionConfig {
            window: Duration::from_secs(seconds),
            state_file: "suppression.csv".into(),
        }),
        ..Config::default()
    };

    let notifier: Arc<dyn Notifier> = Arc::new(world.notifier.clone());
    let watchpost = WatchpostBuilder::new(config)
        .with_http_client(Arc::new(world.http.clone()))
        .with_state_backend(Arc::new(world.state.clone()))
        .with_notifiers(vec![notifier])
        .with_clock(Arc::new(FixedClock(now)))
        .build()
        .await
        .expect("watchpost should build");

    world.last_report = Some(watchpost.run_once().await.expect("run should complete"));
}

#[then(expr = "the report should count {int} endpoints")]
fn report_counts(world: &mut WatchpostWorld, total: usize) {
    let report = world.last_report.as_ref().expect("no run performed");
    assert_eq!(report.total, total);
}

#[then(expr = "the report should list {string} as down with reason {string}")]
fn report_lists(world: &mut WatchpostWorld, endpoint: String, reason: String) {
    let report = world.last_report.as_ref().expect("no run performed");
    let reasons: Vec<(&str, &str)> = report
        .failures
        .iter()
        .map(|f| (f.endpoint.as_str(), f.reason.as_str()))
        .collect();
    assert_eq!(
        reasons,
        vec![(endpoint.as_str(), reason.as_str())],
        "unexpected failures: {:?}",
        report.failures
    );
}

#[then("the report should have no failures")]
fn report_has_no_failures(world: &mut WatchpostWorld) {
    let report = world.last_report.as_ref().expect("no run performed");
    assert!(
        report.failures.is_empty(),
        "unexpected failures: {:?}",
        report.failures
    );
}

#[then(expr = "the failures should be {string}")]
fn failures_should_be(world: &mut WatchpostWorld, expected: String) {
    let report = world.last_report.as_ref().expect("no run performed");
    let mut actual: Vec<String> = report.failures.iter().map(FailureRecord::to_string).collect();
    actual.sort();
    assert_eq!(actual.join("; "), expected);
}

#[then(expr = "the notifier should have received {int} reports")]
fn notifier_received(world: &mut WatchpostWorld, count: usize) {
    assert_eq!(world.notifier.reports.lock().unwrap().len(), count);
}
