//! BDD step definitions for the classification feature

use cucumber::{given, then, when};

use watchpost::classifier::classify;
use watchpost::io::{HttpResponse, TransportError};

use crate::world::WatchpostWorld;

#[given(expr = "a response with status {int} and body {string}")]
fn a_response(world: &mut WatchpostWorld, status: u16, body: String) {
    world.probe_result = Some(Ok(HttpResponse { status, body }));
}

#[given("a connect timeout")]
fn a_connect_timeout(world: &mut WatchpostWorld) {
    world.probe_result = Some(Err(TransportError::ConnectTimeout));
}

#[given("a read timeout")]
fn a_read_timeout(world: &mut WatchpostWorld) {
    world.probe_result = Some(Err(TransportError::ReadTimeout));
}

#[given("a refused connection")]
fn a_refused_connection(world: &mut WatchpostWorld) {
    world.probe_result = Some(Err(TransportError::Other(
        "connection refused".to_string(),
    )));
}

#[given(expr = "the body must contain {string}")]
fn body_must_contain(world: &mut WatchpostWorld, text: String) {
    world.classify_rules.required_strings.push(text);
}

#[when("the result is classified")]
fn result_classified(world: &mut WatchpostWorld) {
    let result = world.probe_result.as_ref().expect("no probe result");
    world.outcome = Some(classify(result.as_ref(), &world.classify_rules));
}

#[then(expr = "the failure reason should be {string}")]
fn failure_reason(world: &mut WatchpostWorld, reason: String) {
    let outcome = world.outcome.clone().expect("not classified");
    let outcome = outcome.expect("result was not classifiable");
    assert_eq!(outcome.reason(), Some(reason));
}

#[then("the result should not be a failure")]
fn not_a_failure(world: &mut WatchpostWorld) {
    let outcome = world.outcome.clone().expect("not classified");
    let outcome = outcome.expect("result was not classifiable");
    assert_eq!(outcome.reason(), None, "got {outcome:?}");
}

#[then("the result should be unclassifiable")]
fn unclassifiable(world: &mut WatchpostWorld) {
    let outcome = world.outcome.clone().expect("not classified");
    assert!(outcome.is_none(), "got {outcome:?}");
}
