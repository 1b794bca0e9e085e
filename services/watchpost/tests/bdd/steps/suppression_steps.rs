//! BDD step definitions for the suppression feature

use cucumber::{given, then};

use watchpost::suppression::SuppressionStore;

use crate::world::WatchpostWorld;

fn stored(world: &WatchpostWorld) -> SuppressionStore {
    let contents = world.state.contents.lock().unwrap().clone();
    SuppressionStore::parse(contents.as_deref().unwrap_or_default())
        .expect("stored suppression state should parse")
}

#[given(expr = "a suppression window of {int} seconds")]
fn suppression_window(world: &mut WatchpostWorld, seconds: u64) {
    world.window_seconds = Some(seconds);
}

#[given(expr = "the stored suppression state is {string}")]
fn stored_state(world: &mut WatchpostWorld, contents: String) {
    *world.state.contents.lock().unwrap() = Some(contents.replace("\\n", "\n"));
}

#[then(expr = "the suppression entry for {string} with reason {string} should have timestamp {int}")]
fn entry_timestamp(world: &mut WatchpostWorld, endpoint: String, reason: String, timestamp: i64) {
    assert_eq!(stored(world).last_alerted(&endpoint, &reason), Some(timestamp));
}

#[then(expr = "there should be {int} suppression entries")]
fn entry_count(world: &mut WatchpostWorld, count: usize) {
    assert_eq!(stored(world).len(), count);
}
