use infra::memory::MemoryStorage;

use crate::helpers::enable_tracing;
use crate::scenarios;

fn storage() -> MemoryStorage {
    enable_tracing();
    MemoryStorage::new()
}

#[tokio::test]
async fn stored_conference_round_trips() {
    scenarios::stored_conference_round_trips(storage()).await;
}

#[tokio::test]
async fn unknown_id_is_absent() {
    scenarios::unknown_id_is_absent(storage()).await;
}

#[tokio::test]
async fn removed_conference_is_absent() {
    scenarios::removed_conference_is_absent(storage()).await;
}

#[tokio::test]
async fn kind_is_part_of_the_lookup_key() {
    scenarios::kind_is_part_of_the_lookup_key(storage()).await;
}

#[tokio::test]
async fn stale_update_conflicts() {
    scenarios::stale_update_conflicts(storage()).await;
}

#[tokio::test]
async fn duplicate_id_violates_constraint() {
    scenarios::duplicate_id_violates_constraint(storage()).await;
}

#[tokio::test]
async fn dropped_transaction_is_rolled_back() {
    scenarios::dropped_transaction_is_rolled_back(storage()).await;
}

#[tokio::test]
async fn attachment_keeps_its_identifier() {
    scenarios::attachment_keeps_its_identifier(storage()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_are_isolated() {
    let storage = storage();
    scenarios::concurrent_creates_are_isolated(storage.clone()).await;
    assert_eq!(storage.len().await, 8);
}
