//! These tests need a running PostgreSQL server configured in `app_settings.toml`.
//! Run them with `cargo test -p test_suite -- --ignored`.
use crate::helpers::{configure_pg_storage, enable_tracing};
use crate::scenarios;

#[tokio::test]
#[ignore]
async fn stored_conference_round_trips() {
    enable_tracing();
    scenarios::stored_conference_round_trips(configure_pg_storage().await).await;
}

#[tokio::test]
#[ignore]
async fn unknown_id_is_absent() {
    enable_tracing();
    scenarios::unknown_id_is_absent(configure_pg_storage().await).await;
}

#[tokio::test]
#[ignore]
async fn removed_conference_is_absent() {
    enable_tracing();
    scenarios::removed_conference_is_absent(configure_pg_storage().await).await;
}

#[tokio::test]
#[ignore]
async fn kind_is_part_of_the_lookup_key() {
    enable_tracing();
    scenarios::kind_is_part_of_the_lookup_key(configure_pg_storage().await).await;
}

#[tokio::test]
#[ignore]
async fn stale_update_conflicts() {
    enable_tracing();
    scenarios::stale_update_conflicts(configure_pg_storage().await).await;
}

#[tokio::test]
#[ignore]
async fn duplicate_id_violates_constraint() {
    enable_tracing();
    scenarios::duplicate_id_violates_constraint(configure_pg_storage().await).await;
}

#[tokio::test]
#[ignore]
async fn dropped_transaction_is_rolled_back() {
    enable_tracing();
    scenarios::dropped_transaction_is_rolled_back(configure_pg_storage().await).await;
}

#[tokio::test]
#[ignore]
async fn attachment_keeps_its_identifier() {
    enable_tracing();
    scenarios::attachment_keeps_its_identifier(configure_pg_storage().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn concurrent_creates_are_isolated() {
    enable_tracing();
    scenarios::concurrent_creates_are_isolated(configure_pg_storage().await).await;
}
