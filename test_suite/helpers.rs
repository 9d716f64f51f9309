//! Helpers for the integration tests
//!
//! The PostgreSQL tests use the same PostgreSQL container as the development environment.
//! But, they create a separate test database for each test.
//! The test database is named in the format `test_geekseek_db_<uuid>`,
//! where `<uuid>` is the UUID with hyphens replaced by underscores.
//!
//! [NOTICE]
//!
//! A test database is created for each test run, so you must drop the test databases manually.
use std::path::Path;

use once_cell::sync::Lazy;
use sqlx::{Connection as _, Executor as _, PgConnection};
use time::macros::datetime;

use app::{create_pg_pool, get_subscriber, init_subscriber, load_app_settings};
use domain::models::{Conference, ConferenceId, ConferenceName, ConferenceTagline};
use infra::postgres::PgStorage;
use settings::{AppSettings, DatabaseSettings};

pub const TEST_DATABASE_PREFIX: &str = "test_geekseek_db_";

/// Canonical UUID grammar
pub const CANONICAL_ID_PATTERN: &str =
    r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$";

/// Initializes tracing once for all tests
///
/// Logs are written to stdout only when the `TEST_LOG` environment variable is set.
static TRACING: Lazy<()> = Lazy::new(|| {
    let name = String::from("test");
    let level = log::Level::Debug;
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(name, level, std::io::stdout);
        init_subscriber(subscriber).unwrap();
    } else {
        let subscriber = get_subscriber(name, level, std::io::sink);
        init_subscriber(subscriber).unwrap();
    }
});

pub fn enable_tracing() {
    Lazy::force(&TRACING);
}

pub fn load_app_settings_for_testing() -> AppSettings {
    let dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set");
    let path = Path::new(&dir).join("..").join("app_settings.toml");
    load_app_settings(path.as_os_str().to_str().unwrap()).unwrap()
}

/// Returns a conference whose identifier is `id`
pub fn conference_with_id(id: &str) -> Conference {
    Conference::with_id(
        id.parse::<ConferenceId>().unwrap(),
        ConferenceName::new(String::from("GeekSeek Conf")).unwrap(),
        Some(ConferenceTagline::new(String::from("Where geeks seek geeks")).unwrap()),
        datetime!(2026-11-02 09:00:00 +01:00),
        datetime!(2026-11-04 18:00:00 +01:00),
    )
    .unwrap()
}

/// Returns a conference with a fresh identifier
pub fn new_conference(name: &str) -> Conference {
    Conference::new(
        ConferenceName::new(String::from(name)).unwrap(),
        None,
        datetime!(2026-11-02 09:00:00 UTC),
        datetime!(2026-11-04 18:00:00 UTC),
    )
    .unwrap()
}

/// Creates a throwaway database, migrates it, and returns the storage connected to it
pub async fn configure_pg_storage() -> PgStorage {
    let app_settings = load_app_settings_for_testing();
    let mut settings = app_settings
        .database
        .expect("the database settings are required for the PostgreSQL tests");
    settings.name = format!("{}{}", TEST_DATABASE_PREFIX, uuid::Uuid::new_v4()).replace('-', "_");
    create_database(&settings).await;

    let pool = create_pg_pool(&settings).await.unwrap();
    let storage = PgStorage::new(pool);
    storage.migrate().await.unwrap();
    storage
}

async fn create_database(settings: &DatabaseSettings) {
    // Connect to the **postgres** database
    let postgres_settings = DatabaseSettings {
        name: String::from("postgres"),
        ..settings.clone()
    };
    let mut conn = PgConnection::connect_with(&postgres_settings.connect_options())
        .await
        .unwrap();
    conn.execute(format!("CREATE DATABASE {};", settings.name).as_str())
        .await
        .unwrap();
}
