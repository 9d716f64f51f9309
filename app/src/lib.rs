use std::time::Duration;

use anyhow::Context as _;
use config::{Config, ConfigBuilder, Environment, builder::DefaultState};
use sqlx::postgres::PgPoolOptions;
use tracing::{Subscriber, subscriber::set_global_default};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, fmt::MakeWriter, layer::SubscriberExt as _};

use domain::{
    DomainErrorKind, DomainResult, domain_error,
    models::Attachment,
    repositories::{AttachmentRepository, Storage, rollback},
};
use settings::{AppSettings, DatabaseSettings};

/// アプリケーション設定ファイルを読み込む。
///
/// `APP__`から始まる環境変数で設定を上書きできる（例: `APP__STORAGE__BACKEND=postgres`）。
pub fn load_app_settings(path: &str) -> anyhow::Result<AppSettings> {
    let builder = Config::builder().add_source(config::File::with_name(path));
    build_app_settings(builder)
}

fn build_app_settings(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<AppSettings> {
    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()
        .context("Failed to read the app_settings.toml file")?;
    config
        .try_deserialize()
        .context("The contents of the app_settings.toml file is incorrect")
}

pub async fn create_pg_pool(
    settings: &DatabaseSettings,
) -> anyhow::Result<sqlx::Pool<sqlx::Postgres>> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.connection_timeout))
        .connect_with(settings.connect_options())
        .await
        .context("Failed to connect to the database")
}

pub fn get_subscriber<Sink>(
    name: String,
    log_level: log::Level,
    sink: Sink,
) -> impl Subscriber + Sync + Send
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);
    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

pub fn init_subscriber(subscriber: impl Subscriber + Sync + Send) -> anyhow::Result<()> {
    LogTracer::init().context("Failed to set logger")?;
    set_global_default(subscriber).context("Failed to set subscriber")
}

/// ストレージが利用できるか確認する。
///
/// 添付ファイルを保存して取得できることを確認した後、トランザクションをロールバックするため、
/// ストレージには何も残らない。
#[tracing::instrument(skip(storage))]
pub async fn health_check<S>(storage: S) -> DomainResult<()>
where
    S: Storage,
{
    let repository = AttachmentRepository::new(storage);
    let mut tx = repository.begin().await?;
    let attachment = repository.store(&mut tx, Attachment::new()).await?;
    let fetched = repository.by_id(&mut tx, attachment.id()).await?;
    rollback(repository.storage(), tx).await?;
    match fetched {
        Some(fetched) if fetched == attachment => {
            tracing::info!("Storage is available");
            Ok(())
        }
        _ => Err(domain_error(
            DomainErrorKind::Unexpected,
            "The stored attachment could not be read back",
        )),
    }
}

#[cfg(test)]
mod tests {
    use infra::memory::MemoryStorage;
    use settings::StorageBackend;

    use super::*;

    fn from_toml(toml: &str) -> anyhow::Result<AppSettings> {
        build_app_settings(
            Config::builder().add_source(config::File::from_str(toml, config::FileFormat::Toml)),
        )
    }

    #[test]
    fn app_settings_with_postgres_backend() {
        let settings = from_toml(
            r#"
            [storage]
            backend = "postgres"

            [database]
            host = "localhost"
            port = 5432
            user = "geekseek"
            password = "secret"
            name = "geekseek_db"
            max_connections = 5
            connection_timeout = 3

            [log]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(settings.storage.backend, StorageBackend::Postgres);
        assert_eq!(settings.log.level, log::Level::Debug);
        let database = settings.database.unwrap();
        assert_eq!(database.port, 5432);
        assert_eq!(database.name, "geekseek_db");
    }

    #[test]
    fn app_settings_without_database() {
        let settings = from_toml(
            r#"
            [storage]
            backend = "memory"

            [log]
            level = "warn"
            "#,
        )
        .unwrap();

        assert_eq!(settings.storage.backend, StorageBackend::Memory);
        assert!(settings.database.is_none());
    }

    #[test]
    fn app_settings_without_log_defaults_to_info() {
        let settings = from_toml(
            r#"
            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(settings.log.level, log::Level::Info);
    }

    #[rstest::rstest]
    #[case(r#"[storage]
backend = "oracle"
[log]
level = "info""#)]
    #[case(r#"[storage]
backend = "memory"
[log]
level = "loud""#)]
    fn app_settings_rejects_invalid_contents(#[case] toml: &str) {
        assert!(from_toml(toml).is_err());
    }

    #[tokio::test]
    async fn health_check_leaves_no_trace() {
        let storage = MemoryStorage::new();

        health_check(storage.clone()).await.unwrap();

        assert!(storage.is_empty().await);
    }
}
