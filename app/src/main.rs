use anyhow::Context as _;

use app::{create_pg_pool, get_subscriber, health_check, init_subscriber, load_app_settings};
use infra::{memory::MemoryStorage, postgres::PgStorage};
use settings::StorageBackend;

/// アプリケーションエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // アプリケーション設定を読み込み
    let app_settings = load_app_settings("app_settings.toml")?;

    // トレーシングを初期化
    let subscriber = get_subscriber("geekseek".into(), app_settings.log.level, std::io::stdout);
    init_subscriber(subscriber)?;
    tracing::info!(backend = %app_settings.storage.backend, "Starting storage");

    // ストレージを作成して、利用できるか確認
    match app_settings.storage.backend {
        StorageBackend::Memory => health_check(MemoryStorage::new()).await?,
        StorageBackend::Postgres => {
            let database = app_settings
                .database
                .as_ref()
                .context("The database settings are required for the postgres backend")?;
            let pool = create_pg_pool(database).await?;
            let storage = PgStorage::new(pool);
            storage.migrate().await?;
            health_check(storage).await?;
        }
    }

    Ok(())
}
