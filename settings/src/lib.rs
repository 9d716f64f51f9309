use enum_display::EnumDisplay;
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

/// アプリケーション設定
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// ストレージ設定
    pub storage: StorageSettings,
    /// データベース設定
    ///
    /// ストレージにPostgreSQLを使用する場合に必要となる。
    pub database: Option<DatabaseSettings>,
    /// ログ設定
    ///
    /// 省略した場合は`info`レベルで出力する。
    #[serde(default)]
    pub log: LogSettings,
}

/// ストレージの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, EnumDisplay)]
#[serde(rename_all = "lowercase")]
#[enum_display(case = "Lower")]
pub enum StorageBackend {
    /// インメモリ
    #[default]
    Memory,
    /// PostgreSQL
    Postgres,
}

/// ストレージ設定
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StorageSettings {
    /// ストレージの種類
    #[serde(default)]
    pub backend: StorageBackend,
}

/// データベース設定
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// ホスト名
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// ユーザー名
    pub user: String,
    /// パスワード
    pub password: SecretString,
    /// データベース名
    pub name: String,
    /// 最大接続数
    pub max_connections: u32,
    /// 接続タイムアウト（秒）
    pub connection_timeout: u64,
}

impl DatabaseSettings {
    /// データベース接続オプションを返す。
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(self.password.expose_secret())
            .database(&self.name)
    }
}

/// ログ設定
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LogSettings {
    /// ログレベル
    pub level: log::Level,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: log::Level::Info,
        }
    }
}
