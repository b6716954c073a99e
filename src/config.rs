use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/library";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// 設定読み込みのエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// アプリケーション設定
///
/// 環境変数から読み込み、未設定の項目はデフォルト値を使う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
}

impl AppConfig {
    /// 環境変数から設定を読み込む
    ///
    /// - `DATABASE_URL`（デフォルト：`postgres://localhost/library`）
    /// - `DATABASE_MAX_CONNECTIONS`（デフォルト：5）
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(value) => match value.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "DATABASE_MAX_CONNECTIONS",
                        value,
                    });
                }
            },
        };

        Ok(Self {
            database_url,
            database_max_connections,
        })
    }
}
