use crate::config::validation::{ValidationError, ValidationUtils, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 是否啟動內嵌 Redis 服務
pub const KEY_EMBEDDED: &str = "redis-server-embedded";
/// Redis 主機
pub const KEY_HOST: &str = "redis-server-host";
/// Redis 端口
pub const KEY_PORT: &str = "redis-server-port";
/// 內嵌模式使用的 redis-server 執行檔
pub const KEY_BINARY: &str = "redis-server-binary";
/// 邏輯資料庫編號
pub const KEY_DATABASE: &str = "redis-database";
/// 服務就緒等待上限（毫秒）
pub const KEY_STARTUP_TIMEOUT_MS: &str = "startup-timeout-ms";
/// 等待交易完成的上限（毫秒）
pub const KEY_TRANSACTION_WAIT_MS: &str = "transaction-wait-ms";
/// 輪詢間隔（毫秒）
pub const KEY_POLL_INTERVAL_MS: &str = "poll-interval-ms";
/// 連接超時（秒）
pub const KEY_CONNECTION_TIMEOUT_SECS: &str = "connection-timeout-secs";
/// 日誌級別
pub const KEY_LOG_LEVEL: &str = "log-level";

/// 驗證框架配置
///
/// 欄位名稱對應 properties 檔中的鍵，例如 `redis-server-port=6379`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HarnessConfig {
    pub redis_server_embedded: bool,
    pub redis_server_host: String,
    pub redis_server_port: u16,
    pub redis_server_binary: String,
    pub redis_database: u32,
    pub startup_timeout_ms: u64,
    pub transaction_wait_ms: u64,
    pub poll_interval_ms: u64,
    pub connection_timeout_secs: u64,
    pub log_level: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            redis_server_embedded: true,
            redis_server_host: "localhost".to_string(),
            redis_server_port: 6379,
            redis_server_binary: "redis-server".to_string(),
            redis_database: 0,
            startup_timeout_ms: 5000,
            transaction_wait_ms: 5000,
            poll_interval_ms: 50,
            connection_timeout_secs: 5,
            log_level: "info".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Redis 連接 URL，格式為 `redis://host:port/db`
    pub fn redis_url(&self) -> String {
        format!(
            "redis://{}:{}/{}",
            self.redis_server_host, self.redis_server_port, self.redis_database
        )
    }

    /// 服務就緒等待上限
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// 等待交易完成的上限
    pub fn transaction_wait(&self) -> Duration {
        Duration::from_millis(self.transaction_wait_ms)
    }

    /// 輪詢間隔
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// 連接超時
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// 改用指定端口（命令列 `--port` 覆寫）
    pub fn with_port(mut self, port: u16) -> Self {
        self.redis_server_port = port;
        self
    }
}

impl Validator for HarnessConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.redis_server_host, KEY_HOST)?;
        ValidationUtils::in_range(self.redis_server_port, 1, 65535, KEY_PORT)?;
        if self.redis_server_embedded {
            ValidationUtils::not_empty(&self.redis_server_binary, KEY_BINARY)?;
        }
        ValidationUtils::in_range(self.redis_database, 0, 15, KEY_DATABASE)?;
        ValidationUtils::in_range(self.startup_timeout_ms, 100, 120_000, KEY_STARTUP_TIMEOUT_MS)?;
        ValidationUtils::in_range(
            self.transaction_wait_ms,
            1,
            120_000,
            KEY_TRANSACTION_WAIT_MS,
        )?;
        ValidationUtils::in_range(self.poll_interval_ms, 1, self.transaction_wait_ms, KEY_POLL_INTERVAL_MS)?;
        ValidationUtils::in_range(self.connection_timeout_secs, 1, 60, KEY_CONNECTION_TIMEOUT_SECS)?;
        ValidationUtils::one_of(
            &self.log_level.to_lowercase(),
            &["trace", "debug", "info", "warn", "error"]
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<String>>(),
            KEY_LOG_LEVEL,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_properties_defaults() {
        let config = HarnessConfig::default();
        assert!(config.redis_server_embedded);
        assert_eq!(config.redis_server_host, "localhost");
        assert_eq!(config.redis_server_port, 6379);
        assert_eq!(config.redis_url(), "redis://localhost:6379/0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_host() {
        let config = HarnessConfig {
            redis_server_host: "  ".to_string(),
            ..HarnessConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingField(field)) if field == KEY_HOST
        ));
    }

    #[test]
    fn test_validation_rejects_unknown_log_level() {
        let config = HarnessConfig {
            log_level: "verbose".to_string(),
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_binary_only_required_when_embedded() {
        let config = HarnessConfig {
            redis_server_embedded: false,
            redis_server_binary: String::new(),
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
