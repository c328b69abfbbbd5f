use crate::config::HarnessConfig;
use crate::redis::connection::InstrumentedConnection;
use crate::telemetry::TransactionContext;
use redis::{Client as RedisClient, RedisError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, warn};

/// Redis客戶端錯誤
#[derive(Error, Debug)]
pub enum RedisClientError {
    /// Redis連接錯誤
    #[error("Redis連接錯誤: {0}")]
    ConnectionError(#[source] RedisError),

    /// 操作超時錯誤
    #[error("Redis操作超時: {0}")]
    TimeoutError(String),

    /// 命令執行錯誤
    #[error("Redis命令 {operation} 失敗: {source}")]
    CommandError {
        operation: String,
        #[source]
        source: RedisError,
    },
}

/// 綁定到單一 Redis 位址的客戶端
///
/// 本身不持有連接；每個被追蹤的操作透過 `connect` 取得自己的連接並在結束時關閉。
#[derive(Debug, Clone)]
pub struct InstrumentedClient {
    inner: RedisClient,
    url: String,
    connection_timeout: Duration,
}

impl InstrumentedClient {
    /// 依配置建立客戶端（不會立即連接）
    pub fn new(config: &HarnessConfig) -> Result<Self, RedisClientError> {
        Self::open(config.redis_url(), config.connection_timeout())
    }

    pub fn open(url: impl Into<String>, connection_timeout: Duration) -> Result<Self, RedisClientError> {
        let url = url.into();
        let inner = RedisClient::open(url.as_str()).map_err(RedisClientError::ConnectionError)?;
        Ok(Self {
            inner,
            url,
            connection_timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn get_async_connection(
        &self,
    ) -> Result<redis::aio::MultiplexedConnection, RedisClientError> {
        match timeout(
            self.connection_timeout,
            self.inner.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => {
                debug!("成功建立Redis連接: {}", self.url);
                Ok(conn)
            }
            Ok(Err(err)) => {
                error!("無法建立Redis連接 {}: {}", self.url, err);
                Err(RedisClientError::ConnectionError(err))
            }
            Err(_) => {
                error!(
                    "Redis連接超時 ({}毫秒): {}",
                    self.connection_timeout.as_millis(),
                    self.url
                );
                Err(RedisClientError::TimeoutError(format!(
                    "連接 {} 超時 ({}毫秒)",
                    self.url,
                    self.connection_timeout.as_millis()
                )))
            }
        }
    }

    /// 在指定交易內開啟一條儀表化連接
    pub async fn connect(
        &self,
        txn: &TransactionContext,
    ) -> Result<InstrumentedConnection, RedisClientError> {
        let conn = self.get_async_connection().await?;
        Ok(InstrumentedConnection::new(conn, txn.clone()))
    }

    /// 執行不計入任何交易的 PING
    pub async fn ping(&self) -> Result<String, RedisClientError> {
        let mut conn = self.get_async_connection().await?;
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|source| RedisClientError::CommandError {
                operation: "ping".to_string(),
                source,
            })
    }

    /// 以 `INFO server` 查詢回應者的行程 ID
    pub async fn server_process_id(&self) -> Result<Option<u32>, RedisClientError> {
        let mut conn = self.get_async_connection().await?;
        let info: String = redis::cmd("INFO")
            .arg("server")
            .query_async(&mut conn)
            .await
            .map_err(|source| RedisClientError::CommandError {
                operation: "info".to_string(),
                source,
            })?;
        Ok(parse_process_id(&info))
    }

    /// 測試連接是否有效
    pub async fn test_connection(&self) -> bool {
        match self.ping().await {
            Ok(pong) => pong == "PONG",
            Err(err) => {
                warn!("Redis連接測試失敗: {}", err);
                false
            }
        }
    }
}

/// 從 INFO 輸出取出 `process_id`
pub(crate) fn parse_process_id(info: &str) -> Option<u32> {
    info.lines()
        .find_map(|line| line.trim().strip_prefix("process_id:"))
        .and_then(|pid| pid.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_client_uses_configured_url() {
        let config = HarnessConfig::default().with_port(6390);
        let client = InstrumentedClient::new(&config).expect("無法建立客戶端");
        assert_eq!(client.url(), "redis://localhost:6390/0");
    }

    #[test]
    fn test_invalid_url_is_connection_error() {
        let result = InstrumentedClient::open("not-a-redis-url", Duration::from_secs(1));
        assert_matches!(result, Err(RedisClientError::ConnectionError(_)));
    }

    #[test]
    fn test_parse_process_id() {
        let info = "# Server\r\nredis_version:7.2.4\r\nprocess_id:4242\r\ntcp_port:6379\r\n";
        assert_eq!(parse_process_id(info), Some(4242));
        assert_eq!(parse_process_id("PONG"), None);
        assert_eq!(parse_process_id("process_id:abc"), None);
    }

    #[tokio::test]
    async fn test_ping_unreachable_store_fails() {
        // 端口 1 不會有 Redis 服務
        let client = InstrumentedClient::open("redis://127.0.0.1:1/0", Duration::from_millis(500))
            .expect("無法建立客戶端");
        assert!(!client.test_connection().await);
    }
}
