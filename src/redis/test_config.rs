//! 集中化的 Redis 測試配置
//!
//! 在隨機可用端口啟動內嵌 Redis；找不到 redis-server 時略過測試。

use crate::config::HarnessConfig;
use crate::redis::embedded::EmbeddedRedisServer;
use std::net::TcpListener;

/// Redis 測試配置建構器
pub struct RedisTestConfig;

impl RedisTestConfig {
    /// 測試用 redis-server 執行檔，可用 REDIS_SERVER_BINARY 覆寫
    pub fn binary() -> String {
        std::env::var("REDIS_SERVER_BINARY").unwrap_or_else(|_| "redis-server".to_string())
    }

    /// 向作業系統要一個可用端口
    pub fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").expect("無法綁定端口 0");
        listener.local_addr().expect("無法取得本地位址").port()
    }

    /// 建立標準測試配置
    pub fn create_test_config() -> HarnessConfig {
        HarnessConfig {
            redis_server_embedded: true,
            redis_server_host: "127.0.0.1".to_string(),
            redis_server_port: Self::free_port(),
            redis_server_binary: Self::binary(),
            startup_timeout_ms: 10_000,
            transaction_wait_ms: 2_000,
            poll_interval_ms: 10,
            ..HarnessConfig::default()
        }
    }

    /// 啟動內嵌 Redis；執行檔不存在時返回 None
    pub async fn start_embedded(test_name: &str) -> Option<(HarnessConfig, EmbeddedRedisServer)> {
        let config = Self::create_test_config();
        if !EmbeddedRedisServer::binary_available(&config.redis_server_binary) {
            eprintln!(
                "略過 Redis 測試 '{}' - 找不到 {}",
                test_name, config.redis_server_binary
            );
            return None;
        }
        let server = EmbeddedRedisServer::start(&config)
            .await
            .unwrap_or_else(|err| panic!("Redis 測試 '{}' 無法啟動內嵌 Redis: {}", test_name, err));
        Some((config, server))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_config() {
        let config = RedisTestConfig::create_test_config();
        assert!(config.redis_server_embedded);
        assert_ne!(config.redis_server_port, 0);
        assert!(config.redis_url().starts_with("redis://127.0.0.1:"));
    }
}
