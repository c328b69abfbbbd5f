//! 儀表化的 Redis 連接
//!
//! 每個命令都在 `redis_command` span 內執行，完成後把 (Redis, 操作) 呼叫記錄到所屬交易。

use crate::redis::client::RedisClientError;
use crate::telemetry::{DatastoreMetrics, TransactionContext};
use redis::aio::MultiplexedConnection;
use redis::{Cmd, FromRedisValue, RedisResult, ToRedisArgs};
use std::time::Instant;
use tracing::{debug, info_span, Instrument};

/// 記錄在資料存儲呼叫中的產品名稱
pub const DATASTORE_PRODUCT: &str = "Redis";

/// 綁定到單一交易的 Redis 連接
pub struct InstrumentedConnection {
    inner: MultiplexedConnection,
    txn: TransactionContext,
}

impl InstrumentedConnection {
    pub fn new(connection: MultiplexedConnection, txn: TransactionContext) -> Self {
        Self {
            inner: connection,
            txn,
        }
    }

    /// 執行命令並記錄一次資料存儲呼叫（失敗的命令也會記錄）
    pub async fn execute<T: FromRedisValue>(
        &mut self,
        operation: &'static str,
        cmd: Cmd,
    ) -> Result<T, RedisClientError> {
        let span = info_span!(
            "redis_command",
            db.system = "redis",
            db.operation = operation
        );

        async {
            let started = Instant::now();
            let result: RedisResult<T> = cmd.query_async(&mut self.inner).await;
            let elapsed = started.elapsed();

            self.txn
                .record_datastore_call(DATASTORE_PRODUCT, operation, elapsed);
            DatastoreMetrics::record_call(DATASTORE_PRODUCT, operation, elapsed, result.is_ok());
            debug!("{} 完成，耗時 {:?}", operation, elapsed);

            result.map_err(|source| RedisClientError::CommandError {
                operation: operation.to_string(),
                source,
            })
        }
        .instrument(span)
        .await
    }

    pub async fn set<K: ToRedisArgs, V: ToRedisArgs>(
        &mut self,
        key: K,
        value: V,
    ) -> Result<(), RedisClientError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        self.execute("set", cmd).await
    }

    pub async fn get<K: ToRedisArgs>(&mut self, key: K) -> Result<Option<String>, RedisClientError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.execute("get", cmd).await
    }

    /// 附加字串，返回附加後的長度
    pub async fn append<K: ToRedisArgs, V: ToRedisArgs>(
        &mut self,
        key: K,
        value: V,
    ) -> Result<i64, RedisClientError> {
        let mut cmd = redis::cmd("APPEND");
        cmd.arg(key).arg(value);
        self.execute("append", cmd).await
    }

    pub async fn del<K: ToRedisArgs>(&mut self, keys: K) -> Result<i64, RedisClientError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(keys);
        self.execute("del", cmd).await
    }

    pub async fn exists<K: ToRedisArgs>(&mut self, key: K) -> Result<bool, RedisClientError> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        self.execute("exists", cmd).await
    }

    /// 加入集合成員，返回新加入的數量
    pub async fn sadd<K: ToRedisArgs, M: ToRedisArgs>(
        &mut self,
        key: K,
        members: M,
    ) -> Result<i64, RedisClientError> {
        let mut cmd = redis::cmd("SADD");
        cmd.arg(key).arg(members);
        self.execute("sadd", cmd).await
    }

    pub async fn smembers<K: ToRedisArgs>(&mut self, key: K) -> Result<Vec<String>, RedisClientError> {
        let mut cmd = redis::cmd("SMEMBERS");
        cmd.arg(key);
        self.execute("smembers", cmd).await
    }

    /// 隨機移除並返回一個成員；集合為空時返回 None
    pub async fn spop<K: ToRedisArgs>(&mut self, key: K) -> Result<Option<String>, RedisClientError> {
        let mut cmd = redis::cmd("SPOP");
        cmd.arg(key);
        self.execute("spop", cmd).await
    }

    /// 設定雜湊欄位，返回新增欄位數
    pub async fn hset<K: ToRedisArgs, F: ToRedisArgs, V: ToRedisArgs>(
        &mut self,
        key: K,
        field: F,
        value: V,
    ) -> Result<i64, RedisClientError> {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key).arg(field).arg(value);
        self.execute("hset", cmd).await
    }

    pub async fn hget<K: ToRedisArgs, F: ToRedisArgs>(
        &mut self,
        key: K,
        field: F,
    ) -> Result<Option<String>, RedisClientError> {
        let mut cmd = redis::cmd("HGET");
        cmd.arg(key).arg(field);
        self.execute("hget", cmd).await
    }

    /// 刪除雜湊欄位，返回實際刪除的數量
    pub async fn hdel<K: ToRedisArgs, F: ToRedisArgs>(
        &mut self,
        key: K,
        field: F,
    ) -> Result<i64, RedisClientError> {
        let mut cmd = redis::cmd("HDEL");
        cmd.arg(key).arg(field);
        self.execute("hdel", cmd).await
    }

    /// 關閉連接
    pub fn close(self) {
        debug!("關閉交易 {} 的 Redis 連接", self.txn.name());
    }
}
