use crate::redis::{EmbeddedServerError, RedisClientError};
use thiserror::Error;

/// 斷言失敗
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssertionError {
    #[error("預期 {expected} 筆已完成交易，實際 {actual} 筆")]
    TransactionCount { expected: usize, actual: usize },

    #[error("交易 {transaction} 預期 {expected} 筆資料存儲記錄，實際 {actual} 筆")]
    CallRecordCount {
        transaction: String,
        expected: usize,
        actual: usize,
    },

    #[error("交易 {transaction} 缺少 {datastore}/{operation} 資料存儲記錄")]
    MissingCallRecord {
        transaction: String,
        datastore: String,
        operation: String,
    },

    #[error("交易 {transaction} 的 {datastore}/{operation} 預期呼叫 {expected} 次，實際 {actual} 次")]
    CallCountMismatch {
        transaction: String,
        datastore: String,
        operation: String,
        expected: u64,
        actual: u64,
    },

    #[error("交易 {transaction} 缺少指標 {metric}")]
    MissingMetric { transaction: String, metric: String },
}

/// 驗證框架錯誤
#[derive(Error, Debug)]
pub enum HarnessError {
    /// 內嵌 Redis 無法啟動
    #[error("環境準備失敗: {0}")]
    Setup(#[from] EmbeddedServerError),

    /// 外部 Redis 在期限內沒有回應
    #[error("無法連接 Redis {url}: {timeout_ms} 毫秒內沒有回應")]
    StoreUnreachable { url: String, timeout_ms: u64 },

    /// 建立客戶端失敗
    #[error("Redis 客戶端錯誤: {0}")]
    Client(#[from] RedisClientError),

    /// 被追蹤的操作本身失敗
    #[error("場景 {scenario} 執行失敗: {source}")]
    Operation {
        scenario: String,
        #[source]
        source: RedisClientError,
    },

    #[error("斷言失敗: {0}")]
    Assertion(#[from] AssertionError),
}

impl HarnessError {
    /// 是否應中止整批場景
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::Setup(_) | HarnessError::StoreUnreachable { .. } | HarnessError::Client(_)
        )
    }
}
