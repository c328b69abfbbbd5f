use crate::telemetry::records::TransactionRecord;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// 交易名稱
///
/// 自訂交易的格式為 `OtherTransaction/Custom/<型別路徑>/<方法>`。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TransactionName(String);

impl TransactionName {
    /// 自訂交易的前綴
    pub const CUSTOM_PREFIX: &'static str = "OtherTransaction/Custom";

    /// 以型別路徑與方法名稱組成自訂交易名稱
    pub fn custom(type_path: &str, method: &str) -> Self {
        Self(format!("{}/{}/{}", Self::CUSTOM_PREFIX, type_path, method))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TransactionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 進行中交易的共享狀態
#[derive(Debug)]
struct ActiveTransaction {
    name: TransactionName,
    started: Instant,
    // 交易結束後變為 None，之後的呼叫不再記錄
    record: Mutex<Option<TransactionRecord>>,
}

/// 進行中交易的句柄
///
/// 由 `TelemetrySink::in_transaction` 建立並傳給被追蹤的工作；
/// 儀表化的連接持有它的複本，每執行一個命令就記錄一次資料存儲呼叫。
#[derive(Debug, Clone)]
pub struct TransactionContext {
    inner: Arc<ActiveTransaction>,
}

impl TransactionContext {
    pub(crate) fn begin(name: TransactionName) -> Self {
        let record = TransactionRecord::new(name.as_str(), Utc::now());
        Self {
            inner: Arc::new(ActiveTransaction {
                name,
                started: Instant::now(),
                record: Mutex::new(Some(record)),
            }),
        }
    }

    pub fn name(&self) -> &TransactionName {
        &self.inner.name
    }

    /// 交易是否仍在進行
    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        self.inner.record.lock().is_some()
    }

    /// 記錄一次資料存儲呼叫
    pub fn record_datastore_call(&self, datastore: &str, operation: &str, duration: Duration) {
        match self.inner.record.lock().as_mut() {
            Some(record) => record.record_datastore_call(datastore, operation, duration),
            None => warn!(
                "交易 {} 已結束，忽略 {}/{} 呼叫",
                self.inner.name, datastore, operation
            ),
        }
    }

    /// 結束交易並取出記錄；重複結束時返回 None
    pub(crate) fn finish(&self, errored: bool) -> Option<TransactionRecord> {
        let mut record = self.inner.record.lock().take()?;
        record.finish(self.inner.started.elapsed(), errored);
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_name_format() {
        let name = TransactionName::custom("redis_trace_fit::scenarios", "string_test");
        assert_eq!(
            name.as_str(),
            "OtherTransaction/Custom/redis_trace_fit::scenarios/string_test"
        );
        assert_eq!(name.to_string(), name.as_str());
    }

    #[test]
    fn test_finish_only_once() {
        let txn = TransactionContext::begin(TransactionName::custom("t", "m"));
        txn.record_datastore_call("Redis", "set", Duration::from_micros(1));
        assert!(txn.is_active());

        let record = txn.finish(false).expect("應返回交易記錄");
        assert_eq!(record.datastore_calls().len(), 1);
        assert!(!txn.is_active());
        assert!(txn.finish(false).is_none());
    }

    #[test]
    fn test_calls_after_finish_are_dropped() {
        let txn = TransactionContext::begin(TransactionName::custom("t", "m"));
        let clone = txn.clone();
        let record = txn.finish(false).expect("應返回交易記錄");

        clone.record_datastore_call("Redis", "get", Duration::from_micros(1));
        assert!(record.datastore_calls().is_empty());
    }
}
