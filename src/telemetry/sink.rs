use crate::telemetry::metrics::DatastoreMetrics;
use crate::telemetry::records::{DatastoreCallRecord, TracedMetricData, TransactionRecord};
use crate::telemetry::transaction::{TransactionContext, TransactionName};
use crate::utils::poll_until;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info_span, Instrument};

/// 預設輪詢間隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
struct SinkState {
    finished: Mutex<Vec<TransactionRecord>>,
    poll_interval: Duration,
}

/// 遙測接收端
///
/// 保存自上次清除以來所有已完成的交易記錄。由呼叫端建立並顯式注入驗證框架，
/// 複本共享同一份狀態。
#[derive(Debug, Clone)]
pub struct TelemetrySink {
    inner: Arc<SinkState>,
}

impl Default for TelemetrySink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(SinkState {
                finished: Mutex::new(Vec::new()),
                poll_interval,
            }),
        }
    }

    /// 在交易範圍內執行工作
    ///
    /// 工作完成（成功或失敗）後恰好產生一筆交易記錄；工作回傳錯誤時記錄標記為 errored。
    pub async fn in_transaction<F, Fut, T, E>(&self, name: TransactionName, work: F) -> Result<T, E>
    where
        F: FnOnce(TransactionContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let span = info_span!("transaction", name = %name);
        let txn = TransactionContext::begin(name);
        let result = work(txn.clone()).instrument(span).await;
        self.complete(&txn, result.is_err());
        result
    }

    fn complete(&self, txn: &TransactionContext, errored: bool) {
        if let Some(record) = txn.finish(errored) {
            debug!(
                "交易完成: {} ({} 個資料存儲操作, 錯誤: {})",
                record.name(),
                record.datastore_calls().len(),
                errored
            );
            DatastoreMetrics::record_transaction_finished(errored);
            self.inner.finished.lock().push(record);
        }
    }

    /// 目前已完成的交易數量（不等待）
    pub fn finished_count_now(&self) -> usize {
        self.inner.finished.lock().len()
    }

    /// 等待至少一筆交易完成，最多等待 `timeout`，返回當時的完成數量
    pub async fn finished_transaction_count(&self, timeout: Duration) -> usize {
        self.finished_transaction_count_every(self.inner.poll_interval, timeout)
            .await
    }

    /// 同 `finished_transaction_count`，但以指定間隔輪詢
    pub async fn finished_transaction_count_every(
        &self,
        interval: Duration,
        timeout: Duration,
    ) -> usize {
        poll_until(interval, timeout, || self.finished_count_now() > 0).await;
        self.finished_count_now()
    }

    /// 指定交易的資料存儲呼叫記錄（同名交易的記錄會合併）
    pub fn data_stores(&self, transaction: &str) -> Vec<DatastoreCallRecord> {
        let finished = self.inner.finished.lock();
        let mut merged: Vec<DatastoreCallRecord> = Vec::new();
        for record in finished.iter().filter(|r| r.name() == transaction) {
            for call in record.datastore_calls() {
                match merged
                    .iter_mut()
                    .find(|existing| existing.matches(&call.datastore, &call.operation))
                {
                    Some(existing) => existing.count += call.count,
                    None => merged.push(call.clone()),
                }
            }
        }
        merged
    }

    /// 指定交易的指標（同名交易的指標會合併）
    pub fn metrics_for_transaction(&self, transaction: &str) -> HashMap<String, TracedMetricData> {
        let finished = self.inner.finished.lock();
        let mut merged: HashMap<String, TracedMetricData> = HashMap::new();
        for record in finished.iter().filter(|r| r.name() == transaction) {
            for (name, data) in record.metrics() {
                merged
                    .entry(name.clone())
                    .and_modify(|existing| existing.merge(data))
                    .or_insert_with(|| data.clone());
            }
        }
        merged
    }

    /// 指定交易的完整記錄
    pub fn transactions(&self, transaction: &str) -> Vec<TransactionRecord> {
        self.inner
            .finished
            .lock()
            .iter()
            .filter(|r| r.name() == transaction)
            .cloned()
            .collect()
    }

    /// 已完成交易的名稱（依完成順序，去重）
    pub fn transaction_names(&self) -> Vec<String> {
        let finished = self.inner.finished.lock();
        let mut names: Vec<String> = Vec::new();
        for record in finished.iter() {
            if !names.iter().any(|name| name == record.name()) {
                names.push(record.name().to_string());
            }
        }
        names
    }

    /// 清除所有交易記錄
    pub fn clear(&self) {
        let mut finished = self.inner.finished.lock();
        debug!("清除 {} 筆交易記錄", finished.len());
        finished.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn name(method: &str) -> TransactionName {
        TransactionName::custom("sink_tests", method)
    }

    #[tokio::test]
    async fn test_one_scope_one_record() {
        let sink = TelemetrySink::with_poll_interval(Duration::from_millis(5));
        let result: Result<u32, ()> = sink
            .in_transaction(name("ok"), |txn| async move {
                txn.record_datastore_call("Redis", "set", Duration::from_micros(3));
                txn.record_datastore_call("Redis", "get", Duration::from_micros(3));
                Ok(7)
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(sink.finished_transaction_count(Duration::from_secs(1)).await, 1);
        assert_eq!(sink.data_stores(name("ok").as_str()).len(), 2);
    }

    #[tokio::test]
    async fn test_failed_work_still_finishes_transaction() {
        let sink = TelemetrySink::new();
        let result: Result<(), &str> = sink
            .in_transaction(name("fails"), |txn| async move {
                txn.record_datastore_call("Redis", "hdel", Duration::from_micros(3));
                Err("boom")
            })
            .await;

        assert_matches!(result, Err("boom"));
        let records = sink.transactions(name("fails").as_str());
        assert_eq!(records.len(), 1);
        assert!(records[0].errored());
        assert_eq!(records[0].datastore_calls()[0].operation, "hdel");
    }

    #[tokio::test]
    async fn test_nested_scopes_produce_two_transactions() {
        let sink = TelemetrySink::new();
        let inner_sink = sink.clone();
        let _: Result<(), ()> = sink
            .in_transaction(name("outer"), |_| async move {
                inner_sink
                    .in_transaction(name("inner"), |_| async { Ok::<(), ()>(()) })
                    .await
            })
            .await;

        assert_eq!(sink.finished_count_now(), 2);
        assert_eq!(
            sink.transaction_names(),
            vec![name("inner").to_string(), name("outer").to_string()]
        );
    }

    #[tokio::test]
    async fn test_clear_resets_counts() {
        let sink = TelemetrySink::with_poll_interval(Duration::from_millis(5));
        let _: Result<(), ()> = sink
            .in_transaction(name("before_clear"), |txn| async move {
                txn.record_datastore_call("Redis", "set", Duration::from_micros(1));
                Ok(())
            })
            .await;
        sink.clear();

        assert_eq!(
            sink.finished_transaction_count(Duration::from_millis(30)).await,
            0
        );
        assert!(sink.data_stores(name("never_ran").as_str()).is_empty());
        assert!(sink.metrics_for_transaction(name("before_clear").as_str()).is_empty());
    }

    #[tokio::test]
    async fn test_explicit_interval_overrides_sink_interval() {
        let sink = TelemetrySink::with_poll_interval(Duration::from_secs(10));
        let late_sink = sink.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let _: Result<(), ()> = late_sink.in_transaction(name("late"), |_| async { Ok(()) }).await;
        });

        let started = std::time::Instant::now();
        let count = sink
            .finished_transaction_count_every(Duration::from_millis(5), Duration::from_secs(3))
            .await;
        assert_eq!(count, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_same_name_transactions_merge() {
        let sink = TelemetrySink::new();
        for _ in 0..2 {
            let _: Result<(), ()> = sink
                .in_transaction(name("repeat"), |txn| async move {
                    txn.record_datastore_call("Redis", "set", Duration::from_micros(1));
                    Ok(())
                })
                .await;
        }

        let calls = sink.data_stores(name("repeat").as_str());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].count, 2);
        let metrics = sink.metrics_for_transaction(name("repeat").as_str());
        assert_eq!(metrics[name("repeat").as_str()].call_count, 2);
    }
}
