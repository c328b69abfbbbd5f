use crate::telemetry::metrics::{
    operation_metric, product_rollup_metric, statement_metric, DATASTORE_ALL,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// 交易內某個 (資料存儲, 操作) 組合的呼叫次數
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DatastoreCallRecord {
    /// 產品名稱，例如 `Redis`
    pub datastore: String,
    /// 小寫的操作名稱，例如 `set`
    pub operation: String,
    /// 呼叫次數
    pub count: u64,
}

impl DatastoreCallRecord {
    /// 忽略大小寫比對資料存儲與操作名稱
    pub fn matches(&self, datastore: &str, operation: &str) -> bool {
        self.datastore.eq_ignore_ascii_case(datastore)
            && self.operation.eq_ignore_ascii_case(operation)
    }
}

/// 單一指標在交易內的彙總數據
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TracedMetricData {
    pub name: String,
    pub call_count: u64,
    pub total_time: Duration,
    pub exclusive_time: Duration,
}

impl TracedMetricData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            call_count: 0,
            total_time: Duration::ZERO,
            exclusive_time: Duration::ZERO,
        }
    }

    /// 記錄一次呼叫
    pub fn record(&mut self, total: Duration, exclusive: Duration) {
        self.call_count += 1;
        self.total_time += total;
        self.exclusive_time += exclusive;
    }

    /// 合併另一筆同名指標
    pub fn merge(&mut self, other: &TracedMetricData) {
        self.call_count += other.call_count;
        self.total_time += other.total_time;
        self.exclusive_time += other.exclusive_time;
    }
}

/// 一筆交易的完整記錄
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    name: String,
    started_at: DateTime<Utc>,
    duration: Duration,
    errored: bool,
    datastore_calls: Vec<DatastoreCallRecord>,
    datastore_time: Duration,
    metrics: HashMap<String, TracedMetricData>,
}

impl TransactionRecord {
    pub fn new(name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            started_at,
            duration: Duration::ZERO,
            errored: false,
            datastore_calls: Vec::new(),
            datastore_time: Duration::ZERO,
            metrics: HashMap::new(),
        }
    }

    /// 記錄一次資料存儲呼叫
    ///
    /// 同一 (資料存儲, 操作) 組合只保留一筆記錄並累加次數；操作名稱統一轉為小寫。
    pub fn record_datastore_call(&mut self, datastore: &str, operation: &str, duration: Duration) {
        let operation = operation.to_lowercase();
        match self
            .datastore_calls
            .iter_mut()
            .find(|call| call.matches(datastore, &operation))
        {
            Some(call) => call.count += 1,
            None => self.datastore_calls.push(DatastoreCallRecord {
                datastore: datastore.to_string(),
                operation: operation.clone(),
                count: 1,
            }),
        }
        self.datastore_time += duration;

        self.record_metric(statement_metric(datastore, None, &operation), duration, duration);
        self.record_metric(operation_metric(datastore, &operation), duration, duration);
        self.record_metric(product_rollup_metric(datastore), duration, duration);
        self.record_metric(DATASTORE_ALL.to_string(), duration, duration);
    }

    fn record_metric(&mut self, name: String, total: Duration, exclusive: Duration) {
        self.metrics
            .entry(name.clone())
            .or_insert_with(|| TracedMetricData::new(name))
            .record(total, exclusive);
    }

    /// 結束交易，記錄根指標（名稱與交易相同）
    pub fn finish(&mut self, duration: Duration, errored: bool) {
        self.duration = duration;
        self.errored = errored;
        let exclusive = duration.saturating_sub(self.datastore_time);
        self.record_metric(self.name.clone(), duration, exclusive);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn errored(&self) -> bool {
        self.errored
    }

    pub fn datastore_calls(&self) -> &[DatastoreCallRecord] {
        &self.datastore_calls
    }

    pub fn metrics(&self) -> &HashMap<String, TracedMetricData> {
        &self.metrics
    }
}
