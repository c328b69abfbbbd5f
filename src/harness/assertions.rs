//! 遙測形狀斷言
//!
//! 名稱比對忽略大小寫；記錄數量與呼叫次數必須完全相符。

use crate::harness::error::AssertionError;
use crate::redis::DATASTORE_PRODUCT;
use crate::telemetry::{DatastoreCallRecord, TelemetrySink, TracedMetricData};
use std::collections::HashMap;

/// 預期的資料存儲呼叫
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedCall {
    pub datastore: String,
    pub operation: String,
    pub count: u64,
}

impl ExpectedCall {
    pub fn new(datastore: &str, operation: &str, count: u64) -> Self {
        Self {
            datastore: datastore.to_string(),
            operation: operation.to_string(),
            count,
        }
    }

    /// Redis 呼叫
    pub fn redis(operation: &str, count: u64) -> Self {
        Self::new(DATASTORE_PRODUCT, operation, count)
    }
}

pub fn assert_transaction_count(actual: usize, expected: usize) -> Result<(), AssertionError> {
    if actual != expected {
        return Err(AssertionError::TransactionCount { expected, actual });
    }
    Ok(())
}

/// 檢查記錄數量，並確認每個預期呼叫都有次數完全相符的記錄
pub fn assert_call_shape(
    sink: &TelemetrySink,
    transaction: &str,
    expected: &[ExpectedCall],
) -> Result<(), AssertionError> {
    check_call_shape(&sink.data_stores(transaction), transaction, expected)
}

fn check_call_shape(
    records: &[DatastoreCallRecord],
    transaction: &str,
    expected: &[ExpectedCall],
) -> Result<(), AssertionError> {
    if records.len() != expected.len() {
        return Err(AssertionError::CallRecordCount {
            transaction: transaction.to_string(),
            expected: expected.len(),
            actual: records.len(),
        });
    }

    for call in expected {
        let record = records
            .iter()
            .find(|record| record.matches(&call.datastore, &call.operation))
            .ok_or_else(|| AssertionError::MissingCallRecord {
                transaction: transaction.to_string(),
                datastore: call.datastore.clone(),
                operation: call.operation.clone(),
            })?;

        if record.count != call.count {
            return Err(AssertionError::CallCountMismatch {
                transaction: transaction.to_string(),
                datastore: call.datastore.clone(),
                operation: call.operation.clone(),
                expected: call.count,
                actual: record.count,
            });
        }
    }
    Ok(())
}

/// 檢查每個預期指標都存在於交易的指標中
pub fn assert_metric_presence(
    sink: &TelemetrySink,
    transaction: &str,
    metric_names: &[&str],
) -> Result<(), AssertionError> {
    check_metric_presence(&sink.metrics_for_transaction(transaction), transaction, metric_names)
}

fn check_metric_presence(
    metrics: &HashMap<String, TracedMetricData>,
    transaction: &str,
    metric_names: &[&str],
) -> Result<(), AssertionError> {
    for expected in metric_names {
        if !metrics.keys().any(|key| key.eq_ignore_ascii_case(expected)) {
            return Err(AssertionError::MissingMetric {
                transaction: transaction.to_string(),
                metric: expected.to_string(),
            });
        }
    }
    Ok(())
}

/// 綁定到單一交易名稱的斷言
pub struct TransactionCheck<'a> {
    sink: &'a TelemetrySink,
    transaction: &'a str,
}

impl<'a> TransactionCheck<'a> {
    pub fn new(sink: &'a TelemetrySink, transaction: &'a str) -> Self {
        Self { sink, transaction }
    }

    pub fn data_stores(&self) -> Vec<DatastoreCallRecord> {
        self.sink.data_stores(self.transaction)
    }

    pub fn call_shape(&self, expected: &[ExpectedCall]) -> Result<(), AssertionError> {
        assert_call_shape(self.sink, self.transaction, expected)
    }

    pub fn call_record_count(&self, expected: usize) -> Result<(), AssertionError> {
        let actual = self.data_stores().len();
        if actual != expected {
            return Err(AssertionError::CallRecordCount {
                transaction: self.transaction.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    pub fn metrics_present(&self, metric_names: &[&str]) -> Result<(), AssertionError> {
        assert_metric_presence(self.sink, self.transaction, metric_names)
    }
}
