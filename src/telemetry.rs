//! 遙測模組
//!
//! 交易範圍、資料存儲呼叫記錄與可查詢、可清除的遙測接收端。

pub mod metrics;
pub mod records;
pub mod sink;
pub mod transaction;

pub use self::metrics::{statement_metric, DatastoreMetrics, METRIC_NAMESPACE};
pub use records::{DatastoreCallRecord, TracedMetricData, TransactionRecord};
pub use sink::TelemetrySink;
pub use transaction::{TransactionContext, TransactionName};
