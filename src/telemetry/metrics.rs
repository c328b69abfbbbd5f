use metrics::{counter, histogram};
use std::time::Duration;

/// 行程層級監控指標命名空間
pub const METRIC_NAMESPACE: &str = "redis_trace_fit";

/// 所有資料存儲呼叫的彙總指標
pub const DATASTORE_ALL: &str = "Datastore/all";

/// 未知集合時的佔位符
pub const UNKNOWN_COLLECTION: &str = "?";

/// `Datastore/statement/<產品>/<集合>/<操作>`，操作名稱轉為大寫
pub fn statement_metric(product: &str, collection: Option<&str>, operation: &str) -> String {
    format!(
        "Datastore/statement/{}/{}/{}",
        product,
        collection.unwrap_or(UNKNOWN_COLLECTION),
        operation.to_uppercase()
    )
}

/// `Datastore/operation/<產品>/<操作>`
pub fn operation_metric(product: &str, operation: &str) -> String {
    format!("Datastore/operation/{}/{}", product, operation.to_uppercase())
}

/// `Datastore/<產品>/all`
pub fn product_rollup_metric(product: &str) -> String {
    format!("Datastore/{}/all", product)
}

/// 透過 `metrics` 門面記錄的行程層級指標
///
/// 未安裝 recorder 時這些呼叫不產生任何效果；交易內的指標由 `TransactionRecord` 保存。
pub struct DatastoreMetrics;

impl DatastoreMetrics {
    /// 記錄一次資料存儲呼叫
    pub fn record_call(product: &'static str, operation: &str, duration: Duration, success: bool) {
        counter!(
            format!("{}.datastore_call", METRIC_NAMESPACE),
            "product" => product,
            "operation" => operation.to_lowercase(),
            "result" => if success { "success" } else { "error" }
        )
        .increment(1);

        histogram!(
            format!("{}.datastore_latency_ns", METRIC_NAMESPACE),
            "product" => product,
            "operation" => operation.to_lowercase()
        )
        .record(duration.as_nanos() as f64);
    }

    /// 記錄一筆完成的交易
    pub fn record_transaction_finished(errored: bool) {
        counter!(
            format!("{}.transaction_finished", METRIC_NAMESPACE),
            "result" => if errored { "error" } else { "success" }
        )
        .increment(1);
    }
}
