use crate::harness::assertions::TransactionCheck;
use crate::harness::error::AssertionError;
use crate::redis::{InstrumentedClient, RedisClientError};
use crate::telemetry::{TransactionContext, TransactionName};
use async_trait::async_trait;

/// 一個驗證場景：被追蹤的工作加上對其遙測的預期
#[async_trait]
pub trait Scenario: Send + Sync {
    /// 場景名稱（報告用）
    fn name(&self) -> &'static str;

    /// 工作所屬交易的名稱
    fn transaction_name(&self) -> TransactionName;

    /// 在交易範圍內執行的工作；連接需在工作內開啟並關閉
    async fn traced(
        &self,
        client: &InstrumentedClient,
        txn: TransactionContext,
    ) -> Result<(), RedisClientError>;

    /// 交易完成後的形狀檢查
    fn verify(&self, check: &TransactionCheck<'_>) -> Result<(), AssertionError>;
}
