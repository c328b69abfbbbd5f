//! 內建驗證場景
//!
//! 涵蓋字串、集合與雜湊命令。每個場景在自己的交易內開啟一條連接、執行命令後關閉。

use crate::harness::{AssertionError, ExpectedCall, Scenario, TransactionCheck};
use crate::redis::{InstrumentedClient, RedisClientError};
use crate::telemetry::{TransactionContext, TransactionName};
use async_trait::async_trait;
use tracing::debug;

fn transaction_name(method: &str) -> TransactionName {
    TransactionName::custom(module_path!(), method)
}

/// SET、APPEND、GET 同一個鍵
pub struct StringScenario;

#[async_trait]
impl Scenario for StringScenario {
    fn name(&self) -> &'static str {
        "string_test"
    }

    fn transaction_name(&self) -> TransactionName {
        transaction_name(self.name())
    }

    async fn traced(
        &self,
        client: &InstrumentedClient,
        txn: TransactionContext,
    ) -> Result<(), RedisClientError> {
        let mut conn = client.connect(&txn).await?;
        let key = "string-test";
        conn.set(key, "OK").await?;
        conn.append(key, "X").await?;
        conn.get(key).await?;
        conn.close();
        Ok(())
    }

    fn verify(&self, check: &TransactionCheck<'_>) -> Result<(), AssertionError> {
        check.call_record_count(3)?;
        check.call_shape(&[
            ExpectedCall::redis("set", 1),
            ExpectedCall::redis("append", 1),
            ExpectedCall::redis("get", 1),
        ])
    }
}

/// SADD、SMEMBERS、SADD、SPOP
pub struct SetScenario;

#[async_trait]
impl Scenario for SetScenario {
    fn name(&self) -> &'static str {
        "set_test"
    }

    fn transaction_name(&self) -> TransactionName {
        transaction_name(self.name())
    }

    async fn traced(
        &self,
        client: &InstrumentedClient,
        txn: TransactionContext,
    ) -> Result<(), RedisClientError> {
        let mut conn = client.connect(&txn).await?;
        let key = "key-Set";
        conn.sadd(key, "a").await?;
        conn.smembers(key).await?;
        conn.sadd(key, vec!["a", "b", "c"]).await?;
        let popped = conn.spop(key).await?;
        debug!("spop: {:?}", popped);
        conn.close();
        Ok(())
    }

    fn verify(&self, check: &TransactionCheck<'_>) -> Result<(), AssertionError> {
        check.metrics_present(&[
            "Datastore/statement/Redis/?/SPOP",
            "Datastore/statement/Redis/?/SMEMBERS",
            "Datastore/statement/Redis/?/SADD",
        ])?;
        check.call_shape(&[
            ExpectedCall::redis("sadd", 2),
            ExpectedCall::redis("smembers", 1),
            ExpectedCall::redis("spop", 1),
        ])
    }
}

/// HDEL、HSET、HDEL
pub struct HashScenario;

#[async_trait]
impl Scenario for HashScenario {
    fn name(&self) -> &'static str {
        "hash_test"
    }

    fn transaction_name(&self) -> TransactionName {
        transaction_name(self.name())
    }

    async fn traced(
        &self,
        client: &InstrumentedClient,
        txn: TransactionContext,
    ) -> Result<(), RedisClientError> {
        let mut conn = client.connect(&txn).await?;
        let key = "key-hash";
        conn.hdel(key, "one").await?;
        conn.hset(key, "one", "1").await?;
        conn.hdel(key, "one").await?;
        conn.close();
        Ok(())
    }

    fn verify(&self, check: &TransactionCheck<'_>) -> Result<(), AssertionError> {
        check.metrics_present(&[
            "Datastore/statement/Redis/?/HSET",
            "Datastore/statement/Redis/?/HDEL",
        ])?;
        check.call_shape(&[ExpectedCall::redis("hdel", 2), ExpectedCall::redis("hset", 1)])
    }
}

/// 單一 SET
pub struct SingleSetScenario;

#[async_trait]
impl Scenario for SingleSetScenario {
    fn name(&self) -> &'static str {
        "do_set"
    }

    fn transaction_name(&self) -> TransactionName {
        transaction_name(self.name())
    }

    async fn traced(
        &self,
        client: &InstrumentedClient,
        txn: TransactionContext,
    ) -> Result<(), RedisClientError> {
        let mut conn = client.connect(&txn).await?;
        conn.set("key", "Hello, Redis!").await?;
        conn.close();
        Ok(())
    }

    fn verify(&self, check: &TransactionCheck<'_>) -> Result<(), AssertionError> {
        check.call_shape(&[ExpectedCall::redis("set", 1)])
    }
}

/// SET 後 GET 同一個鍵
pub struct ReadWriteScenario;

#[async_trait]
impl Scenario for ReadWriteScenario {
    fn name(&self) -> &'static str {
        "readwrite"
    }

    fn transaction_name(&self) -> TransactionName {
        transaction_name(self.name())
    }

    async fn traced(
        &self,
        client: &InstrumentedClient,
        txn: TransactionContext,
    ) -> Result<(), RedisClientError> {
        let mut conn = client.connect(&txn).await?;
        conn.set("foo", "bar").await?;
        let value = conn.get("foo").await?;
        debug!("foo = {:?}", value);
        conn.close();
        Ok(())
    }

    fn verify(&self, check: &TransactionCheck<'_>) -> Result<(), AssertionError> {
        check.call_shape(&[ExpectedCall::redis("set", 1), ExpectedCall::redis("get", 1)])
    }
}

/// 所有內建場景，依執行順序排列
pub fn all() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(StringScenario),
        Box::new(SetScenario),
        Box::new(HashScenario),
        Box::new(SingleSetScenario),
        Box::new(ReadWriteScenario),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_names() {
        let names: Vec<String> = all()
            .iter()
            .map(|scenario| scenario.transaction_name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "OtherTransaction/Custom/redis_trace_fit::scenarios/string_test",
                "OtherTransaction/Custom/redis_trace_fit::scenarios/set_test",
                "OtherTransaction/Custom/redis_trace_fit::scenarios/hash_test",
                "OtherTransaction/Custom/redis_trace_fit::scenarios/do_set",
                "OtherTransaction/Custom/redis_trace_fit::scenarios/readwrite",
            ]
        );
    }

    #[test]
    fn test_scenario_names_are_unique() {
        let mut names: Vec<&str> = all().iter().map(|scenario| scenario.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 5);
    }
}
