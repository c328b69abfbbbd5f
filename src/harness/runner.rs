use crate::config::HarnessConfig;
use crate::harness::assertions::{self, ExpectedCall, TransactionCheck};
use crate::harness::error::{AssertionError, HarnessError};
use crate::harness::report::{HarnessReport, ScenarioOutcome};
use crate::harness::scenario::Scenario;
use crate::redis::{EmbeddedRedisServer, InstrumentedClient};
use crate::telemetry::{TelemetrySink, TransactionName};
use crate::utils::poll_until_async;
use std::time::Instant;
use tracing::{error, info};

/// 驗證框架
///
/// 持有 Redis 客戶端、注入的遙測接收端，以及（內嵌模式下）Redis 子行程。
/// `run_scenario` 需要 `&mut self`，因此同一框架上的場景只能依序執行。
#[derive(Debug)]
pub struct VerificationHarness {
    config: HarnessConfig,
    client: InstrumentedClient,
    sink: TelemetrySink,
    server: Option<EmbeddedRedisServer>,
}

impl VerificationHarness {
    /// 準備環境：視配置啟動內嵌 Redis 或等待外部 Redis 就緒，再建立客戶端
    ///
    /// 任何失敗都是致命的，整批場景無法執行。
    /// 等待已完成交易時使用配置的 `poll-interval-ms`，不使用接收端自身的輪詢間隔。
    pub async fn setup(config: HarnessConfig, sink: TelemetrySink) -> Result<Self, HarnessError> {
        let server = if config.redis_server_embedded {
            info!("啟動內嵌 Redis，端口 {}", config.redis_server_port);
            Some(EmbeddedRedisServer::start(&config).await?)
        } else {
            info!(
                "使用外部 Redis {}:{}",
                config.redis_server_host, config.redis_server_port
            );
            None
        };

        let client = InstrumentedClient::new(&config)?;
        if server.is_none() {
            Self::wait_for_store(&client, &config).await?;
        }

        sink.clear();
        Ok(Self {
            config,
            client,
            sink,
            server,
        })
    }

    async fn wait_for_store(
        client: &InstrumentedClient,
        config: &HarnessConfig,
    ) -> Result<(), HarnessError> {
        let ready = poll_until_async(config.poll_interval(), config.startup_timeout(), || {
            let client = client.clone();
            async move { client.test_connection().await }
        })
        .await;

        if !ready {
            error!("Redis {} 未在期限內回應", client.url());
            return Err(HarnessError::StoreUnreachable {
                url: client.url().to_string(),
                timeout_ms: config.startup_timeout_ms,
            });
        }
        Ok(())
    }

    /// 以既有客戶端建立框架，不管理 Redis 生命週期
    pub fn with_client(config: HarnessConfig, client: InstrumentedClient, sink: TelemetrySink) -> Self {
        Self {
            config,
            client,
            sink,
            server: None,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn client(&self) -> &InstrumentedClient {
        &self.client
    }

    pub fn sink(&self) -> &TelemetrySink {
        &self.sink
    }

    /// 執行單一場景
    ///
    /// 在交易範圍內執行工作，等待恰好一筆已完成交易，再檢查場景的預期形狀。
    /// 不論結果如何，結束前都會清除接收端。
    pub async fn run_scenario(&mut self, scenario: &dyn Scenario) -> Result<(), HarnessError> {
        let name = scenario.transaction_name();
        info!("執行場景 {} ({})", scenario.name(), name);

        let result = self.execute_and_verify(scenario, &name).await;
        self.sink.clear();

        match &result {
            Ok(()) => info!("場景 {} 通過", scenario.name()),
            Err(err) => error!("場景 {} 失敗: {}", scenario.name(), err),
        }
        result
    }

    async fn execute_and_verify(
        &self,
        scenario: &dyn Scenario,
        name: &TransactionName,
    ) -> Result<(), HarnessError> {
        let client = &self.client;
        self.sink
            .in_transaction(name.clone(), |txn| scenario.traced(client, txn))
            .await
            .map_err(|source| HarnessError::Operation {
                scenario: scenario.name().to_string(),
                source,
            })?;

        let finished = self
            .sink
            .finished_transaction_count_every(
                self.config.poll_interval(),
                self.config.transaction_wait(),
            )
            .await;
        assertions::assert_transaction_count(finished, 1)?;

        scenario.verify(&TransactionCheck::new(&self.sink, name.as_str()))?;
        Ok(())
    }

    /// 依序執行所有場景；單一場景失敗不影響其他場景
    pub async fn run_all(&mut self, scenarios: &[Box<dyn Scenario>]) -> HarnessReport {
        let mut report = HarnessReport::new();
        for scenario in scenarios {
            let started = Instant::now();
            let result = self.run_scenario(scenario.as_ref()).await;
            report.push(ScenarioOutcome {
                scenario: scenario.name().to_string(),
                transaction: scenario.transaction_name().to_string(),
                passed: result.is_ok(),
                error: result.err().map(|err| err.to_string()),
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }
        info!("{}", report.summary());
        report
    }

    pub fn assert_call_shape(
        &self,
        transaction: &str,
        expected: &[ExpectedCall],
    ) -> Result<(), AssertionError> {
        assertions::assert_call_shape(&self.sink, transaction, expected)
    }

    pub fn assert_metric_presence(
        &self,
        transaction: &str,
        metric_names: &[&str],
    ) -> Result<(), AssertionError> {
        assertions::assert_metric_presence(&self.sink, transaction, metric_names)
    }

    /// 清除接收端
    pub fn clear(&self) {
        self.sink.clear();
    }

    /// 釋放客戶端並停止內嵌 Redis
    pub async fn shutdown(self) {
        let Self { client, server, .. } = self;
        drop(client);
        if let Some(server) = server {
            server.stop().await;
        }
        info!("驗證框架已關閉");
    }
}
