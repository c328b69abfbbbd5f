//! 驗證框架模組
//!
//! 準備 Redis 環境、在交易範圍內執行場景、等待交易完成並檢查遙測形狀，
//! 每個場景結束後清除接收端。

pub mod assertions;
pub mod error;
pub mod report;
pub mod runner;
pub mod scenario;

pub use assertions::{assert_call_shape, assert_metric_presence, ExpectedCall, TransactionCheck};
pub use error::{AssertionError, HarnessError};
pub use report::{HarnessReport, ScenarioOutcome};
pub use runner::VerificationHarness;
pub use scenario::Scenario;
