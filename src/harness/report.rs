use chrono::{DateTime, Utc};
use serde::Serialize;

/// 單一場景的結果
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub transaction: String,
    pub passed: bool,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// 整批場景的結果
#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl Default for HarnessReport {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: ScenarioOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn outcome(&self, scenario: &str) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| o.scenario == scenario)
    }

    /// 一行摘要，例如 `5 個場景: 4 通過, 1 失敗`
    pub fn summary(&self) -> String {
        format!(
            "{} 個場景: {} 通過, {} 失敗",
            self.outcomes.len(),
            self.passed(),
            self.failed()
        )
    }
}
