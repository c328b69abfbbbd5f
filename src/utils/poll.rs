//! 有上限的輪詢工具
//!
//! 以固定間隔檢查條件，直到條件成立或到達期限。期限一到立即返回，不會重試。

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// 輪詢同步條件
///
/// 條件在期限前成立時返回 `true`；否則在期限到達時返回 `false`。
/// 條件至少會被檢查一次，即使 `timeout` 為零。
pub async fn poll_until<F>(interval: Duration, timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(interval.min(deadline - now)).await;
    }
}

/// 輪詢非同步條件（例如對 Redis 發送 PING）
pub async fn poll_until_async<F, Fut>(interval: Duration, timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_returns_immediately_when_condition_holds() {
        let started = std::time::Instant::now();
        assert!(poll_until(Duration::from_millis(10), Duration::from_secs(5), || true).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_gives_up_at_deadline() {
        let checks = Cell::new(0);
        let started = std::time::Instant::now();
        let satisfied = poll_until(Duration::from_millis(10), Duration::from_millis(60), || {
            checks.set(checks.get() + 1);
            false
        })
        .await;

        assert!(!satisfied);
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert!(checks.get() >= 2);
    }

    #[tokio::test]
    async fn test_zero_timeout_checks_once() {
        let checks = Cell::new(0);
        let satisfied = poll_until(Duration::from_millis(10), Duration::ZERO, || {
            checks.set(checks.get() + 1);
            false
        })
        .await;

        assert!(!satisfied);
        assert_eq!(checks.get(), 1);
    }

    #[tokio::test]
    async fn test_async_condition_eventually_true() {
        let attempts = Cell::new(0);
        let satisfied = poll_until_async(Duration::from_millis(5), Duration::from_secs(2), || {
            attempts.set(attempts.get() + 1);
            let ready = attempts.get() >= 3;
            async move { ready }
        })
        .await;

        assert!(satisfied);
        assert_eq!(attempts.get(), 3);
    }
}
