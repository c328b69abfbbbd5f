//! 內嵌 Redis 服務
//!
//! 以子行程啟動 `redis-server`，並主動 PING 直到服務就緒或超過期限。

use crate::config::HarnessConfig;
use crate::redis::client::{InstrumentedClient, RedisClientError};
use crate::utils::poll_until_async;
use std::io::ErrorKind;
use std::net::TcpListener;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// 內嵌 Redis 錯誤
#[derive(Error, Debug)]
pub enum EmbeddedServerError {
    #[error("無法啟動 {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("端口 {port} 已被其他行程佔用")]
    PortInUse { port: u16 },

    #[error("內嵌 Redis 在就緒前退出 (端口 {port}, {status})")]
    ExitedEarly { port: u16, status: ExitStatus },

    #[error("內嵌 Redis 在 {timeout_ms} 毫秒內未就緒 (端口 {port})")]
    NotReady { port: u16, timeout_ms: u64 },

    #[error("內嵌 Redis 行程錯誤: {0}")]
    Process(#[from] std::io::Error),

    #[error(transparent)]
    Client(#[from] RedisClientError),
}

/// 執行中的內嵌 Redis 服務
///
/// 丟棄時子行程會被終止；正常流程應呼叫 `stop`。
#[derive(Debug)]
pub struct EmbeddedRedisServer {
    child: Child,
    port: u16,
}

impl EmbeddedRedisServer {
    /// 檢查 redis-server 執行檔是否可用
    pub fn binary_available(binary: &str) -> bool {
        std::process::Command::new(binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// 在配置的端口啟動服務並等待就緒
    ///
    /// 端口已被佔用時不啟動子行程；只有回應 `INFO` 的行程 ID 與子行程相同才算就緒。
    pub async fn start(config: &HarnessConfig) -> Result<Self, EmbeddedServerError> {
        let port = config.redis_server_port;
        let binary = config.redis_server_binary.clone();
        Self::ensure_port_free(port)?;

        let child = Command::new(&binary)
            .arg("--port")
            .arg(port.to_string())
            .args(["--save", "", "--appendonly", "no"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EmbeddedServerError::Spawn {
                binary: binary.clone(),
                source,
            })?;
        debug!("已啟動 {} (pid {:?})，端口 {}", binary, child.id(), port);

        let mut server = Self { child, port };
        let client = InstrumentedClient::new(config)?;
        if let Err(err) = server.wait_until_ready(&client, config).await {
            server.kill().await;
            return Err(err);
        }

        info!("內嵌 Redis 已在端口 {} 就緒", port);
        Ok(server)
    }

    fn ensure_port_free(port: u16) -> Result<(), EmbeddedServerError> {
        match TcpListener::bind(("0.0.0.0", port)) {
            Ok(listener) => {
                drop(listener);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::AddrInUse => {
                warn!("端口 {} 已被佔用，不啟動內嵌 Redis", port);
                Err(EmbeddedServerError::PortInUse { port })
            }
            Err(err) => {
                debug!("無法預先檢查端口 {}: {}", port, err);
                Ok(())
            }
        }
    }

    async fn wait_until_ready(
        &mut self,
        client: &InstrumentedClient,
        config: &HarnessConfig,
    ) -> Result<(), EmbeddedServerError> {
        let pid = self.child.id();
        let child = &mut self.child;
        let mut exited: Option<ExitStatus> = None;
        let mut wait_error: Option<std::io::Error> = None;

        let ready = poll_until_async(config.poll_interval(), config.startup_timeout(), || {
            if exited.is_none() && wait_error.is_none() {
                match child.try_wait() {
                    Ok(status) => exited = status,
                    Err(err) => wait_error = Some(err),
                }
            }
            let stop = exited.is_some() || wait_error.is_some();
            let client = client.clone();
            async move { stop || Self::answered_by(&client, pid).await }
        })
        .await;

        if let Some(err) = wait_error {
            return Err(EmbeddedServerError::Process(err));
        }
        if let Some(status) = exited {
            return Err(EmbeddedServerError::ExitedEarly {
                port: self.port,
                status,
            });
        }
        if !ready {
            return Err(EmbeddedServerError::NotReady {
                port: self.port,
                timeout_ms: config.startup_timeout_ms,
            });
        }
        Ok(())
    }

    // 回應者必須是子行程本身
    async fn answered_by(client: &InstrumentedClient, pid: Option<u32>) -> bool {
        if !client.test_connection().await {
            return false;
        }
        match client.server_process_id().await {
            Ok(Some(responder)) if Some(responder) == pid => true,
            Ok(responder) => {
                warn!("端口上的 Redis 行程 {:?} 不是內嵌子行程 {:?}", responder, pid);
                false
            }
            Err(err) => {
                debug!("無法查詢 Redis 行程 ID: {}", err);
                false
            }
        }
    }

    async fn kill(&mut self) {
        if let Err(err) = self.child.kill().await {
            warn!("無法終止內嵌 Redis (端口 {}): {}", self.port, err);
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// 停止服務並等待子行程結束
    pub async fn stop(mut self) {
        self.kill().await;
        info!("內嵌 Redis 已停止 (端口 {})", self.port);
    }
}
