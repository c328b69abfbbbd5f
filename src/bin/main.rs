use anyhow::{anyhow, Context, Result};
use clap::Parser;
use redis_trace_fit::config::{ConfigLoader, HarnessConfig, Validator};
use redis_trace_fit::harness::VerificationHarness;
use redis_trace_fit::scenarios;
use redis_trace_fit::telemetry::TelemetrySink;
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "redis_trace_fit", about = "Redis 儀表化驗證工具")]
struct Cli {
    /// properties 配置檔（預設讀取 REDIS_FIT_CONFIG 或 config/redis.properties）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 覆寫配置中的 Redis 端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 只執行指定名稱的場景，可重複
    #[arg(short, long = "scenario")]
    scenarios: Vec<String>,

    /// 以 JSON 輸出報告
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化配置
    let config = match &cli.config {
        Some(path) => ConfigLoader::load(path),
        None => ConfigLoader::load_current(),
    };
    let config = match cli.port {
        Some(port) => config.with_port(port),
        None => config,
    };

    // 初始化日誌系統
    init_logging(&config)?;
    if let Err(err) = config.validate() {
        warn!("配置驗證失敗: {}", err);
    }

    let mut selected = scenarios::all();
    if !cli.scenarios.is_empty() {
        selected.retain(|scenario| cli.scenarios.iter().any(|name| name == scenario.name()));
        if selected.is_empty() {
            return Err(anyhow!("沒有符合的場景: {:?}", cli.scenarios));
        }
    }

    let sink = TelemetrySink::with_poll_interval(config.poll_interval());
    let mut harness = VerificationHarness::setup(config, sink)
        .await
        .context("無法準備 Redis 環境")?;

    let report = harness.run_all(&selected).await;
    harness.shutdown().await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for outcome in &report.outcomes {
            match &outcome.error {
                None => println!("PASS {} ({} ms)", outcome.scenario, outcome.elapsed_ms),
                Some(err) => println!("FAIL {} ({} ms): {}", outcome.scenario, outcome.elapsed_ms, err),
            }
        }
        println!("{}", report.summary());
    }

    if report.all_passed() {
        info!("所有場景通過");
        Ok(())
    } else {
        error!("{}", report.summary());
        std::process::exit(1);
    }
}

// 初始化日誌系統
fn init_logging(config: &HarnessConfig) -> Result<()> {
    let level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO, // 默認為INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("設置日誌系統失敗: {}", e))?;

    info!("日誌系統初始化完成");
    Ok(())
}
