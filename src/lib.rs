// 模組定義
pub mod config;
pub mod harness;
pub mod redis;
pub mod scenarios;
pub mod telemetry;
pub mod utils;
