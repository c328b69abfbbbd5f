// utils.rs - 公共工具模組
//
// 提供驗證框架各部分共用的輔助函數。

pub mod poll;

pub use poll::{poll_until, poll_until_async};
