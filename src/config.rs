/// 配置管理模組
///
/// 本模組負責從 properties 檔與環境變數加載、驗證驗證框架的配置。
/// 任何無效或缺少的配置項都退回預設值。
// 宣告子模組
pub mod loader;
pub mod types;
pub mod validation;

// 重新導出常用組件
pub use loader::{ConfigExt, ConfigLoader, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
pub use types::*;
pub use validation::{ValidationError, ValidationUtils, Validator};
