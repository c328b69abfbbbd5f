use crate::config::types::*;
use crate::config::validation::Validator;
use config::{Config, ConfigError, File, FileFormat};
use serde::de::DeserializeOwned;
use std::env;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 指定 properties 檔路徑的環境變數
pub const CONFIG_PATH_ENV: &str = "REDIS_FIT_CONFIG";

/// 未設定 `REDIS_FIT_CONFIG` 時使用的路徑
pub const DEFAULT_CONFIG_PATH: &str = "config/redis.properties";

/// 配置鍵與覆寫它的環境變數
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    (KEY_EMBEDDED, "REDIS_FIT_EMBEDDED"),
    (KEY_HOST, "REDIS_FIT_HOST"),
    (KEY_PORT, "REDIS_FIT_PORT"),
    (KEY_BINARY, "REDIS_FIT_BINARY"),
    (KEY_DATABASE, "REDIS_FIT_DATABASE"),
    (KEY_STARTUP_TIMEOUT_MS, "REDIS_FIT_STARTUP_TIMEOUT_MS"),
    (KEY_TRANSACTION_WAIT_MS, "REDIS_FIT_TRANSACTION_WAIT_MS"),
    (KEY_POLL_INTERVAL_MS, "REDIS_FIT_POLL_INTERVAL_MS"),
    (KEY_CONNECTION_TIMEOUT_SECS, "REDIS_FIT_CONNECTION_TIMEOUT_SECS"),
    (KEY_LOG_LEVEL, "REDIS_FIT_LOG_LEVEL"),
];

/// 配置加載器
///
/// 讀取 `key=value` 格式的 properties 檔，再以環境變數覆寫。
/// 檔案不存在、格式錯誤或單一鍵的值無法解析時都退回預設值，不會失敗。
pub struct ConfigLoader;

impl ConfigLoader {
    /// 當前使用的 properties 檔路徑
    pub fn config_path() -> PathBuf {
        env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// 組合配置來源（properties 檔 + 環境變數覆寫）
    pub fn build(path: &Path) -> Result<Config, ConfigError> {
        let builder = Config::builder().add_source(
            File::from(path.to_path_buf())
                .format(FileFormat::Ini)
                .required(false),
        );
        Self::with_env_overrides(builder)?.build()
    }

    fn with_env_overrides(
        mut builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        for (key, var) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, env::var(var).ok())?;
        }
        Ok(builder)
    }

    /// 從指定路徑載入配置
    pub fn load(path: &Path) -> HarnessConfig {
        let source = match Self::build(path) {
            Ok(source) => source,
            Err(err) => {
                warn!("無法讀取配置檔 {}: {}，改用預設值", path.display(), err);
                Self::with_env_overrides(Config::builder())
                    .and_then(|builder| builder.build())
                    .unwrap_or_default()
            }
        };

        if path.exists() {
            info!("已讀取配置檔 {}", path.display());
        } else {
            info!("找不到配置檔 {}，使用預設值", path.display());
        }

        let config = HarnessConfig::from_source(&source);
        if let Err(err) = config.validate() {
            warn!("配置驗證失敗: {}", err);
        } else {
            debug!("配置驗證通過");
        }
        config
    }

    /// 載入 `REDIS_FIT_CONFIG` 指向的配置
    pub fn load_current() -> HarnessConfig {
        Self::load(&Self::config_path())
    }
}

/// 配置獲取輔助特性
pub trait ConfigExt {
    /// 讀取單一鍵；缺少時回傳預設值，無法解析時記錄警告並回傳預設值
    fn get_or<T: DeserializeOwned + Debug>(&self, key: &str, default: T) -> T;
}

impl ConfigExt for Config {
    fn get_or<T: DeserializeOwned + Debug>(&self, key: &str, default: T) -> T {
        match self.get::<T>(key) {
            Ok(value) => value,
            Err(ConfigError::NotFound(_)) => default,
            Err(err) => {
                warn!("配置項 {} 無效 ({})，使用預設值 {:?}", key, err, default);
                default
            }
        }
    }
}

impl HarnessConfig {
    /// 逐鍵從配置來源讀取，每個鍵各自退回預設值
    pub fn from_source(source: &Config) -> Self {
        let defaults = Self::default();
        Self {
            redis_server_embedded: source.get_or(KEY_EMBEDDED, defaults.redis_server_embedded),
            redis_server_host: source.get_or(KEY_HOST, defaults.redis_server_host),
            redis_server_port: source.get_or(KEY_PORT, defaults.redis_server_port),
            redis_server_binary: source.get_or(KEY_BINARY, defaults.redis_server_binary),
            redis_database: source.get_or(KEY_DATABASE, defaults.redis_database),
            startup_timeout_ms: source.get_or(KEY_STARTUP_TIMEOUT_MS, defaults.startup_timeout_ms),
            transaction_wait_ms: source
                .get_or(KEY_TRANSACTION_WAIT_MS, defaults.transaction_wait_ms),
            poll_interval_ms: source.get_or(KEY_POLL_INTERVAL_MS, defaults.poll_interval_ms),
            connection_timeout_secs: source
                .get_or(KEY_CONNECTION_TIMEOUT_SECS, defaults.connection_timeout_secs),
            log_level: source.get_or(KEY_LOG_LEVEL, defaults.log_level),
        }
    }
}
