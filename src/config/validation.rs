use thiserror::Error;

/// 配置驗證錯誤
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("缺少必要配置項: {0}")]
    MissingField(String),

    #[error("無效的配置值: {0}")]
    InvalidValue(String),

    #[error("配置範圍錯誤: {field} 的值 {value} 不在範圍 {min}..{max} 內")]
    RangeError {
        field: String,
        value: String,
        min: String,
        max: String,
    },
}

/// 配置驗證器trait
pub trait Validator {
    /// 驗證配置
    fn validate(&self) -> Result<(), ValidationError>;
}

/// 驗證工具函數
pub struct ValidationUtils;

impl ValidationUtils {
    /// 驗證配置值是否在閉區間 `[min, max]` 內
    pub fn in_range<T>(value: T, min: T, max: T, field_name: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + ToString,
    {
        if value < min || value > max {
            return Err(ValidationError::RangeError {
                field: field_name.to_string(),
                value: value.to_string(),
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(())
    }

    /// 驗證值是否為允許的選項之一
    pub fn one_of<T>(value: &T, options: &[T], field_name: &str) -> Result<(), ValidationError>
    where
        T: PartialEq + ToString,
    {
        if options.contains(value) {
            return Ok(());
        }
        Err(ValidationError::InvalidValue(format!(
            "{} 的值 {} 不是有效選項: {:?}",
            field_name,
            value.to_string(),
            options.iter().map(ToString::to_string).collect::<Vec<_>>()
        )))
    }

    /// 檢查字串欄位不是空白
    pub fn not_empty(value: &str, field_name: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField(field_name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_in_range_reports_bounds() {
        assert!(ValidationUtils::in_range(6379u16, 1, 65535, "port").is_ok());

        let err = ValidationUtils::in_range(0u16, 1, 65535, "port").unwrap_err();
        assert_matches!(
            err,
            ValidationError::RangeError { ref field, ref value, .. } if field == "port" && value == "0"
        );
    }

    #[test]
    fn test_one_of() {
        let levels = ["info".to_string(), "debug".to_string()];
        assert!(ValidationUtils::one_of(&"info".to_string(), &levels, "log-level").is_ok());
        assert_matches!(
            ValidationUtils::one_of(&"loud".to_string(), &levels, "log-level"),
            Err(ValidationError::InvalidValue(_))
        );
    }

    #[test]
    fn test_not_empty() {
        assert!(ValidationUtils::not_empty("localhost", "host").is_ok());
        assert!(ValidationUtils::not_empty("", "host").is_err());
        assert!(ValidationUtils::not_empty("   ", "host").is_err());
    }
}
