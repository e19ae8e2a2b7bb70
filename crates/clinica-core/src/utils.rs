//! 通用工具函数

use crate::error::{ClinicaError, Result};

/// 患者年龄上限
pub const MAX_AGE: i32 = 150;

/// 必填文本字段：去除首尾空白后不能为空
pub fn required_text(field: &str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ClinicaError::Validation(format!("{} is required", field))),
    }
}

/// 可选文本字段：空白串视为缺失
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_age(age: i32) -> Result<i32> {
    if (0..=MAX_AGE).contains(&age) {
        Ok(age)
    } else {
        Err(ClinicaError::Validation(format!(
            "edad must be between 0 and {}, got {}",
            MAX_AGE, age
        )))
    }
}
