//! 肯尼亚手机号规范化

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ApiError, Result};

/// 本地格式 07XX / 01XX，国际格式 +254 / 254，或省略前导 0
static KENYAN_MOBILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\+?254|0)?([17]\d{8})$").expect("静态正则表达式必须合法")
});

/// 规范化为 `2547XXXXXXXX` / `2541XXXXXXXX`
///
/// 允许号码中夹杂空格、短横线和括号。
pub fn normalize_kenyan_phone(input: &str) -> Result<String> {
    let compact: String = input
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    KENYAN_MOBILE
        .captures(&compact)
        .and_then(|caps| caps.get(1))
        .map(|subscriber| format!("254{}", subscriber.as_str()))
        .ok_or_else(|| ApiError::InvalidPhone(input.to_string()))
}
