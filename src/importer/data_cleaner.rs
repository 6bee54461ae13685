// ==========================================
// 饲料搅拌批次偏差分析系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 数值转换 / 时间解析
// 规则: 无法转换的值一律为 None（缺失），不视为 0
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y%m%d"];

pub struct DataCleaner;

impl DataCleaner {
    /// 清洗文本字段（TRIM）
    pub fn clean_text(&self, value: &str) -> String {
        value.trim().to_string()
    }

    /// 标准化 NULL 值（空字符串/空白 → None）
    pub fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 数值转换
    ///
    /// 分隔符规则:
    /// - 同时出现 '.' 与 ','：最后出现的是小数分隔符，另一个是千位分隔符
    ///   （"1.234,5" → 1234.5，"1,234.5" → 1234.5）
    /// - 只出现一次的分隔符是小数分隔符（"12,5" → 12.5，"2.500" → 2.5）
    /// - 同一分隔符出现多次时按千位分组解析（"1.234.567" → 1234567）
    ///
    /// 千位分组不合法（非 3 位一组）时视为缺失；NaN / inf 视为缺失。
    pub fn coerce_numeric(&self, value: Option<&str>) -> Option<f64> {
        let trimmed = value?.trim();
        if trimmed.is_empty() {
            return None;
        }

        let normalized = normalize_separators(trimmed)?;
        let parsed = normalized.parse::<f64>().ok()?;
        parsed.is_finite().then_some(parsed)
    }

    /// 时间解析；纯日期按当天 00:00:00 处理
    pub fn parse_timestamp(&self, value: Option<&str>) -> Option<NaiveDateTime> {
        let trimmed = value?.trim();
        if trimmed.is_empty() {
            return None;
        }

        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            .or_else(|| {
                DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }
}

/// 统一为 '.' 小数点、无千位分隔符的形式
fn normalize_separators(value: &str) -> Option<String> {
    let last_dot = value.rfind('.');
    let last_comma = value.rfind(',');

    let (decimal, thousands) = match (last_dot, last_comma) {
        (None, None) => return Some(value.to_string()),
        (Some(d), Some(c)) if c > d => (',', '.'),
        (Some(_), Some(_)) => ('.', ','),
        (Some(_), None) => ('.', ','),
        (None, Some(_)) => (',', '.'),
    };

    let decimal_count = value.matches(decimal).count();
    let has_thousands = value.contains(thousands);

    if !has_thousands && decimal_count > 1 {
        // "1.234.567"：只有千位分组，没有小数部分
        return strip_grouping(value, decimal);
    }
    if decimal_count > 1 {
        return None;
    }

    let (int_part, frac_part) = value.split_once(decimal)?;
    if frac_part.contains(thousands) {
        return None;
    }
    let int_part = if has_thousands {
        strip_grouping(int_part, thousands)?
    } else {
        int_part.to_string()
    };
    Some(format!("{}.{}", int_part, frac_part))
}

/// 去掉千位分隔符；首组 1-3 位，其余每组恰好 3 位
fn strip_grouping(value: &str, separator: char) -> Option<String> {
    let mut groups = value.split(separator);
    let first = groups.next()?;
    let first_digits = first.trim_start_matches(['-', '+']);
    if first_digits.is_empty()
        || first_digits.len() > 3
        || !first_digits.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let mut joined = first.to_string();
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        joined.push_str(group);
    }
    Some(joined)
}
