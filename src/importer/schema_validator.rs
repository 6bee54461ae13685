// ==========================================
// 饲料搅拌批次偏差分析系统 - 表结构校验器
// ==========================================
// 职责: 按列名严格校验必需列（不按位置推断）
// 规则: 缺失列一次性全部报告；必需列重复出现即报错
// ==========================================

use crate::config::ColumnMapping;
use crate::importer::error::{ImportError, ImportResult};
use tracing::warn;

pub struct SchemaValidator;

impl SchemaValidator {
    pub fn validate(&self, headers: &[String], columns: &ColumnMapping) -> ImportResult<()> {
        let mut missing = Vec::new();

        for (key, column) in columns.required() {
            match headers.iter().filter(|h| h.as_str() == column).count() {
                0 => {
                    warn!(config_key = key, column = column, "必需列缺失");
                    missing.push(column.to_string());
                }
                1 => {}
                _ => return Err(ImportError::DuplicateColumn(column.to_string())),
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MissingColumns { columns: missing })
        }
    }
}
