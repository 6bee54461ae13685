// ==========================================
// 饲料搅拌批次偏差分析系统 - 导入接口
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 流程: 文件解析 → 表结构校验 → 字段映射
// ==========================================

use crate::config::IngestOptions;
use crate::domain::FeedRecord;
use crate::importer::error::ImportResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// RawTable - 解析后的原始表
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// 原始行（列名 → 单元格文本）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub row_number: usize, // 源文件中的行号（从 1 开始）
    pub cells: HashMap<String, String>,
}

impl RawRow {
    /// 取单元格文本；空白视为缺失
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

// ==========================================
// FileParser Trait
// ==========================================
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始表
    ///
    /// # 参数
    /// - file_path: 文件路径
    /// - options: 预处理选项（跳过行、删除列）
    ///
    /// # 返回
    /// - Ok(RawTable): 表头 + 行记录
    /// - Err: 文件读取错误、格式错误
    fn parse(&self, file_path: &Path, options: &IngestOptions) -> ImportResult<RawTable>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 实现者: FeedRecordMapper
pub trait FieldMapper: Send + Sync {
    /// 将原始行映射为 FeedRecord
    ///
    /// 数值/日期无法转换时字段为 None，不返回错误
    fn map_row(&self, row: &RawRow) -> FeedRecord;
}
