// ==========================================
// 饲料搅拌批次偏差分析系统 - 字段映射器实现
// ==========================================
// 职责: 源列 → FeedRecord 字段 + 类型转换
// 列名来自配置（ColumnMapping），不硬编码
// ==========================================

use crate::config::ColumnMapping;
use crate::domain::{BatchId, FeedRecord};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::importer_trait::{FieldMapper as FieldMapperTrait, RawRow};

pub struct FeedRecordMapper {
    columns: ColumnMapping,
    cleaner: DataCleaner,
}

impl FeedRecordMapper {
    pub fn new(columns: ColumnMapping) -> Self {
        Self {
            columns,
            cleaner: DataCleaner,
        }
    }

    fn text(&self, row: &RawRow, column: &str) -> Option<String> {
        self.cleaner.normalize_null(row.get(column))
    }

    fn number(&self, row: &RawRow, column: &str) -> Option<f64> {
        self.cleaner.coerce_numeric(row.get(column))
    }
}

impl FieldMapperTrait for FeedRecordMapper {
    fn map_row(&self, row: &RawRow) -> FeedRecord {
        let c = &self.columns;
        FeedRecord {
            row_number: row.row_number,

            // 分组与标签
            batch_id: self.text(row, &c.batch_code).map(BatchId::new),
            food_name: self.text(row, &c.food_name),
            food_type: self.text(row, &c.food_type),

            // 数量
            planned_kg: self.number(row, &c.planned),
            actual_kg: self.number(row, &c.actual),
            deviation_pct: self.number(row, &c.deviation_pct),

            // 维度
            operator: self.text(row, &c.operator),
            diet_name: self.text(row, &c.diet_name),
            timestamp: self.cleaner.parse_timestamp(row.get(&c.date)),
        }
    }
}
