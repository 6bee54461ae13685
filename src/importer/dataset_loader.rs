// ==========================================
// 饲料搅拌批次偏差分析系统 - 数据集加载器
// ==========================================
// 职责: 整合导入流程，从文件到 FeedDataset
// 流程: 解析 → 表结构校验 → 字段映射 → 数据质量计数
// ==========================================

use crate::config::{AnalysisConfig, IngestOptions};
use crate::domain::{DataQualityReport, FeedDataset};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::FeedRecordMapper;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::{FieldMapper, FileParser, RawTable};
use crate::importer::schema_validator::SchemaValidator;
use crate::perf::PerfGuard;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

// ==========================================
// DatasetLoader
// ==========================================
pub struct DatasetLoader {
    // 导入组件
    file_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
    schema_validator: SchemaValidator,

    // 配置
    config: AnalysisConfig,
}

impl DatasetLoader {
    /// 创建新的 DatasetLoader 实例
    ///
    /// # 参数
    /// - config: 分析配置（列名映射、预处理选项、数值列）
    /// - file_parser: 文件解析器
    /// - field_mapper: 字段映射器
    pub fn new(
        config: AnalysisConfig,
        file_parser: Box<dyn FileParser>,
        field_mapper: Box<dyn FieldMapper>,
    ) -> Self {
        Self {
            file_parser,
            field_mapper,
            schema_validator: SchemaValidator,
            config,
        }
    }

    /// 按配置装配默认组件（按扩展名选择解析器）
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.clone(),
            Box::new(UniversalFileParser),
            Box::new(FeedRecordMapper::new(config.columns.clone())),
        )
    }

    pub fn ingest_options(&self) -> &IngestOptions {
        &self.config.ingest
    }

    /// 从文件加载数据集
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<FeedDataset> {
        let _perf = PerfGuard::new("load_dataset");
        let path = file_path.as_ref();

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let table = self.file_parser.parse(path, &self.config.ingest)?;
        info!(total_rows = table.rows.len(), "文件解析完成");

        self.load_table(table, path.display().to_string())
    }

    /// 从已解析的原始表构建数据集
    pub fn load_table(&self, table: RawTable, source: String) -> ImportResult<FeedDataset> {
        // === 步骤 2: 表结构校验 ===
        debug!("步骤 2: 表结构校验");
        self.schema_validator
            .validate(&table.headers, &self.config.columns)?;

        // === 步骤 3: 数据质量计数 ===
        let mut quality = self.measure_quality(&table);

        // === 步骤 4: 字段映射 ===
        debug!("步骤 4: 字段映射");
        let records: Vec<_> = table
            .rows
            .iter()
            .map(|row| self.field_mapper.map_row(row))
            .collect();

        quality.missing_batch_id = records.iter().filter(|r| r.batch_id.is_none()).count();
        quality.missing_timestamp = records.iter().filter(|r| r.timestamp.is_none()).count();

        if !quality.is_clean() {
            warn!(
                missing_numeric = ?quality.missing_numeric,
                missing_batch_id = quality.missing_batch_id,
                missing_timestamp = quality.missing_timestamp,
                "存在缺失或无法转换的单元格，已按缺失值处理"
            );
        }

        info!(records = records.len(), "数据集加载完成");

        Ok(FeedDataset {
            source,
            headers: table.headers,
            records,
            quality,
        })
    }

    /// 统计数值列中缺失/无法转换的单元格；文件中不存在的数值列跳过
    fn measure_quality(&self, table: &RawTable) -> DataQualityReport {
        let cleaner = DataCleaner;
        let mut missing_numeric = BTreeMap::new();

        for column in self.config.numeric_columns() {
            if !table.headers.iter().any(|h| *h == column) {
                continue;
            }
            let missing = table
                .rows
                .iter()
                .filter(|row| cleaner.coerce_numeric(row.get(&column)).is_none())
                .count();
            missing_numeric.insert(column, missing);
        }

        DataQualityReport {
            total_rows: table.rows.len(),
            missing_numeric,
            missing_batch_id: 0,
            missing_timestamp: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::error::ImportError;
    use crate::importer::importer_trait::RawRow;
    use std::collections::HashMap;

    fn table(rows: Vec<Vec<(&str, &str)>>) -> RawTable {
        let columns = AnalysisConfig::default().columns;
        RawTable {
            headers: columns
                .required()
                .into_iter()
                .map(|(_, c)| c.to_string())
                .collect(),
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(i, pairs)| RawRow {
                    row_number: i + 2,
                    cells: pairs
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<HashMap<_, _>>(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_load_table_counts_quality_issues() {
        let loader = DatasetLoader::from_config(&AnalysisConfig::default());
        let raw = table(vec![
            vec![
                ("COD. BATIDA", "1"),
                ("PREVISTO (KG)", "100"),
                ("REALIZADO (KG)", "90"),
                ("DIFERENÇA (%)", "-10"),
                ("DATA", "2024-01-01 08:00:00"),
            ],
            vec![
                ("PREVISTO (KG)", "abc"),
                ("REALIZADO (KG)", "90"),
                ("DIFERENÇA (%)", ""),
            ],
        ]);

        let dataset = loader.load_table(raw, "memoria".to_string()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.quality.total_rows, 2);
        assert_eq!(dataset.quality.missing_numeric["PREVISTO (KG)"], 1);
        assert_eq!(dataset.quality.missing_numeric["REALIZADO (KG)"], 0);
        assert_eq!(dataset.quality.missing_numeric["DIFERENÇA (%)"], 1);
        assert_eq!(dataset.quality.missing_batch_id, 1);
        assert_eq!(dataset.quality.missing_timestamp, 1);
        assert!(!dataset.quality.is_clean());
    }

    #[test]
    fn test_load_table_rejects_missing_columns() {
        let loader = DatasetLoader::from_config(&AnalysisConfig::default());
        let raw = RawTable {
            headers: vec!["COD. BATIDA".to_string()],
            rows: Vec::new(),
        };
        let result = loader.load_table(raw, "memoria".to_string());
        assert!(matches!(result, Err(ImportError::MissingColumns { .. })));
    }
}
