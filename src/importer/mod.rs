// ==========================================
// 饲料搅拌批次偏差分析系统 - 导入层
// ==========================================
// 职责: 外部称重表格导入,生成类型化记录
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod dataset_loader;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod schema_validator;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use dataset_loader::DatasetLoader;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FeedRecordMapper;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use schema_validator::SchemaValidator;

// 重导出 Trait 接口
pub use importer_trait::{FieldMapper, FileParser, RawRow, RawTable};
