// ==========================================
// 饲料搅拌批次偏差分析系统 - 导出层
// ==========================================
// 职责: 将分析报告写出为 CSV 文件
// ==========================================

pub mod csv_export;
pub mod error;

pub use csv_export::{
    CsvReportWriter, ReportExporter, BATCHES_FILE, HISTOGRAM_FILE, STATISTICS_FILE, WEIGHTS_FILE,
};
pub use error::{ExportError, ExportResult};
