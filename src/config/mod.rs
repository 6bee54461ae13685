// ==========================================
// 饲料搅拌批次偏差分析系统 - 配置层
// ==========================================
// 职责: 分析配置加载与校验
// 存储: JSON 文件（可选），否则使用内置默认值
// ==========================================

pub mod analysis_config;
pub mod error;

// 重导出核心配置类型
pub use analysis_config::{
    config_keys, default_config_path, AggregationConfig, AnalysisConfig, ColumnMapping,
    HistogramConfig, IngestOptions, IntervalLimits, OutlierConfig, ReportConfig, SliderConfig,
    StatisticsConfig,
};
pub use error::{ConfigError, ConfigResult};
