// ==========================================
// 饲料搅拌批次偏差分析系统 - 核心库
// ==========================================
// 技术栈: Rust + calamine/csv + serde
// 系统定位: 称重偏差质量控制（单次批量计算，无持久化）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "pt-BR");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 配置层 - 分析配置
pub mod config;

// 导入层 - 外部数据
pub mod importer;

// 引擎层 - 计算规则
pub mod engine;

// 导出层 - CSV 报表
pub mod export;

// API 层 - 业务接口
pub mod api;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 阶段耗时
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    AnalysisOutcome, AnalysisReport, BatchAggregate, BatchId, BinSet, DeviationBand, FeedDataset,
    FeedRecord, OutlierFence, Selection, StatisticsRecord, WeightMap,
};

// 配置
pub use config::AnalysisConfig;

// 引擎
pub use engine::{
    AnalysisOrchestrator, AnalysisRequest, DateRange, FilterCriteria, HistogramEngine,
    OutlierFilter, StatisticsSummarizer, WeightedDeviationAggregator,
};

// API
pub use api::{AnalysisApi, ApiError, ApiResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "batidas-qc";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
