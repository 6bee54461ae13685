// ==========================================
// 饲料搅拌批次偏差分析系统 - 引擎层
// ==========================================
// 职责: 筛选、加权聚合、离群剔除、分箱、统计
// 红线: 引擎不读文件，只处理已类型化的记录
// ==========================================

pub mod aggregator;
pub mod error;
pub mod filter;
pub mod histogram;
pub mod orchestrator;
pub mod outlier;
pub mod quantile;
pub mod statistics;

// 重导出核心引擎
pub use aggregator::{RowContribution, WeightedDeviationAggregator};
pub use error::{EngineError, EngineResult};
pub use filter::{DateRange, FilterCriteria, RecordFilter};
pub use histogram::{bucket_color, HistogramEngine};
pub use orchestrator::{AnalysisOrchestrator, AnalysisRequest};
pub use outlier::OutlierFilter;
pub use quantile::{Quartiles, SortedSample};
pub use statistics::{classify_deviation, round_to, StatisticsSummarizer};
