// ==========================================
// 饲料搅拌批次偏差分析系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、值对象、分析结果
// 红线: 不含文件读取逻辑,不含计算逻辑
// ==========================================

pub mod batch;
pub mod report;
pub mod types;

// 重导出核心类型
pub use batch::{BatchAggregate, BatchId, DataQualityReport, FeedDataset, FeedRecord, WeightMap};
pub use report::{
    AnalysisOutcome, AnalysisReport, BinSet, BucketCount, ClassifiedBatch, HistogramBin,
    HistogramBounds, IntervalBand, NoDataReason, StatisticsRecord,
};
pub use types::{BarTone, DeviationBand, OutlierFence, Selection, ToneKind};
