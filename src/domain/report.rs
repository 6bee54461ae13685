// ==========================================
// 饲料搅拌批次偏差分析系统 - 分析结果模型
// ==========================================
// 职责: 直方图分箱、统计记录、单次分析报告
// ==========================================

use crate::domain::batch::{BatchAggregate, DataQualityReport, WeightMap};
use crate::domain::types::{BarTone, DeviationBand};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// 直方图
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBounds {
    pub lower: f64,
    pub upper: f64,
    pub bin_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub tone: BarTone,
}

/// 一次渲染的分箱结果；excluded 为落在 [lower, upper] 之外未绘制的值数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSet {
    pub bounds: HistogramBounds,
    pub bins: Vec<HistogramBin>,
    pub tolerance: f64,
    pub excluded: usize,
}

impl BinSet {
    pub fn total_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

// ==========================================
// 统计记录
// ==========================================

/// 半开区间 [lower, upper)；upper 为 None 表示无上界
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalBand {
    pub lower: f64,
    pub upper: Option<f64>,
}

impl IntervalBand {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && self.upper.map_or(true, |upper| value < upper)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketCount {
    pub band: IntervalBand,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRecord {
    pub batch_count: usize,
    pub mean_pct: Option<f64>,
    pub median_pct: Option<f64>,
    pub buckets: Vec<BucketCount>,
    pub unclassified: usize, // 不属于任何区间的批次数（低于最低下限或区间空隙）
}

// ==========================================
// 分析报告
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedBatch {
    #[serde(flatten)]
    pub aggregate: BatchAggregate,
    pub band: Option<DeviationBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    // ===== 元信息 =====
    pub run_id: Uuid,
    pub generated_at: DateTime<FixedOffset>,
    pub period: Option<(NaiveDate, NaiveDate)>,

    // ===== 输入摘要 =====
    pub filtered_rows: usize,
    pub weights: WeightMap,
    pub weight_multiplies_quantity: bool,
    pub outliers_removed: Option<usize>, // None = 未启用离群剔除
    pub quality: DataQualityReport,

    // ===== 结果 =====
    pub batches: Vec<ClassifiedBatch>,
    pub histogram: Option<BinSet>,
    pub statistics: StatisticsRecord,
}

impl AnalysisReport {
    pub fn total_batches(&self) -> usize {
        self.batches.len()
    }
}

/// 分析结果：筛选为空时返回 NoData，而不是错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    NoData { reason: NoDataReason },
    Completed(Box<AnalysisReport>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    FiltersExcludedAllRows,
    NoGroupableBatches,
}

impl AnalysisOutcome {
    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            AnalysisOutcome::Completed(report) => Some(report),
            AnalysisOutcome::NoData { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_band_half_open() {
        let band = IntervalBand {
            lower: 3.0,
            upper: Some(5.0),
        };
        assert!(band.contains(3.0));
        assert!(band.contains(4.99));
        assert!(!band.contains(5.0));
        assert!(!band.contains(2.99));
    }

    #[test]
    fn test_interval_band_unbounded() {
        let band = IntervalBand {
            lower: 7.0,
            upper: None,
        };
        assert!(band.contains(7.0));
        assert!(band.contains(1e9));
        assert!(!band.contains(6.9));
    }
}
