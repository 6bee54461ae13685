// ==========================================
// 饲料搅拌批次偏差分析系统 - 分析编排器
// ==========================================
// 用途: 协调各引擎的执行顺序
// 流程: 筛选 → 批次聚合 → 离群剔除(可选) → 直方图 + 统计 → 报告
// ==========================================

use crate::config::AnalysisConfig;
use crate::domain::{
    AnalysisOutcome, AnalysisReport, ClassifiedBatch, FeedDataset, FeedRecord, NoDataReason,
    WeightMap,
};
use crate::engine::aggregator::WeightedDeviationAggregator;
use crate::engine::error::EngineResult;
use crate::engine::filter::{FilterCriteria, RecordFilter};
use crate::engine::histogram::HistogramEngine;
use crate::engine::outlier::OutlierFilter;
use crate::engine::statistics::{classify_deviation, StatisticsSummarizer};
use crate::perf::PerfGuard;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

// ==========================================
// AnalysisRequest - 单次分析请求
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub criteria: FilterCriteria,
    pub weights: WeightMap,
    pub remove_outliers: Option<bool>, // None = 使用配置 outliers.remove
}

impl AnalysisRequest {
    pub fn new(criteria: FilterCriteria, weights: WeightMap) -> Self {
        Self {
            criteria,
            weights,
            remove_outliers: None,
        }
    }

    pub fn with_outlier_removal(mut self, remove: bool) -> Self {
        self.remove_outliers = Some(remove);
        self
    }
}

// ==========================================
// AnalysisOrchestrator - 分析编排器
// ==========================================
pub struct AnalysisOrchestrator {
    config: AnalysisConfig,
    filter: RecordFilter,
    aggregator: WeightedDeviationAggregator,
    outliers: OutlierFilter,
    histogram: HistogramEngine,
    summarizer: StatisticsSummarizer,
}

impl AnalysisOrchestrator {
    pub fn new(config: AnalysisConfig) -> EngineResult<Self> {
        let summarizer = StatisticsSummarizer::new(config.statistics.decimal_places)?;
        Ok(Self {
            filter: RecordFilter::new(),
            aggregator: WeightedDeviationAggregator::new(config.aggregation.clone()),
            outliers: OutlierFilter::new(config.outliers.fence),
            histogram: HistogramEngine::new(config.histogram.clone()),
            summarizer,
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// 执行一次分析
    pub fn run(
        &self,
        dataset: &FeedDataset,
        request: &AnalysisRequest,
    ) -> EngineResult<AnalysisOutcome> {
        self.run_at(dataset, request, Utc::now())
    }

    /// 以指定时间执行分析（报告时间戳可复现）
    #[instrument(skip_all, fields(source = %dataset.source, rows = dataset.len()))]
    pub fn run_at(
        &self,
        dataset: &FeedDataset,
        request: &AnalysisRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<AnalysisOutcome> {
        let _perf = PerfGuard::new("run_analysis");

        // === 步骤 1: 筛选 ===
        let filtered = self.filter.apply(&dataset.records, &request.criteria);
        if filtered.is_empty() {
            info!("筛选后无数据");
            return Ok(AnalysisOutcome::NoData {
                reason: NoDataReason::FiltersExcludedAllRows,
            });
        }

        // === 步骤 2: 批次聚合 ===
        let batches = {
            let _perf = PerfGuard::new("aggregate");
            self.aggregator
                .aggregate(filtered.iter().copied(), &request.weights)
        };
        if batches.is_empty() {
            info!(rows = filtered.len(), "筛选结果中没有可分组的批次");
            return Ok(AnalysisOutcome::NoData {
                reason: NoDataReason::NoGroupableBatches,
            });
        }

        // === 步骤 3: 离群剔除 ===
        let remove = request.remove_outliers.unwrap_or(self.config.outliers.remove);
        let (batches, outliers_removed) = if remove {
            let (kept, removed) = self.outliers.filter_batches(batches);
            (kept, Some(removed))
        } else {
            (batches, None)
        };

        // === 步骤 4: 直方图 + 统计 ===
        let values: Vec<f64> = batches.iter().map(|b| b.weighted_avg_pct).collect();
        let histogram = {
            let _perf = PerfGuard::new("histogram");
            self.histogram.build(&values)
        };
        let limits = &self.config.statistics.interval_limits;
        let statistics = self.summarizer.summarize(&values, &limits.bands());

        let batches: Vec<ClassifiedBatch> = batches
            .into_iter()
            .map(|aggregate| ClassifiedBatch {
                band: classify_deviation(aggregate.weighted_avg_pct, limits),
                aggregate,
            })
            .collect();

        info!(
            filtered_rows = filtered.len(),
            batches = batches.len(),
            outliers_removed = ?outliers_removed,
            mean = ?statistics.mean_pct,
            "分析完成"
        );

        let period = request
            .criteria
            .date_range
            .map(|r| (r.start(), r.end()))
            .or_else(|| period_of(&filtered));

        Ok(AnalysisOutcome::Completed(Box::new(AnalysisReport {
            run_id: Uuid::new_v4(),
            generated_at: now.with_timezone(&self.report_offset()),
            period,
            filtered_rows: filtered.len(),
            weights: request.weights.clone(),
            weight_multiplies_quantity: self.config.aggregation.weight_multiplies_quantity,
            outliers_removed,
            quality: dataset.quality.clone(),
            batches,
            histogram,
            statistics,
        })))
    }

    fn report_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.config.report.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

/// 筛选结果中最早/最晚称重日期
fn period_of(records: &[&FeedRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = records.iter().filter_map(|r| r.timestamp).map(|t| t.date());
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BatchId, DeviationBand, Selection};
    use crate::engine::filter::DateRange;
    use approx::assert_relative_eq;
    use chrono::{NaiveDateTime, TimeZone};

    fn record(batch: &str, food_type: &str, planned: f64, dev: f64, operator: &str, ts: &str) -> FeedRecord {
        FeedRecord {
            row_number: 2,
            batch_id: Some(BatchId::new(batch)),
            food_name: Some(format!("ALIMENTO {}", food_type)),
            food_type: Some(food_type.to_string()),
            planned_kg: Some(planned),
            actual_kg: Some(planned * (1.0 + dev / 100.0)),
            deviation_pct: Some(dev),
            operator: Some(operator.to_string()),
            diet_name: Some("RECRIA".to_string()),
            timestamp: Some(NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap()),
        }
    }

    fn dataset() -> FeedDataset {
        FeedDataset {
            source: "memoria".to_string(),
            records: vec![
                record("1", "A", 100.0, -10.0, "JOAO", "2024-03-01 06:00:00"),
                record("1", "B", 150.0, -6.67, "JOAO", "2024-03-01 06:05:00"),
                record("2", "A", 200.0, 2.0, "MARIA", "2024-03-02 07:00:00"),
                record("3", "A", 200.0, 4.0, "MARIA", "2024-03-03 07:00:00"),
                record("4", "A", 200.0, 3.5, "MARIA", "2024-03-04 07:00:00"),
                record("5", "A", 200.0, 60.0, "JOAO", "2024-03-05 07:00:00"),
            ],
            ..Default::default()
        }
    }

    fn weights() -> WeightMap {
        [("A", 1.2), ("B", 0.8)].into_iter().collect()
    }

    fn orchestrator() -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_run_produces_report() {
        let request = AnalysisRequest::new(FilterCriteria::all(), weights());
        let outcome = orchestrator().run(&dataset(), &request).unwrap();
        let report = outcome.report().expect("report");

        assert_eq!(report.filtered_rows, 6);
        assert_eq!(report.total_batches(), 5);
        assert_eq!(report.outliers_removed, None);
        assert_relative_eq!(report.batches[0].aggregate.weighted_avg_pct, 8.668, epsilon = 1e-3);
        assert_eq!(report.batches[0].band, Some(DeviationBand::Severe));
        assert_eq!(report.batches[1].band, Some(DeviationBand::Acceptable));
        assert_eq!(report.statistics.batch_count, 5);
        assert!(report.histogram.is_some());
        assert_eq!(
            report.period,
            Some((
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
            ))
        );
    }

    #[test]
    fn test_outlier_removal_override() {
        let request = AnalysisRequest::new(FilterCriteria::all(), weights()).with_outlier_removal(true);
        let report = orchestrator().run(&dataset(), &request).unwrap();
        let report = report.report().unwrap();

        assert_eq!(report.outliers_removed, Some(1));
        assert_eq!(report.total_batches(), 4);
        assert!(report
            .batches
            .iter()
            .all(|b| b.aggregate.batch_id != BatchId::new("5")));
    }

    #[test]
    fn test_no_data_when_filters_exclude_everything() {
        let criteria = FilterCriteria {
            operators: Selection::from_values(["PEDRO"]),
            ..FilterCriteria::all()
        };
        let outcome = orchestrator()
            .run(&dataset(), &AnalysisRequest::new(criteria, weights()))
            .unwrap();
        assert_eq!(
            outcome,
            AnalysisOutcome::NoData {
                reason: NoDataReason::FiltersExcludedAllRows
            }
        );
    }

    #[test]
    fn test_no_data_when_no_batch_ids() {
        let mut ds = dataset();
        for r in &mut ds.records {
            r.batch_id = None;
        }
        let outcome = orchestrator()
            .run(&ds, &AnalysisRequest::new(FilterCriteria::all(), weights()))
            .unwrap();
        assert!(matches!(
            outcome,
            AnalysisOutcome::NoData {
                reason: NoDataReason::NoGroupableBatches
            }
        ));
    }

    #[test]
    fn test_period_follows_date_range_and_offset() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
        )
        .unwrap();
        let criteria = FilterCriteria {
            date_range: Some(range),
            ..FilterCriteria::all()
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let outcome = orchestrator()
            .run_at(&dataset(), &AnalysisRequest::new(criteria, weights()), now)
            .unwrap();
        let report = outcome.report().unwrap();

        assert_eq!(report.filtered_rows, 2);
        assert_eq!(report.period, Some((range.start(), range.end())));
        assert_eq!(report.generated_at.offset().local_minus_utc(), -3 * 3600);
        assert_eq!(report.generated_at.to_rfc3339(), "2024-03-10T09:00:00-03:00");
    }
}
