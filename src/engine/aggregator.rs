// ==========================================
// 饲料搅拌批次偏差分析系统 - 加权偏差聚合器
// ==========================================
// 职责: 按批次聚合加权平均偏差 (MÉDIA PONDERADA %)
// 输入: 筛选后的原始行 + 相对权重表
// 输出: 每个批次一条 BatchAggregate，按批次编码排序
// ==========================================
// 单行:
//   abs_dev      = |deviation_pct|
//   w            = weights[food_type]（缺失 → 缺失）
//   adjusted     = planned · w（weight_multiplies_quantity）或 planned
//   contribution = adjusted · (abs_dev · w) / 100
// 批次:
//   avg = Σcontribution / Σadjusted · 100，结果为 0 或非有限值时取 0
// ==========================================

use crate::config::AggregationConfig;
use crate::domain::{BatchAggregate, BatchId, FeedRecord, WeightMap};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// 单行计算结果；任一输入缺失时对应字段为 None
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowContribution {
    pub adjusted_weight: Option<f64>,
    pub contribution: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy)]
struct BatchAccumulator {
    total_adjusted_weight: f64,
    total_contribution: f64,
}

impl BatchAccumulator {
    fn add(&mut self, row: RowContribution) {
        if let Some(w) = row.adjusted_weight {
            self.total_adjusted_weight += w;
        }
        if let Some(c) = row.contribution {
            self.total_contribution += c;
        }
    }

    fn weighted_avg_pct(&self) -> f64 {
        let avg = self.total_contribution / self.total_adjusted_weight * 100.0;
        if avg.is_finite() {
            avg
        } else {
            0.0
        }
    }
}

// ==========================================
// WeightedDeviationAggregator
// ==========================================
pub struct WeightedDeviationAggregator {
    config: AggregationConfig,
}

impl WeightedDeviationAggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    /// 单行贡献
    pub fn row_contribution(&self, record: &FeedRecord, weights: &WeightMap) -> RowContribution {
        let deviation = record.deviation_pct.or_else(|| {
            if self.config.derive_missing_deviation {
                record.derived_deviation_pct()
            } else {
                None
            }
        });
        let abs_deviation = deviation.map(f64::abs);
        let relative_weight = record.food_type.as_deref().and_then(|t| weights.get(t));

        let adjusted_weight = if self.config.weight_multiplies_quantity {
            record.planned_kg.zip(relative_weight).map(|(p, w)| p * w)
        } else {
            record.planned_kg
        };

        let contribution = match (adjusted_weight, abs_deviation, relative_weight) {
            (Some(adj), Some(dev), Some(w)) => Some(adj * (dev * w) / 100.0),
            _ => None,
        };

        RowContribution {
            adjusted_weight,
            contribution,
        }
    }

    /// 按批次聚合；无批次编码的行不参与分组
    #[instrument(skip_all)]
    pub fn aggregate<'a, I>(&self, records: I, weights: &WeightMap) -> Vec<BatchAggregate>
    where
        I: IntoIterator<Item = &'a FeedRecord>,
    {
        let mut groups: BTreeMap<BatchId, BatchAccumulator> = BTreeMap::new();
        let mut rows = 0usize;
        let mut ungrouped = 0usize;

        for record in records {
            rows += 1;
            let Some(batch_id) = record.batch_id.as_ref() else {
                ungrouped += 1;
                continue;
            };
            groups
                .entry(batch_id.clone())
                .or_default()
                .add(self.row_contribution(record, weights));
        }

        debug!(rows, batches = groups.len(), ungrouped, "批次聚合完成");

        groups
            .into_iter()
            .map(|(batch_id, acc)| BatchAggregate {
                batch_id,
                weighted_avg_pct: acc.weighted_avg_pct(),
            })
            .collect()
    }
}

impl Default for WeightedDeviationAggregator {
    fn default() -> Self {
        Self::new(AggregationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(batch: Option<&str>, food_type: &str, planned: f64, deviation: Option<f64>) -> FeedRecord {
        FeedRecord {
            row_number: 2,
            batch_id: batch.map(BatchId::new),
            food_name: None,
            food_type: Some(food_type.to_string()),
            planned_kg: Some(planned),
            actual_kg: None,
            deviation_pct: deviation,
            operator: None,
            diet_name: None,
            timestamp: None,
        }
    }

    fn weights() -> WeightMap {
        [("A", 1.2), ("B", 0.8)].into_iter().collect()
    }

    #[test]
    fn test_single_row_weight_propagation() {
        let rows = vec![row(Some("1"), "A", 100.0, Some(-10.0))];
        let result = WeightedDeviationAggregator::default().aggregate(&rows, &weights());

        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0].weighted_avg_pct, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_two_row_scenario() {
        let rows = vec![
            row(Some("1"), "A", 100.0, Some(-10.0)),
            row(Some("1"), "B", 150.0, Some(-6.67)),
        ];
        let result = WeightedDeviationAggregator::default().aggregate(&rows, &weights());

        // (14.4 + 6.4032) / 240 · 100
        assert_relative_eq!(result[0].weighted_avg_pct, 8.668, epsilon = 1e-3);
    }

    #[test]
    fn test_without_quantity_multiplier() {
        let config = AggregationConfig {
            weight_multiplies_quantity: false,
            ..AggregationConfig::default()
        };
        let rows = vec![row(Some("1"), "A", 100.0, Some(-10.0))];
        let result = WeightedDeviationAggregator::new(config).aggregate(&rows, &weights());

        // adjusted = 100, contribution = 100 · 12 / 100 = 12
        assert_relative_eq!(result[0].weighted_avg_pct, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_weight_sum_falls_back_to_zero() {
        let zero: WeightMap = [("A", 0.0)].into_iter().collect();
        let rows = vec![row(Some("1"), "A", 100.0, Some(-10.0))];
        let result = WeightedDeviationAggregator::default().aggregate(&rows, &zero);
        assert_eq!(result[0].weighted_avg_pct, 0.0);
    }

    #[test]
    fn test_batch_with_only_unmapped_types_is_zero() {
        let rows = vec![
            row(Some("1"), "A", 100.0, Some(-10.0)),
            row(Some("2"), "Y", 200.0, Some(8.0)),
            row(Some("2"), "Z", 300.0, Some(-4.0)),
        ];

        for multiplies in [true, false] {
            let config = AggregationConfig {
                weight_multiplies_quantity: multiplies,
                ..AggregationConfig::default()
            };
            let aggregator = WeightedDeviationAggregator::new(config);

            let contribution = aggregator.row_contribution(&rows[1], &weights());
            assert_eq!(contribution.contribution, None);
            if multiplies {
                assert_eq!(contribution.adjusted_weight, None);
            } else {
                assert_eq!(contribution.adjusted_weight, Some(200.0));
            }

            let result = aggregator.aggregate(&rows, &weights());
            assert_eq!(result.len(), 2);
            assert_eq!(result[1].batch_id, BatchId::new("2"));
            assert_eq!(result[1].weighted_avg_pct, 0.0);
        }
    }

    #[test]
    fn test_unmapped_food_type_is_missing_contribution() {
        let rows = vec![
            row(Some("1"), "A", 100.0, Some(-10.0)),
            row(Some("1"), "Z", 500.0, Some(-50.0)),
        ];
        let result = WeightedDeviationAggregator::default().aggregate(&rows, &weights());
        assert_relative_eq!(result[0].weighted_avg_pct, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_deviation_derived_when_enabled() {
        let mut r = row(Some("1"), "A", 100.0, None);
        r.actual_kg = Some(90.0);
        let rows = vec![r];

        let off = WeightedDeviationAggregator::default().aggregate(&rows, &weights());
        assert_eq!(off[0].weighted_avg_pct, 0.0);

        let config = AggregationConfig {
            derive_missing_deviation: true,
            ..AggregationConfig::default()
        };
        let on = WeightedDeviationAggregator::new(config).aggregate(&rows, &weights());
        assert_relative_eq!(on[0].weighted_avg_pct, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rows_without_batch_are_not_grouped() {
        let rows = vec![
            row(Some("10"), "A", 100.0, Some(5.0)),
            row(None, "A", 100.0, Some(5.0)),
            row(Some("2"), "B", 100.0, Some(5.0)),
        ];
        let result = WeightedDeviationAggregator::default().aggregate(&rows, &weights());

        let ids: Vec<&str> = result.iter().map(|b| b.batch_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "10"]);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let rows = vec![
            row(Some("1"), "A", 100.0, Some(-10.0)),
            row(Some("2"), "B", 150.0, Some(3.0)),
        ];
        let aggregator = WeightedDeviationAggregator::default();
        assert_eq!(
            aggregator.aggregate(&rows, &weights()),
            aggregator.aggregate(&rows, &weights())
        );
    }
}
