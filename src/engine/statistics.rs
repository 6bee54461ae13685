// ==========================================
// 饲料搅拌批次偏差分析系统 - 统计汇总
// ==========================================
// 职责: 批次数、均值、中位数、区间计数、偏差分级
// 区间: 半开 [lower, upper)，最后一个区间无上界
// ==========================================

use crate::config::IntervalLimits;
use crate::domain::{BucketCount, DeviationBand, IntervalBand, StatisticsRecord};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::quantile::SortedSample;

/// f64 可安全表示的小数位上限
const MAX_DECIMAL_PLACES: u32 = 15;

pub struct StatisticsSummarizer {
    decimal_places: u32,
}

impl StatisticsSummarizer {
    pub fn new(decimal_places: u32) -> EngineResult<Self> {
        if decimal_places > MAX_DECIMAL_PLACES {
            return Err(EngineError::InvalidPrecision(decimal_places));
        }
        Ok(Self { decimal_places })
    }

    pub fn summarize(&self, values: &[f64], bands: &[IntervalBand]) -> StatisticsRecord {
        let buckets: Vec<BucketCount> = bands
            .iter()
            .map(|band| BucketCount {
                band: *band,
                count: values.iter().filter(|&&v| band.contains(v)).count(),
            })
            .collect();
        let classified: usize = buckets.iter().map(|b| b.count).sum();

        let (mean_pct, median_pct) = match SortedSample::new(values) {
            Some(sample) => {
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                (
                    Some(round_to(mean, self.decimal_places)),
                    Some(round_to(sample.median(), self.decimal_places)),
                )
            }
            None => (None, None),
        };

        StatisticsRecord {
            batch_count: values.len(),
            mean_pct,
            median_pct,
            buckets,
            unclassified: values.len().saturating_sub(classified),
        }
    }
}

/// 偏差分级（左开右闭）；落在区间空隙中的值返回 None
pub fn classify_deviation(value: f64, limits: &IntervalLimits) -> Option<DeviationBand> {
    if !value.is_finite() {
        return None;
    }
    if value <= limits.low_1 {
        Some(DeviationBand::Acceptable)
    } else if value <= limits.high_1 {
        Some(DeviationBand::Attention)
    } else if value > limits.low_2 && value <= limits.high_2 {
        Some(DeviationBand::Critical)
    } else if value > limits.high_2 {
        Some(DeviationBand::Severe)
    } else {
        None
    }
}

/// 四舍五入到指定小数位（远离零）
pub fn round_to(value: f64, decimal_places: u32) -> f64 {
    let factor = 10f64.powi(decimal_places as i32);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarizer() -> StatisticsSummarizer {
        StatisticsSummarizer::new(1).unwrap()
    }

    #[test]
    fn test_summarize_default_bands() {
        let bands = IntervalLimits::default().bands();
        let values = [1.0, 3.0, 4.9, 5.0, 6.0, 7.0, 12.0];
        let stats = summarizer().summarize(&values, &bands);

        assert_eq!(stats.batch_count, 7);
        let counts: Vec<usize> = stats.buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 2, 2]);
        assert_eq!(stats.unclassified, 1);
        assert_eq!(stats.median_pct, Some(5.0));
        assert_eq!(stats.mean_pct, Some(5.6));
    }

    #[test]
    fn test_boundary_value_belongs_to_one_bucket() {
        let bands = IntervalLimits::default().bands();
        let stats = summarizer().summarize(&[5.0], &bands);
        let total: usize = stats.buckets.iter().map(|b| b.count).sum();
        assert_eq!(total, 1);
        assert_eq!(stats.buckets[1].count, 1);
    }

    #[test]
    fn test_summarize_empty() {
        let bands = IntervalLimits::default().bands();
        let stats = summarizer().summarize(&[], &bands);
        assert_eq!(stats.batch_count, 0);
        assert_eq!(stats.mean_pct, None);
        assert_eq!(stats.median_pct, None);
        assert_eq!(stats.unclassified, 0);
    }

    #[test]
    fn test_invalid_precision() {
        assert!(matches!(
            StatisticsSummarizer::new(40),
            Err(EngineError::InvalidPrecision(40))
        ));
    }

    #[test]
    fn test_classify_deviation() {
        let limits = IntervalLimits::default();
        assert_eq!(classify_deviation(2.0, &limits), Some(DeviationBand::Acceptable));
        assert_eq!(classify_deviation(3.0, &limits), Some(DeviationBand::Acceptable));
        assert_eq!(classify_deviation(4.0, &limits), Some(DeviationBand::Attention));
        assert_eq!(classify_deviation(5.0, &limits), Some(DeviationBand::Attention));
        assert_eq!(classify_deviation(6.5, &limits), Some(DeviationBand::Critical));
        assert_eq!(classify_deviation(7.5, &limits), Some(DeviationBand::Severe));
    }

    #[test]
    fn test_classify_deviation_gap() {
        let limits = IntervalLimits {
            low_1: 3.0,
            high_1: 4.0,
            low_2: 5.0,
            high_2: 7.0,
        };
        assert_eq!(classify_deviation(4.5, &limits), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(8.6677, 1), 8.7);
        assert_eq!(round_to(8.6677, 2), 8.67);
        assert_eq!(round_to(-2.25, 0), -2.0);
    }
}
