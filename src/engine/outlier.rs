// ==========================================
// 饲料搅拌批次偏差分析系统 - 离群值过滤器
// ==========================================
// 职责: 按 IQR 栅栏剔除离群的批次平均偏差
// 规则: 默认只剔除上侧 (value > Q3 + 1.5·IQR)
// ==========================================

use crate::domain::{BatchAggregate, OutlierFence};
use crate::engine::quantile::SortedSample;
use tracing::debug;

pub struct OutlierFilter {
    fence: OutlierFence,
}

impl OutlierFilter {
    pub fn new(fence: OutlierFence) -> Self {
        Self { fence }
    }

    pub fn fence(&self) -> OutlierFence {
        self.fence
    }

    /// 保留区间 (lower, upper)；lower 为 None 表示无下界
    pub fn bounds(&self, values: &[f64]) -> Option<(Option<f64>, f64)> {
        let quartiles = SortedSample::new(values)?.quartiles();
        let lower = match self.fence {
            OutlierFence::UpperOnly => None,
            OutlierFence::Symmetric => Some(quartiles.lower_fence()),
        };
        Some((lower, quartiles.upper_fence()))
    }

    /// 返回保留的值，顺序不变；空输入返回空
    pub fn remove_outliers(&self, values: &[f64]) -> Vec<f64> {
        let Some((lower, upper)) = self.bounds(values) else {
            return Vec::new();
        };
        values
            .iter()
            .copied()
            .filter(|&v| retained(v, lower, upper))
            .collect()
    }

    /// 对批次结果应用同一栅栏
    pub fn filter_batches(&self, batches: Vec<BatchAggregate>) -> (Vec<BatchAggregate>, usize) {
        let values: Vec<f64> = batches.iter().map(|b| b.weighted_avg_pct).collect();
        let Some((lower, upper)) = self.bounds(&values) else {
            return (Vec::new(), 0);
        };

        let before = batches.len();
        let kept: Vec<BatchAggregate> = batches
            .into_iter()
            .filter(|b| retained(b.weighted_avg_pct, lower, upper))
            .collect();
        let removed = before - kept.len();

        debug!(fence = %self.fence, upper, removed, "离群剔除完成");
        (kept, removed)
    }
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self::new(OutlierFence::default())
    }
}

fn retained(value: f64, lower: Option<f64>, upper: f64) -> bool {
    value <= upper && lower.map_or(true, |lo| value >= lo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BatchId;

    #[test]
    fn test_upper_only_removes_high_tail() {
        let values = [1.0, 2.0, 3.0, 4.0, 100.0];
        let kept = OutlierFilter::default().remove_outliers(&values);
        assert_eq!(kept, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_upper_only_keeps_low_tail() {
        let values = [-100.0, 2.0, 3.0, 4.0, 5.0];
        let kept = OutlierFilter::new(OutlierFence::UpperOnly).remove_outliers(&values);
        assert_eq!(kept.len(), 5);

        let kept = OutlierFilter::new(OutlierFence::Symmetric).remove_outliers(&values);
        assert_eq!(kept, vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_result_is_subset_and_not_larger() {
        let values = [0.5, 3.2, 3.3, 3.9, 4.1, 7.0, 25.0, 2.2];
        let filter = OutlierFilter::default();
        let kept = filter.remove_outliers(&values);
        assert!(kept.len() <= values.len());
        assert!(kept.iter().all(|v| values.contains(v)));

        // 保留值都不超过 Q3 + 1.5·IQR
        let (_, upper) = filter.bounds(&values).unwrap();
        assert!(kept.iter().all(|&v| v <= upper));
        assert!(!kept.contains(&25.0));
    }

    #[test]
    fn test_empty_and_single() {
        assert!(OutlierFilter::default().remove_outliers(&[]).is_empty());
        assert_eq!(OutlierFilter::default().remove_outliers(&[4.2]), vec![4.2]);
    }

    #[test]
    fn test_filter_batches_counts_removed() {
        let batches: Vec<BatchAggregate> = [1.0, 2.0, 3.0, 4.0, 100.0]
            .iter()
            .enumerate()
            .map(|(i, &v)| BatchAggregate {
                batch_id: BatchId::new(i.to_string()),
                weighted_avg_pct: v,
            })
            .collect();

        let (kept, removed) = OutlierFilter::default().filter_batches(batches);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 4);
        assert_eq!(kept[3].batch_id, BatchId::new("3"));
    }
}
