// ==========================================
// 饲料搅拌批次偏差分析系统 - 直方图分箱引擎
// ==========================================
// 职责: Freedman–Diaconis 分箱 + 各柱颜色
// 规则:
//   lower = min(values)，upper = ceil(Q3 + 1.5·IQR)
//   bin_width = 2·IQR·n^(-1/3)，bin_count = floor(range / bin_width) ∈ [1, max_bins]
//   计数与 numpy.histogram 一致：等宽，最后一柱右端闭合
// ==========================================

use crate::config::HistogramConfig;
use crate::domain::{BarTone, BinSet, HistogramBin, HistogramBounds, ToneKind};
use crate::engine::quantile::SortedSample;
use tracing::{debug, instrument};

pub struct HistogramEngine {
    config: HistogramConfig,
}

impl HistogramEngine {
    pub fn new(config: HistogramConfig) -> Self {
        Self { config }
    }

    /// 计算分箱范围与数量；只考虑 >= 0 的值，无可用值时返回 None
    pub fn compute_bins(&self, values: &[f64]) -> Option<HistogramBounds> {
        let non_negative: Vec<f64> = values.iter().copied().filter(|&v| v >= 0.0).collect();
        let sample = SortedSample::new(&non_negative)?;
        let quartiles = sample.quartiles();
        let iqr = quartiles.iqr();

        let lower = sample.min();
        let mut upper = quartiles.upper_fence().ceil();
        if upper <= lower {
            upper = lower + 1.0;
        }

        let bin_width = 2.0 * iqr * (sample.len() as f64).powf(-1.0 / 3.0);
        let max_bins = self.config.max_bins.max(1);
        let bin_count = if bin_width.is_finite() && bin_width > 0.0 {
            let raw = ((upper - lower) / bin_width).floor();
            if raw.is_finite() {
                (raw as usize).clamp(1, max_bins)
            } else {
                max_bins
            }
        } else {
            1
        };

        Some(HistogramBounds {
            lower,
            upper,
            bin_count,
        })
    }

    /// 生成完整分箱结果（含计数与颜色）
    #[instrument(skip(self, values), fields(n = values.len()))]
    pub fn build(&self, values: &[f64]) -> Option<BinSet> {
        let bounds = self.compute_bins(values)?;
        let width = (bounds.upper - bounds.lower) / bounds.bin_count as f64;
        let tolerance = self.config.tolerance_threshold;

        let mut counts = vec![0usize; bounds.bin_count];
        let mut excluded = 0usize;
        for &v in values.iter().filter(|v| v.is_finite() && **v >= 0.0) {
            if v < bounds.lower || v > bounds.upper {
                excluded += 1;
                continue;
            }
            let idx = if v == bounds.upper {
                bounds.bin_count - 1
            } else {
                (((v - bounds.lower) / width).floor() as usize).min(bounds.bin_count - 1)
            };
            counts[idx] += 1;
        }

        let bins: Vec<HistogramBin> = counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| {
                let lower = bounds.lower + width * i as f64;
                let upper = if i + 1 == bounds.bin_count {
                    bounds.upper
                } else {
                    bounds.lower + width * (i + 1) as f64
                };
                HistogramBin {
                    lower,
                    upper,
                    count,
                    tone: bucket_color(lower, bounds.upper, tolerance),
                }
            })
            .collect();

        debug!(
            lower = bounds.lower,
            upper = bounds.upper,
            bins = bounds.bin_count,
            excluded,
            "直方图分箱完成"
        );

        Some(BinSet {
            bounds,
            bins,
            tolerance,
            excluded,
        })
    }
}

impl Default for HistogramEngine {
    fn default() -> Self {
        Self::new(HistogramConfig::default())
    }
}

/// 单柱颜色
///
/// - 左端 >= 容差：红色系，强度 min((edge − tol)/(max_edge − tol), 1)
/// - 左端 < 容差：绿色系，强度 min((tol − edge)/tol, 1)
///
/// 分母为 0 或非有限值时取满强度
pub fn bucket_color(bin_edge: f64, max_edge: f64, tolerance: f64) -> BarTone {
    if bin_edge >= tolerance {
        BarTone {
            kind: ToneKind::HighDeviation,
            intensity: ratio(bin_edge - tolerance, max_edge - tolerance),
        }
    } else {
        BarTone {
            kind: ToneKind::LowDeviation,
            intensity: ratio(tolerance - bin_edge, tolerance),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    let value = numerator / denominator;
    if denominator <= 0.0 || !value.is_finite() {
        1.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
