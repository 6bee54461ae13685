// ==========================================
// 饲料搅拌批次偏差分析系统 - 分位数工具
// ==========================================
// 职责: 线性插值分位数、四分位距（与 numpy 默认算法一致）
// 被离群剔除、直方图分箱、统计汇总共用
// ==========================================

/// 已排序样本；构造时丢弃非有限值
#[derive(Debug, Clone)]
pub struct SortedSample(Vec<f64>);

impl SortedSample {
    pub fn new(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        Some(Self(sorted))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.0[0]
    }

    pub fn max(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    /// 第 p 百分位（p 截断到 [0, 100]）
    pub fn percentile(&self, p: f64) -> f64 {
        let p = p.clamp(0.0, 100.0);
        let last = self.0.len() - 1;
        if last == 0 || p >= 100.0 {
            return self.0[last];
        }

        let rank = p / 100.0 * last as f64;
        let lower = rank.floor() as usize;
        let fraction = rank - lower as f64;
        let floor = self.0[lower];
        let ceiling = self.0[(lower + 1).min(last)];

        floor + (ceiling - floor) * fraction
    }

    pub fn median(&self) -> f64 {
        self.percentile(50.0)
    }

    pub fn quartiles(&self) -> Quartiles {
        Quartiles {
            q1: self.percentile(25.0),
            q3: self.percentile(75.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub q3: f64,
}

impl Quartiles {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Tukey 上栅栏 Q3 + 1.5·IQR
    pub fn upper_fence(&self) -> f64 {
        self.q3 + 1.5 * self.iqr()
    }

    /// Tukey 下栅栏 Q1 − 1.5·IQR
    pub fn lower_fence(&self) -> f64 {
        self.q1 - 1.5 * self.iqr()
    }
}
