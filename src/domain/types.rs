// ==========================================
// 饲料搅拌批次偏差分析系统 - 领域类型定义
// ==========================================
// 职责: 筛选选择、离群栅栏、偏差分级、柱色调
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ==========================================
// 筛选选择 (Selection)
// ==========================================
// All = 不在该维度过滤（界面上的 "Todos"）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl Selection {
    /// 由取值列表构造；空列表视为 All
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if set.is_empty() {
            Selection::All
        } else {
            Selection::Only(set)
        }
    }

    /// 精确匹配；缺失值只在 All 时通过
    pub fn accepts(&self, value: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(allowed) => value.map_or(false, |v| allowed.contains(v)),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

// ==========================================
// 离群栅栏 (Outlier Fence)
// ==========================================
// 默认只设上栅栏：本领域只有大偏差才算问题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierFence {
    #[default]
    UpperOnly,
    Symmetric,
}

impl fmt::Display for OutlierFence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierFence::UpperOnly => write!(f, "upper_only"),
            OutlierFence::Symmetric => write!(f, "symmetric"),
        }
    }
}

// ==========================================
// 偏差分级 (Deviation Band)
// ==========================================
// 用于导出表格的条件着色，区间为左开右闭
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviationBand {
    Acceptable, // <= low_1
    Attention,  // (low_1, high_1]
    Critical,   // (low_2, high_2]
    Severe,     // > high_2
}

impl DeviationBand {
    /// i18n 键
    pub fn label_key(&self) -> &'static str {
        match self {
            DeviationBand::Acceptable => "band.acceptable",
            DeviationBand::Attention => "band.attention",
            DeviationBand::Critical => "band.critical",
            DeviationBand::Severe => "band.severe",
        }
    }
}

impl fmt::Display for DeviationBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviationBand::Acceptable => write!(f, "ACCEPTABLE"),
            DeviationBand::Attention => write!(f, "ATTENTION"),
            DeviationBand::Critical => write!(f, "CRITICAL"),
            DeviationBand::Severe => write!(f, "SEVERE"),
        }
    }
}

// ==========================================
// 柱色调 (Bar Tone)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneKind {
    LowDeviation,  // 容差以下（绿）
    HighDeviation, // 容差及以上（红）
}

/// 直方图单柱颜色描述：色系 + 强度 [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarTone {
    pub kind: ToneKind,
    pub intensity: f64,
}

impl BarTone {
    /// RGBA，强度作为 alpha
    pub fn rgba(&self) -> [f64; 4] {
        match self.kind {
            ToneKind::HighDeviation => [1.0, 0.0, 0.0, self.intensity],
            ToneKind::LowDeviation => [0.0, 1.0, 0.0, self.intensity],
        }
    }
}
