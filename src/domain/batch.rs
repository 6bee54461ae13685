// ==========================================
// 饲料搅拌批次偏差分析系统 - 批次领域模型
// ==========================================
// 职责: 原始行记录、批次标识、相对权重表、批次聚合结果
// 生命周期: 单次分析内有效，计算后不再修改
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ==========================================
// BatchId - 批次标识 (COD. BATIDA)
// ==========================================
// 不透明键；排序时数值型编码按数值比较，排在文本编码之前
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<f64> {
        self.0.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl Ord for BatchId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.total_cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for BatchId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ==========================================
// FeedRecord - 原始行记录（已类型转换）
// ==========================================
// 数值列无法转换时为 None（缺失），不视为 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub row_number: usize, // 源文件行号（含表头偏移）

    // ===== 分组与标签 =====
    pub batch_id: Option<BatchId>,    // 批次编码
    pub food_name: Option<String>,    // 饲料名称 (ALIMENTO)
    pub food_type: Option<String>,    // 饲料类型 (TIPO)，映射到相对权重

    // ===== 数量 =====
    pub planned_kg: Option<f64>,      // 计划量 (PREVISTO)
    pub actual_kg: Option<f64>,       // 实际量 (REALIZADO)
    pub deviation_pct: Option<f64>,   // 偏差百分比 (DIFERENÇA %)，带符号

    // ===== 维度 =====
    pub operator: Option<String>,     // 操作员
    pub diet_name: Option<String>,    // 配方名称
    pub timestamp: Option<NaiveDateTime>, // 称重时间
}

impl FeedRecord {
    /// 由计划量/实际量推导偏差百分比；计划量缺失或为 0 时无法推导
    pub fn derived_deviation_pct(&self) -> Option<f64> {
        match (self.planned_kg, self.actual_kg) {
            (Some(planned), Some(actual)) if planned > 0.0 => {
                Some((actual - planned) / planned * 100.0)
            }
            _ => None,
        }
    }
}

// ==========================================
// DataQualityReport - 数据质量报告
// ==========================================
// 数据质量问题在本地降级为缺失值，这里只做计数供展示
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub total_rows: usize,
    pub missing_numeric: BTreeMap<String, usize>, // 列名 -> 缺失/无法转换的单元格数
    pub missing_batch_id: usize,
    pub missing_timestamp: usize,
}

impl DataQualityReport {
    pub fn is_clean(&self) -> bool {
        self.missing_numeric.values().all(|&n| n == 0)
            && self.missing_batch_id == 0
            && self.missing_timestamp == 0
    }
}

// ==========================================
// FeedDataset - 导入后的数据集
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedDataset {
    pub source: String,            // 源文件路径
    pub headers: Vec<String>,      // 预处理后的表头
    pub records: Vec<FeedRecord>,
    pub quality: DataQualityReport,
}

impl FeedDataset {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 数据集中出现的饲料类型（去重、排序）
    pub fn food_types(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.food_type.as_deref()))
    }

    pub fn operators(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.operator.as_deref()))
    }

    pub fn food_names(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.food_name.as_deref()))
    }

    pub fn diet_names(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.diet_name.as_deref()))
    }

    /// 最早/最晚称重日期
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().filter_map(|r| r.timestamp).map(|t| t.date());
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    values
        .flatten()
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ==========================================
// WeightMap - 相对权重表 (Peso relativo)
// ==========================================
// 未登记的饲料类型返回 None，按缺失贡献处理
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightMap(BTreeMap<String, f64>);

impl WeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有类型使用同一权重
    pub fn uniform<I, S>(food_types: I, weight: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(food_types.into_iter().map(|t| (t.into(), weight)).collect())
    }

    pub fn insert(&mut self, food_type: impl Into<String>, weight: f64) -> Option<f64> {
        self.0.insert(food_type.into(), weight)
    }

    pub fn get(&self, food_type: &str) -> Option<f64> {
        self.0.get(food_type).copied()
    }

    pub fn contains(&self, food_type: &str) -> bool {
        self.0.contains_key(food_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for WeightMap {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ==========================================
// BatchAggregate - 批次加权平均偏差
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAggregate {
    pub batch_id: BatchId,
    pub weighted_avg_pct: f64, // MÉDIA PONDERADA (%)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(food_type: Option<&str>, ts: Option<&str>) -> FeedRecord {
        FeedRecord {
            row_number: 1,
            batch_id: Some(BatchId::new("1")),
            food_name: None,
            food_type: food_type.map(str::to_string),
            planned_kg: Some(100.0),
            actual_kg: Some(90.0),
            deviation_pct: None,
            operator: None,
            diet_name: None,
            timestamp: ts.map(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()),
        }
    }

    #[test]
    fn test_batch_id_numeric_ordering() {
        let mut ids = vec![
            BatchId::new("10"),
            BatchId::new("B-1"),
            BatchId::new("2"),
            BatchId::new("A-9"),
        ];
        ids.sort();
        let ordered: Vec<&str> = ids.iter().map(BatchId::as_str).collect();
        assert_eq!(ordered, vec!["2", "10", "A-9", "B-1"]);
    }

    #[test]
    fn test_derived_deviation_pct() {
        let r = record(None, None);
        assert_eq!(r.derived_deviation_pct(), Some(-10.0));

        let mut zero_planned = record(None, None);
        zero_planned.planned_kg = Some(0.0);
        assert_eq!(zero_planned.derived_deviation_pct(), None);
    }

    #[test]
    fn test_dataset_distinct_values_and_bounds() {
        let dataset = FeedDataset {
            records: vec![
                record(Some("VOLUMOSO"), Some("2024-01-02 08:00:00")),
                record(Some("CONCENTRADO"), Some("2024-01-01 10:30:00")),
                record(Some("VOLUMOSO"), None),
                record(None, Some("2024-01-05 23:00:00")),
            ],
            ..Default::default()
        };

        assert_eq!(dataset.food_types(), vec!["CONCENTRADO", "VOLUMOSO"]);
        let (lo, hi) = dataset.date_bounds().unwrap();
        assert_eq!(lo, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(hi, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn test_weight_map_missing_key() {
        let weights: WeightMap = [("A", 1.2), ("B", 0.8)].into_iter().collect();
        assert_eq!(weights.get("A"), Some(1.2));
        assert_eq!(weights.get("C"), None);
        assert_eq!(weights.len(), 2);
    }
}
