// ==========================================
// 饲料搅拌批次偏差分析系统 - 分析配置
// ==========================================
// 职责: 配置结构定义、JSON 加载、必填项检查、取值校验
// 约定: 配置是不可变值，由调用方显式传入各组件
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::report::IntervalBand;
use crate::domain::types::OutlierFence;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const COLUMNS: &str = "columns";
    pub const COLUMN_BATCH_CODE: &str = "columns.batch_code";
    pub const COLUMN_FOOD_NAME: &str = "columns.food_name";
    pub const COLUMN_FOOD_TYPE: &str = "columns.food_type";
    pub const COLUMN_PLANNED: &str = "columns.planned";
    pub const COLUMN_ACTUAL: &str = "columns.actual";
    pub const COLUMN_DEVIATION_PCT: &str = "columns.deviation_pct";
    pub const COLUMN_OPERATOR: &str = "columns.operator";
    pub const COLUMN_DIET_NAME: &str = "columns.diet_name";
    pub const COLUMN_DATE: &str = "columns.date";

    pub const STATISTICS: &str = "statistics";
    pub const INTERVAL_LIMITS: &str = "statistics.interval_limits";
    pub const DECIMAL_PLACES: &str = "statistics.decimal_places";

    pub const TOLERANCE_THRESHOLD: &str = "histogram.tolerance_threshold";
    pub const MAX_BINS: &str = "histogram.max_bins";
    pub const WEIGHT_SLIDER: &str = "weight_slider";
    pub const UTC_OFFSET_HOURS: &str = "report.utc_offset_hours";

    /// 从文件加载时必须显式给出的键
    pub const REQUIRED: &[&str] = &[
        COLUMNS,
        COLUMN_BATCH_CODE,
        COLUMN_FOOD_NAME,
        COLUMN_FOOD_TYPE,
        COLUMN_PLANNED,
        COLUMN_ACTUAL,
        COLUMN_DEVIATION_PCT,
        COLUMN_OPERATOR,
        COLUMN_DIET_NAME,
        COLUMN_DATE,
        STATISTICS,
        INTERVAL_LIMITS,
    ];
}

// ==========================================
// 列名映射
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub batch_code: String,
    pub food_name: String,
    pub food_type: String,
    pub planned: String,
    pub actual: String,
    pub deviation_pct: String,
    pub operator: String,
    pub diet_name: String,
    pub date: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            batch_code: "COD. BATIDA".to_string(),
            food_name: "ALIMENTO".to_string(),
            food_type: "TIPO".to_string(),
            planned: "PREVISTO (KG)".to_string(),
            actual: "REALIZADO (KG)".to_string(),
            deviation_pct: "DIFERENÇA (%)".to_string(),
            operator: "OPERADOR".to_string(),
            diet_name: "NOME".to_string(),
            date: "DATA".to_string(),
        }
    }
}

impl ColumnMapping {
    /// (配置键, 列名) 列表，用于必填列检查
    pub fn required(&self) -> Vec<(&'static str, &str)> {
        use config_keys::*;
        vec![
            (COLUMN_BATCH_CODE, self.batch_code.as_str()),
            (COLUMN_FOOD_NAME, self.food_name.as_str()),
            (COLUMN_FOOD_TYPE, self.food_type.as_str()),
            (COLUMN_PLANNED, self.planned.as_str()),
            (COLUMN_ACTUAL, self.actual.as_str()),
            (COLUMN_DEVIATION_PCT, self.deviation_pct.as_str()),
            (COLUMN_OPERATOR, self.operator.as_str()),
            (COLUMN_DIET_NAME, self.diet_name.as_str()),
            (COLUMN_DATE, self.date.as_str()),
        ]
    }

    /// 默认参与数值转换的列
    pub fn numeric(&self) -> Vec<String> {
        vec![
            self.planned.clone(),
            self.actual.clone(),
            self.deviation_pct.clone(),
        ]
    }
}

// ==========================================
// 各配置段
// ==========================================

/// 文件预处理（由导入层执行）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub skip_rows: usize,
    pub remove_first_column: bool,
    pub columns_to_remove: Vec<String>,
    pub sheet_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub weight_multiplies_quantity: bool, // peso_multiplicador
    pub derive_missing_deviation: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            weight_multiplies_quantity: true,
            derive_missing_deviation: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    pub remove: bool,
    pub fence: OutlierFence,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalLimits {
    pub low_1: f64,
    pub high_1: f64,
    pub low_2: f64,
    pub high_2: f64,
}

impl Default for IntervalLimits {
    fn default() -> Self {
        Self {
            low_1: 3.0,
            high_1: 5.0,
            low_2: 5.0,
            high_2: 7.0,
        }
    }
}

impl IntervalLimits {
    /// [low_1, high_1), [low_2, high_2), [high_2, +inf)
    pub fn bands(&self) -> Vec<IntervalBand> {
        vec![
            IntervalBand {
                lower: self.low_1,
                upper: Some(self.high_1),
            },
            IntervalBand {
                lower: self.low_2,
                upper: Some(self.high_2),
            },
            IntervalBand {
                lower: self.high_2,
                upper: None,
            },
        ]
    }

    fn validate(&self) -> ConfigResult<()> {
        let values = [self.low_1, self.high_1, self.low_2, self.high_2];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(invalid(config_keys::INTERVAL_LIMITS, "区间上下限必须为有限数值"));
        }
        if self.low_1 < 0.0 {
            return Err(invalid(config_keys::INTERVAL_LIMITS, "low_1 不能为负数"));
        }
        if !(self.low_1 <= self.high_1 && self.high_1 <= self.low_2 && self.low_2 <= self.high_2) {
            return Err(invalid(
                config_keys::INTERVAL_LIMITS,
                &format!(
                    "要求 low_1 <= high_1 <= low_2 <= high_2，实际 {} / {} / {} / {}",
                    self.low_1, self.high_1, self.low_2, self.high_2
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsConfig {
    pub interval_limits: IntervalLimits,
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
}

fn default_decimal_places() -> u32 {
    1
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            interval_limits: IntervalLimits::default(),
            decimal_places: default_decimal_places(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    pub tolerance_threshold: f64, // Tolerância (%)
    pub max_bins: usize,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            tolerance_threshold: 3.0,
            max_bins: 100,
        }
    }
}

/// 相对权重输入范围
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliderConfig {
    pub min_value: f64,
    pub max_value: f64,
    pub default_value: f64,
    pub step: f64,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            min_value: 0.0,
            max_value: 10.0,
            default_value: 1.0,
            step: 0.1,
        }
    }
}

impl SliderConfig {
    pub fn contains(&self, weight: f64) -> bool {
        weight.is_finite() && weight >= self.min_value && weight <= self.max_value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub utc_offset_hours: i32, // 报告时间所用时区（巴西利亚 = -3）
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: -3,
        }
    }
}

fn default_locale() -> String {
    "pt-BR".to_string()
}

// ==========================================
// AnalysisConfig - 顶层配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub columns: ColumnMapping,
    #[serde(default)]
    pub numeric_columns: Vec<String>, // 为空时取 columns 中的数量列
    #[serde(default)]
    pub ingest: IngestOptions,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub outliers: OutlierConfig,
    pub statistics: StatisticsConfig,
    #[serde(default)]
    pub histogram: HistogramConfig,
    #[serde(default)]
    pub weight_slider: SliderConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            numeric_columns: Vec::new(),
            ingest: IngestOptions::default(),
            aggregation: AggregationConfig::default(),
            outliers: OutlierConfig::default(),
            statistics: StatisticsConfig::default(),
            histogram: HistogramConfig::default(),
            weight_slider: SliderConfig::default(),
            report: ReportConfig::default(),
            locale: default_locale(),
        }
    }
}

impl AnalysisConfig {
    /// 从 JSON 字符串加载（检查必填项 + 校验取值）
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(raw)?;

        for key in config_keys::REQUIRED {
            if lookup(&value, key).is_none() {
                return Err(ConfigError::MissingKey {
                    key: key.to_string(),
                });
            }
        }

        let config: AnalysisConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&raw)?;
        info!(path = %path.display(), "配置加载完成");
        Ok(config)
    }

    /// 显式路径优先，其次默认位置，都没有时使用内置默认值
    pub fn load_or_default(explicit: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            return Self::from_json_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_json_file(path),
            _ => {
                debug!("未找到配置文件，使用内置默认配置");
                Ok(Self::default())
            }
        }
    }

    /// 取值校验
    pub fn validate(&self) -> ConfigResult<()> {
        for (key, column) in self.columns.required() {
            if column.trim().is_empty() {
                return Err(invalid(key, "列名不能为空"));
            }
        }

        self.statistics.interval_limits.validate()?;
        if self.statistics.decimal_places > 6 {
            return Err(invalid(config_keys::DECIMAL_PLACES, "小数位数不能超过 6"));
        }

        let tolerance = self.histogram.tolerance_threshold;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(invalid(
                config_keys::TOLERANCE_THRESHOLD,
                &format!("容差必须为非负有限数值，实际 {}", tolerance),
            ));
        }
        if self.histogram.max_bins == 0 {
            return Err(invalid(config_keys::MAX_BINS, "分箱上限至少为 1"));
        }

        let slider = &self.weight_slider;
        if !(slider.min_value >= 0.0
            && slider.min_value <= slider.default_value
            && slider.default_value <= slider.max_value)
        {
            return Err(invalid(
                config_keys::WEIGHT_SLIDER,
                &format!(
                    "要求 0 <= min <= default <= max，实际 {} / {} / {}",
                    slider.min_value, slider.default_value, slider.max_value
                ),
            ));
        }
        if !(slider.step > 0.0) {
            return Err(invalid(config_keys::WEIGHT_SLIDER, "step 必须大于 0"));
        }

        if !(-12..=14).contains(&self.report.utc_offset_hours) {
            return Err(invalid(
                config_keys::UTC_OFFSET_HOURS,
                &format!("时区偏移超出范围: {}", self.report.utc_offset_hours),
            ));
        }

        Ok(())
    }

    /// 参与数值转换的列（未配置时使用数量列）
    pub fn numeric_columns(&self) -> Vec<String> {
        if self.numeric_columns.is_empty() {
            self.columns.numeric()
        } else {
            self.numeric_columns.clone()
        }
    }
}

/// 默认配置路径: <config_dir>/batidas-qc/config.json
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("batidas-qc").join("config.json"))
}

/// 按 "a.b.c" 路径查找 JSON 值
fn lookup<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(value, |current, segment| current.get(segment))
        .filter(|v| !v.is_null())
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
