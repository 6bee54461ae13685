// ==========================================
// 饲料搅拌批次偏差分析系统 - 分析 API
// ==========================================
// 职责: 加载数据集、列出筛选选项、默认权重、执行分析、导出
// 调用方: 命令行 (main.rs) 与集成测试
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::AnalysisConfig;
use crate::domain::{AnalysisOutcome, AnalysisReport, FeedDataset, WeightMap};
use crate::engine::{AnalysisOrchestrator, AnalysisRequest};
use crate::export::ReportExporter;
use crate::importer::DatasetLoader;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 数据集中可选的筛选取值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub operators: Vec<String>,
    pub foods: Vec<String>,
    pub diets: Vec<String>,
    pub food_types: Vec<String>,
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
}

// ==========================================
// AnalysisApi
// ==========================================
pub struct AnalysisApi {
    config: AnalysisConfig,
    loader: DatasetLoader,
    orchestrator: AnalysisOrchestrator,
}

impl AnalysisApi {
    /// 使用校验后的配置创建 API
    pub fn new(config: AnalysisConfig) -> ApiResult<Self> {
        config.validate()?;
        let loader = DatasetLoader::from_config(&config);
        let orchestrator = AnalysisOrchestrator::new(config.clone())?;
        Ok(Self {
            config,
            loader,
            orchestrator,
        })
    }

    /// 从配置文件创建；未指定路径时尝试默认位置，不存在则用内置默认值
    pub fn from_config_path(path: Option<&Path>) -> ApiResult<Self> {
        let config = AnalysisConfig::load_or_default(path)?;
        Self::new(config)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    // ==========================================
    // 数据集
    // ==========================================

    pub fn load_dataset<P: AsRef<Path>>(&self, path: P) -> ApiResult<FeedDataset> {
        Ok(self.loader.load(path)?)
    }

    pub fn filter_options(&self, dataset: &FeedDataset) -> FilterOptions {
        FilterOptions {
            operators: dataset.operators(),
            foods: dataset.food_names(),
            diets: dataset.diet_names(),
            food_types: dataset.food_types(),
            date_bounds: dataset.date_bounds(),
        }
    }

    // ==========================================
    // 权重
    // ==========================================

    /// 数据集中每个饲料类型取滑块默认值
    pub fn default_weights(&self, dataset: &FeedDataset) -> WeightMap {
        WeightMap::uniform(dataset.food_types(), self.config.weight_slider.default_value)
    }

    /// 覆盖部分权重；超出滑块范围的值拒绝
    pub fn with_weight_overrides<I, S>(&self, base: WeightMap, overrides: I) -> ApiResult<WeightMap>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut weights = base;
        for (food_type, weight) in overrides {
            let food_type = food_type.into();
            self.check_weight(&food_type, weight)?;
            if !weights.contains(&food_type) {
                warn!(food_type = %food_type, "权重对应的饲料类型不在数据集中");
            }
            weights.insert(food_type, weight);
        }
        Ok(weights)
    }

    fn check_weight(&self, food_type: &str, weight: f64) -> ApiResult<()> {
        let slider = &self.config.weight_slider;
        if !weight.is_finite() || !slider.contains(weight) {
            return Err(ApiError::WeightOutOfRange {
                food_type: food_type.to_string(),
                weight,
                min: slider.min_value,
                max: slider.max_value,
            });
        }
        Ok(())
    }

    // ==========================================
    // 分析与导出
    // ==========================================

    pub fn run_analysis(
        &self,
        dataset: &FeedDataset,
        request: &AnalysisRequest,
    ) -> ApiResult<AnalysisOutcome> {
        for (food_type, weight) in request.weights.iter() {
            self.check_weight(food_type, weight)?;
        }
        if request.weights.is_empty() {
            warn!("权重表为空，所有行的贡献均按缺失处理");
        }

        let outcome = self.orchestrator.run(dataset, request)?;
        if let Some(report) = outcome.report() {
            info!(run_id = %report.run_id, batches = report.total_batches(), "分析请求完成");
        }
        Ok(outcome)
    }

    pub fn export_report<P: AsRef<Path>>(
        &self,
        report: &AnalysisReport,
        dir: P,
    ) -> ApiResult<Vec<PathBuf>> {
        let exporter = ReportExporter::new(&self.config.locale);
        Ok(exporter.export_to_dir(report, dir)?)
    }
}
