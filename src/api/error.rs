// ==========================================
// 饲料搅拌批次偏差分析系统 - API层错误类型
// ==========================================
// 职责: 汇总各层错误，对外给出明确原因
// ==========================================

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::export::ExportError;
use crate::importer::ImportError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 下层错误
    // ==========================================
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("文件导入失败: {0}")]
    Import(#[from] ImportError),

    #[error("分析失败: {0}")]
    Engine(#[from] EngineError),

    #[error("导出失败: {0}")]
    Export(#[from] ExportError),

    // ==========================================
    // 请求校验错误
    // ==========================================
    #[error("权重超出范围: {food_type}={weight}（允许 {min} ~ {max}）")]
    WeightOutOfRange {
        food_type: String,
        weight: f64,
        min: f64,
        max: f64,
    },
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
