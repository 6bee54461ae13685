// ==========================================
// 饲料搅拌批次偏差分析系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行调用
// ==========================================

pub mod analysis_api;
pub mod error;

// 重导出核心类型
pub use analysis_api::{AnalysisApi, FilterOptions};
pub use error::{ApiError, ApiResult};
