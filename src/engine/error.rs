// ==========================================
// 饲料搅拌批次偏差分析系统 - 引擎层错误类型
// ==========================================

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("日期范围无效: 开始日期 {start} 晚于结束日期 {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("小数位数超出范围: {0}")]
    InvalidPrecision(u32),
}

pub type EngineResult<T> = Result<T, EngineError>;
