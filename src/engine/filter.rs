// ==========================================
// 饲料搅拌批次偏差分析系统 - 记录筛选器
// ==========================================
// 职责: 按操作员/饲料/配方/日期范围筛选原始行
// 规则: 各维度之间为 AND；结束日期扩展到当日 23:59:59
// ==========================================

use crate::domain::{FeedRecord, Selection};
use crate::engine::error::{EngineError, EngineResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

// ==========================================
// DateRange - 闭区间日期范围
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> EngineResult<Self> {
        if start > end {
            return Err(EngineError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// 起点: 开始日期 00:00:00
    pub fn start_datetime(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// 终点: 结束日期 23:59:59（包含当日全部称重）
    pub fn end_datetime(&self) -> NaiveDateTime {
        self.end.and_hms_opt(23, 59, 59).unwrap_or_else(|| self.end.and_time(NaiveTime::MIN))
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        timestamp >= self.start_datetime() && timestamp <= self.end_datetime()
    }
}

// ==========================================
// FilterCriteria - 筛选条件
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub operators: Selection,
    pub foods: Selection,
    pub diets: Selection,
    pub date_range: Option<DateRange>,
}

impl FilterCriteria {
    /// 不做任何筛选
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.operators.is_all()
            && self.foods.is_all()
            && self.diets.is_all()
            && self.date_range.is_none()
    }

    /// 单条记录是否满足全部条件
    ///
    /// 设置日期范围时，时间戳缺失的记录被排除
    pub fn matches(&self, record: &FeedRecord) -> bool {
        if !self.operators.accepts(record.operator.as_deref()) {
            return false;
        }
        if !self.foods.accepts(record.food_name.as_deref()) {
            return false;
        }
        if !self.diets.accepts(record.diet_name.as_deref()) {
            return false;
        }
        match (&self.date_range, record.timestamp) {
            (None, _) => true,
            (Some(range), Some(ts)) => range.contains(ts),
            (Some(_), None) => false,
        }
    }
}

// ==========================================
// RecordFilter
// ==========================================
pub struct RecordFilter;

impl RecordFilter {
    pub fn new() -> Self {
        Self
    }

    /// 返回满足条件的记录子集，保持原有顺序
    #[instrument(skip(self, records, criteria), fields(input = records.len()))]
    pub fn apply<'a>(
        &self,
        records: &'a [FeedRecord],
        criteria: &FilterCriteria,
    ) -> Vec<&'a FeedRecord> {
        if criteria.is_unrestricted() {
            return records.iter().collect();
        }

        let kept: Vec<&FeedRecord> = records.iter().filter(|r| criteria.matches(r)).collect();
        debug!(kept = kept.len(), dropped = records.len() - kept.len(), "筛选完成");
        kept
    }
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self::new()
    }
}
