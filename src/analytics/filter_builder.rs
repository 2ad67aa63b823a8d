//! Filter Builder
//!
//! 把原始查询参数转换为规范化的 `Filter`。纯函数，无副作用。

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::filter::{AgeRange, Filter, StepRange};

/// 原始过滤参数（均为可选字符串）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: Option<String>,
    pub merchant: Option<String>,
    pub age_range: Option<String>,
}

/// 空字符串视为未提供
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bound(name: &str, raw: &str) -> Result<i64> {
    raw.parse::<i64>()
        .map_err(|_| AppError::InvalidRange(format!("{} must be an integer, got {:?}", name, raw)))
}

fn build_step_range(start: Option<&str>, end: Option<&str>) -> Result<Option<StepRange>> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let start = parse_bound("startDate", start)?;
            let end = parse_bound("endDate", end)?;
            if start > end {
                return Err(AppError::InvalidRange(format!(
                    "startDate {} is after endDate {}",
                    start, end
                )));
            }
            Ok(Some(StepRange { start, end }))
        }
        (Some(_), None) => Err(AppError::InvalidRange(
            "startDate requires endDate".to_string(),
        )),
        (None, Some(_)) => Err(AppError::InvalidRange(
            "endDate requires startDate".to_string(),
        )),
    }
}

/// 解析 "<min>-<max>" 形式的年龄范围
pub fn parse_age_range(raw: &str) -> Result<AgeRange> {
    let (min, max) = raw.split_once('-').ok_or_else(|| {
        AppError::InvalidRange(format!("ageRange must look like \"min-max\", got {:?}", raw))
    })?;
    let min = parse_bound("ageRange min", min.trim())?;
    let max = parse_bound("ageRange max", max.trim())?;
    if min > max {
        return Err(AppError::InvalidRange(format!(
            "ageRange min {} is greater than max {}",
            min, max
        )));
    }
    Ok(AgeRange { min, max })
}

/// 构建过滤条件
pub fn build_filter(params: &FilterParams) -> Result<Filter> {
    let step = build_step_range(present(&params.start_date), present(&params.end_date))?;
    let age = present(&params.age_range).map(parse_age_range).transpose()?;

    Ok(Filter {
        step,
        category: present(&params.category).map(str::to_string),
        merchant: present(&params.merchant).map(str::to_string),
        age,
    })
}
