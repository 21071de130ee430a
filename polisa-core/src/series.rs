//! Dashboard time series.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::range::{DateRange, FilterSelection};

/// Bucket size of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Month,
    Day,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Day => "day",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that determines which series the backend returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesQuery {
    /// Dashboard perspective, e.g. `"production"` or `"branch"`.
    pub mode: String,
    pub granularity: Granularity,
    pub range: DateRange,
    pub filters: FilterSelection,
}

impl SeriesQuery {
    pub fn new(mode: impl Into<String>, granularity: Granularity, range: DateRange) -> Self {
        Self {
            mode: mode.into(),
            granularity,
            range,
            filters: FilterSelection::new(),
        }
    }

    pub fn with_filters(mut self, filters: FilterSelection) -> Self {
        self.filters = filters;
        self
    }

    /// Same mode and filters over a different range and granularity.
    pub fn narrowed(&self, granularity: Granularity, range: DateRange) -> Self {
        Self {
            mode: self.mode.clone(),
            granularity,
            range,
            filters: self.filters.clone(),
        }
    }
}

/// Calendar position of a point. `day` is set only for daily series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodBucket {
    pub year: i32,
    pub month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl PeriodBucket {
    pub fn month(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            day: None,
        }
    }

    pub fn day(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day: Some(day),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub bucket: PeriodBucket,
    pub label: String,
    /// Named measures, e.g. `premium`, `commission`, `policyCount`.
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesResponse {
    pub granularity: Granularity,
    pub points: Vec<SeriesPoint>,
}

impl SeriesResponse {
    pub fn empty(granularity: Granularity) -> Self {
        Self {
            granularity,
            points: Vec::new(),
        }
    }

    pub fn total(&self, metric: &str) -> f64 {
        self.points
            .iter()
            .filter_map(|point| point.metrics.get(metric))
            .sum()
    }
}
