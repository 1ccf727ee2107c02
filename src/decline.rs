use std::ops::RangeInclusive;

use polars::prelude::*;

use crate::aggregation::{clamp_idx, known_sum};
use crate::error::{PadiError, Result};
use crate::model::{records_frame, Dataset};
use crate::schema::{decline, record};

/// Accepted range for the number of regions to report.
pub const TOP_N_RANGE: RangeInclusive<usize> = 1..=20;

/// A regency whose total fell between the two compared years.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRow {
    pub province: String,
    pub regency: String,
    pub total_prev: f64,
    pub total_now: f64,
    pub delta_tons: f64,
}

/// Parameters of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclineQuery {
    pub year_prev: i32,
    pub year_now: i32,
    pub top_n: usize,
}

impl DeclineQuery {
    pub fn new(year_prev: i32, year_now: i32, top_n: usize) -> Self {
        Self {
            year_prev,
            year_now,
            top_n,
        }
    }

    /// The two most recent known years, if there are at least two.
    pub fn latest_pair(years: &[i32], top_n: usize) -> Option<Self> {
        match years {
            [.., prev, now] => Some(Self::new(*prev, *now, top_n)),
            _ => None,
        }
    }

    /// Reject queries that cannot produce a meaningful comparison.
    pub fn validate(&self, known_years: &[i32]) -> Result<()> {
        if known_years.len() < 2 {
            return Err(PadiError::InsufficientData(format!(
                "decline detection needs at least two years of data, found {}",
                known_years.len()
            )));
        }
        if self.year_prev == self.year_now {
            return Err(PadiError::InvalidParameter(format!(
                "choose two different years to compare (both are {})",
                self.year_now
            )));
        }
        for year in [self.year_prev, self.year_now] {
            if !known_years.contains(&year) {
                return Err(PadiError::InvalidParameter(format!(
                    "year {year} is not present in the data"
                )));
            }
        }
        if !TOP_N_RANGE.contains(&self.top_n) {
            return Err(PadiError::InvalidParameter(format!(
                "top_n must be between {} and {}, got {}",
                TOP_N_RANGE.start(),
                TOP_N_RANGE.end(),
                self.top_n
            )));
        }
        Ok(())
    }
}

/// Regions with the largest production drop from `year_prev` to `year_now`.
///
/// Only regencies present in both years are compared. Rows are ordered by
/// delta ascending, then province and regency name. An empty frame means
/// nothing declined.
pub fn detect_declines_frame(dataset: &Dataset, query: &DeclineQuery) -> Result<DataFrame> {
    query.validate(&dataset.years())?;

    let frame = records_frame(dataset.records())?;
    let prev = regency_totals(&frame, query.year_prev, decline::TOTAL_PREV);
    let now = regency_totals(&frame, query.year_now, decline::TOTAL_NOW);

    let df = now
        .join(
            prev,
            [col(record::PROVINCE), col(record::REGENCY)],
            [col(record::PROVINCE), col(record::REGENCY)],
            JoinArgs::new(JoinType::Inner),
        )
        .with_column(
            (col(decline::TOTAL_NOW) - col(decline::TOTAL_PREV)).alias(decline::DELTA_TONS),
        )
        .filter(col(decline::DELTA_TONS).lt(lit(0.0)))
        .sort_by_exprs(
            [
                col(decline::DELTA_TONS),
                col(record::PROVINCE),
                col(record::REGENCY),
            ],
            SortMultipleOptions::default()
                .with_order_descending_multi([false, false, false])
                .with_maintain_order(true),
        )
        .limit(clamp_idx(query.top_n))
        .select([
            col(record::PROVINCE),
            col(record::REGENCY),
            col(decline::TOTAL_PREV),
            col(decline::TOTAL_NOW),
            col(decline::DELTA_TONS),
        ])
        .collect()?;

    Ok(df)
}

pub fn detect_declines(dataset: &Dataset, query: &DeclineQuery) -> Result<Vec<DeltaRow>> {
    let df = detect_declines_frame(dataset, query)?;
    let provinces = df.column(record::PROVINCE)?.str()?;
    let regencies = df.column(record::REGENCY)?.str()?;
    let prev = df.column(decline::TOTAL_PREV)?.f64()?;
    let now = df.column(decline::TOTAL_NOW)?.f64()?;
    let delta = df.column(decline::DELTA_TONS)?.f64()?;

    let rows = (0..df.height())
        .filter_map(|i| {
            Some(DeltaRow {
                province: provinces.get(i)?.to_string(),
                regency: regencies.get(i)?.to_string(),
                total_prev: prev.get(i)?,
                total_now: now.get(i)?,
                delta_tons: delta.get(i)?,
            })
        })
        .collect();
    Ok(rows)
}

/// Known production per regency in `year`. Regencies with no known value
/// that year are absent, so they never take part in a comparison.
fn regency_totals(frame: &DataFrame, year: i32, alias: &str) -> LazyFrame {
    frame
        .clone()
        .lazy()
        .filter(col(record::YEAR).eq(lit(year)))
        .group_by([col(record::PROVINCE), col(record::REGENCY)])
        .agg([known_sum(record::PRODUCTION_TONS).alias(alias)])
        .filter(col(alias).is_not_null())
}
