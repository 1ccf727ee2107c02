use polars::prelude::*;

use crate::error::{PadiError, Result};
use crate::model::{records_frame, ProductionRecord};
use crate::schema::{aggregate, record};

/// Which record columns form the grouping key. At least one must be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupKey {
    pub province: bool,
    pub regency: bool,
    pub year: bool,
}

impl GroupKey {
    pub const PROVINCE: Self = Self::new(true, false, false);
    pub const PROVINCE_REGENCY: Self = Self::new(true, true, false);
    pub const YEAR: Self = Self::new(false, false, true);
    pub const PROVINCE_YEAR: Self = Self::new(true, false, true);
    pub const PROVINCE_REGENCY_YEAR: Self = Self::new(true, true, true);

    pub const fn new(province: bool, regency: bool, year: bool) -> Self {
        Self {
            province,
            regency,
            year,
        }
    }

    /// Parse column names (`province`, `regency`, `year`).
    pub fn from_columns<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut key = Self::new(false, false, false);
        for name in names {
            match name.as_ref() {
                record::PROVINCE => key.province = true,
                record::REGENCY => key.regency = true,
                record::YEAR => key.year = true,
                other => {
                    return Err(PadiError::InvalidParameter(format!(
                        "Unknown group column '{other}'. Must be one of province, regency, year"
                    )))
                }
            }
        }
        key.validate()?;
        Ok(key)
    }

    /// Key columns in tie-break order.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut cols = Vec::with_capacity(3);
        if self.province {
            cols.push(record::PROVINCE);
        }
        if self.regency {
            cols.push(record::REGENCY);
        }
        if self.year {
            cols.push(record::YEAR);
        }
        cols
    }

    fn validate(&self) -> Result<()> {
        if self.columns().is_empty() {
            return Err(PadiError::InvalidParameter(
                "grouping key must contain at least one column".into(),
            ));
        }
        Ok(())
    }
}

/// Row order of an aggregate table. Ties always fall back to the grouping
/// key, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    TotalDescending,
    TotalAscending,
    Key,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    pub key: GroupKey,
    pub sort: SortOrder,
    /// Keep only the first `n` rows after sorting.
    pub limit: Option<usize>,
}

impl AggregateQuery {
    pub fn new(key: GroupKey) -> Self {
        Self {
            key,
            sort: SortOrder::default(),
            limit: None,
        }
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// One summarized total. Key fields outside the grouping key are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub province: Option<String>,
    pub regency: Option<String>,
    pub year: Option<i32>,
    /// `None` when every production value in the group is missing.
    pub total_production_tons: Option<f64>,
}

/// Aggregate result: the grouping key plus a frame holding the key columns
/// and `total_production_tons`.
#[derive(Debug, Clone)]
pub struct AggregateTable {
    key: GroupKey,
    frame: DataFrame,
}

impl AggregateTable {
    pub fn key(&self) -> GroupKey {
        self.key
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn rows(&self) -> Result<Vec<AggregateRow>> {
        let df = &self.frame;
        let provinces = if self.key.province {
            Some(df.column(record::PROVINCE)?.str()?)
        } else {
            None
        };
        let regencies = if self.key.regency {
            Some(df.column(record::REGENCY)?.str()?)
        } else {
            None
        };
        let years = if self.key.year {
            Some(df.column(record::YEAR)?.i32()?)
        } else {
            None
        };
        let totals = df.column(aggregate::TOTAL_PRODUCTION_TONS)?.f64()?;

        let rows = (0..df.height())
            .map(|i| AggregateRow {
                province: provinces.and_then(|c| c.get(i)).map(str::to_string),
                regency: regencies.and_then(|c| c.get(i)).map(str::to_string),
                year: years.and_then(|c| c.get(i)),
                total_production_tons: totals.get(i),
            })
            .collect();
        Ok(rows)
    }
}

/// Group records and sum production per key.
///
/// Missing production values contribute nothing; a group whose values are all
/// missing gets a missing total, never zero. Such groups sort after every
/// known total. Records with a missing year are left out of any year-keyed
/// grouping.
pub fn aggregate<'a>(
    records: impl IntoIterator<Item = &'a ProductionRecord>,
    query: &AggregateQuery,
) -> Result<AggregateTable> {
    let frame = records_frame(records)?;
    aggregate_frame(frame, query)
}

/// Same as [`aggregate`] over a frame with the canonical record columns.
pub fn aggregate_frame(frame: DataFrame, query: &AggregateQuery) -> Result<AggregateTable> {
    query.key.validate()?;
    let keys: Vec<Expr> = query.key.columns().into_iter().map(col).collect();

    let mut lazy = frame.lazy();
    if query.key.year {
        lazy = lazy.filter(col(record::YEAR).is_not_null());
    }

    let (by, descending) = sort_spec(&keys, query.sort);
    lazy = lazy
        .group_by(keys)
        .agg([known_sum(record::PRODUCTION_TONS).alias(aggregate::TOTAL_PRODUCTION_TONS)])
        .sort_by_exprs(
            by,
            SortMultipleOptions::default()
                .with_order_descending_multi(descending)
                .with_nulls_last(true)
                .with_maintain_order(true),
        );

    if let Some(n) = query.limit {
        lazy = lazy.limit(clamp_idx(n));
    }

    Ok(AggregateTable {
        key: query.key,
        frame: lazy.collect()?,
    })
}

/// Sum of the non-null values in `column`, null when there are none.
pub(crate) fn known_sum(column: &str) -> Expr {
    when(col(column).count().gt(lit(0)))
        .then(col(column).sum())
        .otherwise(lit(NULL).cast(DataType::Float64))
}

fn sort_spec(keys: &[Expr], sort: SortOrder) -> (Vec<Expr>, Vec<bool>) {
    let total = col(aggregate::TOTAL_PRODUCTION_TONS);
    let mut by = Vec::with_capacity(keys.len() + 1);
    let mut descending = Vec::with_capacity(keys.len() + 1);

    match sort {
        SortOrder::TotalDescending | SortOrder::TotalAscending => {
            by.push(total);
            descending.push(sort == SortOrder::TotalDescending);
        }
        SortOrder::Key => {}
    }
    for k in keys {
        by.push(k.clone());
        descending.push(false);
    }
    (by, descending)
}

pub(crate) fn clamp_idx(n: usize) -> IdxSize {
    IdxSize::try_from(n).unwrap_or(IdxSize::MAX)
}
