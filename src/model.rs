use std::collections::BTreeSet;

use polars::prelude::*;

use crate::geo;
use crate::schema::record;

/// One canonical observation. Missing numbers stay `None` and are skipped by
/// every aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionRecord {
    pub province: String,
    pub regency: String,
    pub year: Option<i32>,
    pub production_tons: Option<f64>,
}

impl ProductionRecord {
    pub fn new(
        province: impl Into<String>,
        regency: impl Into<String>,
        year: Option<i32>,
        production_tons: Option<f64>,
    ) -> Self {
        Self {
            province: province.into(),
            regency: regency.into(),
            year,
            production_tons,
        }
    }
}

/// The immutable record set of one loaded document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<ProductionRecord>,
}

impl Dataset {
    pub fn new(records: Vec<ProductionRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ProductionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct known years, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.records
            .iter()
            .filter_map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct province names, ascending.
    pub fn provinces(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.province.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Provinces with no entry in the coordinate table. These still aggregate
    /// normally but never reach the map.
    pub fn unrecognized_provinces(&self) -> Vec<String> {
        self.provinces()
            .into_iter()
            .filter(|p| geo::coordinates(p).is_none())
            .collect()
    }

    pub fn total_production(&self) -> f64 {
        total_production(self.records.iter())
    }

    pub fn max_production(&self) -> Option<f64> {
        self.records
            .iter()
            .filter_map(|r| r.production_tons)
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        records_frame(self.records.iter())
    }
}

/// Sum of the non-missing production values.
pub fn total_production<'a>(records: impl IntoIterator<Item = &'a ProductionRecord>) -> f64 {
    records.into_iter().filter_map(|r| r.production_tons).sum()
}

/// Build a frame with the canonical record columns. An empty input still
/// yields the full, typed schema.
pub fn records_frame<'a>(
    records: impl IntoIterator<Item = &'a ProductionRecord>,
) -> PolarsResult<DataFrame> {
    let mut provinces: Vec<&str> = Vec::new();
    let mut regencies: Vec<&str> = Vec::new();
    let mut years: Vec<Option<i32>> = Vec::new();
    let mut production: Vec<Option<f64>> = Vec::new();

    for r in records {
        provinces.push(&r.province);
        regencies.push(&r.regency);
        years.push(r.year);
        production.push(r.production_tons);
    }

    DataFrame::new(vec![
        Column::new(record::PROVINCE.into(), provinces),
        Column::new(record::REGENCY.into(), regencies),
        Column::new(record::YEAR.into(), years),
        Column::new(record::PRODUCTION_TONS.into(), production),
    ])
}
