use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;

use crate::aggregation::{aggregate, AggregateQuery, GroupKey, SortOrder};
use crate::dashboard::Dashboard;
use crate::decline::{detect_declines_frame, DeclineQuery};
use crate::error::PadiError;
use crate::export::records_csv;
use crate::filter::RecordFilter;
use crate::forecast::{forecast, Forecast};
use crate::geo::join_coordinates;
use crate::model::records_frame;
use crate::schema;

/// Result of a province forecast.
#[pyclass(name = "Forecast", module = "padi_core")]
#[derive(Debug, Clone)]
pub struct PyForecast {
    inner: Forecast,
}

#[pymethods]
impl PyForecast {
    #[getter]
    fn province(&self) -> String {
        self.inner.province.clone()
    }

    #[getter]
    fn slope(&self) -> f64 {
        self.inner.fit.slope
    }

    #[getter]
    fn intercept(&self) -> f64 {
        self.inner.fit.intercept
    }

    #[getter]
    fn target_year(&self) -> i32 {
        self.inner.target_year
    }

    /// Line value at the target year, may be negative.
    #[getter]
    fn predicted_tons(&self) -> f64 {
        self.inner.predicted_tons
    }

    /// Reported forecast, never below zero.
    #[getter]
    fn forecast_tons(&self) -> f64 {
        self.inner.forecast_tons
    }

    #[getter]
    fn history(&self) -> Vec<(i32, f64)> {
        self.inner.history.clone()
    }

    fn trend_line(&self) -> Vec<(i32, f64)> {
        self.inner.trend_line()
    }

    fn __repr__(&self) -> String {
        format!(
            "Forecast(province='{}', target_year={}, forecast_tons={:.0}, years_used={})",
            self.inner.province,
            self.inner.target_year,
            self.inner.forecast_tons,
            self.inner.years_used()
        )
    }
}

/// Dashboard session over one production document.
///
/// A document that cannot be read leaves an empty dataset; check
/// `load_error` before rendering.
#[pyclass(name = "PadiDashboard", module = "padi_core")]
pub struct PyDashboard {
    inner: Dashboard,
}

#[pymethods]
impl PyDashboard {
    #[new]
    fn new(path: String) -> Self {
        Self {
            inner: Dashboard::open(path),
        }
    }

    fn reload(&mut self) {
        self.inner.reload();
    }

    #[getter]
    fn load_error(&self) -> Option<String> {
        self.inner.load_error().map(str::to_string)
    }

    fn years(&self) -> Vec<i32> {
        self.inner.dataset().years()
    }

    fn provinces(&self) -> Vec<String> {
        self.inner.dataset().provinces()
    }

    fn unrecognized_provinces(&self) -> Vec<String> {
        self.inner.dataset().unrecognized_provinces()
    }

    // ── Records ─────────────────────────────────────────────────────────────

    /// Filtered canonical records. `None` means no filter on that field.
    #[pyo3(signature = (year=None, province=None, search=None))]
    fn records(
        &self,
        year: Option<i32>,
        province: Option<&str>,
        search: Option<&str>,
    ) -> PyResult<PyDataFrame> {
        let filter = build_filter(year, province, search);
        let df = records_frame(filter.apply(self.inner.dataset().records()))
            .map_err(PadiError::from)?;
        Ok(PyDataFrame(df))
    }

    #[pyo3(signature = (year=None, province=None, search=None))]
    fn export_csv(
        &self,
        year: Option<i32>,
        province: Option<&str>,
        search: Option<&str>,
    ) -> PyResult<String> {
        let filter = build_filter(year, province, search);
        Ok(records_csv(filter.apply(self.inner.dataset().records()))?)
    }

    // ── Aggregation ─────────────────────────────────────────────────────────

    /// Sum production over `group_by` (any of "province", "regency", "year"),
    /// largest first unless `ascending`. Groups without any known production
    /// have a null total and come last.
    #[pyo3(signature = (group_by, year=None, province=None, search=None, top_n=None, ascending=false))]
    fn aggregate(
        &self,
        group_by: Vec<String>,
        year: Option<i32>,
        province: Option<&str>,
        search: Option<&str>,
        top_n: Option<usize>,
        ascending: bool,
    ) -> PyResult<PyDataFrame> {
        let sort = if ascending {
            SortOrder::TotalAscending
        } else {
            SortOrder::TotalDescending
        };
        let mut query = AggregateQuery::new(GroupKey::from_columns(&group_by)?).sort(sort);
        if let Some(n) = top_n {
            query = query.limit(n);
        }
        let filter = build_filter(year, province, search);
        let table = aggregate(filter.apply(self.inner.dataset().records()), &query)?;
        Ok(PyDataFrame(table.into_frame()))
    }

    /// Province totals with coordinates and tier, for the map layer.
    #[pyo3(signature = (year=None))]
    fn province_map(&self, year: Option<i32>) -> PyResult<PyDataFrame> {
        let filter = build_filter(year, None, None);
        let totals = aggregate(
            filter.apply(self.inner.dataset().records()),
            &AggregateQuery::new(GroupKey::PROVINCE),
        )?;
        Ok(PyDataFrame(join_coordinates(&totals)?))
    }

    // ── Analysis ────────────────────────────────────────────────────────────

    #[pyo3(signature = (year_prev, year_now, top_n=5))]
    fn detect_declines(&self, year_prev: i32, year_now: i32, top_n: usize) -> PyResult<PyDataFrame> {
        let query = DeclineQuery::new(year_prev, year_now, top_n);
        Ok(PyDataFrame(detect_declines_frame(
            self.inner.dataset(),
            &query,
        )?))
    }

    #[pyo3(signature = (province, target_year=2025))]
    fn forecast(&self, province: &str, target_year: i32) -> PyResult<PyForecast> {
        let inner = forecast(self.inner.dataset(), province, target_year)?;
        Ok(PyForecast { inner })
    }
}

fn build_filter(year: Option<i32>, province: Option<&str>, search: Option<&str>) -> RecordFilter {
    RecordFilter::all()
        .year(year)
        .province(province)
        .search(search.unwrap_or_default())
}

/// Export column-name constants as a `columns` submodule.
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let columns = PyModule::new(m.py(), "columns")?;
    columns.add("PROVINCE", schema::record::PROVINCE)?;
    columns.add("REGENCY", schema::record::REGENCY)?;
    columns.add("YEAR", schema::record::YEAR)?;
    columns.add("PRODUCTION_TONS", schema::record::PRODUCTION_TONS)?;
    columns.add(
        "TOTAL_PRODUCTION_TONS",
        schema::aggregate::TOTAL_PRODUCTION_TONS,
    )?;
    columns.add("LAT", schema::geo::LAT)?;
    columns.add("LON", schema::geo::LON)?;
    columns.add("TIER", schema::geo::TIER)?;
    columns.add("COLOR", schema::geo::COLOR)?;
    columns.add("TOTAL_PREV", schema::decline::TOTAL_PREV)?;
    columns.add("TOTAL_NOW", schema::decline::TOTAL_NOW)?;
    columns.add("DELTA_TONS", schema::decline::DELTA_TONS)?;
    m.add_submodule(&columns)?;
    Ok(())
}

#[pymodule]
fn padi_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDashboard>()?;
    m.add_class::<PyForecast>()?;
    add_schema_exports(m)?;
    Ok(())
}
