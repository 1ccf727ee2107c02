use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::aggregation::{aggregate, AggregateQuery, AggregateRow, GroupKey};
use crate::decline::{detect_declines, DeclineQuery, DeltaRow};
use crate::error::{PadiError, Result};
use crate::export::records_csv;
use crate::filter::{ProvinceSelection, RecordFilter, YearSelection};
use crate::forecast::{forecast, Forecast};
use crate::geo::{coordinates, geo_rows, GeoRow};
use crate::loader::DatasetCache;
use crate::model::{total_production, Dataset, ProductionRecord};

/// Why a view has nothing to show.
///
/// View builders never fail. Rejected parameters, insufficient history and
/// engine errors all come back as an empty view carrying one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    NoMatchingRecords,
    /// Records matched, but none of their provinces has map coordinates.
    NoMappedProvinces { unrecognized: Vec<String> },
    NoDecline { year_prev: i32, year_now: i32 },
    InsufficientData(String),
    InvalidParameter(String),
    Unavailable(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoMatchingRecords => write!(f, "No records match the selected filters."),
            Notice::NoMappedProvinces { unrecognized } if unrecognized.is_empty() => {
                write!(f, "No province in the selection has production data to map.")
            }
            Notice::NoMappedProvinces { unrecognized } => write!(
                f,
                "No province in the selection can be placed on the map (unrecognized: {}).",
                unrecognized.join(", ")
            ),
            Notice::NoDecline {
                year_prev,
                year_now,
            } => write!(
                f,
                "No production decline found from {year_prev} to {year_now}."
            ),
            Notice::InsufficientData(msg) => write!(f, "Not enough data: {msg}"),
            Notice::InvalidParameter(msg) => write!(f, "Invalid selection: {msg}"),
            Notice::Unavailable(msg) => write!(f, "This view is unavailable: {msg}"),
        }
    }
}

fn notice_for(view: &'static str, err: PadiError) -> Notice {
    match err {
        PadiError::InsufficientData(msg) => Notice::InsufficientData(msg),
        PadiError::InvalidParameter(msg) => Notice::InvalidParameter(msg),
        other => {
            warn!(view, error = %other, "view degraded to an empty result");
            Notice::Unavailable(other.to_string())
        }
    }
}

// ── Map ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub year: YearSelection,
    /// Sum over every matching record, including provinces without a marker.
    pub national_total_tons: f64,
    pub markers: Vec<GeoRow>,
    pub notice: Option<Notice>,
}

pub fn map_view(dataset: &Dataset, year: YearSelection) -> MapView {
    let records = RecordFilter::all().year(year).apply(dataset.records());
    let national_total_tons = total_production(records.iter().copied());

    let (markers, notice) = if records.is_empty() {
        (Vec::new(), Some(Notice::NoMatchingRecords))
    } else {
        let query = AggregateQuery::new(GroupKey::PROVINCE);
        let unrecognized = unrecognized_in(&records);
        match aggregate(records, &query).and_then(|totals| geo_rows(&totals)) {
            Ok(markers) if markers.is_empty() => {
                (markers, Some(Notice::NoMappedProvinces { unrecognized }))
            }
            Ok(markers) => (markers, None),
            Err(err) => (Vec::new(), Some(notice_for("map", err))),
        }
    };

    MapView {
        year,
        national_total_tons,
        markers,
        notice,
    }
}

fn unrecognized_in(records: &[&ProductionRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.province.as_str())
        .filter(|p| coordinates(p).is_none())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

// ── Ranking ─────────────────────────────────────────────────────────────────

/// Ranking length. `Top(0)` is rejected by [`ranking_view`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankLimit {
    Top(usize),
    All,
}

impl RankLimit {
    /// `0` means no limit.
    pub fn from_count(n: usize) -> Self {
        if n == 0 {
            RankLimit::All
        } else {
            RankLimit::Top(n)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingView {
    /// Regency totals, largest first. Regencies without any known
    /// production are not ranked.
    pub rows: Vec<AggregateRow>,
    pub notice: Option<Notice>,
}

pub fn ranking_view(
    dataset: &Dataset,
    year: YearSelection,
    province: ProvinceSelection,
    limit: RankLimit,
) -> RankingView {
    if limit == RankLimit::Top(0) {
        return RankingView {
            rows: Vec::new(),
            notice: Some(Notice::InvalidParameter(
                "ranking length must be at least 1".into(),
            )),
        };
    }

    let records = RecordFilter::all()
        .year(year)
        .province(province)
        .apply(dataset.records());

    let mut query = AggregateQuery::new(GroupKey::PROVINCE_REGENCY);
    if let RankLimit::Top(n) = limit {
        query = query.limit(n);
    }

    let result = if records.is_empty() {
        Ok(Vec::new())
    } else {
        aggregate(records, &query).and_then(|t| t.rows()).map(|mut rows| {
            rows.retain(|r| r.total_production_tons.is_some());
            rows
        })
    };

    match result {
        Ok(rows) if rows.is_empty() => RankingView {
            rows,
            notice: Some(Notice::NoMatchingRecords),
        },
        Ok(rows) => RankingView { rows, notice: None },
        Err(err) => RankingView {
            rows: Vec::new(),
            notice: Some(notice_for("ranking", err)),
        },
    }
}

// ── Decline ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct DeclineView {
    pub query: DeclineQuery,
    pub rows: Vec<DeltaRow>,
    pub notice: Option<Notice>,
}

pub fn decline_view(dataset: &Dataset, query: DeclineQuery) -> DeclineView {
    match detect_declines(dataset, &query) {
        Ok(rows) if rows.is_empty() => DeclineView {
            query,
            rows,
            notice: Some(Notice::NoDecline {
                year_prev: query.year_prev,
                year_now: query.year_now,
            }),
        },
        Ok(rows) => DeclineView {
            query,
            rows,
            notice: None,
        },
        Err(err) => DeclineView {
            query,
            rows: Vec::new(),
            notice: Some(notice_for("decline", err)),
        },
    }
}

/// Decline view over the two most recent years.
pub fn latest_decline_view(dataset: &Dataset, top_n: usize) -> DeclineView {
    let years = dataset.years();
    match DeclineQuery::latest_pair(&years, top_n) {
        Some(query) => decline_view(dataset, query),
        None => {
            let year = years.first().copied().unwrap_or_default();
            DeclineView {
                query: DeclineQuery::new(year, year, top_n),
                rows: Vec::new(),
                notice: Some(Notice::InsufficientData(format!(
                    "decline detection needs at least two years of data, found {}",
                    years.len()
                ))),
            }
        }
    }
}

// ── Forecast ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastView {
    pub forecast: Option<Forecast>,
    pub notice: Option<Notice>,
}

pub fn forecast_view(dataset: &Dataset, province: &str, target_year: i32) -> ForecastView {
    match forecast(dataset, province, target_year) {
        Ok(f) => ForecastView {
            forecast: Some(f),
            notice: None,
        },
        Err(err) => ForecastView {
            forecast: None,
            notice: Some(notice_for("forecast", err)),
        },
    }
}

// ── Data table ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub records: Vec<ProductionRecord>,
    pub total_production_tons: f64,
    pub record_count: usize,
    /// Largest single production value in the whole dataset; the scale of
    /// the table's production bar.
    pub max_production_tons: Option<f64>,
    pub notice: Option<Notice>,
}

impl TableView {
    pub fn csv(&self) -> Result<String> {
        records_csv(&self.records)
    }
}

pub fn table_view(dataset: &Dataset, filter: &RecordFilter) -> TableView {
    let records: Vec<ProductionRecord> = filter
        .apply(dataset.records())
        .into_iter()
        .cloned()
        .collect();

    TableView {
        total_production_tons: total_production(&records),
        record_count: records.len(),
        max_production_tons: dataset.max_production(),
        notice: records.is_empty().then_some(Notice::NoMatchingRecords),
        records,
    }
}

// ── Session ─────────────────────────────────────────────────────────────────

/// One loaded document plus the cache it came from.
///
/// A failed load leaves an empty dataset and keeps the error for display;
/// every view then reports no matching records.
#[derive(Debug)]
pub struct Dashboard {
    path: PathBuf,
    cache: DatasetCache,
    dataset: Arc<Dataset>,
    load_error: Option<String>,
}

impl Dashboard {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_cache(path, DatasetCache::new())
    }

    pub fn with_cache(path: impl AsRef<Path>, mut cache: DatasetCache) -> Self {
        let path = path.as_ref().to_path_buf();
        let outcome = cache.open(&path);
        Self {
            path,
            cache,
            dataset: outcome.dataset,
            load_error: outcome.error,
        }
    }

    /// Drop the cached document and read it again.
    pub fn reload(&mut self) {
        self.cache.invalidate(&self.path);
        let outcome = self.cache.open(&self.path);
        self.dataset = outcome.dataset;
        self.load_error = outcome.error;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn map(&self, year: YearSelection) -> MapView {
        map_view(&self.dataset, year)
    }

    pub fn ranking(
        &self,
        year: YearSelection,
        province: ProvinceSelection,
        limit: RankLimit,
    ) -> RankingView {
        ranking_view(&self.dataset, year, province, limit)
    }

    pub fn declines(&self, query: DeclineQuery) -> DeclineView {
        decline_view(&self.dataset, query)
    }

    pub fn forecast(&self, province: &str, target_year: i32) -> ForecastView {
        forecast_view(&self.dataset, province, target_year)
    }

    pub fn table(&self, filter: &RecordFilter) -> TableView {
        table_view(&self.dataset, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        Dataset::new(vec![
            ProductionRecord::new("Jawa Timur", "Kab. Ngawi", Some(2020), Some(12_000_000.0)),
            ProductionRecord::new("Jawa Timur", "Kab. Ngawi", Some(2021), Some(11_000_000.0)),
            ProductionRecord::new("Jawa Timur", "Kab. Lamongan", Some(2021), Some(9_000_000.0)),
            ProductionRecord::new("Atlantis", "Kota Lama", Some(2021), Some(7.0)),
            ProductionRecord::new("Bali", "Kab. Tabanan", Some(2020), Some(300.0)),
            ProductionRecord::new("Bali", "Kab. Tabanan", Some(2021), Some(320.0)),
        ])
    }

    #[test]
    fn map_total_includes_unmapped_provinces() {
        let view = map_view(&dataset(), YearSelection::Year(2021));
        assert_eq!(view.national_total_tons, 20_000_327.0);
        let provinces: Vec<_> = view.markers.iter().map(|m| m.province.as_str()).collect();
        assert_eq!(provinces, vec!["Jawa Timur", "Bali"]);
        assert!(view.notice.is_none());
    }

    #[test]
    fn map_with_unknown_year_is_explicitly_empty() {
        let view = map_view(&dataset(), YearSelection::Year(1990));
        assert!(view.markers.is_empty());
        assert_eq!(view.national_total_tons, 0.0);
        assert_eq!(view.notice, Some(Notice::NoMatchingRecords));
    }

    #[test]
    fn ranking_respects_filters_and_limit() {
        let view = ranking_view(
            &dataset(),
            YearSelection::All,
            ProvinceSelection::named("jawa timur"),
            RankLimit::Top(1),
        );
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].regency.as_deref(), Some("Kab. Ngawi"));
        assert_eq!(view.rows[0].total_production_tons, Some(23_000_000.0));

        let all = ranking_view(&dataset(), YearSelection::All, ProvinceSelection::All, RankLimit::All);
        assert_eq!(all.rows.len(), 4);
    }

    #[test]
    fn zero_length_ranking_is_rejected() {
        let view = ranking_view(
            &dataset(),
            YearSelection::All,
            ProvinceSelection::All,
            RankLimit::Top(0),
        );
        assert!(view.rows.is_empty());
        assert!(matches!(view.notice, Some(Notice::InvalidParameter(_))));
        assert_eq!(RankLimit::from_count(0), RankLimit::All);
    }

    #[test]
    fn ranking_skips_regencies_without_known_production() {
        let ds = Dataset::new(vec![
            ProductionRecord::new("Bali", "Kab. Tabanan", Some(2021), Some(3.0)),
            ProductionRecord::new("Bali", "Kab. Badung", Some(2021), None),
        ]);
        let view = ranking_view(&ds, YearSelection::All, ProvinceSelection::All, RankLimit::All);
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].regency.as_deref(), Some("Kab. Tabanan"));
    }

    #[test]
    fn map_of_unmapped_provinces_names_them() {
        let ds = Dataset::new(vec![
            ProductionRecord::new("Atlantis", "Kota Lama", Some(2021), Some(7.0)),
            ProductionRecord::new("Lemuria", "Kota Baru", Some(2021), Some(2.0)),
        ]);
        let view = map_view(&ds, YearSelection::All);
        assert!(view.markers.is_empty());
        assert_eq!(view.national_total_tons, 9.0);
        assert_eq!(
            view.notice,
            Some(Notice::NoMappedProvinces {
                unrecognized: vec!["Atlantis".to_string(), "Lemuria".to_string()]
            })
        );
        assert!(view.notice.unwrap().to_string().contains("Atlantis, Lemuria"));
    }

    #[test]
    fn ranking_without_matches_has_notice() {
        let view = ranking_view(
            &dataset(),
            YearSelection::Year(2020),
            ProvinceSelection::named("Atlantis"),
            RankLimit::Top(10),
        );
        assert!(view.rows.is_empty());
        assert_eq!(view.notice, Some(Notice::NoMatchingRecords));
    }

    #[test]
    fn decline_view_reports_each_outcome() {
        let ds = dataset();

        let view = decline_view(&ds, DeclineQuery::new(2020, 2021, 5));
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].delta_tons, -1_000_000.0);
        assert!(view.notice.is_none());

        let view = decline_view(&ds, DeclineQuery::new(2021, 2020, 5));
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].regency, "Kab. Tabanan");

        let view = decline_view(&ds, DeclineQuery::new(2021, 2021, 5));
        assert!(matches!(view.notice, Some(Notice::InvalidParameter(_))));

        let grow = Dataset::new(vec![
            ProductionRecord::new("Bali", "Kab. Tabanan", Some(2020), Some(1.0)),
            ProductionRecord::new("Bali", "Kab. Tabanan", Some(2021), Some(2.0)),
        ]);
        let view = decline_view(&grow, DeclineQuery::new(2020, 2021, 5));
        assert_eq!(
            view.notice,
            Some(Notice::NoDecline {
                year_prev: 2020,
                year_now: 2021
            })
        );
    }

    #[test]
    fn latest_decline_needs_two_years() {
        let view = latest_decline_view(&dataset(), 5);
        assert_eq!(view.query, DeclineQuery::new(2020, 2021, 5));

        let single = Dataset::new(vec![ProductionRecord::new("Bali", "A", Some(2020), Some(1.0))]);
        let view = latest_decline_view(&single, 5);
        assert!(matches!(view.notice, Some(Notice::InsufficientData(_))));
    }

    #[test]
    fn forecast_view_rejects_short_history() {
        let view = forecast_view(&dataset(), "Atlantis", 2025);
        assert!(view.forecast.is_none());
        assert!(matches!(view.notice, Some(Notice::InsufficientData(_))));

        let view = forecast_view(&dataset(), "Bali", 2025);
        assert_eq!(view.forecast.unwrap().forecast_tons, 400.0);
    }

    #[test]
    fn table_view_counts_and_exports() {
        let filter = RecordFilter::all().year(2021).search("NGAWI");
        let view = table_view(&dataset(), &filter);
        assert_eq!(view.record_count, 1);
        assert_eq!(view.total_production_tons, 11_000_000.0);
        assert_eq!(view.max_production_tons, Some(12_000_000.0));
        let csv = view.csv().unwrap();
        assert_eq!(csv.lines().count(), 2);

        let empty = table_view(&dataset(), &RecordFilter::all().search("zzz"));
        assert!(empty.records.is_empty());
        assert_eq!(empty.notice, Some(Notice::NoMatchingRecords));
    }

    #[test]
    fn failed_load_yields_empty_views() {
        let dash = Dashboard::open("/nonexistent/data_padi_final.json");
        assert!(dash.load_error().is_some());
        assert!(dash.dataset().is_empty());
        assert_eq!(dash.map(YearSelection::All).notice, Some(Notice::NoMatchingRecords));
        assert!(matches!(
            dash.declines(DeclineQuery::new(2020, 2021, 5)).notice,
            Some(Notice::InsufficientData(_))
        ));
    }
}
