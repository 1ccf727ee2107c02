use polars::prelude::*;

use crate::aggregation::{AggregateTable, GroupKey};
use crate::error::{PadiError, Result};
use crate::schema::{aggregate, geo, record};

/// Marker anchor for one canonical province.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateEntry {
    pub province: &'static str,
    pub lat: f64,
    pub lon: f64,
}

const fn entry(province: &'static str, lat: f64, lon: f64) -> CoordinateEntry {
    CoordinateEntry { province, lat, lon }
}

pub const PROVINCE_COORDINATES: [CoordinateEntry; 37] = [
    entry("Aceh", 4.6951, 96.7494),
    entry("Sumatera Utara", 2.1154, 99.5451),
    entry("Sumatera Barat", -0.7399, 100.8000),
    entry("Riau", 0.5071, 101.4478),
    entry("Jambi", -1.6101, 103.6131),
    entry("Sumatera Selatan", -3.3194, 104.9145),
    entry("Bengkulu", -3.7928, 102.2608),
    entry("Lampung", -4.5585, 105.4068),
    entry("Kepulauan Bangka Belitung", -2.7411, 106.4406),
    entry("Kepulauan Riau", 3.9159, 108.1961),
    entry("DKI Jakarta", -6.2088, 106.8456),
    entry("Jawa Barat", -6.9175, 107.6191),
    entry("Jawa Tengah", -7.1510, 110.1403),
    entry("DI Yogyakarta", -7.7956, 110.3695),
    entry("Jawa Timur", -7.5361, 112.2384),
    entry("Banten", -6.4058, 106.0640),
    entry("Bali", -8.4095, 115.1889),
    entry("Nusa Tenggara Barat", -8.6529, 117.3616),
    entry("Nusa Tenggara Timur", -8.6574, 121.0794),
    entry("Kalimantan Barat", -0.2787, 111.4753),
    entry("Kalimantan Tengah", -1.6815, 113.3824),
    entry("Kalimantan Selatan", -3.0926, 115.2838),
    entry("Kalimantan Timur", 0.5387, 116.4194),
    entry("Kalimantan Utara", 3.0731, 116.0414),
    entry("Sulawesi Utara", 0.6247, 123.9750),
    entry("Sulawesi Tengah", -1.4300, 121.4456),
    entry("Sulawesi Selatan", -3.6687, 119.9740),
    entry("Sulawesi Tenggara", -4.1449, 122.1746),
    entry("Gorontalo", 0.6999, 122.4467),
    entry("Sulawesi Barat", -2.8441, 119.2321),
    entry("Maluku", -3.2385, 130.1453),
    entry("Maluku Utara", 1.5709, 127.8087),
    entry("Papua", -4.2699, 138.0804),
    entry("Papua Barat", -1.3361, 133.1747),
    entry("Papua Selatan", -7.4927, 139.6997),
    entry("Papua Tengah", -4.1783, 136.2570),
    entry("Papua Pegunungan", -4.0931, 139.1174),
];

/// Lower bound (inclusive) of the medium tier, in tons.
pub const MEDIUM_THRESHOLD_TONS: f64 = 10_000_000.0;
/// Lower bound (inclusive) of the high tier, in tons.
pub const HIGH_THRESHOLD_TONS: f64 = 20_000_000.0;

pub fn coordinates(province: &str) -> Option<&'static CoordinateEntry> {
    PROVINCE_COORDINATES.iter().find(|c| c.province == province)
}

/// Production volume class of a map marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProductionTier {
    Low,
    Medium,
    High,
}

impl ProductionTier {
    pub fn classify(total_tons: f64) -> Self {
        if total_tons >= HIGH_THRESHOLD_TONS {
            ProductionTier::High
        } else if total_tons >= MEDIUM_THRESHOLD_TONS {
            ProductionTier::Medium
        } else {
            ProductionTier::Low
        }
    }

    /// Marker fill color, RGBA.
    pub fn color(&self) -> [u8; 4] {
        match self {
            ProductionTier::High => [255, 0, 0, 200],
            ProductionTier::Medium => [0, 255, 0, 200],
            ProductionTier::Low => [255, 255, 0, 200],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionTier::Low => "low",
            ProductionTier::Medium => "medium",
            ProductionTier::High => "high",
        }
    }
}

/// One map marker.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRow {
    pub province: String,
    pub lat: f64,
    pub lon: f64,
    pub total_production_tons: f64,
    pub tier: ProductionTier,
    /// RGBA fill for the tier.
    pub color: [u8; 4],
}

impl GeoRow {
    fn new(province: String, lat: f64, lon: f64, total_production_tons: f64) -> Self {
        let tier = ProductionTier::classify(total_production_tons);
        Self {
            province,
            lat,
            lon,
            total_production_tons,
            tier,
            color: tier.color(),
        }
    }
}

pub fn coordinate_frame() -> PolarsResult<DataFrame> {
    let provinces: Vec<&str> = PROVINCE_COORDINATES.iter().map(|c| c.province).collect();
    let lats: Vec<f64> = PROVINCE_COORDINATES.iter().map(|c| c.lat).collect();
    let lons: Vec<f64> = PROVINCE_COORDINATES.iter().map(|c| c.lon).collect();

    DataFrame::new(vec![
        Column::new(record::PROVINCE.into(), provinces),
        Column::new(geo::LAT.into(), lats),
        Column::new(geo::LON.into(), lons),
    ])
}

/// Attach coordinates, a tier and its RGBA color to province totals.
///
/// Provinces missing from the coordinate table are dropped, as are provinces
/// without any known production. Rows come back sorted by total, descending,
/// then by province.
pub fn join_coordinates(totals: &AggregateTable) -> Result<DataFrame> {
    if totals.key() != GroupKey::PROVINCE {
        return Err(PadiError::InvalidParameter(
            "map totals must be grouped by province only".into(),
        ));
    }

    let joined = totals
        .frame()
        .clone()
        .lazy()
        .join(
            coordinate_frame()?.lazy(),
            [col(record::PROVINCE)],
            [col(record::PROVINCE)],
            JoinArgs::new(JoinType::Inner),
        )
        .filter(col(aggregate::TOTAL_PRODUCTION_TONS).is_not_null())
        .sort_by_exprs(
            [col(aggregate::TOTAL_PRODUCTION_TONS), col(record::PROVINCE)],
            SortMultipleOptions::default()
                .with_order_descending_multi([true, false])
                .with_maintain_order(true),
        )
        .collect()?;

    let tiers: Vec<ProductionTier> = joined
        .column(aggregate::TOTAL_PRODUCTION_TONS)?
        .f64()?
        .into_no_null_iter()
        .map(ProductionTier::classify)
        .collect();

    let names: Vec<&str> = tiers.iter().map(ProductionTier::as_str).collect();
    let colors = if tiers.is_empty() {
        Column::new_empty(
            geo::COLOR.into(),
            &DataType::List(Box::new(DataType::UInt8)),
        )
    } else {
        let fills: Vec<Series> = tiers
            .iter()
            .map(|t| Series::new(PlSmallStr::EMPTY, t.color().to_vec()))
            .collect();
        Column::new(geo::COLOR.into(), fills)
    };

    let mut joined = joined;
    joined.with_column(Column::new(geo::TIER.into(), names))?;
    joined.with_column(colors)?;
    Ok(joined)
}

pub fn geo_rows(totals: &AggregateTable) -> Result<Vec<GeoRow>> {
    let df = join_coordinates(totals)?;
    let provinces = df.column(record::PROVINCE)?.str()?;
    let lats = df.column(geo::LAT)?.f64()?;
    let lons = df.column(geo::LON)?.f64()?;
    let totals = df.column(aggregate::TOTAL_PRODUCTION_TONS)?.f64()?;

    let rows = (0..df.height())
        .filter_map(|i| {
            Some(GeoRow::new(
                provinces.get(i)?.to_string(),
                lats.get(i)?,
                lons.get(i)?,
                totals.get(i)?,
            ))
        })
        .collect();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{aggregate, AggregateQuery};
    use crate::canonical::canonicalize;
    use crate::model::ProductionRecord;

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(ProductionTier::classify(9_999_999.0), ProductionTier::Low);
        assert_eq!(ProductionTier::classify(10_000_000.0), ProductionTier::Medium);
        assert_eq!(ProductionTier::classify(19_999_999.99), ProductionTier::Medium);
        assert_eq!(ProductionTier::classify(20_000_000.0), ProductionTier::High);
        assert_eq!(ProductionTier::classify(0.0), ProductionTier::Low);
    }

    #[test]
    fn coordinate_names_are_canonical() {
        for c in PROVINCE_COORDINATES.iter() {
            assert_eq!(canonicalize(c.province), c.province);
        }
    }

    #[test]
    fn unknown_provinces_are_dropped() {
        let recs = vec![
            ProductionRecord::new("Jawa Timur", "Kab. Ngawi", Some(2021), Some(20_000_000.0)),
            ProductionRecord::new("Atlantis", "Kota Lama", Some(2021), Some(5.0)),
            ProductionRecord::new("Bali", "Kab. Tabanan", Some(2021), Some(10_000_000.0)),
        ];
        let totals = aggregate(&recs, &AggregateQuery::new(GroupKey::PROVINCE)).unwrap();
        let rows = geo_rows(&totals).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].province, "Jawa Timur");
        assert_eq!(rows[0].tier, ProductionTier::High);
        assert_eq!(rows[0].lat, -7.5361);
        assert_eq!(rows[1].province, "Bali");
        assert_eq!(rows[1].tier, ProductionTier::Medium);

        let df = join_coordinates(&totals).unwrap();
        let tiers: Vec<_> = df.column(geo::TIER).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(tiers, vec![Some("high"), Some("medium")]);
    }

    #[test]
    fn each_tier_carries_its_marker_color() {
        let recs = vec![
            ProductionRecord::new("Jawa Timur", "Kab. Ngawi", Some(2021), Some(25_000_000.0)),
            ProductionRecord::new("Jawa Barat", "Kab. Karawang", Some(2021), Some(15_000_000.0)),
            ProductionRecord::new("Bali", "Kab. Tabanan", Some(2021), Some(500_000.0)),
        ];
        let totals = aggregate(&recs, &AggregateQuery::new(GroupKey::PROVINCE)).unwrap();

        let rows = geo_rows(&totals).unwrap();
        let colors: Vec<_> = rows.iter().map(|r| (r.tier, r.color)).collect();
        assert_eq!(
            colors,
            vec![
                (ProductionTier::High, [255, 0, 0, 200]),
                (ProductionTier::Medium, [0, 255, 0, 200]),
                (ProductionTier::Low, [255, 255, 0, 200]),
            ]
        );

        let df = join_coordinates(&totals).unwrap();
        let fills = df.column(geo::COLOR).unwrap().list().unwrap();
        let first: Vec<Option<u8>> = fills
            .get_as_series(0)
            .unwrap()
            .u8()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(first, vec![Some(255), Some(0), Some(0), Some(200)]);
        let last: Vec<Option<u8>> = fills
            .get_as_series(2)
            .unwrap()
            .u8()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(last, vec![Some(255), Some(255), Some(0), Some(200)]);
    }

    #[test]
    fn provinces_without_known_production_get_no_marker() {
        let recs = vec![
            ProductionRecord::new("Bali", "Kab. Tabanan", Some(2021), None),
            ProductionRecord::new("Aceh", "Kab. Pidie", Some(2021), Some(10.0)),
        ];
        let totals = aggregate(&recs, &AggregateQuery::new(GroupKey::PROVINCE)).unwrap();
        let rows = geo_rows(&totals).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].province, "Aceh");
    }

    #[test]
    fn rejects_non_province_grouping() {
        let recs = vec![ProductionRecord::new("Bali", "Kab. Badung", Some(2021), Some(1.0))];
        let totals = aggregate(&recs, &AggregateQuery::new(GroupKey::PROVINCE_REGENCY)).unwrap();
        assert!(matches!(
            geo_rows(&totals),
            Err(PadiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn empty_totals_give_empty_map() {
        let totals = aggregate(&[], &AggregateQuery::new(GroupKey::PROVINCE)).unwrap();
        assert!(geo_rows(&totals).unwrap().is_empty());
        let df = join_coordinates(&totals).unwrap();
        assert_eq!(
            df.column(geo::COLOR).unwrap().dtype(),
            &DataType::List(Box::new(DataType::UInt8))
        );
    }
}
