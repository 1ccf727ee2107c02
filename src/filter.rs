use crate::canonical::canonicalize;
use crate::model::ProductionRecord;

/// Year criterion: one known year, or every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearSelection {
    #[default]
    All,
    Year(i32),
}

impl YearSelection {
    pub fn matches(&self, record: &ProductionRecord) -> bool {
        match self {
            YearSelection::All => true,
            YearSelection::Year(y) => record.year == Some(*y),
        }
    }
}

impl From<Option<i32>> for YearSelection {
    fn from(year: Option<i32>) -> Self {
        year.map_or(YearSelection::All, YearSelection::Year)
    }
}

/// Province criterion. Named selections are canonicalized on construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProvinceSelection {
    #[default]
    All,
    Named(String),
}

impl ProvinceSelection {
    pub fn named(name: &str) -> Self {
        ProvinceSelection::Named(canonicalize(name))
    }

    pub fn matches(&self, record: &ProductionRecord) -> bool {
        match self {
            ProvinceSelection::All => true,
            ProvinceSelection::Named(p) => record.province == *p,
        }
    }
}

impl From<Option<&str>> for ProvinceSelection {
    fn from(name: Option<&str>) -> Self {
        name.map_or(ProvinceSelection::All, ProvinceSelection::named)
    }
}

/// Case-insensitive plain substring over the regency name. Blank text
/// matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegencySearch {
    needle: Option<String>,
}

impl RegencySearch {
    pub fn new(text: &str) -> Self {
        let trimmed = text.trim();
        Self {
            needle: (!trimmed.is_empty()).then(|| text.to_lowercase()),
        }
    }

    pub fn matches(&self, record: &ProductionRecord) -> bool {
        match &self.needle {
            None => true,
            Some(needle) => record.regency.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// Single filter criterion.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Year(YearSelection),
    Province(ProvinceSelection),
    Search(RegencySearch),
}

impl Criterion {
    pub fn matches(&self, record: &ProductionRecord) -> bool {
        match self {
            Criterion::Year(s) => s.matches(record),
            Criterion::Province(s) => s.matches(record),
            Criterion::Search(s) => s.matches(record),
        }
    }

    /// Apply this criterion on its own, keeping input order.
    pub fn apply<'a>(&self, records: &[&'a ProductionRecord]) -> Vec<&'a ProductionRecord> {
        records.iter().copied().filter(|r| self.matches(r)).collect()
    }
}

/// Conjunction of the three dashboard filters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordFilter {
    pub year: YearSelection,
    pub province: ProvinceSelection,
    pub search: RegencySearch,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn year(mut self, year: impl Into<YearSelection>) -> Self {
        self.year = year.into();
        self
    }

    pub fn province(mut self, province: impl Into<ProvinceSelection>) -> Self {
        self.province = province.into();
        self
    }

    pub fn search(mut self, text: &str) -> Self {
        self.search = RegencySearch::new(text);
        self
    }

    pub fn criteria(&self) -> [Criterion; 3] {
        [
            Criterion::Year(self.year),
            Criterion::Province(self.province.clone()),
            Criterion::Search(self.search.clone()),
        ]
    }

    pub fn matches(&self, record: &ProductionRecord) -> bool {
        self.year.matches(record) && self.province.matches(record) && self.search.matches(record)
    }

    /// Matching records in input order. May be empty.
    ///
    /// Criteria are independent predicates, so applying them one after the
    /// other in any order gives the same records.
    pub fn apply<'a>(&self, records: &'a [ProductionRecord]) -> Vec<&'a ProductionRecord> {
        let all: Vec<&ProductionRecord> = records.iter().collect();
        self.criteria()
            .iter()
            .fold(all, |kept, criterion| criterion.apply(&kept))
    }
}

impl From<i32> for YearSelection {
    fn from(year: i32) -> Self {
        YearSelection::Year(year)
    }
}

impl From<&str> for ProvinceSelection {
    fn from(name: &str) -> Self {
        ProvinceSelection::named(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn records() -> Vec<ProductionRecord> {
        vec![
            ProductionRecord::new("Jawa Barat", "Kab. Bogor", Some(2020), Some(10.0)),
            ProductionRecord::new("Jawa Barat", "Kota Bogor", Some(2021), Some(2.0)),
            ProductionRecord::new("Jawa Timur", "Kab. Malang", Some(2021), Some(7.0)),
            ProductionRecord::new("Aceh", "Kab. Bireuen", None, Some(1.0)),
        ]
    }

    #[test]
    fn all_passes_everything() {
        let recs = records();
        assert_eq!(RecordFilter::all().apply(&recs).len(), 4);
    }

    #[test]
    fn year_filter_excludes_missing_years() {
        let recs = records();
        let out = RecordFilter::all().year(2021).apply(&recs);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.year == Some(2021)));
    }

    #[test]
    fn province_selection_is_canonicalized() {
        let recs = records();
        let out = RecordFilter::all().province("  jawa barat").apply(&recs);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let recs = records();
        let out = RecordFilter::all().search("BOGOR").apply(&recs);
        assert_eq!(out.len(), 2);
        let out = RecordFilter::all().search("kab. b").apply(&recs);
        assert_eq!(out.len(), 2);
        assert_eq!(RecordFilter::all().search("   ").apply(&recs).len(), 4);
    }

    #[test]
    fn search_treats_text_literally() {
        let recs = records();
        assert!(RecordFilter::all().search("Kab.*").apply(&recs).is_empty());
    }

    #[test]
    fn no_match_is_explicitly_empty() {
        let recs = records();
        let out = RecordFilter::all().year(1999).province("Aceh").apply(&recs);
        assert!(out.is_empty());
    }

    fn year_strategy() -> impl Strategy<Value = YearSelection> {
        prop_oneof![
            Just(YearSelection::All),
            (2019..2023i32).prop_map(YearSelection::Year),
        ]
    }

    fn province_strategy() -> impl Strategy<Value = ProvinceSelection> {
        prop_oneof![
            Just(ProvinceSelection::All),
            Just(ProvinceSelection::named("Jawa Barat")),
            Just(ProvinceSelection::named("Jawa Timur")),
            Just(ProvinceSelection::named("Aceh")),
        ]
    }

    proptest! {
        #[test]
        fn criteria_commute(
            year in year_strategy(),
            province in province_strategy(),
            search in "(|bogor|KAB|malang|x)",
        ) {
            let recs = records();
            let all: Vec<&ProductionRecord> = recs.iter().collect();
            let filter = RecordFilter { year, province, search: RegencySearch::new(&search) };
            let [y, p, s] = filter.criteria();

            let expected = filter.apply(&recs);
            let direct: Vec<&ProductionRecord> = recs.iter().filter(|r| filter.matches(r)).collect();
            prop_assert_eq!(&direct, &expected);
            let orders = [
                [&y, &p, &s], [&y, &s, &p], [&p, &y, &s],
                [&p, &s, &y], [&s, &y, &p], [&s, &p, &y],
            ];
            for order in orders {
                let mut view = all.clone();
                for c in order {
                    view = c.apply(&view);
                }
                prop_assert_eq!(&view, &expected);
            }
        }
    }
}
