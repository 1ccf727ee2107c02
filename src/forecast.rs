use crate::aggregation::{aggregate, AggregateQuery, GroupKey, SortOrder};
use crate::canonical::canonicalize;
use crate::error::{PadiError, Result};
use crate::model::Dataset;

/// Ordinary least-squares line `production = slope * year + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendFit {
    /// Fit `(year, production)` points. Needs at least two distinct years.
    ///
    /// Points are ordered by year before summing, so the result does not depend
    /// on input order.
    pub fn fit(points: &[(i32, f64)]) -> Result<Self> {
        let mut points = points.to_vec();
        points.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let mut distinct = points.iter().map(|(x, _)| *x).collect::<Vec<_>>();
        distinct.dedup();
        if distinct.len() < 2 {
            return Err(PadiError::InsufficientData(format!(
                "a trend needs at least two distinct years, found {}",
                distinct.len()
            )));
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| f64::from(*x)).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| *y).sum::<f64>() / n;

        let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            let dx = f64::from(*x) - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });

        let slope = sxy / sxx;
        Ok(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    /// Value of the line at `year`. Not clamped.
    pub fn evaluate(&self, year: i32) -> f64 {
        self.slope * f64::from(year) + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub province: String,
    /// Yearly totals the line was fitted on, ascending by year.
    pub history: Vec<(i32, f64)>,
    pub fit: TrendFit,
    pub target_year: i32,
    /// Line value at the target year, possibly negative.
    pub predicted_tons: f64,
    /// `predicted_tons` clamped at zero.
    pub forecast_tons: f64,
}

impl Forecast {
    pub fn years_used(&self) -> usize {
        self.history.len()
    }

    /// Fitted line over the history years and the target year.
    pub fn trend_line(&self) -> Vec<(i32, f64)> {
        let mut years: Vec<i32> = self.history.iter().map(|(y, _)| *y).collect();
        if !years.contains(&self.target_year) {
            years.push(self.target_year);
            years.sort_unstable();
        }
        years
            .into_iter()
            .map(|y| (y, self.fit.evaluate(y)))
            .collect()
    }
}

/// Per-year production totals of one province, summed across regencies.
/// Years without any known production value are left out.
pub fn province_history(dataset: &Dataset, province: &str) -> Result<Vec<(i32, f64)>> {
    let province = canonicalize(province);
    let records = dataset.records().iter().filter(|r| r.province == province);
    let table = aggregate(records, &AggregateQuery::new(GroupKey::YEAR).sort(SortOrder::Key))?;

    Ok(table
        .rows()?
        .into_iter()
        .filter_map(|row| Some((row.year?, row.total_production_tons?)))
        .collect())
}

pub fn forecast(dataset: &Dataset, province: &str, target_year: i32) -> Result<Forecast> {
    let history = province_history(dataset, province)?;
    let fit = TrendFit::fit(&history).map_err(|_| {
        PadiError::InsufficientData(format!(
            "{province} has {} year(s) of data; at least two are needed for a forecast",
            history.len()
        ))
    })?;
    let predicted_tons = fit.evaluate(target_year);

    Ok(Forecast {
        province: canonicalize(province),
        history,
        fit,
        target_year,
        predicted_tons,
        forecast_tons: predicted_tons.max(0.0),
    })
}
