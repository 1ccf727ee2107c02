use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use padi_core::config::DashboardConfig;
use padi_core::dashboard::{Dashboard, Notice, RankLimit};
use padi_core::decline::DeclineQuery;
use padi_core::export::write_records_csv;
use padi_core::filter::{ProvinceSelection, RecordFilter, YearSelection};

#[derive(Parser, Debug)]
#[command(name = "padi", about = "Rice production summaries from a regional production document")]
struct Cli {
    /// Production document (JSON array). Overrides the config file.
    #[arg(long)]
    data: Option<PathBuf>,

    /// TOML file with dashboard defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known years and provinces.
    Years,
    /// Province totals with map coordinates and tier.
    Map {
        #[arg(long, default_value = "all", value_parser = parse_year)]
        year: YearSelection,
    },
    /// Regency ranking by total production.
    Rank {
        #[arg(long, default_value = "all", value_parser = parse_year)]
        year: YearSelection,
        #[arg(long)]
        province: Option<String>,
        /// Number of rows, or "all".
        #[arg(long, value_parser = parse_limit)]
        top: Option<RankLimit>,
    },
    /// Regencies with the largest production drop between two years.
    Decline {
        /// Defaults to the second most recent year.
        #[arg(long)]
        from: Option<i32>,
        /// Defaults to the most recent year.
        #[arg(long)]
        to: Option<i32>,
        #[arg(long)]
        top: Option<usize>,
    },
    /// Linear production forecast for a province.
    Forecast {
        #[arg(long)]
        province: String,
        #[arg(long)]
        target_year: Option<i32>,
    },
    /// Filtered records, optionally exported as CSV.
    Table {
        #[arg(long, default_value = "all", value_parser = parse_year)]
        year: YearSelection,
        #[arg(long)]
        province: Option<String>,
        #[arg(long, default_value = "")]
        search: String,
        /// Write the filtered records to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn parse_year(s: &str) -> Result<YearSelection, String> {
    if s.eq_ignore_ascii_case("all") {
        return Ok(YearSelection::All);
    }
    s.parse::<i32>()
        .map(YearSelection::Year)
        .map_err(|_| format!("expected a year or \"all\", got '{s}'"))
}

fn parse_limit(s: &str) -> Result<RankLimit, String> {
    if s.eq_ignore_ascii_case("all") {
        return Ok(RankLimit::All);
    }
    match s.parse::<usize>() {
        Ok(n) if n > 0 => Ok(RankLimit::Top(n)),
        _ => Err(format!("expected a positive number or \"all\", got '{s}'")),
    }
}

fn province_selection(name: Option<&str>) -> ProvinceSelection {
    name.map_or(ProvinceSelection::All, ProvinceSelection::named)
}

fn print_notice(notice: &Option<Notice>) {
    if let Some(n) = notice {
        println!("{n}");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    let data_path = cli.data.clone().unwrap_or(config.data_path.clone());

    let dashboard = Dashboard::open(&data_path);
    if let Some(err) = dashboard.load_error() {
        eprintln!("Could not load {}: {err}", data_path.display());
    }
    let dataset = dashboard.dataset();

    match cli.command {
        Command::Years => {
            let years: Vec<String> = dataset.years().iter().map(i32::to_string).collect();
            println!("Years: {}", years.join(", "));
            println!("Provinces:");
            for p in dataset.provinces() {
                println!("  {p}");
            }
            for p in dataset.unrecognized_provinces() {
                println!("Unrecognized province (not on map): {p}");
            }
        }
        Command::Map { year } => {
            let view = dashboard.map(year);
            println!("National production: {:.0} tons", view.national_total_tons);
            for m in &view.markers {
                println!(
                    "{:<28} {:>9.4} {:>9.4} {:>16.0} {}",
                    m.province, m.lat, m.lon, m.total_production_tons, m.tier.as_str()
                );
            }
            print_notice(&view.notice);
        }
        Command::Rank {
            year,
            province,
            top,
        } => {
            let limit = top.unwrap_or(RankLimit::from_count(config.ranking_limit));
            let view = dashboard.ranking(year, province_selection(province.as_deref()), limit);
            for (i, row) in view.rows.iter().enumerate() {
                println!(
                    "{:>3}. {:<32} {:<28} {:>16.0}",
                    i + 1,
                    row.regency.as_deref().unwrap_or_default(),
                    row.province.as_deref().unwrap_or_default(),
                    row.total_production_tons.unwrap_or_default()
                );
            }
            print_notice(&view.notice);
        }
        Command::Decline { from, to, top } => {
            let top_n = top.unwrap_or(config.decline_top_n);
            let years = dataset.years();
            let latest = DeclineQuery::latest_pair(&years, top_n);
            let view = match (from, to, latest) {
                (Some(prev), Some(now), _) => dashboard.declines(DeclineQuery::new(prev, now, top_n)),
                (prev, now, Some(latest)) => dashboard.declines(DeclineQuery::new(
                    prev.unwrap_or(latest.year_prev),
                    now.unwrap_or(latest.year_now),
                    top_n,
                )),
                _ => padi_core::dashboard::latest_decline_view(dataset, top_n),
            };
            if !view.rows.is_empty() {
                println!(
                    "{} regions with the largest decline from {} to {}:",
                    view.rows.len(),
                    view.query.year_prev,
                    view.query.year_now
                );
            }
            for row in &view.rows {
                println!(
                    "{:<32} {:<28} {:>16.0}",
                    row.regency, row.province, row.delta_tons
                );
            }
            print_notice(&view.notice);
        }
        Command::Forecast {
            province,
            target_year,
        } => {
            let target_year = target_year.unwrap_or(config.target_year);
            let view = dashboard.forecast(&province, target_year);
            if let Some(f) = &view.forecast {
                for (year, tons) in &f.history {
                    println!("{year}: {tons:.0}");
                }
                println!(
                    "Based on {} years of data, the {} forecast for {} is {:.0} tons.",
                    f.years_used(),
                    f.target_year,
                    f.province,
                    f.forecast_tons
                );
            }
            print_notice(&view.notice);
        }
        Command::Table {
            year,
            province,
            search,
            csv,
        } => {
            let filter = RecordFilter::all()
                .year(year)
                .province(province_selection(province.as_deref()))
                .search(&search);
            let view = dashboard.table(&filter);
            for r in &view.records {
                let year = r.year.map(|y| y.to_string()).unwrap_or_default();
                let tons = r
                    .production_tons
                    .map(|t| format!("{t:.0}"))
                    .unwrap_or_default();
                println!("{:<28} {:<32} {:>6} {:>14}", r.province, r.regency, year, tons);
            }
            println!(
                "Total production: {:.0} tons across {} records",
                view.total_production_tons, view.record_count
            );
            print_notice(&view.notice);
            if let Some(path) = csv {
                write_records_csv(&view.records, &path)?;
                println!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}
