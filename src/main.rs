mod graph;
mod error;
mod rki;
mod destatis;
mod series;

use std::{env,fs};
use std::path::{PathBuf,Path};
use std::collections::HashMap;

use chrono::Local;
use chrono::naive::NaiveDate;

use error::{Result,Error};
use graph::Metrics;


const DEFAULT_REGION: &str = "SK Dortmund";

/// Stand-in population when a district cannot be found in the merged
/// population table; keeps the dashboard rendering instead of failing.
const FALLBACK_POPULATION: u64 = 100_000;

/// Days per averaging period; 7 also fixes the incidence window.
const WINDOW: usize = 7;


fn main() -> Result<()> {

    let graph_path = PathBuf::from("graphs");
    let cache_path = PathBuf::from("cache");
    let data_path = PathBuf::from("data");

    fs::create_dir_all(&graph_path)?;

    let today = Local::today().naive_local();

    let regions : Vec<String> = match env::args().skip(1).collect::<Vec<_>>() {
        args if args.is_empty() => vec![DEFAULT_REGION.to_string()],
        args => args,
    };

    let catalog = match rki::districts(&cache_path, today)? {
        Some(catalog) => catalog,
        None => {
            eprintln!("Error: the district catalog is unavailable.");
            return Ok(());
        }
    };

    // Lookup failures of any kind fall back to a default population
    // further down, so a broken or missing table never stops a render.
    let populations = destatis::populations(&data_path).ok();

    for region in regions {
        if let Err(err) = region_dashboard(&graph_path, &cache_path, &catalog,
                                           populations.as_ref(), &region, today) {
            eprintln!("Error: {}: {}", region, err);
        }
    }

    Ok(())

}


fn region_dashboard(graph_path: &Path, cache_path: &Path, catalog: &[String],
                    populations: Option<&HashMap<String,u64>>,
                    region: &str, today: NaiveDate) -> Result<()> {

    if !catalog.iter().any(|r| r == region) {
        return Err(Error::MissingRegion(region.to_string()));
    }

    let reports = match rki::reports(cache_path, region, today)? {
        Some(reports) => reports,
        None => {
            eprintln!("Error: case reports for {} are unavailable.", region);
            return Ok(());
        }
    };

    if reports.truncated {
        println!("Warning: the report query for {} hit the {}-row limit, \
                  case counts may be incomplete!", region, rki::ROW_LIMIT);
    }

    let cases = series::daily_cases(&reports.rows)?;
    let stand = reports.rows.last()
        .map(|report| report.datenstand.clone()).unwrap_or_default();

    let population = populations.and_then(|table| table.get(region).copied())
        .unwrap_or(FALLBACK_POPULATION);

    let incidence = series::weekly_incidence(&cases, population);
    let mean = series::rolling_mean(&cases, WINDOW);

    let headline = incidence.iter().rev()
        .find(|(_,value)| value.is_finite()).map(|(_,value)| *value);

    let metrics : Metrics = vec![
        ("pro 7-Tage-Woche & 100t Einwohner".to_string(), incidence),
        (format!("{} Tage(s) Mittel", WINDOW), mean),
    ];

    graph::dashboard(graph_path, &format!("{}.html", rki::slug(region)),
                     region, &stand, true, &cases, &metrics, headline, WINDOW)?;

    if let Some(value) = headline {
        println!("{}: Inzidenzwert des vorherigen Tages {:.0}", region, value);
    }

    Ok(())

}
