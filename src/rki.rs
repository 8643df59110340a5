use std::{io,fs};
use std::fs::File;
use std::path::Path;

use chrono::naive::NaiveDate;
use serde::{Serialize,Deserialize};
use serde::de::DeserializeOwned;
use unidecode::unidecode;

use super::error::Result;


/// Read-only query layer of the RKI COVID-19 feature service.
const SERVICE_URL: &str = "https://services7.arcgis.com/mOBPykOjAyBO2ZKk\
                           /arcgis/rest/services/RKI_COVID19/FeatureServer/0";

/// The service caps a single query at this many rows and silently drops
/// the rest; see `Reports::truncated`.
pub const ROW_LIMIT: usize = 5000;


#[derive(Deserialize,Debug)]
struct FeatureCollection<T> {
    features: Vec<Feature<T>>,
    #[serde(rename = "exceededTransferLimit", default)]
    exceeded_transfer_limit: bool,
}

#[derive(Deserialize,Debug)]
struct Feature<T> {
    attributes: T
}

#[derive(Deserialize,Debug)]
#[serde(rename_all = "PascalCase")]
struct District {
    landkreis: String
}

/// One case notification. Unwrapping the `features[].attributes`
/// envelope is what strips the `attributes.` prefix off the column
/// names; rows keep only the fields the pipeline reads.
#[derive(Serialize,Deserialize,Debug,Clone)]
#[serde(rename_all = "PascalCase")]
pub struct Report {
    pub landkreis: String,
    pub meldedatum: i64,
    pub anzahl_fall: i64,
    pub datenstand: String,
}

#[derive(Serialize,Deserialize,Debug)]
pub struct Reports {
    pub rows: Vec<Report>,
    pub truncated: bool,
}

impl Reports {

    fn from_response(data: FeatureCollection<Report>) -> Self {
        let truncated = data.exceeded_transfer_limit
            || data.features.len() >= ROW_LIMIT;
        Reports {
            rows: data.features.into_iter().map(|f| f.attributes).collect(),
            truncated
        }
    }

}


/// All distinct district identifiers known to the service, sorted.
/// Any non-200 response yields `Ok(None)`; callers must report the
/// outage instead of rendering.
pub fn districts(cache_path: &Path, today: NaiveDate) -> Result<Option<Vec<String>>> {
    let cache_path = cache_path.join("rki");
    let cache_file = format!("landkreise_{}.json", today.format("%Y%m%d"));
    cached(&cache_path, &cache_file, download_districts)
}


/// All report rows for one district. `today` busts the cache: the file
/// name embeds it, so a file written on another day is never read back.
pub fn reports(cache_path: &Path, region: &str, today: NaiveDate) -> Result<Option<Reports>> {
    let cache_path = cache_path.join("rki");
    let cache_file = format!("reports_{}_{}.json",
                             slug(region), today.format("%Y%m%d"));
    cached(&cache_path, &cache_file, || download_reports(region))
}


/// Filesystem-safe name for a district, also used for the dashboard
/// output files.
pub fn slug(region: &str) -> String {
    unidecode(region).to_lowercase().replace(' ', "-")
}


fn cached<T,F>(cache_path: &Path, filename: &str, download: F) -> Result<Option<T>>
where T: Serialize + DeserializeOwned,
      F: FnOnce() -> Result<Option<T>> {

    let cache_file = cache_path.join(filename);

    if cache_file.exists() {
        let contents = serde_json::from_reader(
            io::BufReader::new(File::open(&cache_file)?));
        if let Ok(data) = contents {
            return Ok(Some(data));
        }
    }

    let data = download()?;

    // An unavailable result is not cached, so the next run retries
    // instead of pinning the outage for the rest of the day.
    if let Some(data) = data.as_ref() {
        fs::create_dir_all(cache_path)?;
        serde_json::to_writer(io::BufWriter::new(
            File::create(&cache_file)?), data)?;
    }

    Ok(data)

}


fn download_districts() -> Result<Option<Vec<String>>> {

    println!("Downloading district catalog...");

    let res = reqwest::blocking::get(&format!(
        "{}/query?where=1%3D1&outFields=Landkreis&returnGeometry=false\
         &returnDistinctValues=true&outSR=4326&f=json", SERVICE_URL))?;

    if res.status().as_u16() != 200 {
        return Ok(None);
    }

    let data : FeatureCollection<District> = serde_json::from_str(&res.text()?)?;
    let mut names : Vec<String> = data.features.into_iter()
        .map(|f| f.attributes.landkreis).collect();
    names.sort();
    names.dedup();

    Ok(Some(names))

}


fn download_reports(region: &str) -> Result<Option<Reports>> {

    println!("Downloading case reports for {}...", region);

    let res = reqwest::blocking::get(&format!(
        "{}/query?where=Landkreis%20%3D%20'{}'&outFields=*&outSR=4326&f=json",
        SERVICE_URL, region.replace(' ', "%20")))?;

    if res.status().as_u16() != 200 {
        return Ok(None);
    }

    let data : FeatureCollection<Report> = serde_json::from_str(&res.text()?)?;
    Ok(Some(Reports::from_response(data)))

}


#[cfg(test)]
mod tests {

    use super::*;

    const RESPONSE: &str = r#"{
        "objectIdFieldName": "ObjectId",
        "features": [
            {"attributes": {"Landkreis": "SK Dortmund", "Meldedatum": 1598918400000,
                            "AnzahlFall": 3, "AnzahlTodesfall": 0,
                            "Datenstand": "28.10.2020, 00:00 Uhr"}},
            {"attributes": {"Landkreis": "SK Dortmund", "Meldedatum": 1599004800000,
                            "AnzahlFall": 1, "AnzahlTodesfall": 0,
                            "Datenstand": "28.10.2020, 00:00 Uhr"}}
        ]
    }"#;

    #[test]
    fn test_report_rows_unwrap_attributes() {
        let data : FeatureCollection<Report> = serde_json::from_str(RESPONSE).unwrap();
        let reports = Reports::from_response(data);
        assert_eq!(reports.rows.len(), 2);
        assert_eq!(reports.rows[0].landkreis, "SK Dortmund");
        assert_eq!(reports.rows[0].meldedatum, 1598918400000);
        assert_eq!(reports.rows[0].anzahl_fall, 3);
        assert_eq!(reports.rows[0].datenstand, "28.10.2020, 00:00 Uhr");
        assert!(!reports.truncated);
    }

    #[test]
    fn test_transfer_limit_flag_marks_truncation() {
        let response = r#"{"features": [], "exceededTransferLimit": true}"#;
        let data : FeatureCollection<Report> = serde_json::from_str(response).unwrap();
        assert!(Reports::from_response(data).truncated);
    }

    #[test]
    fn test_district_catalog_parses() {
        let response = r#"{"features": [
            {"attributes": {"Landkreis": "SK Dortmund"}},
            {"attributes": {"Landkreis": "LK Heinsberg"}}
        ]}"#;
        let data : FeatureCollection<District> = serde_json::from_str(response).unwrap();
        assert_eq!(data.features.len(), 2);
        assert_eq!(data.features[1].attributes.landkreis, "LK Heinsberg");
    }

    #[test]
    fn test_slug_is_ascii_and_pathless() {
        assert_eq!(slug("SK Dortmund"), "sk-dortmund");
        assert_eq!(slug("SK Köln"), "sk-koln");
        assert_eq!(slug("LK Stadtverband Saarbrücken"),
                   "lk-stadtverband-saarbrucken");
    }

}
