use std::io;
use std::fs::File;
use std::path::Path;
use std::collections::HashMap;

use calamine::{open_workbook,DataType,Reader,Xlsx};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::error::{Result,Error};


// Fixed layout of the Destatis district sheet ("Kreisfreie Städte und
// Landkreise nach Fläche, Bevölkerung und Bevölkerungsdichte").
const SHEET_INDEX: usize = 1;
const HEADER_ROWS: usize = 3;
const FOOTER_ROWS: usize = 16;
const COL_SCHLUESSEL: usize = 0;
const COL_REGION: usize = 1;
const COL_KREIS: usize = 2;
const COL_EINWOHNER: usize = 5;


lazy_static! {

    /// Destatis region-type labels mapped to the conventions the
    /// reporting interface uses in its district identifiers.
    static ref REGION_LABELS: HashMap<&'static str,&'static str> = vec![
        ("Kreisfreie Stadt", "SK"),
        ("Stadtkreis", "SK"),
        ("Kreis", "LK"),
        ("Landkreis", "LK"),
        ("Regionalverband", "LK Stadtverband"),
    ].into_iter().collect();

    /// Rows whose naming the two sources disagree on, keyed by the
    /// district code so the list survives row reordering between
    /// Destatis editions.
    static ref NAME_CORRECTIONS: HashMap<&'static str,(&'static str,&'static str)> = vec![
        ("10041", ("LK Stadtverband", "Saarbrücken")),
        ("05334", ("StadtRegion", "Aachen")),
        ("03241", ("Region", "Hannover")),
    ].into_iter().collect();

    /// Leading word sequence of a Kreis cell, i.e. the district name
    /// without a ", Stadt"-style qualifier. Names may contain spaces
    /// and hyphens.
    static ref KREIS_NAME: Regex = Regex::new(r"[\w\s-]+").unwrap();

}


/// Population per district identifier, merged from the Destatis sheet
/// and the Berlin supplement. Berlin's internal districts are missing
/// from Destatis, but the reporting interface counts cases per Bezirk.
pub fn populations(data_path: &Path) -> Result<HashMap<String,u64>> {

    let mut table = HashMap::new();

    for (key,count) in destatis_table(&data_path.join("04-kreise.xlsx"))? {
        table.insert(key, count);
    }

    for (key,count) in berlin_table(File::open(data_path.join("Berlin.csv"))?)? {
        table.insert(key, count);
    }

    Ok(table)

}


/// District identifier as used by the reporting interface, e.g.
/// "SK Flensburg" from ("Kreisfreie Stadt", "Flensburg, Stadt").
/// Already-normalized pairs pass through unchanged.
pub fn district_key(schluessel: &str, region: &str, kreis: &str) -> Option<String> {

    if let Some((region,kreis)) = NAME_CORRECTIONS.get(schluessel) {
        return Some(format!("{} {}", region, kreis));
    }

    let region = REGION_LABELS.get(region).copied().unwrap_or(region);
    let kreis = KREIS_NAME.find(kreis)?.as_str();

    Some(format!("{} {}", region, kreis))

}


fn destatis_table(path: &Path) -> Result<Vec<(String,u64)>> {

    let mut workbook : Xlsx<_> = open_workbook(path)?;
    let sheets = workbook.sheet_names().to_owned();
    let sheet = sheets.get(SHEET_INDEX)
        .ok_or(Error::MissingSheet(SHEET_INDEX))?.clone();
    let range = workbook.worksheet_range(&sheet)
        .ok_or(Error::MissingSheet(SHEET_INDEX))??;

    let rows : Vec<_> = range.rows().collect();
    let end = rows.len().saturating_sub(FOOTER_ROWS);
    let mut table = Vec::new();

    for row in rows.iter().take(end).skip(HEADER_ROWS) {

        // Summary rows, state headers and footnotes all carry keys of
        // other lengths; districts have 5-character codes.
        let schluessel = cell_string(row.get(COL_SCHLUESSEL));
        if schluessel.chars().count() != 5 {
            continue;
        }

        let region = cell_string(row.get(COL_REGION));
        let kreis = cell_string(row.get(COL_KREIS));

        if let Some(key) = district_key(&schluessel, &region, &kreis) {
            table.push((key, cell_count(row.get(COL_EINWOHNER))?));
        }

    }

    Ok(table)

}


fn berlin_table<R: io::Read>(reader: R) -> Result<Vec<(String,u64)>> {

    #[derive(Deserialize)]
    struct Bezirk {
        #[serde(rename = "Bezirk")]
        bezirk: String,
        #[serde(rename = "Einwohnerzahl")]
        einwohner: u64,
    }

    csv::Reader::from_reader(reader).deserialize().map(|row| {
        let row : Bezirk = row?;
        Ok((row.bezirk, row.einwohner))
    }).collect()

}


fn cell_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(s)) => s.trim().to_string(),
        Some(DataType::Int(i)) => i.to_string(),
        Some(DataType::Float(f)) => (*f as i64).to_string(),
        _ => String::new(),
    }
}


fn cell_count(cell: Option<&DataType>) -> Result<u64> {
    match cell {
        Some(DataType::Int(i)) => Ok(*i as u64),
        Some(DataType::Float(f)) => Ok(*f as u64),
        Some(DataType::String(s)) => Ok(s.trim().parse()?),
        _ => Err(Error::MissingData),
    }
}
