use std::{io,fs};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde_json::{Value,json};

use super::error::Result;
use super::series::Series;


/// Derived series shown on top of the daily cases, keyed by the label
/// that ends up in the legend.
pub type Metrics = Vec<(String,Series)>;

const DAILY_LABEL: &str = "tägl. Fallzahlen";

/// Weekly incidence levels used as intervention thresholds.
const THRESHOLDS: [(&str,&str,f64); 2] = [
    ("Grenzwert", "red", 50.0),
    ("Warnwert", "orange", 35.0),
];


/// Write the dashboard page for one district: usage notes, the case
/// chart, the headline incidence of the previous day, a table of the
/// last `window` days and the data sources.
pub fn dashboard(graph_path: &Path, filename: &str, region: &str, stand: &str,
                 thresholds: bool, data: &Series, metrics: &Metrics,
                 incidence: Option<f64>, window: usize) -> Result<()> {

    fs::create_dir_all(graph_path)?;
    let mut out = io::BufWriter::new(File::create(graph_path.join(filename))?);

    write!(out, "<!DOCTYPE html><html><head>")?;
    write!(out, "<meta charset=\"UTF-8\">")?;
    write!(out, "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">")?;
    write!(out, "<title>COVID19 lokale Fallzahlen: {}</title>", region)?;
    write!(out, "<script src=\"https://cdn.jsdelivr.net/npm/vega@5\"></script>")?;
    write!(out, "<script src=\"https://cdn.jsdelivr.net/npm/vega-lite@4\"></script>")?;
    write!(out, "<script src=\"https://cdn.jsdelivr.net/npm/vega-embed\"></script>")?;
    write!(out, "</head>")?;
    write!(out, "<body>")?;
    write!(out, "<h1>COVID19 lokale Fallzahlen</h1>")?;
    write!(out, "<p>Diese Seite stellt den Verlauf gemeldeter COVID19 Fälle dar. \
                 Die Meldungen werden von der Datenschnittstelle des \
                 <a href=\"https://www.rki.de/\">Robert-Koch-Instituts</a> abgerufen \
                 und tageweise gesammelt dargestellt.</p>")?;
    write!(out, "<div id=\"vis\" style=\"width: 100%; height: 480px;\"></div>")?;
    write!(out, "<script type=\"text/javascript\">")?;
    write!(out, "var spec = ")?;

    serde_json::to_writer_pretty(out.by_ref(),
                                 &chart_spec(region, stand, thresholds, data, metrics))?;

    write!(out, ";vegaEmbed('#vis', spec,{{}}).catch(console.error);")?;
    write!(out, "</script>")?;

    if let Some(value) = incidence {
        write!(out, "<h2>Inzidenzwert des vorherigen Tages {:.0}*</h2>", value)?;
        write!(out, "<p>* Der angezeigte Wert ist gerundet.</p>")?;
    }

    write!(out, "<h2>Fallzahlen der letzten {} Tage:</h2>", window)?;
    write!(out, "<table><tr><th>Meldedatum</th><th>Fallzahlen</th></tr>")?;
    for (date,value) in data.iter().rev().take(window) {
        write!(out, "<tr><td>{}</td><td>{:.0}</td></tr>",
               date.format("%Y-%m-%d"), value)?;
    }
    write!(out, "</table>")?;

    write!(out, "<h2>Datenquellen:</h2><ul>")?;
    write!(out, "<li>Fallzahlen: <a href=\"https://npgeo-corona-npgeo-de.hub.arcgis.com\
                 /datasets/dd4580c810204019a7b8eb3e0b329dd6_0/data\">Robert Koch-Institut \
                 (RKI)</a>, dl-de/by-2-0.</li>")?;
    write!(out, "<li>Einwohnerzahlen: Statistisches Bundesamt (Destatis), \
                 Gemeindeverzeichnis, Kreisfreie Städte und Landkreise am 31.12.2019.</li>")?;
    write!(out, "<li>Einwohnerzahlen Berliner Bezirke: Amt für Statistik \
                 Berlin-Brandenburg, Statistischer Bericht A I 5 – hj 2 / 19.</li>")?;
    write!(out, "</ul>")?;

    write!(out, "</body></html>")?;

    Ok(())

}


/// Step plot of the daily series with a shaded area beneath, one step
/// line per derived metric and, if requested, the two fixed threshold
/// rules. Non-finite values (rolling-window warm-up) are dropped.
fn chart_spec(region: &str, stand: &str, thresholds: bool,
              data: &Series, metrics: &Metrics) -> Value {

    let daily : Vec<Value> = values(DAILY_LABEL, data);
    let combined : Vec<Value> = std::iter::once((DAILY_LABEL.to_string(), data))
        .chain(metrics.iter().map(|(name,series)| (name.clone(), series)))
        .flat_map(|(name,series)| values(&name, series))
        .collect();

    let x = json!({
        "field": "Date",
        "timeUnit": "utcyearmonthdate",
        "title": "Meldedatum",
        "type": "temporal",
        "axis": {
            "format": "%b'%y",
            "tickCount": {"interval": "month", "step": 1},
            "grid": true,
            "gridOpacity": 0.3
        }
    });

    let mut layers = vec![
        json!({
            "data": {"values": daily},
            "mark": {"type": "area", "interpolate": "step-before", "opacity": 0.4},
            "encoding": {
                "x": x.clone(),
                "y": {
                    "field": "Value",
                    "title": "gemeldete Fallzahlen",
                    "type": "quantitative"
                }
            }
        }),
        json!({
            "data": {"values": combined},
            "mark": {"type": "line", "interpolate": "step-before"},
            "selection": {
                "Highlight": {"bind":"legend","type":"multi","fields":["Kennzahl"]},
                "Grid": {"bind":"scales","type":"interval"}
            },
            "encoding": {
                "x": x,
                "y": {
                    "field": "Value",
                    "title": "gemeldete Fallzahlen",
                    "type": "quantitative"
                },
                "color": {
                    "field": "Kennzahl",
                    "type": "nominal",
                    "legend": {"orient": "top"}
                },
                "opacity": {"value":0.3,"condition":{"value":1,"selection":"Highlight"}}
            }
        }),
        json!({
            "data": {"values": combined},
            "transform": [
                {
                    "groupby": ["Date"],
                    "value": "Value",
                    "pivot": "Kennzahl"
                }
            ],
            "mark": {
                "color": "gray",
                "tooltip": {"content":"data"},
                "type": "rule"
            },
            "selection": {
                "Hover": {
                    "nearest":true,
                    "empty":"none",
                    "clear":"mouseout",
                    "type":"single",
                    "on":"mouseover",
                    "fields":["Date"]
                }
            },
            "encoding": {
                "opacity": {
                    "value": 0,
                    "condition": {
                        "value": 1,
                        "selection": "Hover"
                    }
                },
                "x": {
                    "field":"Date",
                    "type":"temporal"
                },
                "tooltip": std::iter::once(json!({"field":"Date","type":"temporal"}))
                    .chain(std::iter::once(
                        json!({"field":DAILY_LABEL,"format":".0f","type":"quantitative"})))
                    .chain(metrics.iter().map(
                        |(name,_)| json!({"field":name,"format":".1f","type":"quantitative"})
                    )).collect::<Vec<_>>()
            }
        }),
    ];

    if thresholds {
        for &(name,color,value) in THRESHOLDS.iter() {
            layers.push(json!({
                "data": {"values": [{"Name": name, "Value": value}]},
                "encoding": {
                    "y": {
                        "field":"Value",
                        "type":"quantitative"
                    }
                },
                "layer": [
                    {
                        "mark": {
                            "color": color,
                            "opacity": 0.5,
                            "size": 1,
                            "type":"rule"
                        }
                    },
                    {
                        "mark": {
                            "type": "text",
                            "color": color,
                            "align": "right",
                            "dy": -5
                        },
                        "encoding": {
                            "text": {"field": "Name"}
                        }
                    }
                ]
            }));
        }
    }

    json!({
        "$schema": "https://vega.github.io/schema/vega-lite/v4.json",
        "height": "container",
        "width": "container",
        "title": format!("{}, Stand: {}", region, stand),
        "layer": layers
    })

}


fn values(name: &str, series: &Series) -> Vec<Value> {
    series.iter().filter_map(
        |(date,val)| match val.is_finite() {
            false => None,
            true => Some(json!({
                "Date": format!("{}", date.format("%Y-%m-%d")),
                "Kennzahl": name.to_string(),
                "Value": val
            }))
        }
    ).collect()
}


#[cfg(test)]
mod tests {

    use super::*;
    use chrono::naive::NaiveDate;

    fn sample() -> (Series, Metrics) {
        let data = vec![
            (NaiveDate::from_ymd(2020, 9, 1), 5.0),
            (NaiveDate::from_ymd(2020, 9, 2), 0.0),
            (NaiveDate::from_ymd(2020, 9, 3), 5.0),
        ];
        let metrics = vec![
            ("7 Tage(s) Mittel".to_string(), vec![
                (NaiveDate::from_ymd(2020, 9, 1), f64::NAN),
                (NaiveDate::from_ymd(2020, 9, 2), f64::NAN),
                (NaiveDate::from_ymd(2020, 9, 3), 3.3),
            ]),
        ];
        (data, metrics)
    }

    #[test]
    fn test_threshold_layer_is_optional() {
        let (data,metrics) = sample();
        let with = chart_spec("SK Dortmund", "28.10.2020", true, &data, &metrics);
        let without = chart_spec("SK Dortmund", "28.10.2020", false, &data, &metrics);
        assert_eq!(with["layer"].as_array().unwrap().len(),
                   without["layer"].as_array().unwrap().len() + THRESHOLDS.len());
    }

    #[test]
    fn test_non_finite_values_are_dropped() {
        let (_,metrics) = sample();
        let encoded = values("7 Tage(s) Mittel", &metrics[0].1);
        assert_eq!(encoded.len(), 1);
        assert_eq!(encoded[0]["Date"], "2020-09-03");
    }

    #[test]
    fn test_title_carries_region_and_stand() {
        let (data,metrics) = sample();
        let spec = chart_spec("SK Dortmund", "28.10.2020, 00:00 Uhr", false, &data, &metrics);
        assert_eq!(spec["title"], "SK Dortmund, Stand: 28.10.2020, 00:00 Uhr");
    }

}
