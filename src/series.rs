use std::collections::BTreeMap;

use chrono::naive::{NaiveDate,NaiveDateTime};

use super::error::{Result,Error};
use super::rki::Report;


/// A date-indexed series with strictly increasing, contiguous dates.
pub type Series = Vec<(NaiveDate,f64)>;


/// Calendar day of a report; the service reports millisecond epochs.
pub fn report_date(report: &Report) -> NaiveDate {
    NaiveDateTime::from_timestamp(report.meldedatum / 1000, 0).date()
}


/// Sum case counts per calendar day and reindex over every day from the
/// first to the last observed date, so days without any report show up
/// as an explicit zero.
pub fn daily_cases(reports: &[Report]) -> Result<Series> {

    let mut by_date = BTreeMap::new();

    for report in reports {
        *by_date.entry(report_date(report)).or_insert(0.0)
            += report.anzahl_fall as f64;
    }

    let date_range = NaiveDateRange(*by_date.keys().min().ok_or(Error::MissingData)?,
                                    Some(*by_date.keys().max().ok_or(Error::MissingData)?));

    Ok(date_range.map(
        |date| (date, by_date.remove(&date).unwrap_or(0.0))
    ).collect())

}


/// Trailing mean over `window` days. Positions where the window is not
/// yet full carry NaN; the renderer drops non-finite values.
pub fn rolling_mean(data: &Series, window: usize) -> Series {
    let mut sum = 0.0;
    (0..data.len()).map(|i| {
        sum += data[i].1;
        if i >= window {
            sum -= data[i - window].1;
        }
        (data[i].0, match i + 1 >= window {
            true => sum / window as f64,
            false => f64::NAN
        })
    }).collect()
}


/// Trailing sum over `window` days, NaN during warm-up.
pub fn rolling_sum(data: &Series, window: usize) -> Series {
    let mut sum = 0.0;
    (0..data.len()).map(|i| {
        sum += data[i].1;
        if i >= window {
            sum -= data[i - window].1;
        }
        (data[i].0, match i + 1 >= window {
            true => sum,
            false => f64::NAN
        })
    }).collect()
}


/// Cases of the trailing 7-day week per 100 000 inhabitants, the usual
/// traffic-light number for a district.
pub fn weekly_incidence(data: &Series, population: u64) -> Series {
    rolling_sum(data, 7).into_iter().map(
        |(date,sum)| (date, sum / (population as f64 / 100_000.0))
    ).collect()
}


#[derive(Clone,Debug)]
pub struct NaiveDateRange(pub NaiveDate, pub Option<NaiveDate>);

impl Iterator for NaiveDateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<NaiveDate> {
        match self.1.map_or(true, |end| self.0 <= end) {
            false => None,
            true => {
                let current = self.0;
                self.0 = self.0.succ();
                Some(current)
            }
        }
    }
}


#[cfg(test)]
mod tests {

    use super::*;

    fn report(date: NaiveDate, cases: i64) -> Report {
        Report {
            landkreis: "SK Dortmund".to_string(),
            meldedatum: date.and_hms(0, 0, 0).timestamp() * 1000,
            anzahl_fall: cases,
            datenstand: "28.10.2020, 00:00 Uhr".to_string(),
        }
    }

    #[test]
    fn test_daily_cases_sums_and_fills_gaps() {
        let day1 = NaiveDate::from_ymd(2020, 9, 1);
        let day3 = NaiveDate::from_ymd(2020, 9, 3);
        let reports = vec![report(day1, 3), report(day1, 2), report(day3, 5)];
        let cases = daily_cases(&reports).unwrap();
        assert_eq!(cases, vec![
            (day1, 5.0),
            (NaiveDate::from_ymd(2020, 9, 2), 0.0),
            (day3, 5.0),
        ]);
    }

    #[test]
    fn test_daily_cases_has_no_gaps() {
        let reports = vec![
            report(NaiveDate::from_ymd(2020, 3, 2), 1),
            report(NaiveDate::from_ymd(2020, 3, 20), 4),
            report(NaiveDate::from_ymd(2020, 3, 11), 2),
        ];
        let cases = daily_cases(&reports).unwrap();
        assert_eq!(cases.len(), 19);
        for window in cases.windows(2) {
            assert_eq!(window[0].0.succ(), window[1].0);
        }
    }

    #[test]
    fn test_daily_cases_conserves_total() {
        let reports = vec![
            report(NaiveDate::from_ymd(2020, 9, 1), 3),
            report(NaiveDate::from_ymd(2020, 9, 1), 2),
            report(NaiveDate::from_ymd(2020, 9, 3), 5),
            report(NaiveDate::from_ymd(2020, 9, 9), -1),
        ];
        let total : i64 = reports.iter().map(|r| r.anzahl_fall).sum();
        let cases = daily_cases(&reports).unwrap();
        assert_eq!(cases.iter().map(|(_,v)| v).sum::<f64>(), total as f64);
    }

    #[test]
    fn test_daily_cases_empty_is_missing_data() {
        assert!(daily_cases(&[]).is_err());
    }

    #[test]
    fn test_rolling_mean_of_constant_series() {
        let series : Series = NaiveDateRange(NaiveDate::from_ymd(2020, 9, 1), None)
            .take(10).map(|date| (date, 4.0)).collect();
        let mean = rolling_mean(&series, 7);
        assert_eq!(mean.len(), series.len());
        for (i,(date,value)) in mean.iter().enumerate() {
            assert_eq!(*date, series[i].0);
            if i >= 6 {
                assert_eq!(*value, 4.0);
            } else {
                assert!(value.is_nan());
            }
        }
    }

    #[test]
    fn test_weekly_incidence_normalizes_to_100k() {
        let series : Series = NaiveDateRange(NaiveDate::from_ymd(2020, 9, 1), None)
            .take(7).map(|date| (date, 5.0)).collect();
        let incidence = weekly_incidence(&series, 200_000);
        // weekly sum 35, population 200k -> 17.5 per 100k
        assert_eq!(incidence.last().unwrap().1, 17.5);
        assert!(incidence[5].1.is_nan());
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let range = NaiveDateRange(NaiveDate::from_ymd(2020, 2, 27),
                                   Some(NaiveDate::from_ymd(2020, 3, 2)));
        assert_eq!(range.count(), 5);
    }

}
