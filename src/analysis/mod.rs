/// Delay analysis over arrival board records
use crate::domain::{DelayStats, FlightRecord, FlightRecordSet, HistogramBin, TrendPoint};
use crate::utils::parse_timestamp;
use std::collections::BTreeMap;

const HISTOGRAM_BINS: usize = 20;

/// Signed minutes between actual and scheduled arrival.
///
/// `None` when either timestamp is missing or unparseable.
pub fn compute_delay_minutes(record: &FlightRecord) -> Option<f64> {
    let scheduled = parse_timestamp(&record.schedule_arrival_time)?;
    let actual = parse_timestamp(record.actual_arrival_time.as_deref()?)?;
    Some((actual - scheduled).num_seconds() as f64 / 60.0)
}

/// Records whose remark is exactly `"Delayed"`
pub fn filter_delayed(records: &[FlightRecord]) -> FlightRecordSet {
    records.iter().filter(|r| r.is_delayed()).cloned().collect()
}

/// Summary statistics and a histogram of delay minutes
pub fn delay_stats(records: &[FlightRecord]) -> DelayStats {
    let delays: Vec<f64> = records.iter().filter_map(compute_delay_minutes).collect();

    if delays.is_empty() {
        return DelayStats {
            total: records.len(),
            with_delay: 0,
            mean_minutes: None,
            min_minutes: None,
            max_minutes: None,
            histogram: Vec::new(),
        };
    }

    let min = delays.iter().copied().fold(f64::INFINITY, f64::min);
    let max = delays.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = delays.iter().sum::<f64>() / delays.len() as f64;

    DelayStats {
        total: records.len(),
        with_delay: delays.len(),
        mean_minutes: Some(mean),
        min_minutes: Some(min),
        max_minutes: Some(max),
        histogram: histogram(&delays, min, max),
    }
}

fn histogram(values: &[f64], min: f64, max: f64) -> Vec<HistogramBin> {
    if max <= min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / HISTOGRAM_BINS as f64;
    let mut bins: Vec<HistogramBin> = (0..HISTOGRAM_BINS)
        .map(|i| HistogramBin {
            lower: min + i as f64 * width,
            upper: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();

    for v in values {
        // the top edge belongs to the last bin
        let idx = (((v - min) / width) as usize).min(HISTOGRAM_BINS - 1);
        bins[idx].count += 1;
    }
    bins
}

/// Flights per day across the history, oldest day first.
///
/// Days come from `FlightDate`, falling back to the scheduled arrival date.
/// Records with neither are left out.
pub fn daily_counts(records: &[FlightRecord]) -> Vec<TrendPoint> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        if let Some(day) = flight_day(record) {
            *counts.entry(day).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(date, flights)| TrendPoint { date, flights })
        .collect()
}

fn flight_day(record: &FlightRecord) -> Option<String> {
    if let Some(date) = record.flight_date.as_deref() {
        let date = date.trim();
        if !date.is_empty() {
            return Some(date.chars().take(10).collect());
        }
    }
    parse_timestamp(&record.schedule_arrival_time).map(|t| t.date_naive().to_string())
}
