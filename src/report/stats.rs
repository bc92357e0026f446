// Pure reductions over one endpoint's samples in one window.
// Nothing here mutates its input; empty input yields None rather than 0 or NaN.

use std::collections::HashSet;
use std::hash::Hash;

use crate::models::{Sample, Summary, Window};
use crate::version::REPORT_SCHEMA_VERSION;

/// Present, finite values of one optional measurement.
fn present<T>(items: &[T], field: impl Fn(&T) -> Option<f64>) -> Vec<f64> {
    items
        .iter()
        .filter_map(field)
        .filter(|v| v.is_finite())
        .collect()
}

/// Arithmetic mean over items where `field` is present.
pub fn mean<T>(items: &[T], field: impl Fn(&T) -> Option<f64>) -> Option<f64> {
    let values = present(items, field);
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Shortest round-trip text of a finite number: `-0` prints as `0`, exponent form outside
/// `[1e-6, 1e21)` with an explicit `+` on positive exponents.
fn number_text(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let abs = v.abs();
    if (1e-6..1e21).contains(&abs) {
        return v.to_string();
    }
    let text = format!("{v:e}");
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => text,
    }
}

/// Median over items where `field` is present. Even count: mean of the two central values.
///
/// Values are ordered by their text form, not numerically: `[-3, -1, 2, 4]` orders as
/// `-1, -3, 2, 4` and yields `-0.5`. The sort is stable.
pub fn median<T>(items: &[T], field: impl Fn(&T) -> Option<f64>) -> Option<f64> {
    let values = present(items, field);
    if values.is_empty() {
        return None;
    }
    let mut keyed: Vec<(String, f64)> =
        values.into_iter().map(|v| (number_text(v), v)).collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    let values: Vec<f64> = keyed.into_iter().map(|(_, v)| v).collect();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

pub fn distinct_count<'a, T, K: Eq + Hash>(items: &'a [T], key: impl Fn(&'a T) -> K) -> usize {
    items.iter().map(key).collect::<HashSet<K>>().len()
}

pub fn changed<'a, T, K: Eq + Hash>(items: &'a [T], key: impl Fn(&'a T) -> K) -> bool {
    distinct_count(items, key) > 1
}

/// Values at the earliest and latest `time`. Ties keep the first item in input order.
pub fn chronological_endpoints<'a, T, K: Ord, V>(
    items: &'a [T],
    time: impl Fn(&'a T) -> K,
    value: impl Fn(&'a T) -> V,
) -> Option<(V, V)> {
    let first = items.first()?;
    let mut earliest = (time(first), first);
    let mut latest = (time(first), first);
    for item in &items[1..] {
        let t = time(item);
        if t < earliest.0 {
            earliest = (t, item);
        } else if t > latest.0 {
            latest = (t, item);
        }
    }
    Some((value(earliest.1), value(latest.1)))
}

/// Reduce one window's samples into a report. Zero samples produce the blank report.
pub fn summarize(endpoint: &str, window: Window, samples: &[Sample]) -> Summary {
    if samples.is_empty() {
        return Summary::blank(endpoint, window);
    }

    let (start_user_agent, end_user_agent) =
        chronological_endpoints(samples, |s| s.observed_at, |s| s.user_agent.clone()).unzip();

    Summary {
        endpoint: endpoint.to_string(),
        window_start: window.start,
        period: window.period,
        sample_count: samples.len() as u32,
        probe_count: distinct_count(samples, |s| s.probe_id.as_str()) as u32,
        mean_latency: mean(samples, |s| s.latency),
        median_latency: median(samples, |s| s.latency),
        mean_shaped_latency: mean(samples, |s| s.shaped_latency),
        mean_reliability: mean(samples, |s| s.reliability),
        user_agent_changed: changed(samples, |s| s.user_agent.as_str()),
        start_user_agent,
        end_user_agent,
        schema_version: REPORT_SCHEMA_VERSION.to_string(),
    }
}
