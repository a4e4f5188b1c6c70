//! Numeric text checks and value clustering.
//!
//! `dominant_cluster` implements the median-distance grouping used to pick
//! the plausible price band out of scraped listings: outliers sit far from
//! the median, the band worth keeping is the largest run of close values.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Optional sign, digits, at most one decimal point.
    static ref NUMERIC_PATTERN: Regex = Regex::new(r"^-?\d*\.?\d*$").unwrap();
}

/// Check whether a string holds a plain decimal number.
///
/// Accepts `123`, `123.456`, `-123`, `-.5`; rejects thousands separators,
/// exponents, and sign/point-only strings like `-` or `.`.
pub fn is_numeric_value(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.bytes().any(|b| b.is_ascii_digit()) && NUMERIC_PATTERN.is_match(trimmed)
}

/// Pick the dominant cluster out of a list of values.
///
/// The values are deduplicated and sorted, then grouped by distance from the
/// median; the largest group wins. Lists that are small (fewer than 4
/// values) or already tight (max within 3x of min below 10 000, or within 2x
/// above) are returned whole.
///
/// With `round_to_hundred`, every value is first rounded to the nearest 100.
///
/// # Example
///
/// ```rust
/// use binfra_core::numeric::dominant_cluster;
///
/// let cluster = dominant_cluster(&[4, 5, 100, 1000, 1500, 1300, 1230, 5000], false);
/// assert_eq!(cluster, vec![1000, 1230, 1300, 1500]);
/// ```
pub fn dominant_cluster(nums: &[i64], round_to_hundred: bool) -> Vec<i64> {
    let mut values: Vec<i64> = nums
        .iter()
        .map(|&n| {
            if round_to_hundred {
                ((n as f64) / 100.0).round() as i64 * 100
            } else {
                n
            }
        })
        .collect();
    values.sort_unstable();
    values.dedup();

    if values.len() < 4 {
        return values;
    }

    let min = values[0];
    let max = values[values.len() - 1];
    if (max < 10_000 && max <= 3 * min) || (max > 10_000 && max <= 2 * min) {
        return values;
    }

    let median = median_i64(&values);

    if values.len() > 5 {
        let threshold = if max > 4 * min { 0.6 } else { 0.5 };
        let border = median * threshold;
        let close: Vec<i64> = values
            .iter()
            .copied()
            .filter(|&n| (n as f64 - median).abs() <= border)
            .collect();
        if close.is_empty() {
            return values;
        }
        return close;
    }

    // 4 or 5 values: gap-group with the median absolute deviation as threshold
    let deviations: Vec<f64> = values.iter().map(|&n| (n as f64 - median).abs()).collect();
    let mut threshold = median_f64(&deviations);
    if min > 5000 {
        threshold *= 3.0;
    }

    let max_deviation = deviations.iter().cloned().fold(0.0_f64, f64::max);
    if threshold < 1000.0 && max_deviation < 1000.0 {
        return values;
    }

    let mut groups: Vec<Vec<i64>> = Vec::new();
    let mut current = vec![values[0]];
    for pair in values.windows(2) {
        if (pair[1] - pair[0]) as f64 <= threshold {
            current.push(pair[1]);
        } else {
            groups.push(std::mem::take(&mut current));
            current = vec![pair[1]];
        }
    }
    groups.push(current);

    // First-largest wins on ties
    let mut best = 0;
    for (i, group) in groups.iter().enumerate() {
        if group.len() > groups[best].len() {
            best = i;
        }
    }
    groups.swap_remove(best)
}

fn median_i64(sorted: &[i64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
    }
}

fn median_f64(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}
