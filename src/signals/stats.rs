//! Small numeric helpers shared by the extractors. Every helper returns 0.0
//! instead of NaN for empty or degenerate input.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values
        .iter()
        .map(|value| {
            let diff = value - avg;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

pub fn max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .fold(None, |acc: Option<f64>, value| match acc {
            Some(current) if current >= value => Some(current),
            _ => Some(value),
        })
        .unwrap_or(0.0)
}

pub fn last(values: &[f64]) -> f64 {
    values.last().copied().unwrap_or(0.0)
}

pub fn first(values: &[f64]) -> f64 {
    values.first().copied().unwrap_or(0.0)
}

/// The last `window` values, or the whole slice when it is shorter.
pub fn tail(values: &[f64], window: usize) -> &[f64] {
    let window = window.min(values.len());
    &values[values.len() - window..]
}

/// The first `window` values, or the whole slice when it is shorter.
pub fn head(values: &[f64], window: usize) -> &[f64] {
    let window = window.min(values.len());
    &values[..window]
}

/// Least-squares slope of `values` against their index.
pub fn slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = mean(values);

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (index, value) in values.iter().enumerate() {
        let dx = index as f64 - mean_x;
        numerator += dx * (value - mean_y);
        denominator += dx * dx;
    }

    if denominator <= 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Averages of the early, middle and late thirds of a series. Series shorter
/// than three points use the whole series for every third.
pub fn thirds(values: &[f64]) -> (f64, f64, f64) {
    let third = values.len() / 3;
    if third == 0 {
        let avg = mean(values);
        return (avg, avg, avg);
    }
    (
        mean(&values[..third]),
        mean(&values[third..2 * third]),
        mean(&values[2 * third..]),
    )
}

/// `(from - to) / from * 100`, or 0 when `from` is not positive.
pub fn percent_drop(from: f64, to: f64) -> f64 {
    if from > 0.0 {
        (from - to) / from * 100.0
    } else {
        0.0
    }
}

pub fn round_to(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}
