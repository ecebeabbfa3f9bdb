/// Arithmetic mean, `0.0` for no data
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// `part / (part + rest)`, with absent counters counted as zero and an
/// empty or negative total giving `0.0`
pub fn share(part: Option<f64>, rest: Option<f64>) -> f64 {
    let part = part.unwrap_or(0.0);
    let total = part + rest.unwrap_or(0.0);
    if total > 0.0 { part / total } else { 0.0 }
}
