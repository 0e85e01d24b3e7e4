/// Coefficient of determination of `predictions` against `targets`.
///
/// Constant targets score `1.0` when predicted exactly and `0.0` otherwise.
/// Empty input scores `0.0`.
#[must_use]
pub fn r2_score(targets: &[f64], predictions: &[f64]) -> f64 {
    let n = targets.len().min(predictions.len());
    if n == 0 {
        return 0.0;
    }
    let targets = &targets[..n];

    let mean = targets.iter().sum::<f64>() / n as f64;
    let ss_res: f64 = targets
        .iter()
        .zip(predictions)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = targets.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
