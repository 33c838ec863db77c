//! Goodness-of-fit metrics between observed and predicted values.

/// Root-mean-squared error.
pub fn rmse(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len().min(predicted.len());
    let sse: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p) * (o - p))
        .sum();
    (sse / n as f64).sqrt()
}

/// Mean absolute error.
pub fn mae(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len().min(predicted.len());
    let sae: f64 = observed.iter().zip(predicted).map(|(o, p)| (o - p).abs()).sum();
    sae / n as f64
}

/// Coefficient of determination against the variance of `observed`.
///
/// NaN when `observed` is constant.
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }
    let mean = observed[..n].iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = observed[..n].iter().map(|o| (o - mean) * (o - mean)).sum();
    if ss_tot == 0.0 {
        return f64::NAN;
    }
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p) * (o - p))
        .sum();
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_prediction() {
        let y = [1.0, 2.0, 3.0];
        assert_eq!(rmse(&y, &y), 0.0);
        assert_eq!(mae(&y, &y), 0.0);
        assert_eq!(r_squared(&y, &y), 1.0);
    }

    #[test]
    fn test_errors() {
        let y = [1.0, 2.0, 3.0, 4.0];
        let p = [2.0, 2.0, 2.0, 2.0];
        assert_relative_eq!(rmse(&y, &p), 1.5f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(mae(&y, &p), 1.0, epsilon = 1e-12);
        // Predicting a constant 2 against mean 2.5: 1 - 6 / 5.
        assert_relative_eq!(r_squared(&y, &p), -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_observed_has_no_r_squared() {
        assert!(r_squared(&[3.0, 3.0], &[3.0, 3.0]).is_nan());
    }
}
