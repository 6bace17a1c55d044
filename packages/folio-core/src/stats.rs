//! Descriptive statistics shared by the risk engine.
//!
//! Variance, standard deviation and covariance use the sample (n - 1)
//! denominator throughout.

use crate::{Error, Result};

#[inline]
fn lerp(lower: f64, upper: f64, weight: f64) -> f64 {
    lower * (1.0 - weight) + upper * weight
}

fn require_len(data: &[f64], min: usize, what: &str) -> Result<()> {
    if data.len() < min {
        return Err(Error::InsufficientData(format!(
            "{} needs at least {} observations, got {}",
            what,
            min,
            data.len()
        )));
    }
    Ok(())
}

pub fn mean(data: &[f64]) -> Result<f64> {
    require_len(data, 1, "mean")?;
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

pub fn sample_variance(data: &[f64]) -> Result<f64> {
    require_len(data, 2, "variance")?;
    let m = mean(data)?;
    let sum_sq = data.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    Ok(sum_sq / (data.len() - 1) as f64)
}

pub fn sample_std(data: &[f64]) -> Result<f64> {
    Ok(sample_variance(data)?.sqrt())
}

pub fn sample_covariance(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::InvalidInput(format!(
            "covariance inputs differ in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    require_len(a, 2, "covariance")?;

    let mean_a = mean(a)?;
    let mean_b = mean(b)?;
    let sum = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum::<f64>();
    Ok(sum / (a.len() - 1) as f64)
}

/// Linearly interpolated percentile, `q` in [0, 1].
///
/// Matches the default "linear" method: rank `q * (n - 1)` between the two
/// nearest order statistics.
pub fn percentile(data: &[f64], q: f64) -> Result<f64> {
    require_len(data, 1, "percentile")?;
    if !(0.0..=1.0).contains(&q) {
        return Err(Error::InvalidInput(format!(
            "percentile must be in [0, 1], got {}",
            q
        )));
    }

    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;

    if lower == upper {
        Ok(sorted[lower])
    } else {
        Ok(lerp(sorted[lower], sorted[upper], position - lower as f64))
    }
}
