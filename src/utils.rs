use num_traits::{Float, FromPrimitive};
use std::cmp::Ordering;

/// Total order for floats that are already known not to be NaN.
pub(crate) fn ascending<F: Float>(a: &F, b: &F) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Index of the first NaN in `values`, if any.
pub(crate) fn position_of_nan<'a, F, I>(values: I) -> Option<usize>
where
    F: Float + 'a,
    I: IntoIterator<Item = &'a F>,
{
    values.into_iter().position(|v| v.is_nan())
}

/// Whether `error` can scale a perturbation: finite and not negative.
pub(crate) fn is_valid_uncertainty<F: Float>(error: F) -> bool {
    error.is_finite() && error >= F::zero()
}

/// Sorts `values` in place and returns the linear-interpolated quantiles `qs`.
///
/// Interpolation follows the usual `(n - 1) * q` positioning, so the 0 and 1
/// quantiles are the minimum and maximum.
pub(crate) fn quantiles<F>(values: &mut [F], qs: &[f64]) -> Vec<F>
where
    F: Float + FromPrimitive,
{
    values.sort_by(ascending);
    qs.iter().map(|&q| sorted_quantile(values, q)).collect()
}

fn sorted_quantile<F>(sorted: &[F], q: f64) -> F
where
    F: Float + FromPrimitive,
{
    match sorted.len() {
        0 => F::nan(),
        1 => sorted[0],
        n => {
            let position = q.max(0.).min(1.) * (n - 1) as f64;
            let lower = position.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let fraction = F::from_f64(position - lower as f64).unwrap_or_else(F::zero);
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

/// Population standard deviation, zero for fewer than two values.
pub(crate) fn std_dev<F>(values: &[F]) -> F
where
    F: Float + FromPrimitive,
{
    if values.len() < 2 {
        return F::zero();
    }
    let n = F::from_usize(values.len()).unwrap_or_else(F::one);
    let mean = values.iter().fold(F::zero(), |acc, &v| acc + v) / n;
    let sum_sq = values
        .iter()
        .fold(F::zero(), |acc, &v| acc + (v - mean) * (v - mean));
    (sum_sq / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn quantiles_interpolate_linearly() {
        let mut values = vec![4., 1., 3., 2., 5.];
        let actual = quantiles(&mut values, &[0., 0.5, 0.1, 1.]);
        let expected = [1., 3., 1.4, 5.];
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < TOLERANCE);
        }
        assert_eq!(values, vec![1., 2., 3., 4., 5.]);
    }

    #[test]
    fn quantile_of_single_value() {
        let mut values = vec![0.25f32];
        assert_eq!(quantiles(&mut values, &[0.16, 0.84]), vec![0.25, 0.25]);
    }

    #[test]
    fn std_dev_is_population() {
        let actual = std_dev(&[2., 4., 4., 4., 5., 5., 7., 9.]);
        assert!((actual - 2.).abs() < TOLERANCE);
        assert_eq!(std_dev(&[3.0f64]), 0.);
        assert_eq!(std_dev::<f64>(&[]), 0.);
    }

    #[test]
    fn valid_uncertainties() {
        assert!(is_valid_uncertainty(0.));
        assert!(is_valid_uncertainty(2.5f32));
        assert!(!is_valid_uncertainty(-1e-3));
        assert!(!is_valid_uncertainty(f64::INFINITY));
        assert!(!is_valid_uncertainty(f64::NAN));
    }

    #[test]
    fn finds_nan() {
        assert_eq!(position_of_nan(&[1., f64::NAN, 2.]), Some(1));
        assert_eq!(position_of_nan(&[1., 2.]), None);
    }
}
