use super::kaplan_meier::KaplanMeierCurve;
use crate::error::{ensure_same_len, Error};
use crate::sample::CensoredSample;
use crate::utils::{is_valid_uncertainty, quantiles};
use log::debug;
use ndarray::{ArrayBase, Data, Ix1};
use num_traits::{Float, FromPrimitive};
use rand::seq::IndexedRandom;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde_derive::{Deserialize, Serialize};

const PERCENTILES: [f64; 3] = [0.1587, 0.5, 0.8413];

/// How the reference sample is resampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariationMethod<F> {
    /// Draw observations with replacement, keeping each value with its censoring flag.
    Bootstrap,
    /// Perturb every value by a normal draw with the given per-observation uncertainty.
    MonteCarlo(Vec<F>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationParameters {
    /// Number of resampled curves.
    pub samples: usize,
}

impl Default for VariationParameters {
    fn default() -> Self {
        VariationParameters { samples: 1000 }
    }
}

/// Median survival at a query value over resampled curves, with the distances
/// from the median to the 15.87th and 84.13th percentiles.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation<F> {
    pub median: F,
    pub lower: F,
    pub upper: F,
}

/// Measures how much the curve of `(x, c)` at `x0` moves when the reference
/// sample itself is resampled.
pub fn variation<F, S, B, R>(
    x0: F,
    x: &ArrayBase<S, Ix1>,
    c: &ArrayBase<B, Ix1>,
    method: &VariationMethod<F>,
    parameters: &VariationParameters,
    rng: &mut R,
) -> Result<Variation<F>, Error>
where
    F: Float + FromPrimitive,
    S: Data<Elem = F>,
    B: Data<Elem = bool>,
    R: Rng + ?Sized,
    StandardNormal: Distribution<F>,
{
    if x0.is_nan() {
        return Err(Error::NotANumber(0));
    }
    let sample = CensoredSample::from_events(x, c)?;
    if parameters.samples == 0 {
        let median = KaplanMeierCurve::from_sample(&sample).survival_at(x0);
        return Ok(Variation {
            median,
            lower: F::zero(),
            upper: F::zero(),
        });
    }

    let mut evaluations = Vec::with_capacity(parameters.samples);
    match method {
        VariationMethod::Bootstrap => {
            for _ in 0..parameters.samples {
                let resampled = bootstrap(&sample, rng)?;
                evaluations.push(KaplanMeierCurve::from_sample(&resampled).survival_at(x0));
            }
        }
        VariationMethod::MonteCarlo(x_err) => {
            ensure_same_len(x.len(), x_err.len())?;
            if let Some(index) = x_err.iter().position(|&e| !is_valid_uncertainty(e)) {
                return Err(Error::InvalidUncertainty(index));
            }
            for _ in 0..parameters.samples {
                let perturbed = perturb(x, c, x_err, rng)?;
                evaluations.push(KaplanMeierCurve::from_sample(&perturbed).survival_at(x0));
            }
        }
    }

    debug!(
        "Resampled {} curves of {} observations",
        parameters.samples,
        sample.len()
    );

    let q = quantiles(&mut evaluations, &PERCENTILES);
    Ok(Variation {
        median: q[1],
        lower: q[1] - q[0],
        upper: q[2] - q[1],
    })
}

fn bootstrap<F, R>(sample: &CensoredSample<F>, rng: &mut R) -> Result<CensoredSample<F>, Error>
where
    F: Float,
    R: Rng + ?Sized,
{
    let events = sample.events();
    let drawn = (0..events.len())
        .filter_map(|_| events.choose(rng).copied())
        .collect();
    CensoredSample::from_pairs(drawn)
}

fn perturb<F, S, B, R>(
    x: &ArrayBase<S, Ix1>,
    c: &ArrayBase<B, Ix1>,
    x_err: &[F],
    rng: &mut R,
) -> Result<CensoredSample<F>, Error>
where
    F: Float,
    S: Data<Elem = F>,
    B: Data<Elem = bool>,
    R: Rng + ?Sized,
    StandardNormal: Distribution<F>,
{
    let drawn = x
        .iter()
        .zip(x_err.iter())
        .zip(c.iter())
        .map(|((&value, &error), &censored)| {
            let z: F = StandardNormal.sample(rng);
            (value + z * error, censored)
        })
        .collect();
    CensoredSample::from_pairs(drawn)
}
