use super::kaplan_meier::KaplanMeierCurve;
use crate::error::{ensure_same_len, Error};
use crate::sample::CensoredSample;
use crate::utils::{is_valid_uncertainty, position_of_nan, quantiles, std_dev};
use log::debug;
use ndarray::{Array, Array1, ArrayBase, Data, Ix1};
use num_traits::{Float, FromPrimitive};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde_derive::{Deserialize, Serialize};

const LOWER_PERCENTILE: f64 = 0.1587;
const UPPER_PERCENTILE: f64 = 0.8413;

/// How the perturbed survival values are summarized into one uncertainty.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Spread {
    /// Population standard deviation of the perturbed values.
    StandardDeviation,
    /// Half the distance between the 15.87th and 84.13th percentiles.
    Percentile,
}

impl Default for Spread {
    fn default() -> Self {
        Spread::StandardDeviation
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationParameters {
    /// Number of perturbed query values drawn per query point.
    pub samples: usize,
    pub spread: Spread,
}

impl Default for EvaluationParameters {
    fn default() -> Self {
        EvaluationParameters {
            samples: 1000,
            spread: Spread::default(),
        }
    }
}

/// Lower and upper measurement uncertainty of a query value.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsymmetricError<F> {
    pub lower: F,
    pub upper: F,
}

impl<F: Float> AsymmetricError<F> {
    pub fn symmetric(error: F) -> Self {
        AsymmetricError {
            lower: error,
            upper: error,
        }
    }

    /// Draws an offset from the split normal with scale `lower` below zero and
    /// `upper` above it.
    pub fn sample_offset<R>(&self, rng: &mut R) -> F
    where
        R: Rng + ?Sized,
        StandardNormal: Distribution<F>,
    {
        let z: F = StandardNormal.sample(rng);
        if z < F::zero() {
            z * self.lower
        } else {
            z * self.upper
        }
    }
}

impl<F> From<(F, F)> for AsymmetricError<F> {
    fn from((lower, upper): (F, F)) -> Self {
        AsymmetricError { lower, upper }
    }
}

/// Survival probability and its uncertainty at each query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation<F> {
    pub probability: Array1<F>,
    pub uncertainty: Array1<F>,
}

/// Evaluates the Kaplan-Meier curve of `(x, c)` at the query values `x0`.
///
/// When `x0_err` is given, each query value is perturbed by its own
/// `(lower, upper)` split-normal error and the spread of the re-evaluated
/// survival is reported as the uncertainty. Without errors every uncertainty
/// is zero and `rng` is left untouched.
///
/// Survival outside `[0.01, 0.99]` suggests rejecting the hypothesis that the
/// query value belongs to the population of `x`.
pub fn evaluate<F, Q, S, B, R>(
    x0: &ArrayBase<Q, Ix1>,
    x: &ArrayBase<S, Ix1>,
    c: &ArrayBase<B, Ix1>,
    x0_err: Option<&[(F, F)]>,
    parameters: &EvaluationParameters,
    rng: &mut R,
) -> Result<Evaluation<F>, Error>
where
    F: Float + FromPrimitive,
    Q: Data<Elem = F>,
    S: Data<Elem = F>,
    B: Data<Elem = bool>,
    R: Rng + ?Sized,
    StandardNormal: Distribution<F>,
{
    if let Some(errors) = x0_err {
        ensure_same_len(x0.len(), errors.len())?;
    }
    let sample = CensoredSample::from_events(x, c)?;
    let curve = KaplanMeierCurve::from_sample(&sample);

    match x0_err {
        Some(errors) => {
            let errors: Vec<AsymmetricError<F>> = errors.iter().map(|&e| e.into()).collect();
            curve.evaluate_with_errors(x0, &errors, parameters, rng)
        }
        None => curve.evaluate(x0),
    }
}

impl<F> KaplanMeierCurve<F>
where
    F: Float + FromPrimitive,
{
    /// Evaluates the curve at each query value with zero uncertainty.
    pub fn evaluate<Q>(&self, x0: &ArrayBase<Q, Ix1>) -> Result<Evaluation<F>, Error>
    where
        Q: Data<Elem = F>,
    {
        if let Some(index) = position_of_nan(x0.iter()) {
            return Err(Error::NotANumber(index));
        }

        Ok(Evaluation {
            probability: x0.mapv(|q| self.survival_at(q)),
            uncertainty: Array::from_elem(x0.len(), F::zero()),
        })
    }

    /// Evaluates the curve at each query value and estimates the uncertainty by
    /// re-evaluating at perturbed copies of the value.
    ///
    /// The curve itself is held fixed; only the query values are perturbed.
    pub fn evaluate_with_errors<Q, R>(
        &self,
        x0: &ArrayBase<Q, Ix1>,
        errors: &[AsymmetricError<F>],
        parameters: &EvaluationParameters,
        rng: &mut R,
    ) -> Result<Evaluation<F>, Error>
    where
        Q: Data<Elem = F>,
        R: Rng + ?Sized,
        StandardNormal: Distribution<F>,
    {
        ensure_same_len(x0.len(), errors.len())?;
        if let Some(index) = errors
            .iter()
            .position(|e| !(is_valid_uncertainty(e.lower) && is_valid_uncertainty(e.upper)))
        {
            return Err(Error::InvalidUncertainty(index));
        }
        let Evaluation { probability, .. } = self.evaluate(x0)?;

        let uncertainty: Array1<F> = x0
            .iter()
            .zip(errors.iter())
            .map(|(&q, error)| self.perturbed_spread(q, error, parameters, rng))
            .collect();

        debug!(
            "Evaluated {} query points with {} perturbations each",
            x0.len(),
            parameters.samples
        );

        Ok(Evaluation {
            probability,
            uncertainty,
        })
    }

    fn perturbed_spread<R>(
        &self,
        value: F,
        error: &AsymmetricError<F>,
        parameters: &EvaluationParameters,
        rng: &mut R,
    ) -> F
    where
        R: Rng + ?Sized,
        StandardNormal: Distribution<F>,
    {
        if parameters.samples == 0 {
            return F::zero();
        }

        let mut perturbed: Vec<F> = (0..parameters.samples)
            .map(|_| self.survival_at(value + error.sample_offset(rng)))
            .collect();

        match parameters.spread {
            Spread::StandardDeviation => std_dev(&perturbed),
            Spread::Percentile => {
                let q = quantiles(&mut perturbed, &[LOWER_PERCENTILE, UPPER_PERCENTILE]);
                let half = F::from_f64(0.5).unwrap_or_else(F::zero);
                (q[1] - q[0]) * half
            }
        }
    }
}
