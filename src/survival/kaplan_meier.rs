use super::Survival;
use crate::error::Error;
use crate::sample::CensoredSample;
use log::debug;
use ndarray::{Array, Array1, ArrayBase, Data, Ix1};
use num_traits::{Float, FromPrimitive};
use serde_derive::{Deserialize, Serialize};

/// Product-limit estimate of the survival function on the distinct values of a sample.
///
/// The curve is a right-continuous step function: `survival[k]` holds from
/// `values[k]` up to, but not including, `values[k + 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KaplanMeierCurve<F> {
    /// Distinct sample values in ascending order.
    pub values: Array1<F>,
    /// Survival probability at each value.
    pub survival: Array1<F>,
    /// Observations with a value greater than or equal to each value.
    pub at_risk: Array1<usize>,
    /// Uncensored observations at each value.
    pub events: Array1<usize>,
}

/// Builds the Kaplan-Meier curve of `x`, where `c[i]` flags `x[i]` as censored.
///
/// # Examples
///
/// ```
/// use censored_km::build_curve;
/// use ndarray::array;
///
/// let curve = build_curve(&array![1., 2., 3., 4.], &array![false, false, true, false]).unwrap();
/// assert_eq!(curve.values, array![1., 2., 3., 4.]);
/// assert_eq!(curve.survival, array![0.75, 0.5, 0.5, 0.]);
/// ```
pub fn build_curve<F, S, B>(
    x: &ArrayBase<S, Ix1>,
    c: &ArrayBase<B, Ix1>,
) -> Result<KaplanMeierCurve<F>, Error>
where
    F: Float + FromPrimitive,
    S: Data<Elem = F>,
    B: Data<Elem = bool>,
{
    let sample = CensoredSample::from_events(x, c)?;
    Ok(KaplanMeierCurve::from_sample(&sample))
}

impl<F> KaplanMeierCurve<F>
where
    F: Float + FromPrimitive,
{
    pub fn from_sample(sample: &CensoredSample<F>) -> Self {
        let table = sample.life_table();

        let mut current = F::one();
        let mut survival = Vec::with_capacity(table.len());
        for row in &table {
            if row.events > 0 {
                current = current * (F::one() - ratio(row.events, row.at_risk));
            }
            survival.push(current);
        }

        debug!(
            "Built Kaplan-Meier curve over {} distinct values from {} observations",
            table.len(),
            sample.len()
        );

        KaplanMeierCurve {
            values: table.iter().map(|row| row.value).collect(),
            survival: Array::from(survival),
            at_risk: table.iter().map(|row| row.at_risk).collect(),
            events: table.iter().map(|row| row.events).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    /// Step-function lookup at `value`.
    ///
    /// Below the smallest value the survival is 1. Above the largest value the
    /// last estimate is held.
    pub fn survival_at(&self, value: F) -> F {
        let below = match self.values.as_slice() {
            Some(values) => values.partition_point(|&v| v <= value),
            None => self.values.iter().take_while(|&&v| v <= value).count(),
        };

        if below == 0 {
            F::one()
        } else {
            self.survival[below - 1]
        }
    }
}

impl<F> Survival<F, F> for KaplanMeierCurve<F>
where
    F: Float + FromPrimitive,
{
    fn survival(&self, input: &F) -> F {
        self.survival_at(*input)
    }
}

impl<S, F> Survival<ArrayBase<S, Ix1>, Array1<F>> for KaplanMeierCurve<F>
where
    S: Data<Elem = F>,
    F: Float + FromPrimitive,
{
    fn survival(&self, input: &ArrayBase<S, Ix1>) -> Array1<F> {
        input.mapv(|value| self.survival_at(value))
    }
}

fn ratio<F: Float + FromPrimitive>(numerator: usize, denominator: usize) -> F {
    match (F::from_usize(numerator), F::from_usize(denominator)) {
        (Some(n), Some(d)) => n / d,
        _ => F::nan(),
    }
}
