use crate::error::Error;
use crate::sample::risk::{RiskTable, Tabulation};
use crate::sample::CensoredSample;
use log::{debug, trace};
use ndarray::{ArrayBase, Data, Ix1};
use num_traits::Float;
use serde_derive::{Deserialize, Serialize};
use statrs::function::gamma::gamma_ur;
use std::fmt;
use std::str::FromStr;

/// Variance estimator of the log-rank statistic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Estimator {
    /// Hypergeometric variance summed over distinct times (Mantel 1966).
    Mantel,
    /// `(O1 - E1)^2 / E1 + (O2 - E2)^2 / E2` (Pike 1972, Peto & Pike 1973).
    Pike,
}

impl Default for Estimator {
    fn default() -> Self {
        Estimator::Pike
    }
}

impl FromStr for Estimator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mantel" => Ok(Estimator::Mantel),
            "pike" => Ok(Estimator::Pike),
            _ => Err(Error::UnknownEstimator(s.to_string())),
        }
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Estimator::Mantel => write!(f, "mantel"),
            Estimator::Pike => write!(f, "pike"),
        }
    }
}

/// Outcome of a two-sample log-rank test.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRank {
    /// Observed minus expected events of the first sample, `D`.
    pub deviation: f64,
    /// Normalizing term `T`, so that the statistic is `D^2 / T`.
    pub variance: f64,
    /// Chi-square statistic with one degree of freedom.
    pub statistic: f64,
    /// Upper tail probability of the statistic.
    pub p_value: f64,
    /// Uncensored events of each sample.
    pub observed: [f64; 2],
    /// Events of each sample expected if both share one survival function.
    pub expected: [f64; 2],
}

/// Compares the censored samples `(x1, c1)` and `(x2, c2)` with a log-rank test.
///
/// # Examples
///
/// ```
/// use censored_km::{log_rank, Estimator};
/// use ndarray::array;
///
/// let x = array![1., 2., 3., 4.];
/// let c = array![false, true, false, false];
/// let result = log_rank(&x, &c, &x, &c, "mantel".parse::<Estimator>().unwrap()).unwrap();
/// assert_eq!(result.deviation, 0.);
/// assert_eq!(result.p_value, 1.);
/// ```
pub fn log_rank<F, S1, B1, S2, B2>(
    x1: &ArrayBase<S1, Ix1>,
    c1: &ArrayBase<B1, Ix1>,
    x2: &ArrayBase<S2, Ix1>,
    c2: &ArrayBase<B2, Ix1>,
    estimator: Estimator,
) -> Result<LogRank, Error>
where
    F: Float,
    S1: Data<Elem = F>,
    B1: Data<Elem = bool>,
    S2: Data<Elem = F>,
    B2: Data<Elem = bool>,
{
    log_rank_tabulated(x1, c1, x2, c2, estimator, Tabulation::RiskSets)
}

/// Log-rank test over an explicitly chosen tabulation of the merged samples.
///
/// [`Tabulation::Cumulative`] reproduces the statistics of the `km_logrank`
/// routine of `KaplanMeier.py`, including its published regression values.
pub fn log_rank_tabulated<F, S1, B1, S2, B2>(
    x1: &ArrayBase<S1, Ix1>,
    c1: &ArrayBase<B1, Ix1>,
    x2: &ArrayBase<S2, Ix1>,
    c2: &ArrayBase<B2, Ix1>,
    estimator: Estimator,
    tabulation: Tabulation,
) -> Result<LogRank, Error>
where
    F: Float,
    S1: Data<Elem = F>,
    B1: Data<Elem = bool>,
    S2: Data<Elem = F>,
    B2: Data<Elem = bool>,
{
    let first = CensoredSample::from_events(x1, c1)?;
    let second = CensoredSample::from_events(x2, c2)?;
    let table = RiskTable::new(&first, &second, tabulation);
    Ok(LogRank::from_table(&table, estimator))
}

impl LogRank {
    pub fn from_samples<F: Float>(
        first: &CensoredSample<F>,
        second: &CensoredSample<F>,
        estimator: Estimator,
    ) -> Self {
        Self::from_table(&RiskTable::merge(first, second), estimator)
    }

    /// Accumulates the statistic over the rows of `table`, skipping rows with
    /// nobody counted.
    pub fn from_table<F: Float>(table: &RiskTable<F>, estimator: Estimator) -> Self {
        let mut deviation = 0.;
        let mut observed = [0.; 2];
        let mut expected = [0.; 2];
        let mut hypergeometric = 0.;

        for row in table.rows() {
            let n = row.total_at_risk() as f64;
            if n == 0. {
                continue;
            }
            let d = row.total_events() as f64;
            let n1 = row.at_risk[0] as f64;
            let n2 = row.at_risk[1] as f64;

            let d1 = row.events[0] as f64;
            let e1 = n1 * d / n;

            deviation += d1 - e1;
            observed[0] += d1;
            observed[1] += row.events[1] as f64;
            expected[0] += e1;
            expected[1] += n2 * d / n;
            if n > 1. {
                hypergeometric += n1 * n2 * d * (n - d) / (n * n * (n - 1.));
            }

            trace!(
                "risk row: at risk {:?}, events {:?}",
                row.at_risk,
                row.events
            );
        }

        let variance = match estimator {
            Estimator::Mantel => hypergeometric,
            Estimator::Pike => {
                if expected[0] > 0. && expected[1] > 0. {
                    expected[0] * expected[1] / (expected[0] + expected[1])
                } else {
                    0.
                }
            }
        };

        let statistic = if variance > 0. {
            deviation * deviation / variance
        } else {
            0.
        };
        let p_value = if statistic > 0. {
            gamma_ur(0.5, 0.5 * statistic)
        } else {
            1.
        };

        debug!(
            "Log-rank ({}) over {} rows: D = {}, T = {}, p = {}",
            estimator,
            table.rows().len(),
            deviation,
            variance,
            p_value
        );

        LogRank {
            deviation,
            variance,
            statistic,
            p_value,
            observed,
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::prelude::*;

    const TOLERANCE: f64 = 1e-9;

    fn samples() -> (Array1<f64>, Array1<bool>, Array1<f64>, Array1<bool>) {
        (
            array![1., 2., 2., 4., 5.],
            array![false, true, false, false, true],
            array![3., 4., 6., 7.],
            array![false, false, true, false],
        )
    }

    #[test]
    fn parses_estimators() {
        assert_eq!("mantel".parse::<Estimator>(), Ok(Estimator::Mantel));
        assert_eq!("Pike".parse::<Estimator>(), Ok(Estimator::Pike));
        assert_eq!(
            "peto".parse::<Estimator>(),
            Err(Error::UnknownEstimator("peto".to_string()))
        );
        assert_eq!(Estimator::default(), Estimator::Pike);
        assert_eq!(Estimator::Mantel.to_string(), "mantel");
    }

    #[test]
    fn hand_computed_statistics() {
        let (x1, c1, x2, c2) = samples();

        // distinct times 1..7, (n1, n2, d1, d2):
        // 1: (5, 4, 1, 0)  2: (4, 4, 1, 0)  3: (2, 4, 0, 1)
        // 4: (2, 3, 1, 1)  5: (1, 2, 0, 0)  6: (0, 2, 0, 0)  7: (0, 1, 0, 1)
        let e1 = 5. / 9. + 4. / 8. + 2. / 6. + 2. * 2. / 5.;
        let e2 = 4. / 9. + 4. / 8. + 4. / 6. + 2. * 3. / 5. + 1.;
        let d = 3. - e1;
        let mantel = 5. * 4. * 8. / (81. * 8.)
            + 4. * 4. * 7. / (64. * 7.)
            + 2. * 4. * 5. / (36. * 5.)
            + 2. * 3. * 2. * 3. / (25. * 4.);

        let result = log_rank(&x1, &c1, &x2, &c2, Estimator::Mantel).unwrap();
        assert!((result.deviation - d).abs() < TOLERANCE);
        assert!((result.variance - mantel).abs() < TOLERANCE);
        assert!((result.statistic - d * d / mantel).abs() < TOLERANCE);
        assert_eq!(result.observed, [3., 3.]);
        assert!((result.expected[0] - e1).abs() < TOLERANCE);
        assert!((result.expected[1] - e2).abs() < TOLERANCE);

        let result = log_rank(&x1, &c1, &x2, &c2, Estimator::Pike).unwrap();
        let pike = d * d / e1 + d * d / e2;
        assert!((result.statistic - pike).abs() < TOLERANCE);
        assert!((result.deviation * result.deviation / result.variance - pike).abs() < TOLERANCE);
        // Pike is the more conservative estimator
        assert!(result.statistic < d * d / mantel);
    }

    #[test]
    fn tabulations_agree_on_identical_samples() {
        let (x1, c1, _, _) = samples();

        for &tabulation in &[Tabulation::RiskSets, Tabulation::Cumulative] {
            let result =
                log_rank_tabulated(&x1, &c1, &x1, &c1, Estimator::Pike, tabulation).unwrap();
            assert_eq!(result.deviation, 0.);
            assert_eq!(result.p_value, 1.);
        }

        let (x1, c1, x2, c2) = samples();
        assert_eq!(
            log_rank_tabulated(&x1, &c1, &x2, &c2, Estimator::Mantel, Tabulation::RiskSets),
            log_rank(&x1, &c1, &x2, &c2, Estimator::Mantel)
        );
    }

    #[test]
    fn cumulative_tabulation_by_hand() {
        // grid 1, 2, 3, 4; (Y1, Y2, d1, d2) counted strictly below:
        // 1: (0, 0, 0, 0) skipped  2: (1, 0, 1, 0)  3: (1, 1, 1, 1)  4: (2, 1, 1, 1)
        let x1 = array![1., 3.];
        let c1 = array![false, true];
        let x2 = array![2., 4.];
        let c2 = array![false, false];

        let e1 = 1. + 1. + 2. * 2. / 3.;
        let e2 = 1. + 2. / 3.;
        let d = 3. - e1;
        let mantel = 2. * 1. * 2. * 1. / (9. * 2.);

        let result =
            log_rank_tabulated(&x1, &c1, &x2, &c2, Estimator::Mantel, Tabulation::Cumulative)
                .unwrap();
        assert!((result.deviation - d).abs() < TOLERANCE);
        assert!((result.variance - mantel).abs() < TOLERANCE);
        assert_eq!(result.observed, [3., 2.]);
        assert!((result.expected[1] - e2).abs() < TOLERANCE);

        let result =
            log_rank_tabulated(&x1, &c1, &x2, &c2, Estimator::Pike, Tabulation::Cumulative)
                .unwrap();
        assert!((result.statistic - (d * d / e1 + d * d / e2)).abs() < TOLERANCE);
    }

    #[test]
    fn p_value_matches_chi_square_tail() {
        // statistic 3.841459 sits at the 95th percentile of chi-square(1)
        let p = gamma_ur(0.5, 0.5 * 3.841459);
        assert!((p - 0.05).abs() < 1e-6);
    }

    #[test]
    fn identical_samples_do_not_differ() {
        let (x1, c1, _, _) = samples();

        for &estimator in &[Estimator::Mantel, Estimator::Pike] {
            let result = log_rank(&x1, &c1, &x1, &c1, estimator).unwrap();
            assert_eq!(result.deviation, 0.);
            assert_eq!(result.p_value, 1.);
        }
    }

    #[test]
    fn swapping_samples_flips_deviation() {
        let (x1, c1, x2, c2) = samples();

        for &estimator in &[Estimator::Mantel, Estimator::Pike] {
            let forward = log_rank(&x1, &c1, &x2, &c2, estimator).unwrap();
            let backward = log_rank(&x2, &c2, &x1, &c1, estimator).unwrap();

            assert!((forward.deviation + backward.deviation).abs() < TOLERANCE);
            assert!((forward.statistic - backward.statistic).abs() < TOLERANCE);
            assert!((forward.p_value - backward.p_value).abs() < TOLERANCE);
        }
    }

    #[test]
    fn no_events_gives_unit_p_value() {
        let x1 = array![1., 2.];
        let x2 = array![3., 4.];
        let censored = array![true, true];

        for &estimator in &[Estimator::Mantel, Estimator::Pike] {
            let result = log_rank(&x1, &censored, &x2, &censored, estimator).unwrap();
            assert_eq!(result.variance, 0.);
            assert_eq!(result.statistic, 0.);
            assert_eq!(result.p_value, 1.);
        }
    }

    #[test]
    fn separated_samples_are_significant() {
        let x1 = Array::linspace(0., 1., 40);
        let x2 = Array::linspace(2., 3., 40);
        let uncensored = Array::from_elem((40,), false);

        let result = log_rank(&x1, &uncensored, &x2, &uncensored, Estimator::Mantel).unwrap();
        assert!(result.deviation > 0.);
        assert!(result.p_value < 1e-6);
    }

    #[test]
    fn rejects_invalid_samples() {
        let (x1, c1, x2, _) = samples();
        let empty = Array1::<f64>::from(Vec::new());
        let no_flags = Array1::<bool>::from(Vec::new());

        assert_eq!(
            log_rank(&x1, &c1, &empty, &no_flags, Estimator::Pike),
            Err(Error::EmptySample)
        );
        assert_eq!(
            log_rank(&x1, &c1, &x2, &c1, Estimator::Pike),
            Err(Error::ShapeMismatch(4, 5))
        );
    }
}
