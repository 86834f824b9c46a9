use super::CensoredSample;
use crate::utils::ascending;
use num_traits::Float;
use serde_derive::{Deserialize, Serialize};

/// Counts of two samples at one time of the merged grid.
///
/// Under [`Tabulation::Cumulative`] `at_risk` and `events` hold the strictly-below
/// counts instead of the risk sets.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RiskRow<F> {
    pub time: F,
    pub at_risk: [usize; 2],
    pub events: [usize; 2],
}

impl<F> RiskRow<F> {
    pub fn total_at_risk(&self) -> usize {
        self.at_risk[0] + self.at_risk[1]
    }

    pub fn total_events(&self) -> usize {
        self.events[0] + self.events[1]
    }
}

/// How the merged grid and its counts are tabulated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tabulation {
    /// One row per distinct time with the observations at or above it and
    /// the uncensored observations equal to it.
    RiskSets,
    /// One row per observation of either sample, in ascending order, with the
    /// observations strictly below it and the uncensored observations strictly
    /// below it. This is the tabulation of the `km_logrank` routine of
    /// `KaplanMeier.py`.
    Cumulative,
}

impl Default for Tabulation {
    fn default() -> Self {
        Tabulation::RiskSets
    }
}

/// The merged table of two samples used by the log-rank test.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskTable<F> {
    rows: Vec<RiskRow<F>>,
}

impl<F: Float> RiskTable<F> {
    pub fn new(
        first: &CensoredSample<F>,
        second: &CensoredSample<F>,
        tabulation: Tabulation,
    ) -> Self {
        match tabulation {
            Tabulation::RiskSets => Self::merge(first, second),
            Tabulation::Cumulative => Self::cumulative(first, second),
        }
    }

    /// Rows on the distinct values of both samples.
    pub fn merge(first: &CensoredSample<F>, second: &CensoredSample<F>) -> Self {
        let mut grid = merged_values(first, second);
        grid.dedup();

        Self::tabulate(first, second, &grid, counts_on_grid)
    }

    /// Rows on every value of both samples, ties kept, with strictly-below counts.
    pub fn cumulative(first: &CensoredSample<F>, second: &CensoredSample<F>) -> Self {
        let grid = merged_values(first, second);

        Self::tabulate(first, second, &grid, counts_below_grid)
    }

    fn tabulate<C>(
        first: &CensoredSample<F>,
        second: &CensoredSample<F>,
        grid: &[F],
        counts: C,
    ) -> Self
    where
        C: Fn(&[(F, bool)], &[F]) -> (Vec<usize>, Vec<usize>),
    {
        let (first_at_risk, first_events) = counts(first.events(), grid);
        let (second_at_risk, second_events) = counts(second.events(), grid);

        let rows = grid
            .iter()
            .enumerate()
            .map(|(k, &time)| RiskRow {
                time,
                at_risk: [first_at_risk[k], second_at_risk[k]],
                events: [first_events[k], second_events[k]],
            })
            .collect();

        RiskTable { rows }
    }

    pub fn rows(&self) -> &[RiskRow<F>] {
        &self.rows
    }
}

fn merged_values<F: Float>(first: &CensoredSample<F>, second: &CensoredSample<F>) -> Vec<F> {
    let mut grid: Vec<F> = first
        .events()
        .iter()
        .chain(second.events().iter())
        .map(|&(value, _)| value)
        .collect();
    grid.sort_by(ascending);
    grid
}

/// Counts, for every grid time, the sorted observations at or above it and the
/// uncensored observations equal to it.
fn counts_on_grid<F: Float>(sorted: &[(F, bool)], grid: &[F]) -> (Vec<usize>, Vec<usize>) {
    let n = sorted.len();
    let mut at_risk = Vec::with_capacity(grid.len());
    let mut events = Vec::with_capacity(grid.len());
    let mut below = 0;

    for &time in grid {
        while below < n && sorted[below].0 < time {
            below += 1;
        }
        at_risk.push(n - below);
        events.push(
            sorted[below..]
                .iter()
                .take_while(|(value, _)| *value == time)
                .filter(|(_, censored)| !censored)
                .count(),
        );
    }

    (at_risk, events)
}

/// Counts, for every grid time, the sorted observations strictly below it and
/// the uncensored ones among them.
fn counts_below_grid<F: Float>(sorted: &[(F, bool)], grid: &[F]) -> (Vec<usize>, Vec<usize>) {
    let n = sorted.len();
    let mut below_counts = Vec::with_capacity(grid.len());
    let mut uncensored_counts = Vec::with_capacity(grid.len());
    let mut below = 0;
    let mut uncensored = 0;

    for &time in grid {
        while below < n && sorted[below].0 < time {
            if !sorted[below].1 {
                uncensored += 1;
            }
            below += 1;
        }
        below_counts.push(below);
        uncensored_counts.push(uncensored);
    }

    (below_counts, uncensored_counts)
}
