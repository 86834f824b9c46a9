use crate::error::{ensure_same_len, Error};
use crate::utils::{ascending, position_of_nan};
use ndarray::{ArrayBase, Data, Ix1};
use num_traits::Float;

pub mod risk;

/// Measurements paired with their censoring flags, held in ascending order of value.
///
/// A flag of `true` marks a censored observation: the value is only a limit and
/// contributes to the risk set without producing an event.
#[derive(Debug, Clone, PartialEq)]
pub struct CensoredSample<F> {
    events: Vec<(F, bool)>,
}

/// Risk set and event counts at one distinct value of a sample.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LifeTableRow<F> {
    pub value: F,
    /// Number of observations with a value greater than or equal to `value`.
    pub at_risk: usize,
    /// Number of uncensored observations equal to `value`.
    pub events: usize,
    /// Number of censored observations equal to `value`.
    pub censored: usize,
}

impl<F: Float> CensoredSample<F> {
    pub fn from_events<S, B>(
        values: &ArrayBase<S, Ix1>,
        censored: &ArrayBase<B, Ix1>,
    ) -> Result<Self, Error>
    where
        S: Data<Elem = F>,
        B: Data<Elem = bool>,
    {
        ensure_same_len(values.len(), censored.len())?;
        let events = values
            .iter()
            .copied()
            .zip(censored.iter().copied())
            .collect();
        Self::from_pairs(events)
    }

    /// Builds a sample from unsorted `(value, censored)` pairs.
    pub fn from_pairs(mut events: Vec<(F, bool)>) -> Result<Self, Error> {
        if events.is_empty() {
            return Err(Error::EmptySample);
        }
        if let Some(index) = position_of_nan(events.iter().map(|(value, _)| value)) {
            return Err(Error::NotANumber(index));
        }

        events.sort_by(|a, b| ascending(&a.0, &b.0));
        Ok(CensoredSample { events })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always `false`: an empty sample cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The `(value, censored)` pairs in ascending order of value.
    pub fn events(&self) -> &[(F, bool)] {
        &self.events
    }

    /// Collapses the sample to one row per distinct value in a single ascending sweep.
    pub fn life_table(&self) -> Vec<LifeTableRow<F>> {
        let n = self.events.len();
        let mut rows: Vec<LifeTableRow<F>> = Vec::new();

        for (index, &(value, censored)) in self.events.iter().enumerate() {
            let same_value = rows.last().map_or(false, |row| row.value == value);
            if !same_value {
                rows.push(LifeTableRow {
                    value,
                    at_risk: n - index,
                    events: 0,
                    censored: 0,
                });
            }

            if let Some(row) = rows.last_mut() {
                if censored {
                    row.censored += 1;
                } else {
                    row.events += 1;
                }
            }
        }

        rows
    }
}
