#[cfg(doctest)]
use doc_comment::doctest;

#[cfg(test)]
#[macro_use]
mod tests {
    #[macro_export]
    macro_rules! assert_diff_within_tolerance {
        ($actual: expr, $expected: expr, $tolerance: expr) => {
            for diff in ($actual - $expected).iter() {
                assert!(diff.abs() < $tolerance);
            }
        };
    }
}

pub mod error;
pub mod logrank;
pub mod sample;
pub mod survival;
mod utils;

pub use error::Error;
pub use logrank::{log_rank, log_rank_tabulated, Estimator, LogRank};
pub use sample::risk::{RiskTable, Tabulation};
pub use sample::CensoredSample;
pub use survival::evaluate::{
    evaluate, AsymmetricError, Evaluation, EvaluationParameters, Spread,
};
pub use survival::kaplan_meier::{build_curve, KaplanMeierCurve};
pub use survival::variation::{variation, Variation, VariationMethod, VariationParameters};
pub use survival::Survival;

#[cfg(doctest)]
doctest!("../README.md");
