pub mod evaluate;
pub mod kaplan_meier;
pub mod variation;

/// Probability of exceeding the input value(s).
pub trait Survival<Input, Output> {
    fn survival(&self, input: &Input) -> Output;
}
