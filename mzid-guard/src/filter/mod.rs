//! Rule filtering: which rules become irrelevant for a given search.

mod resolver;
mod spec;

pub use resolver::{RuleFilterResolver, RuleSkipSet, SelectedOptions};
pub use spec::{Condition, ConditionOption, OutcomeDependents, RuleFilterSpec};
