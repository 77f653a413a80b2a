//! View-side option filtering
//!
//! Filters apply to a copy of the option list handed to one caller. The
//! cached canonical list is never touched.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::cache::DropdownOption;

/// Values meaning "no additional income" across the content revisions
pub const NO_ADDITIONAL_INCOME_VALUES: [&str; 3] = ["no_additional_income", "option_1", "1"];

type Predicate = Arc<dyn Fn(&DropdownOption) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct OptionFilter {
    excluded: HashSet<String>,
    predicates: Vec<Predicate>,
}

impl OptionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop options whose value is `value`
    pub fn exclude(mut self, value: impl Into<String>) -> Self {
        self.excluded.insert(value.into());
        self
    }

    /// Drop every "no additional income" option
    pub fn exclude_no_income(mut self) -> Self {
        self.excluded
            .extend(NO_ADDITIONAL_INCOME_VALUES.iter().map(|v| v.to_string()));
        self
    }

    /// Keep only options for which `predicate` holds
    pub fn retain<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&DropdownOption) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    pub fn allows(&self, option: &DropdownOption) -> bool {
        !self.excluded.contains(&option.value) && self.predicates.iter().all(|p| p(option))
    }

    pub fn apply(&self, options: &[DropdownOption]) -> Vec<DropdownOption> {
        options.iter().filter(|o| self.allows(o)).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty() && self.predicates.is_empty()
    }
}

impl fmt::Debug for OptionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionFilter")
            .field("excluded", &self.excluded)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}
