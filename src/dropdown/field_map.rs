//! Logical field → remote field key table
//!
//! The same logical field (`obligations`, `main_source`, ...) lives under a
//! different remote key on every screen that asks for it. Each logical field
//! has a primary key plus synonyms the content service has used over time;
//! the resolver tries them in order.
//!
//! Screens or fields missing from the table fall back to the
//! `{screen}_{field}` naming convention.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::types::{ContentError, Result};

/// `(screen, logical field, [primary, synonyms...])`
const BUILT_IN: &[(&str, &str, &[&str])] = &[
    // mortgage
    ("mortgage_step1", "when_needed", &["mortgage_step1_when_needed", "mortgage_step1_when"]),
    ("mortgage_step1", "type", &["mortgage_step1_type"]),
    ("mortgage_step1", "first_home", &["mortgage_step1_first_home", "mortgage_step1_first"]),
    ("mortgage_step1", "property_ownership", &["mortgage_step1_property_ownership"]),
    ("mortgage_step2", "education", &["mortgage_step2_education"]),
    ("mortgage_step2", "citizenship", &["mortgage_step2_citizenship"]),
    ("mortgage_step2", "family_status", &["mortgage_step2_family_status"]),
    ("mortgage_step3", "obligations", &["mortgage_step3_obligations"]),
    ("mortgage_step3", "main_source", &["mortgage_step3_main_source"]),
    ("mortgage_step3", "additional_income", &["mortgage_step3_additional_income"]),
    ("mortgage_step3", "field_of_activity", &["mortgage_step3_field_of_activity"]),
    // credit
    ("credit_step1", "when_needed", &["credit_step1_when_needed", "credit_step1_when"]),
    ("credit_step1", "purpose", &["credit_step1_purpose"]),
    ("credit_step2", "education", &["credit_step2_education"]),
    ("credit_step2", "family_status", &["credit_step2_family_status"]),
    ("credit_step3", "obligations", &["credit_step3_obligations"]),
    ("credit_step3", "main_source", &["credit_step3_main_source"]),
    ("credit_step3", "additional_income", &["credit_step3_additional_income"]),
    ("credit_step3", "field_of_activity", &["credit_step3_field_of_activity"]),
    // refinance mortgage
    ("refinance_step1", "why", &["refinance_step1_why"]),
    ("refinance_step1", "property_type", &["refinance_step1_property_type"]),
    ("refinance_step2", "education", &["refinance_step2_education"]),
    ("refinance_step2", "family_status", &["refinance_step2_family_status"]),
    ("refinance_step3", "obligations", &["refinance_step3_obligations"]),
    ("refinance_step3", "main_source", &["refinance_step3_main_source"]),
    ("refinance_step3", "additional_income", &["refinance_step3_additional_income"]),
    // refinance credit
    ("refinance_credit_step1", "refinance_reason", &["refinance_credit_step1_refinance_reason"]),
    ("refinance_credit_step3", "obligations", &["refinance_credit_step3_obligations"]),
    ("refinance_credit_step3", "main_source", &["refinance_credit_step3_main_source"]),
    ("refinance_credit_step3", "additional_income", &["refinance_credit_step3_additional_income"]),
    // other borrowers
    ("other_borrowers_step1", "family_status", &["other_borrowers_step1_family_status"]),
    ("other_borrowers_step2", "obligations", &["other_borrowers_step2_obligations"]),
    ("other_borrowers_step2", "main_source", &["other_borrowers_step2_main_source"]),
    ("other_borrowers_step2", "additional_income", &["other_borrowers_step2_additional_income"]),
    ("other_borrowers_step2", "field_of_activity", &["other_borrowers_step2_field_of_activity"]),
];

/// One screen's fields
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScreenFields {
    pub fields: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct FieldKeyTable {
    screens: HashMap<String, ScreenFields>,
}

impl FieldKeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for every known screen of the application
    pub fn built_in() -> Self {
        let mut table = Self::new();
        for (screen, field, keys) in BUILT_IN {
            table.insert(screen, field, keys.iter().map(|k| k.to_string()).collect());
        }
        table
    }

    pub fn insert(&mut self, screen_location: &str, logical_field: &str, keys: Vec<String>) {
        self.screens
            .entry(screen_location.to_string())
            .or_default()
            .fields
            .insert(logical_field.to_string(), keys);
    }

    /// Primary remote key for a logical field on a screen
    pub fn resolve_field_key(&self, screen_location: &str, logical_field: &str) -> String {
        self.candidates(screen_location, logical_field)
            .into_iter()
            .next()
            .unwrap_or_else(|| conventional_key(screen_location, logical_field))
    }

    /// Remote keys to try, primary first. Never empty.
    pub fn candidates(&self, screen_location: &str, logical_field: &str) -> Vec<String> {
        match self
            .screens
            .get(screen_location)
            .and_then(|screen| screen.fields.get(logical_field))
        {
            Some(keys) if !keys.is_empty() => keys.clone(),
            _ => vec![conventional_key(screen_location, logical_field)],
        }
    }

    pub fn screen(&self, screen_location: &str) -> Option<&ScreenFields> {
        self.screens.get(screen_location)
    }

    pub fn screens(&self) -> Vec<&str> {
        let mut screens: Vec<&str> = self.screens.keys().map(String::as_str).collect();
        screens.sort_unstable();
        screens
    }

    /// Check that every entry has at least one key and that no remote key is
    /// shared between two screens.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        let mut owners: HashMap<&str, &str> = HashMap::new();

        for screen in self.screens() {
            let Some(fields) = self.screens.get(screen) else {
                continue;
            };
            for (field, keys) in &fields.fields {
                if keys.is_empty() {
                    problems.push(format!("{screen}.{field} has no remote key"));
                }
                for key in keys {
                    if let Some(other) = owners.insert(key.as_str(), screen) {
                        if other != screen {
                            problems.push(format!("{key} is shared by {other} and {screen}"));
                        }
                    }
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ContentError::Config(problems.join("; ")))
        }
    }
}

fn conventional_key(screen_location: &str, logical_field: &str) -> String {
    format!("{screen_location}_{logical_field}")
}
