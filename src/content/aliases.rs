//! Key aliases
//!
//! Consumers ask for legacy keys (`calculate_mortgage_education`) while the
//! content service groups the same strings under structured keys
//! (`app.mortgage.step2.education`). Neither side is a prefix of the other,
//! so the mapping is an explicit table, tried in order after the exact and
//! short key and before the key prefixes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Legacy key → remote keys, tried in order
const BUILT_IN: &[(&str, &[&str])] = &[
    // home page
    ("title_compare", &["app.home.header.title_compare", "app.home.header.TITLE_COMPARE"]),
    ("TITLE_COMPARE", &["app.home.header.TITLE_COMPARE", "app.home.header.title_compare"]),
    ("compare_in_5minutes", &["app.home.text.compare_in_5minutes", "app.home.text.compare_in_5mins"]),
    ("fill_form_text", &["app.home.text.fill_form_description"]),
    ("mortgage_calculator_text", &["app.home.text.calculator_description"]),
    // mortgage step 1
    (
        "mobile_step_1",
        &["mobile_step_1_fixed", "app.mortgage.step.mobile_step_1_fixed", "app.mortgage.step.mobile_step_1"],
    ),
    (
        "mobile_step_2",
        &["mobile_step_2_fixed", "app.mortgage.step.mobile_step_2_fixed", "app.mortgage.step.mobile_step_2"],
    ),
    (
        "video_calculate_mortgage_title",
        &[
            "video_calculate_mortgage_title_fixed",
            "app.mortgage.header.video_calculate_mortgage_title_fixed",
            "app.mortgage.header.video_calculate_mortgage_title",
        ],
    ),
    (
        "calculate_mortgage_title",
        &[
            "calculate_mortgage_title_fixed",
            "app.mortgage.form.calculate_mortgage_title_fixed",
            "app.mortgage.form.calculate_mortgage_title",
        ],
    ),
    // mortgage step 2
    ("calculate_mortgage_step2_title", &["app.mortgage.step2.title"]),
    ("third_persons", &["app.mortgage.step2.privacy_notice"]),
    ("calculate_mortgage_name_surname", &["app.mortgage.step2.name_surname"]),
    ("calculate_mortgage_name_surname_ph", &["app.mortgage.step2.name_surname_ph"]),
    ("calculate_mortgage_birth_date", &["app.mortgage.step2.birth_date"]),
    ("calculate_mortgage_education", &["app.mortgage.step2.education"]),
    ("calculate_mortgage_education_ph", &["app.mortgage.step2.education_ph"]),
    ("calculate_mortgage_citizenship", &["app.mortgage.step2.citizenship"]),
    ("calculate_mortgage_citizenship_title", &["app.mortgage.step2.citizenship_title"]),
    ("calculate_mortgage_citizenship_ph", &["app.mortgage.step2.citizenship_ph"]),
    ("calculate_mortgage_tax", &["app.mortgage.step2.tax_obligations"]),
    ("plat", &["app.mortgage.step2.tax_tooltip"]),
    ("calculate_mortgage_children18", &["app.mortgage.step2.children_under_18"]),
    ("calculate_mortgage_how_much_childrens", &["app.mortgage.step2.children_count"]),
    ("calculate_mortgage_is_medinsurance", &["app.mortgage.step2.medical_insurance"]),
    ("calculate_mortgage_is_foreigner", &["app.mortgage.step2.foreign_resident"]),
    ("mest", &["app.mortgage.step2.foreign_resident_tooltip"]),
    ("calculate_mortgage_is_public", &["app.mortgage.step2.public_person"]),
    ("pub", &["app.mortgage.step2.public_person_tooltip"]),
    ("calculate_mortgage_borrowers", &["app.mortgage.step2.borrowers_count"]),
    ("place_borrowers", &["app.mortgage.step2.borrowers_placeholder"]),
    ("calculate_mortgage_family_status", &["app.mortgage.step2.family_status"]),
    ("calculate_mortgage_family_status_ph", &["app.mortgage.step2.family_status_ph"]),
    ("calculate_mortgage_partner_pay_mortgage", &["app.mortgage.step2.partner_mortgage_participation"]),
    ("calculate_mortgage_add_partner_title", &["app.mortgage.step2.add_partner_title"]),
    ("calculate_mortgage_add_partner", &["app.mortgage.step2.add_partner"]),
    ("search", &["app.mortgage.step2.search"]),
    ("nothing_found", &["app.mortgage.step2.nothing_found"]),
    ("countries", &["app.mortgage.step2.countries"]),
    // mortgage step 3
    ("calculate_mortgage_step3_title", &["app.mortgage.step3.title"]),
    ("calculate_mortgage_main_source", &["app.mortgage.step3.main_source_income"]),
    ("calculate_mortgage_main_source_ph", &["app.mortgage.step3.main_source_income_ph"]),
    ("calculate_mortgage_has_additional", &["app.mortgage.step3.additional_income"]),
    ("calculate_mortgage_has_additional_ph", &["app.mortgage.step3.additional_income_ph"]),
    ("calculate_mortgage_debt_types", &["app.mortgage.step3.obligations"]),
    ("calculate_mortgage_debt_types_ph", &["app.mortgage.step3.obligations_ph"]),
    ("calculate_mortgage_monthly_income", &["app.mortgage.step3.monthly_income"]),
    ("calculate_mortgage_monthly_income_ph", &["app.mortgage.step3.monthly_income_ph"]),
    ("calculate_mortgage_monthly_income_hint", &["app.mortgage.step3.monthly_income_hint"]),
    ("calculate_mortgage_sfere", &["app.mortgage.step3.field_activity"]),
    ("calculate_mortgage_company", &["app.mortgage.step3.company_name"]),
    ("calculate_mortgage_profession", &["app.mortgage.step3.profession"]),
    ("calculate_mortgage_profession_ph", &["app.mortgage.step3.profession_ph"]),
    ("calculate_mortgage_start_date", &["app.mortgage.step3.start_date"]),
    ("borrower", &["app.mortgage.step3.borrower"]),
    ("add_borrower", &["app.mortgage.step3.add_borrower"]),
    ("add_place_to_work", &["app.mortgage.step3.add_workplace"]),
    ("add_additional_source_of_income", &["app.mortgage.step3.add_additional_income"]),
    ("add_obligation", &["app.mortgage.step3.add_obligation"]),
    ("source_of_income", &["app.mortgage.step3.source_of_income"]),
    ("additional_source_of_income", &["app.mortgage.step3.additional_source_of_income"]),
    ("obligation", &["app.mortgage.step3.obligation"]),
];

/// Numbered option families: `<legacy>N` → `<remote>N` for `N` in `1..=count`
const NUMBERED: &[(&str, &str, u32)] = &[
    ("calculate_mortgage_education_option_", "app.mortgage.step2.education_option_", 7),
    ("calculate_mortgage_family_status_option_", "app.mortgage.step2.family_status_option_", 6),
    ("calculate_mortgage_main_source_option_", "app.mortgage.step3.main_source_income_option_", 7),
    ("calculate_mortgage_has_additional_option_", "app.mortgage.step3.additional_income_option_", 7),
    ("calculate_mortgage_debt_types_option_", "app.mortgage.step3.obligations_option_", 5),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyAliases {
    aliases: HashMap<String, Vec<String>>,
}

impl KeyAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// The aliases the questionnaire screens rely on
    pub fn built_in() -> Self {
        let mut aliases = Self::new();
        for (key, remote) in BUILT_IN {
            aliases.insert(*key, remote.iter().copied());
        }
        for (legacy, remote, count) in NUMBERED {
            for n in 1..=*count {
                aliases.insert(format!("{legacy}{n}"), [format!("{remote}{n}")]);
            }
        }
        aliases
    }

    /// Set the remote keys tried for `key`, replacing any earlier entry
    pub fn insert<I, S>(&mut self, key: impl Into<String>, remote_keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases
            .insert(key.into(), remote_keys.into_iter().map(Into::into).collect());
    }

    /// Remote keys for `key`, empty when it has none
    pub fn get(&self, key: &str) -> &[String] {
        self.aliases.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
