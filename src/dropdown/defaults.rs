//! Built-in English dropdown data
//!
//! Used when the dropdown service is unreachable or returns nothing for a
//! field, so every form stays completable.

use crate::cache::DropdownOption;

pub struct DefaultField {
    pub label: &'static str,
    pub placeholder: &'static str,
    pub options: &'static [(&'static str, &'static str)],
}

impl DefaultField {
    pub fn options(&self) -> Vec<DropdownOption> {
        self.options
            .iter()
            .map(|(value, label)| DropdownOption::new(*value, *label))
            .collect()
    }
}

static WHEN_NEEDED: DefaultField = DefaultField {
    label: "When do you need the money?",
    placeholder: "Select timeframe",
    options: &[
        ("within_3_months", "Within 3 months"),
        ("3_to_6_months", "3-6 months"),
        ("6_to_12_months", "6-12 months"),
        ("over_12_months", "Over 12 months"),
    ],
};

static PROPERTY_TYPE: DefaultField = DefaultField {
    label: "Property type",
    placeholder: "Select property type",
    options: &[
        ("apartment", "Apartment"),
        ("private_house", "Private house"),
        ("garden_apartment", "Garden apartment"),
        ("penthouse", "Penthouse"),
        ("other", "Other"),
    ],
};

static FIRST_HOME: DefaultField = DefaultField {
    label: "Is this your first home?",
    placeholder: "Select an option",
    options: &[
        ("yes_first_home", "Yes, first home"),
        ("no_additional_property", "No, additional property"),
        ("investment", "Investment property"),
    ],
};

static PROPERTY_OWNERSHIP: DefaultField = DefaultField {
    label: "Property ownership",
    placeholder: "Select your status",
    options: &[
        ("no_property", "I don't own any property"),
        ("has_property", "I own a property"),
        ("selling_property", "I'm selling a property"),
    ],
};

static EDUCATION: DefaultField = DefaultField {
    label: "Education",
    placeholder: "Select education level",
    options: &[
        ("no_high_school_certificate", "No high school certificate"),
        ("partial_high_school_certificate", "Partial high school certificate"),
        ("full_high_school_certificate", "Full high school certificate"),
        ("postsecondary_education", "Post-secondary education"),
        ("bachelors", "Bachelor's degree"),
        ("masters", "Master's degree"),
        ("doctorate", "Doctorate"),
    ],
};

static CITIZENSHIP: DefaultField = DefaultField {
    label: "Citizenship",
    placeholder: "Select citizenship",
    options: &[("israel", "Israel"), ("other", "Other")],
};

static FAMILY_STATUS: DefaultField = DefaultField {
    label: "Family status",
    placeholder: "Select family status",
    options: &[
        ("single", "Single"),
        ("married", "Married"),
        ("divorced", "Divorced"),
        ("widowed", "Widowed"),
        ("commonlaw_partner", "Common-law partner"),
        ("other", "Other"),
    ],
};

static OBLIGATIONS: DefaultField = DefaultField {
    label: "Existing obligations",
    placeholder: "Select obligation type",
    options: &[
        ("no_obligations", "No obligations"),
        ("bank_loan", "Bank loan"),
        ("consumer_credit", "Consumer credit"),
        ("credit_card", "Credit card debt"),
        ("other", "Other"),
    ],
};

static MAIN_SOURCE: DefaultField = DefaultField {
    label: "Main source of income",
    placeholder: "Select source of income",
    options: &[
        ("employee", "Employee"),
        ("selfemployed", "Self-employed"),
        ("pension", "Pension"),
        ("unemployed", "Unemployed"),
        ("unpaid_leave", "Unpaid leave"),
        ("student", "Student"),
        ("other", "Other"),
    ],
};

static ADDITIONAL_INCOME: DefaultField = DefaultField {
    label: "Additional income",
    placeholder: "Select additional income",
    options: &[
        ("no_additional_income", "No additional income"),
        ("additional_salary", "Additional salary"),
        ("additional_work", "Additional work"),
        ("property_rental_income", "Property rental income"),
        ("pension", "Pension"),
        ("other", "Other"),
    ],
};

static FIELD_OF_ACTIVITY: DefaultField = DefaultField {
    label: "Field of activity",
    placeholder: "Select field of activity",
    options: &[
        ("technology", "Technology"),
        ("education", "Education"),
        ("healthcare", "Healthcare"),
        ("finance", "Finance"),
        ("retail", "Retail"),
        ("other", "Other"),
    ],
};

static REFINANCE_REASON: DefaultField = DefaultField {
    label: "Why are you refinancing?",
    placeholder: "Select a reason",
    options: &[
        ("lower_interest_rate", "Lower interest rate"),
        ("reduce_monthly_payment", "Reduce monthly payment"),
        ("shorten_term", "Shorten the term"),
        ("cash_out", "Cash out"),
        ("consolidate_debts", "Consolidate debts"),
    ],
};

static CREDIT_PURPOSE: DefaultField = DefaultField {
    label: "Purpose of the loan",
    placeholder: "Select purpose",
    options: &[
        ("vehicle", "Vehicle purchase"),
        ("renovation", "Home renovation"),
        ("wedding", "Wedding and events"),
        ("business", "Business investment"),
        ("other", "Other"),
    ],
};

/// Defaults for a logical field, if the application knows one
pub fn default_field(logical_field: &str) -> Option<&'static DefaultField> {
    let field = match logical_field {
        "when_needed" | "when" => &WHEN_NEEDED,
        "type" | "property_type" => &PROPERTY_TYPE,
        "first_home" | "first" => &FIRST_HOME,
        "property_ownership" => &PROPERTY_OWNERSHIP,
        "education" => &EDUCATION,
        "citizenship" => &CITIZENSHIP,
        "family_status" => &FAMILY_STATUS,
        "obligations" => &OBLIGATIONS,
        "main_source" => &MAIN_SOURCE,
        "additional_income" => &ADDITIONAL_INCOME,
        "field_of_activity" => &FIELD_OF_ACTIVITY,
        "why" | "refinance_reason" => &REFINANCE_REASON,
        "purpose" => &CREDIT_PURPOSE,
        _ => return None,
    };
    Some(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dropdown::field_map::FieldKeyTable;

    #[test]
    fn test_every_built_in_field_has_defaults() {
        let table = FieldKeyTable::built_in();
        for screen in table.screens() {
            for field in table.screen(screen).unwrap().fields.keys() {
                let defaults = default_field(field)
                    .unwrap_or_else(|| panic!("no defaults for {screen}.{field}"));
                assert!(!defaults.options.is_empty());
            }
        }
    }

    #[test]
    fn test_unknown_field() {
        assert!(default_field("favourite_colour").is_none());
    }
}
