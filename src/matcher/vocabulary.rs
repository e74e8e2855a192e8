use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Keywords for one logical field, most specific first, plus substrings that
/// disqualify a control's name/id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl FieldRule {
    fn new(keywords: &[&str], exclude: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            exclude: exclude.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Logical field keys and their matching rules, in profile order.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    rules: Vec<(String, FieldRule)>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Vocabulary {
    pub fn builtin() -> Self {
        let rules = [
            (
                "firstName",
                FieldRule::new(
                    &["firstname", "first_name", "first-name", "fname", "givenname", "given-name", "first name"],
                    &[],
                ),
            ),
            (
                "lastName",
                FieldRule::new(
                    &["lastname", "last_name", "last-name", "lname", "surname", "familyname", "family-name", "last name"],
                    &[],
                ),
            ),
            (
                "fullName",
                FieldRule::new(&["fullname", "full_name", "full-name", "full name", "your name"], &[]),
            ),
            (
                "email",
                FieldRule::new(&["email", "e-mail", "email address"], &[]),
            ),
            (
                "phone",
                FieldRule::new(
                    &["phone", "telephone", "mobile", "cell", "tel", "phone number"],
                    &["countrycode", "country_code", "country-code", "dialcode", "dial_code", "callingcode", "calling_code", "extension"],
                ),
            ),
            (
                "street",
                FieldRule::new(
                    &["street", "address1", "address_1", "address-line1", "addressline1", "street address", "address"],
                    &["email", "address2", "address_2", "line2"],
                ),
            ),
            (
                "city",
                FieldRule::new(&["city", "town", "locality", "address-level2"], &["ethnicity"]),
            ),
            (
                "state",
                FieldRule::new(&["state", "province", "region", "address-level1"], &["statement"]),
            ),
            (
                "zip",
                FieldRule::new(&["zip", "zipcode", "postal", "postcode", "zip code", "postal code"], &[]),
            ),
            (
                "country",
                FieldRule::new(&["country"], &["phone", "dial", "calling"]),
            ),
            ("linkedin", FieldRule::new(&["linkedin"], &[])),
            ("github", FieldRule::new(&["github"], &[])),
            (
                "portfolio",
                FieldRule::new(
                    &["portfolio", "website", "personal_site", "homepage", "url"],
                    &["linkedin", "github"],
                ),
            ),
            (
                "jobTitle",
                FieldRule::new(&["jobtitle", "job_title", "job-title", "current title", "position", "title"], &[]),
            ),
            (
                "company",
                FieldRule::new(&["company", "employer", "organization", "current company"], &[]),
            ),
            (
                "yearsExperience",
                FieldRule::new(
                    &["yearsexperience", "years_experience", "years-of-experience", "years of experience", "experience"],
                    &[],
                ),
            ),
            (
                "summary",
                FieldRule::new(&["summary", "coverletter", "cover_letter", "cover letter", "about", "bio"], &[]),
            ),
            ("degree", FieldRule::new(&["degree", "qualification"], &[])),
            (
                "university",
                FieldRule::new(&["university", "school", "college", "institution"], &[]),
            ),
            (
                "graduationYear",
                FieldRule::new(
                    &["graduationyear", "graduation_year", "grad_year", "graduation year", "graduation"],
                    &[],
                ),
            ),
        ];

        Self {
            rules: rules
                .into_iter()
                .map(|(key, rule)| (key.to_string(), rule))
                .collect(),
        }
    }

    /// Apply overrides from config. Non-empty lists replace the built-in
    /// ones; unknown keys are appended.
    pub fn merged(mut self, overrides: &BTreeMap<String, FieldRule>) -> Self {
        for (key, rule) in overrides {
            match self.rules.iter_mut().find(|(k, _)| k == key) {
                Some((_, existing)) => {
                    if !rule.keywords.is_empty() {
                        existing.keywords = rule.keywords.clone();
                    }
                    if !rule.exclude.is_empty() {
                        existing.exclude = rule.exclude.clone();
                    }
                }
                None => self.rules.push((key.clone(), rule.clone())),
            }
        }
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    /// Rule for `key`; unknown keys get `fallback_keywords`.
    pub fn rule(&self, key: &str) -> FieldRule {
        self.get(key).cloned().unwrap_or_else(|| FieldRule {
            keywords: fallback_keywords(key),
            exclude: Vec::new(),
        })
    }
}

/// `yearsOfService` -> `["yearsofservice", "years_of_service"]`.
pub fn fallback_keywords(key: &str) -> Vec<String> {
    let lower = key.to_lowercase();
    let mut snake = String::new();
    for (i, c) in key.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            snake.push('_');
        }
        snake.extend(c.to_lowercase());
    }
    if snake == lower {
        vec![lower]
    } else {
        vec![lower, snake]
    }
}
