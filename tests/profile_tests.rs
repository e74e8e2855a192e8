use std::collections::BTreeMap;

use form_autofill::discovery::discovery::discover;
use form_autofill::error::ProfileError;
use form_autofill::field::field_model::FillValue;
use form_autofill::inject::fill_pass::run_injection;
use form_autofill::matcher::vocabulary::{FieldRule, Vocabulary};
use form_autofill::profile::planner::plan_fill;
use form_autofill::profile::profile::Profile;

use crate::common::utils::{TWIN_SECTIONS, by_name, doc, fixture_html};

mod common;

const PROFILE_YAML: &str = r#"
pronouns: she/her
firstName: Ada
lastName: Lovelace
yearsExperience: 12
remote: true
skills: [Rust, Go]
middleName: null
address:
  line1: 12 St James's Square
blank: "   "
"#;

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn parse_yaml_profile() {
    let profile = Profile::parse(PROFILE_YAML, "profile.yaml").unwrap();

    assert_eq!(profile.len(), 6, "null, nested and blank entries are skipped");
    assert_eq!(profile.get("firstName"), Some(&FillValue::Single("Ada".into())));
    assert_eq!(profile.get("yearsExperience"), Some(&FillValue::Single("12".into())));
    assert_eq!(profile.get("remote"), Some(&FillValue::Single("true".into())));
    assert_eq!(
        profile.get("skills"),
        Some(&FillValue::Many(vec!["Rust".into(), "Go".into()]))
    );
    assert_eq!(profile.get("middleName"), None);
    assert_eq!(profile.get("address"), None);
    assert_eq!(profile.get("blank"), None);
}

#[test]
fn parse_json_profile() {
    let profile = Profile::parse(r#"{"email": "ada@example.com", "skills": ["Rust"]}"#, "profile.json").unwrap();

    assert_eq!(profile.get("email"), Some(&FillValue::Single("ada@example.com".into())));
    assert_eq!(profile.get("skills"), Some(&FillValue::Many(vec!["Rust".into()])));
}

#[test]
fn malformed_profiles_are_errors() {
    let list = Profile::parse("- just\n- a list\n", "list.yaml").unwrap_err();
    assert!(matches!(&list, ProfileError::Yaml { path, .. } if path == "list.yaml"));

    let broken = Profile::parse("firstName: [unclosed", "broken.yaml").unwrap_err();
    assert!(matches!(broken, ProfileError::Yaml { .. }));
    assert!(broken.to_string().starts_with("Invalid profile broken.yaml"));
}

#[test]
fn load_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("me.yaml");
    std::fs::write(&path, "firstName: Ada\n").unwrap();

    let profile = Profile::load(&path).unwrap();
    assert_eq!(profile.len(), 1);

    let missing = Profile::load(&dir.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(missing, ProfileError::Io { .. }));
}

#[test]
fn instructions_follow_vocabulary_then_file_order() {
    let profile = Profile::parse(PROFILE_YAML, "profile.yaml").unwrap();

    let keys: Vec<String> = profile
        .instructions(&Vocabulary::builtin())
        .into_iter()
        .map(|i| i.field_name)
        .collect();
    assert_eq!(
        keys,
        vec!["firstName", "lastName", "yearsExperience", "pronouns", "remote", "skills"]
    );
}

// ============================================================================
// Planning
// ============================================================================

#[test]
fn plan_pins_selectors_of_scraped_fields() {
    let fields = discover(&doc(&fixture_html("application.html"))).unwrap().fields;
    let profile = Profile::from_entries([
        ("firstName", "Ada"),
        ("phone", "555-0100"),
        ("state", "California"),
        ("github", "ada"),
    ]);

    let planned = plan_fill(&fields, &profile, &Vocabulary::builtin());
    let selector = |key: &str| {
        planned
            .iter()
            .find(|i| i.field_name == key)
            .and_then(|i| i.selector.clone())
    };

    assert_eq!(planned.len(), 4);
    assert_eq!(selector("firstName").as_deref(), Some("#first-name"));
    assert_eq!(
        selector("phone").as_deref(),
        Some(r#"input[name="phone_number"]"#),
        "the country code select is excluded for phone"
    );
    assert_eq!(selector("state").as_deref(), Some(r#"select[name="state"]"#));
    assert_eq!(selector("github"), None, "unmatched keys are still sent unpinned");
}

#[test]
fn plan_uses_each_field_once() {
    let fields = discover(&doc(&fixture_html("application.html"))).unwrap().fields;
    let mut overrides = BTreeMap::new();
    overrides.insert(
        "workEmail".to_string(),
        FieldRule {
            keywords: vec!["email".into()],
            exclude: Vec::new(),
        },
    );
    let vocab = Vocabulary::builtin().merged(&overrides);
    let profile = Profile::from_entries([("email", "ada@example.com"), ("workEmail", "ada@work.example")]);

    let planned = plan_fill(&fields, &profile, &vocab);

    assert_eq!(planned[0].selector.as_deref(), Some(r#"input[name="email"]"#));
    assert_eq!(planned[1].selector.as_deref(), Some(r#"input[name="newsletter_email"]"#));
}

#[test]
fn planned_instructions_fill_the_page() {
    let mut page = doc(&fixture_html("application.html"));
    let fields = discover(&page).unwrap().fields;
    let vocab = Vocabulary::builtin();
    let profile = Profile::from_entries([
        ("firstName", "Ada"),
        ("lastName", "Lovelace"),
        ("phone", "555-0100"),
        ("state", "Calif"),
    ]);

    let report = run_injection(&mut page, &plan_fill(&fields, &profile, &vocab), &vocab);

    assert_eq!(report.success_count, 4);
    assert_eq!(page.value(by_name(&page, "first_name")), "Ada");
    assert_eq!(page.value(by_name(&page, "phone_number")), "555-0100");
    assert_eq!(page.value(by_name(&page, "phone_country_code")), "", "country code untouched");
    assert_eq!(page.value(by_name(&page, "state")), "CA");
}

#[test]
fn plan_leaves_shared_selectors_unpinned() {
    let mut page = doc(TWIN_SECTIONS);
    let fields = discover(&page).unwrap().fields;
    let mut overrides = BTreeMap::new();
    overrides.insert(
        "workCity".to_string(),
        FieldRule {
            keywords: vec!["work city".into()],
            exclude: Vec::new(),
        },
    );
    let vocab = Vocabulary::builtin().merged(&overrides);
    let profile = Profile::from_entries([("workCity", "Lyon")]);

    let planned = plan_fill(&fields, &profile, &vocab);
    assert_eq!(planned.len(), 1);
    assert_eq!(planned[0].selector, None, "both twins carry the same selector");

    let report = run_injection(&mut page, &planned, &vocab);
    assert_eq!(report.success_count, 1);
    let inputs = page.elements_by_tag(&["input"]);
    assert_eq!(page.value(inputs[0]), "");
    assert_eq!(page.value(inputs[1]), "Lyon");
}
