use form_autofill::dom::dom_model::{Document, NodeId};
use form_autofill::dom::html::parse_html;
use form_autofill::field::selector::resolve;

/// `file://` URL of a page under tests/fixtures.
pub fn page(name: &str) -> String {
    let base = std::env::current_dir().unwrap();
    let path = base.join("tests").join("fixtures").join(name);

    format!("file://{}", path.display())
}

pub fn fixture_html(name: &str) -> String {
    let base = std::env::current_dir().unwrap();
    std::fs::read_to_string(base.join("tests").join("fixtures").join(name)).unwrap()
}

/// Parse an inline HTML snippet.
pub fn doc(html: &str) -> Document {
    parse_html(html).expect("snippet should parse")
}

/// First element whose `name` attribute equals `name`.
pub fn by_name(doc: &Document, name: &str) -> NodeId {
    doc.elements()
        .into_iter()
        .find(|n| doc.attr(*n, "name") == Some(name))
        .unwrap_or_else(|| panic!("no element named {name}"))
}

pub fn by_id(doc: &Document, id: &str) -> NodeId {
    doc.get_element_by_id(id)
        .unwrap_or_else(|| panic!("no element with id {id}"))
}

pub fn select(doc: &Document, selector: &str) -> NodeId {
    resolve(doc, selector).unwrap_or_else(|| panic!("selector {selector} did not resolve"))
}

/// Page from the end-to-end scenario: an empty first_name, a prefilled
/// legacy field and a state select.
pub const E2E_PAGE: &str = r#"
<html><head><title>Apply</title></head><body>
  <form id="apply">
    <input name="first_name">
    <input name="firstName_legacy" value="Bob">
    <select name="state">
      <option>Alabama</option>
      <option>California</option>
      <option>Texas</option>
    </select>
  </form>
</body></html>
"#;

/// Two unnamed inputs whose nearest three ancestors look identical, so their
/// structural selectors cannot tell them apart.
pub const TWIN_SECTIONS: &str = r#"
<section><div><div><div><label>Home city <input></label></div></div></div></section>
<section><div><div><div><label>Work city <input></label></div></div></div></section>
"#;
