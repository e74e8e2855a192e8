use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use crate::dom::dom_model::{Document, NodeId};
use crate::error::DomError;

/// Parse an HTML snapshot into a `Document`.
///
/// Attributes, text, `<title>`, initial values, `checked` and `selected`
/// states carry over. Scripts and comments are dropped.
pub fn parse_html(html: &str) -> Result<Document, DomError> {
    let parsed = Html::parse_document(html);
    let mut doc = Document::new();

    let root = doc.root();
    copy_element(&mut doc, root, parsed.root_element())?;

    if let Ok(selector) = Selector::parse("title") {
        if let Some(title) = parsed.select(&selector).next() {
            let text = title.text().collect::<String>();
            doc.set_title(text.split_whitespace().collect::<Vec<_>>().join(" "));
        }
    }

    debug!(nodes = doc.elements().len(), title = doc.title(), "Parsed HTML snapshot");
    Ok(doc)
}

/// Parse and remember where the page came from.
pub fn parse_html_with_url(html: &str, url: Option<&str>) -> Result<Document, DomError> {
    let mut doc = parse_html(html)?;
    doc.set_url(url.map(str::to_string));
    Ok(doc)
}

fn copy_element(doc: &mut Document, parent: NodeId, source: ElementRef<'_>) -> Result<(), DomError> {
    let tag = source.value().name();
    if matches!(tag, "script" | "style" | "template") {
        return Ok(());
    }

    let node = doc.create_element(tag);
    for (name, value) in source.value().attrs() {
        doc.set_attr(node, name, value)?;
    }
    doc.reset_control_state(node)?;
    doc.append_child(parent, node)?;

    for child in source.children() {
        match child.value() {
            Node::Text(text) => {
                doc.append_text(node, text)?;
            }
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    copy_element(doc, node, el)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}
