use roxmltree::{Document, Node};

use crate::model::{RawItem, RawTerm};

/// Namespace of `content:encoded`.
pub const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";
/// WXR 1.0, 1.1 and 1.2 all live under this prefix.
pub const WP_EXPORT_NAMESPACE_PREFIX: &str = "http://wordpress.org/export/";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WxrError {
    #[error("malformed export xml: {0}")]
    Xml(String),
    #[error("export has no <channel> element")]
    MissingChannel,
}

/// Parse a WordPress export and return every `channel/item` in document order.
pub fn parse_items(xml: &str) -> Result<Vec<RawItem>, WxrError> {
    let doc = Document::parse(xml).map_err(|err| WxrError::Xml(err.to_string()))?;
    let channel = doc
        .root_element()
        .children()
        .find(|node| is_plain(node, "channel"))
        .ok_or(WxrError::MissingChannel)?;

    Ok(channel
        .children()
        .filter(|node| is_plain(node, "item"))
        .map(|node| read_item(&node))
        .collect())
}

fn read_item(item: &Node<'_, '_>) -> RawItem {
    let mut raw = RawItem::default();
    for child in item.children().filter(Node::is_element) {
        let name = child.tag_name();
        match (name.namespace(), name.name()) {
            (None, "title") => raw.title = element_text(&child),
            (None, "link") => raw.link = element_text(&child),
            (None, "category") => raw.terms.push(RawTerm {
                domain: child.attribute("domain").map(str::to_string),
                label: element_text(&child),
            }),
            (Some(ns), "post_date") if ns.starts_with(WP_EXPORT_NAMESPACE_PREFIX) => {
                raw.post_date = element_text(&child);
            }
            (Some(CONTENT_NAMESPACE), "encoded") => {
                raw.content = Some(element_text(&child).unwrap_or_default());
            }
            _ => {}
        }
    }
    raw
}

fn is_plain(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().namespace().is_none() && node.tag_name().name() == name
}

/// Concatenated text and CDATA children; `None` for an empty element.
fn element_text(node: &Node<'_, '_>) -> Option<String> {
    let text: String = node
        .children()
        .filter(Node::is_text)
        .filter_map(|child| child.text())
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
