use std::collections::HashMap;

use ego_tree::NodeId;
use scraper::node::{Element, Node};
use scraper::{Html, Selector};

pub const EXTERNAL_LINK_REL: &str = "nofollow noopener noreferrer";
pub const EXTERNAL_LINK_TARGET: &str = "_blank";
pub const DEFAULT_INTERNAL_DOMAIN: &str = "djangocentral";

/// Raw `src` value -> re-hosted URL, `None` when the import failed.
pub type ImageMap = HashMap<String, Option<String>>;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
/// The parser drops one leading newline inside these.
const LEADING_NEWLINE_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

/// Every distinct `<img src>` in the fragment, in document order.
pub fn collect_image_sources(html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let Ok(selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };
    let mut sources: Vec<String> = Vec::new();
    for img in fragment.select(&selector) {
        if let Some(src) = img.value().attr("src") {
            if !sources.iter().any(|seen| seen == src) {
                sources.push(src.to_string());
            }
        }
    }
    sources
}

pub fn is_external_link(href: &str, internal_domain: &str) -> bool {
    !href.contains(internal_domain)
}

/// Edits an HTML fragment in place: image sources are swapped for their
/// re-hosted copies and external anchors open in a new, unreferred tab.
#[derive(Debug, Clone)]
pub struct ContentRewriter {
    internal_domain: String,
}

impl ContentRewriter {
    pub fn new(internal_domain: impl Into<String>) -> Self {
        Self {
            internal_domain: internal_domain.into(),
        }
    }

    pub fn rewrite(&self, html: &str, images: &ImageMap) -> String {
        let mut fragment = Html::parse_fragment(html);

        let elements: Vec<NodeId> = fragment
            .tree
            .nodes()
            .filter(|node| node.value().is_element())
            .map(|node| node.id())
            .collect();
        for id in elements {
            let Some(mut node) = fragment.tree.get_mut(id) else {
                continue;
            };
            if let Node::Element(element) = node.value() {
                match element.name() {
                    "img" => rewrite_image(element, images),
                    "a" => self.rewrite_anchor(element),
                    _ => {}
                }
            }
        }
        restore_leading_newlines(&mut fragment);

        fragment.root_element().inner_html()
    }

    fn rewrite_anchor(&self, element: &mut Element) {
        let external = element
            .attr("href")
            .is_some_and(|href| is_external_link(href, &self.internal_domain));
        if external {
            set_attr(element, "rel", EXTERNAL_LINK_REL);
            set_attr(element, "target", EXTERNAL_LINK_TARGET);
        }
    }
}

impl Default for ContentRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_INTERNAL_DOMAIN)
    }
}

fn rewrite_image(element: &mut Element, images: &ImageMap) {
    if let Some(src) = element.attr("src") {
        let rehosted = images.get(src).cloned().flatten().unwrap_or_default();
        set_attr(element, "src", &rehosted);
    }
    set_attr(element, "srcset", "");
}

/// Sets an unprefixed attribute, keeping the list sorted so `Element::attr` still finds it.
fn set_attr(element: &mut Element, key: &str, value: &str) {
    let existing = element
        .attrs
        .iter_mut()
        .find(|(name, _)| name.prefix.is_none() && &*name.local == key);
    match existing {
        Some((_, slot)) => *slot = value.into(),
        None => {
            let mut name = element.name.clone();
            name.prefix = None;
            name.ns = "".into();
            name.local = key.into();
            element.attrs.push((name, value.into()));
            element.attrs.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        }
    }
}

/// A text node that starts with a newline inside `<pre>` only keeps it through
/// serialization when a second one is written in front of it.
fn restore_leading_newlines(fragment: &mut Html) {
    let texts: Vec<NodeId> = fragment
        .tree
        .nodes()
        .filter(|node| {
            node.value().as_element().is_some_and(|element| {
                &*element.name.ns == HTML_NAMESPACE
                    && LEADING_NEWLINE_ELEMENTS.contains(&element.name())
            })
        })
        .filter_map(|node| node.first_child())
        .filter(|child| {
            child
                .value()
                .as_text()
                .is_some_and(|text| text.starts_with('\n'))
        })
        .map(|child| child.id())
        .collect();
    for id in texts {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            if let Node::Text(text) = node.value() {
                let restored = format!("\n{}", &*text.text);
                text.text = restored.as_str().into();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::node::Node;
    use scraper::Html;

    use super::set_attr;

    #[test]
    fn set_attr_replaces_existing_and_adds_missing() {
        let mut fragment = Html::parse_fragment(r#"<a rel="me" href="x">t</a>"#);
        let id = fragment
            .tree
            .nodes()
            .find(|node| node.value().as_element().is_some_and(|el| el.name() == "a"))
            .map(|node| node.id())
            .unwrap();
        let mut node = fragment.tree.get_mut(id).unwrap();
        let Node::Element(element) = node.value() else {
            panic!("not an element");
        };

        set_attr(element, "rel", "nofollow");
        set_attr(element, "target", "_blank");

        assert_eq!(element.attr("rel"), Some("nofollow"));
        assert_eq!(element.attr("target"), Some("_blank"));
        assert_eq!(element.attr("href"), Some("x"));
        assert_eq!(element.attrs.len(), 3);
    }
}
