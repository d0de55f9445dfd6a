//! Microformats2 parsing on top of `scraper`.
//!
//! Covers the parts of the mf2 parsing rules a link preview needs: root
//! `h-*` items, `p-`/`u-`/`dt-`/`e-` properties, nested items, the
//! value-class pattern, implied `name`/`photo`/`url`, and rel links.

use crate::utils::resolve_url;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub items: Vec<Item>,
    pub rels: BTreeMap<String, Vec<String>>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn rel_urls(&self, rel: &str) -> &[String] {
        self.rels.get(rel).map(Vec::as_slice).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub types: Vec<String>,
    pub properties: BTreeMap<String, Vec<PropertyValue>>,
    pub children: Vec<Item>,
    /// Plain value when the item is itself a property of its parent.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Url(String),
    Html { html: String, value: String },
    Item(Box<Item>),
}

impl PropertyValue {
    pub fn plain_text(&self) -> Option<String> {
        match self {
            PropertyValue::Text(s) | PropertyValue::Url(s) => Some(s.clone()),
            PropertyValue::Html { value, .. } => Some(value.clone()),
            PropertyValue::Item(item) => item.value.clone().or_else(|| item.first_text("name")),
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            PropertyValue::Item(item) => Some(item),
            _ => None,
        }
    }
}

impl Item {
    pub fn has_type(&self, ty: &str) -> bool {
        self.types.iter().any(|t| t == ty)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.get(name).is_some_and(|v| !v.is_empty())
    }

    pub fn values(&self, name: &str) -> &[PropertyValue] {
        self.properties.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first(&self, name: &str) -> Option<&PropertyValue> {
        self.values(name).first()
    }

    /// First value of `name` as trimmed, non-empty plain text.
    pub fn first_text(&self, name: &str) -> Option<String> {
        self.first(name)
            .and_then(PropertyValue::plain_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn push(&mut self, name: &str, value: PropertyValue) {
        self.properties.entry(name.to_string()).or_default().push(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    P,
    U,
    Dt,
    E,
}

#[derive(Default)]
struct Seen {
    p: bool,
    u: bool,
    e: bool,
    nested: bool,
}

/// Parse every microformats2 item in `html`. Relative URLs resolve against
/// `<base href>` when present, otherwise against `base_url`.
pub fn parse(html: &str, base_url: &str) -> Document {
    let document = Html::parse_document(html);

    let base = Selector::parse("base[href]")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .and_then(|el| el.value().attr("href"))
        .map(|href| resolve_url(base_url, href))
        .unwrap_or_else(|| base_url.to_string());

    let mut items = Vec::new();
    collect_roots(document.root_element(), &base, &mut items);

    let rels = collect_rels(&document, &base);
    debug!(items = items.len(), rels = rels.len(), "Parsed microformats2 document");

    Document { items, rels }
}

fn collect_roots(el: ElementRef, base: &str, out: &mut Vec<Item>) {
    if !root_types(&el).is_empty() {
        out.push(parse_item(el, base));
        return;
    }
    for child in el.children().filter_map(ElementRef::wrap) {
        collect_roots(child, base, out);
    }
}

fn collect_rels(document: &Html, base: &str) -> BTreeMap<String, Vec<String>> {
    let mut rels: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let Ok(selector) = Selector::parse("a[rel][href], link[rel][href]") else {
        return rels;
    };
    for el in document.select(&selector) {
        let (Some(rel), Some(href)) = (el.value().attr("rel"), el.value().attr("href")) else {
            continue;
        };
        let url = resolve_url(base, href);
        for name in rel.split_whitespace() {
            let urls = rels.entry(name.to_ascii_lowercase()).or_default();
            if !urls.contains(&url) {
                urls.push(url.clone());
            }
        }
    }
    rels
}

fn is_mf_name(rest: &str) -> bool {
    !rest.is_empty()
        && !rest.starts_with('-')
        && !rest.ends_with('-')
        && rest
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn root_types(el: &ElementRef) -> Vec<String> {
    let mut types: Vec<String> = el
        .value()
        .classes()
        .filter(|c| c.strip_prefix("h-").is_some_and(is_mf_name))
        .map(str::to_string)
        .collect();
    types.sort();
    types.dedup();
    types
}

fn property_classes(el: &ElementRef) -> Vec<(Prefix, String)> {
    let mut props = Vec::new();
    for class in el.value().classes() {
        let parsed = if let Some(rest) = class.strip_prefix("p-") {
            Some((Prefix::P, rest))
        } else if let Some(rest) = class.strip_prefix("u-") {
            Some((Prefix::U, rest))
        } else if let Some(rest) = class.strip_prefix("dt-") {
            Some((Prefix::Dt, rest))
        } else {
            class.strip_prefix("e-").map(|rest| (Prefix::E, rest))
        };
        if let Some((prefix, name)) = parsed {
            if is_mf_name(name) && !props.iter().any(|(p, n)| *p == prefix && n == name) {
                props.push((prefix, name.to_string()));
            }
        }
    }
    props
}

fn parse_item(el: ElementRef, base: &str) -> Item {
    let mut item = Item {
        types: root_types(&el),
        ..Default::default()
    };
    let mut seen = Seen::default();
    parse_properties(el, base, &mut item, &mut seen);

    if !item.has_property("name") && !seen.p && !seen.e && !seen.nested {
        if let Some(name) = implied_name(el) {
            item.push("name", PropertyValue::Text(name));
        }
    }
    if !item.has_property("photo") && !seen.u && !seen.nested {
        if let Some(photo) = implied_photo(el) {
            item.push("photo", PropertyValue::Url(resolve_url(base, &photo)));
        }
    }
    if !item.has_property("url") && !seen.u && !seen.nested {
        if let Some(url) = implied_url(el) {
            item.push("url", PropertyValue::Url(resolve_url(base, &url)));
        }
    }

    item
}

fn parse_properties(el: ElementRef, base: &str, item: &mut Item, seen: &mut Seen) {
    for child in el.children().filter_map(ElementRef::wrap) {
        let props = property_classes(&child);

        if !root_types(&child).is_empty() {
            seen.nested = true;
            let mut nested = parse_item(child, base);
            if props.is_empty() {
                item.children.push(nested);
                continue;
            }
            for (prefix, name) in props {
                nested.value = Some(match prefix {
                    Prefix::P => nested.first_text("name").unwrap_or_else(|| text_content(child)),
                    Prefix::U => nested
                        .first_text("url")
                        .unwrap_or_else(|| resolve_url(base, &url_value(child))),
                    Prefix::Dt => datetime_value(child),
                    Prefix::E => text_content(child),
                });
                item.push(&name, PropertyValue::Item(Box::new(nested.clone())));
            }
            continue;
        }

        for (prefix, name) in &props {
            let value = match prefix {
                Prefix::P => {
                    seen.p = true;
                    PropertyValue::Text(text_value(child))
                }
                Prefix::U => {
                    seen.u = true;
                    PropertyValue::Url(resolve_url(base, &url_value(child)))
                }
                Prefix::Dt => PropertyValue::Text(datetime_value(child)),
                Prefix::E => {
                    seen.e = true;
                    PropertyValue::Html {
                        html: child.inner_html().trim().to_string(),
                        value: text_content(child),
                    }
                }
            };
            item.push(name, value);
        }

        parse_properties(child, base, item, seen);
    }
}

/// Text with whitespace collapsed, `<script>`/`<style>` dropped and images
/// replaced by their alt text.
fn text_content(el: ElementRef) -> String {
    let mut out = String::new();
    push_text(el, &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_text(el: ElementRef, out: &mut String) {
    for node in el.children() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => match element.name() {
                "script" | "style" => {}
                "img" => {
                    if let Some(alt) = element.attr("alt") {
                        out.push(' ');
                        out.push_str(alt);
                        out.push(' ');
                    }
                }
                _ => {
                    if let Some(child) = ElementRef::wrap(node) {
                        push_text(child, out);
                    }
                }
            },
            _ => {}
        }
    }
}

fn attr(el: &ElementRef, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn value_class(el: ElementRef) -> Option<String> {
    let selector = Selector::parse(".value, .value-title").ok()?;
    let parts: Vec<String> = el
        .select(&selector)
        .filter_map(|v| {
            if v.value().classes().any(|c| c == "value-title") {
                return attr(&v, "title");
            }
            match v.value().name() {
                "img" | "area" => attr(&v, "alt"),
                "data" => attr(&v, "value").or_else(|| Some(text_content(v))),
                "abbr" => attr(&v, "title").or_else(|| Some(text_content(v))),
                "time" | "ins" | "del" => attr(&v, "datetime").or_else(|| Some(text_content(v))),
                _ => Some(text_content(v)),
            }
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(""))
    }
}

fn text_value(el: ElementRef) -> String {
    if let Some(value) = value_class(el) {
        return value;
    }
    let found = match el.value().name() {
        "abbr" | "link" => attr(&el, "title"),
        "data" | "input" => attr(&el, "value"),
        "img" | "area" => attr(&el, "alt"),
        _ => None,
    };
    found.unwrap_or_else(|| text_content(el))
}

fn url_value(el: ElementRef) -> String {
    let found = match el.value().name() {
        "a" | "area" | "link" => attr(&el, "href"),
        "img" | "audio" | "source" | "iframe" => attr(&el, "src"),
        "video" => attr(&el, "src").or_else(|| attr(&el, "poster")),
        "object" => attr(&el, "data"),
        _ => None,
    };
    found
        .or_else(|| value_class(el))
        .or_else(|| match el.value().name() {
            "abbr" => attr(&el, "title"),
            "data" | "input" => attr(&el, "value"),
            _ => None,
        })
        .unwrap_or_else(|| text_content(el))
}

fn datetime_value(el: ElementRef) -> String {
    if let Some(value) = value_class(el) {
        return value;
    }
    let found = match el.value().name() {
        "time" | "ins" | "del" => attr(&el, "datetime"),
        "abbr" => attr(&el, "title"),
        "data" | "input" => attr(&el, "value"),
        _ => None,
    };
    found.unwrap_or_else(|| text_content(el))
}

fn only_child(el: ElementRef) -> Option<ElementRef> {
    let mut children = el.children().filter_map(ElementRef::wrap);
    let first = children.next()?;
    if children.next().is_some() || !root_types(&first).is_empty() {
        return None;
    }
    Some(first)
}

fn only_child_named<'a>(el: ElementRef<'a>, names: &[&str]) -> Option<ElementRef<'a>> {
    only_child(el).filter(|c| names.contains(&c.value().name()))
}

fn implied_name(el: ElementRef) -> Option<String> {
    let from_self = match el.value().name() {
        "img" | "area" => attr(&el, "alt"),
        "abbr" => attr(&el, "title"),
        _ => None,
    };
    let name = from_self
        .or_else(|| {
            only_child_named(el, &["img", "area"])
                .or_else(|| only_child(el).and_then(|c| only_child_named(c, &["img", "area"])))
                .and_then(|c| attr(&c, "alt"))
        })
        .or_else(|| {
            only_child_named(el, &["abbr"])
                .or_else(|| only_child(el).and_then(|c| only_child_named(c, &["abbr"])))
                .and_then(|c| attr(&c, "title"))
        })
        .unwrap_or_else(|| text_content(el));
    Some(name).filter(|n| !n.is_empty())
}

fn implied_photo(el: ElementRef) -> Option<String> {
    let src = |e: &ElementRef| match e.value().name() {
        "img" => attr(e, "src"),
        "object" => attr(e, "data"),
        _ => None,
    };
    src(&el)
        .or_else(|| only_child_named(el, &["img", "object"]).and_then(|c| src(&c)))
        .or_else(|| {
            only_child(el)
                .and_then(|c| only_child_named(c, &["img", "object"]))
                .and_then(|c| src(&c))
        })
}

fn implied_url(el: ElementRef) -> Option<String> {
    let href = |e: &ElementRef| match e.value().name() {
        "a" | "area" => attr(e, "href"),
        _ => None,
    };
    href(&el)
        .or_else(|| only_child_named(el, &["a", "area"]).and_then(|c| href(&c)))
        .or_else(|| {
            only_child(el)
                .and_then(|c| only_child_named(c, &["a", "area"]))
                .and_then(|c| href(&c))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/posts/1";

    #[test]
    fn test_no_markup_is_empty() {
        let doc = parse("<html><body><p>Nothing here</p></body></html>", BASE);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_entry_properties() {
        let html = r#"
            <article class="h-entry">
              <h1 class="p-name">A   Title</h1>
              <p class="p-summary">The summary</p>
              <div class="e-content"><p>Body <b>text</b></p></div>
              <a class="u-url" href="/posts/1">link</a>
              <time class="dt-published" datetime="2024-03-05T14:30:00Z">March 5</time>
              <img class="u-photo" src="/img/photo.jpg" alt="A photo">
            </article>"#;
        let doc = parse(html, BASE);
        assert_eq!(doc.items.len(), 1);

        let entry = &doc.items[0];
        assert!(entry.has_type("h-entry"));
        assert_eq!(entry.first_text("name").as_deref(), Some("A Title"));
        assert_eq!(entry.first_text("summary").as_deref(), Some("The summary"));
        assert_eq!(entry.first_text("url").as_deref(), Some("https://example.com/posts/1"));
        assert_eq!(
            entry.first_text("published").as_deref(),
            Some("2024-03-05T14:30:00Z")
        );
        assert_eq!(
            entry.first_text("photo").as_deref(),
            Some("https://example.com/img/photo.jpg")
        );
        match entry.first("content") {
            Some(PropertyValue::Html { html, value }) => {
                assert_eq!(html, "<p>Body <b>text</b></p>");
                assert_eq!(value, "Body text");
            }
            other => panic!("unexpected content value: {other:?}"),
        }
    }

    #[test]
    fn test_nested_author_card() {
        let html = r#"
            <div class="h-entry">
              <a class="p-author h-card" href="https://alice.test/">Alice</a>
              <p class="e-content">Hi</p>
            </div>"#;
        let doc = parse(html, BASE);
        let entry = &doc.items[0];
        let author = entry.first("author").and_then(PropertyValue::as_item).unwrap();

        assert!(author.has_type("h-card"));
        assert_eq!(author.first_text("name").as_deref(), Some("Alice"));
        assert_eq!(author.first_text("url").as_deref(), Some("https://alice.test/"));
        assert_eq!(author.value.as_deref(), Some("Alice"));
        assert!(!entry.has_property("name"));
    }

    #[test]
    fn test_children_of_feed() {
        let html = r#"
            <div class="h-feed">
              <div class="h-entry"><p class="p-name">One</p></div>
              <div class="h-entry"><p class="p-name">Two</p></div>
            </div>"#;
        let doc = parse(html, BASE);
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].children.len(), 2);
        assert_eq!(doc.items[0].children[1].first_text("name").as_deref(), Some("Two"));
    }

    #[test]
    fn test_implied_properties() {
        let html = r#"<a class="h-card" href="/about"><img src="/me.png" alt="Bob"></a>"#;
        let doc = parse(html, BASE);
        let card = &doc.items[0];

        assert_eq!(card.first_text("name").as_deref(), Some("Bob"));
        assert_eq!(card.first_text("photo").as_deref(), Some("https://example.com/me.png"));
        assert_eq!(card.first_text("url").as_deref(), Some("https://example.com/about"));
    }

    #[test]
    fn test_value_class_pattern() {
        let html = r#"
            <div class="h-entry">
              <span class="dt-published"><span class="value">2024-01-02</span> at noon</span>
            </div>"#;
        let doc = parse(html, BASE);
        assert_eq!(doc.items[0].first_text("published").as_deref(), Some("2024-01-02"));
    }

    #[test]
    fn test_rels_and_base() {
        let html = r#"
            <html><head>
              <base href="https://cdn.example.org/">
              <link rel="author me" href="/alice">
            </head><body></body></html>"#;
        let doc = parse(html, BASE);
        assert_eq!(doc.rel_urls("author"), ["https://cdn.example.org/alice"]);
        assert_eq!(doc.rel_urls("me"), ["https://cdn.example.org/alice"]);
        assert!(doc.rel_urls("webmention").is_empty());
    }
}
