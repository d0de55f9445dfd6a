//! Interpretation of parsed microformats2 items: entry lookup, post type
//! discovery and the flattened property bag used to build previews.

use crate::metadata::PostType;
use crate::mf2::{Document, Item, PropertyValue};
use crate::utils::resolve_url;

/// Item types treated as an "entry" when looking for the main post on a page.
pub const ENTRY_TYPES: &[&str] = &["h-entry", "h-event", "h-cite"];

/// Depth-first search for the first item carrying one of `types`.
pub fn find_first_entry<'a>(doc: &'a Document, types: &[&str]) -> Option<&'a Item> {
    fn search<'a>(items: &'a [Item], types: &[&str]) -> Option<&'a Item> {
        for item in items {
            if types.iter().any(|t| item.has_type(t)) {
                return Some(item);
            }
            if let Some(found) = search(&item.children, types) {
                return Some(found);
            }
        }
        None
    }
    search(&doc.items, types)
}

const RESPONSE_PROPERTIES: &[(&str, PostType)] = &[
    ("invitee", PostType::Invite),
    ("repost-of", PostType::Repost),
    ("like-of", PostType::Like),
    ("in-reply-to", PostType::Reply),
    ("bookmark-of", PostType::Bookmark),
    ("quotation-of", PostType::Quotation),
    ("tag-of", PostType::Tag),
    ("follow-of", PostType::Follow),
    ("checkin", PostType::Checkin),
    ("read-of", PostType::Read),
    ("watch-of", PostType::Watch),
    ("listen-of", PostType::Listen),
    ("video", PostType::Video),
    ("audio", PostType::Audio),
    ("photo", PostType::Photo),
];

const RSVP_VALUES: &[&str] = &["yes", "no", "maybe", "interested"];

/// Classify an entry following the IndieWeb post type discovery rules.
pub fn post_type_discovery(entry: &Item) -> PostType {
    if entry.has_type("h-event") {
        return PostType::Event;
    }

    if entry
        .first_text("rsvp")
        .is_some_and(|v| RSVP_VALUES.contains(&v.to_ascii_lowercase().as_str()))
    {
        return PostType::Rsvp;
    }

    for (property, post_type) in RESPONSE_PROPERTIES {
        if entry.has_property(property) {
            return *post_type;
        }
    }

    let Some(name) = entry.first_text("name") else {
        return PostType::Note;
    };
    let content = entry
        .first_text("content")
        .or_else(|| entry.first_text("summary"));

    match content {
        None => PostType::Article,
        Some(content) if is_name_a_title(&name, &content) => PostType::Article,
        Some(_) => PostType::Note,
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A name is a real title unless it is just the start of the content,
/// which is what parsers produce for untitled notes.
pub fn is_name_a_title(name: &str, content: &str) -> bool {
    let name = normalize(name);
    if name.is_empty() {
        return false;
    }
    !normalize(content).starts_with(&name)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Author {
    pub name: Option<String>,
    pub url: Option<String>,
}

impl Author {
    /// Best single-string label for the author.
    pub fn label(&self) -> Option<String> {
        self.name.clone().or_else(|| self.url.clone())
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        let author = match value {
            PropertyValue::Item(card) => Author {
                name: card.first_text("name"),
                url: card.first_text("url"),
            },
            PropertyValue::Url(url) => Author {
                url: Some(url.clone()),
                ..Default::default()
            },
            other => {
                let text = other.plain_text()?.trim().to_string();
                if text.starts_with("http://") || text.starts_with("https://") {
                    Author {
                        url: Some(text),
                        ..Default::default()
                    }
                } else {
                    Author {
                        name: Some(text).filter(|s| !s.is_empty()),
                        ..Default::default()
                    }
                }
            }
        };
        if author.name.is_none() && author.url.is_none() {
            None
        } else {
            Some(author)
        }
    }
}

/// Flattened view of an entry's properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryProperties {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub content_plain: Option<String>,
    pub author: Option<Author>,
    pub url: Option<String>,
    pub published: Option<String>,
    pub photo: Option<String>,
    pub featured: Option<String>,
}

/// Interpret the first entry on the page. `None` when the page has no entry.
pub fn interpret_entry(doc: &Document, source_url: &str) -> Option<EntryProperties> {
    let entry = find_first_entry(doc, ENTRY_TYPES)?;

    let content_plain = entry
        .first("content")
        .and_then(PropertyValue::plain_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let mut name = entry.first_text("name");
    if let (Some(n), Some(c)) = (&name, &content_plain) {
        if !is_name_a_title(n, c) {
            name = None;
        }
    }

    let resolved = |name: &str| entry.first_text(name).map(|u| resolve_url(source_url, &u));

    Some(EntryProperties {
        name,
        summary: entry.first_text("summary"),
        content_plain,
        author: find_author(doc, entry),
        url: resolved("url"),
        published: entry.first_text("published"),
        photo: resolved("photo"),
        featured: resolved("featured"),
    })
}

/// Authorship: the entry's own author, then its enclosing feed's author,
/// then the page's `rel=author` link.
fn find_author(doc: &Document, entry: &Item) -> Option<Author> {
    if let Some(author) = entry.first("author").and_then(Author::from_value) {
        return Some(author);
    }

    let feed_author = doc
        .items
        .iter()
        .filter(|item| item.has_type("h-feed"))
        .find(|feed| feed.children.iter().any(|child| std::ptr::eq(child, entry)))
        .and_then(|feed| feed.first("author"))
        .and_then(Author::from_value);
    if feed_author.is_some() {
        return feed_author;
    }

    doc.rel_urls("author").first().map(|url| Author {
        url: Some(url.clone()),
        ..Default::default()
    })
}
