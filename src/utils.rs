use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use unicode_width::UnicodeWidthChar;

use url::Url;

const ELLIPSIS: &str = "...";

/// Safely truncate a string, ensuring it is not truncated in the middle of multi-byte characters
///
/// The output's display width never exceeds `max_width`; used for the fixed-width log cards.
#[cfg_attr(not(feature = "logging"), allow(dead_code))]
pub fn truncate_str(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(1);

        if current_width + char_width + 3 > max_width {
            break;
        }

        result.push(c);
        current_width += char_width;
    }

    result.push_str(ELLIPSIS);
    result
}

/// Cap `s` at `limit` characters. When it is cut, the last three characters
/// of the output are `...` and everything before them is the original text.
pub fn elide(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }
    if limit <= ELLIPSIS.len() {
        return ELLIPSIS[..limit].to_string();
    }

    let mut result: String = s.chars().take(limit - ELLIPSIS.len()).collect();
    result.push_str(ELLIPSIS);
    result
}

/// Like [`elide`], for text that is already HTML. The cut backs up so it
/// never splits an entity such as `&amp;` or a tag such as `<br>`.
pub fn elide_html(html: &str, limit: usize) -> String {
    if html.chars().count() <= limit {
        return html.to_string();
    }
    if limit <= ELLIPSIS.len() {
        return ELLIPSIS[..limit].to_string();
    }

    let mut result: String = html.chars().take(limit - ELLIPSIS.len()).collect();
    if let Some(pos) = result.rfind(|c| c == '&' || c == '<') {
        let close = if result[pos..].starts_with('&') { ';' } else { '>' };
        if !result[pos..].contains(close) {
            result.truncate(pos);
        }
    }
    result.push_str(ELLIPSIS);
    result
}

/// Escape plain text for inclusion in HTML, keeping line breaks.
pub fn plain_to_html(text: &str) -> String {
    html_escape::encode_text(text.trim())
        .lines()
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Escape `text` and cap the escaped result at `limit` characters.
pub fn plain_to_capped_html(text: &str, limit: usize) -> String {
    elide_html(&plain_to_html(text), limit)
}

/// Resolve a possibly relative reference against the page it came from.
pub fn resolve_url(base: &str, reference: &str) -> String {
    let reference = reference.trim();
    match Url::parse(base).and_then(|b| b.join(reference)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => reference.to_string(),
    }
}

/// Parse the timestamp shapes microformats2 publishers emit.
///
/// Offsets are kept when present; naive values are read as UTC.
pub fn parse_published(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    let utc = FixedOffset::east_opt(0)?;
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_local_timezone(utc).single()?);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|naive| naive.and_local_timezone(utc).single())
}

/// Human display form of a timestamp, e.g. `05 Mar, 2024 02:30 PM`.
pub fn format_locale(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%d %b, %Y %I:%M %p").to_string()
}
