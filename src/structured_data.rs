use crate::enrichment::ImageDimensionEnricher;
use crate::interpret::{find_first_entry, interpret_entry, post_type_discovery, EntryProperties, ENTRY_TYPES};
use crate::metadata::{LinkMetadata, PostType, StructuredPreview};
use crate::utils::{format_locale, parse_published, plain_to_capped_html};
use crate::{mf2, Fetcher, Preview, PreviewError, PreviewSource};
use async_trait::async_trait;
use tracing::{debug, instrument};

pub const DEFAULT_DESCRIPTION_LIMIT: usize = 500;

/// Builds previews from a page's microformats2 markup.
#[derive(Clone)]
pub struct StructuredDataAdapter {
    fetcher: Fetcher,
    enricher: ImageDimensionEnricher,
    description_limit: usize,
}

impl StructuredDataAdapter {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            enricher: ImageDimensionEnricher::new(fetcher.clone()),
            fetcher,
            description_limit: DEFAULT_DESCRIPTION_LIMIT,
        }
    }

    pub fn with_description_limit(mut self, limit: usize) -> Self {
        self.description_limit = limit;
        self
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_structured(&self, url: &str) -> Result<Option<StructuredPreview>, PreviewError> {
        let html = self.fetcher.fetch_html(url).await?;
        let Some(mut preview) = self.extract(&html, url) else {
            return Ok(None);
        };

        self.enricher.enrich(&mut preview.metadata).await;
        Ok(Some(preview))
    }

    /// Parse and normalize without touching the network.
    ///
    /// `None` when the page has no microformats, or when the entry yields
    /// neither a title nor a description.
    pub fn extract(&self, html: &str, url: &str) -> Option<StructuredPreview> {
        let doc = mf2::parse(html, url);
        if doc.is_empty() {
            debug!(url = %url, "No microformats2 markup found");
            return None;
        }

        let post_type = find_first_entry(&doc, ENTRY_TYPES)
            .map(post_type_discovery)
            .unwrap_or(PostType::Note);

        let properties = interpret_entry(&doc, url).unwrap_or_default();
        let metadata = self.to_metadata(properties);

        if !metadata.has_text() {
            debug!(url = %url, post_type = %post_type, "Entry has no title or description, discarding");
            return None;
        }

        Some(StructuredPreview { post_type, metadata })
    }

    fn to_metadata(&self, properties: EntryProperties) -> LinkMetadata {
        let description = properties
            .summary
            .or(properties.content_plain)
            .map(|text| plain_to_capped_html(&text, self.description_limit));

        let published_locale = properties
            .published
            .as_deref()
            .and_then(parse_published)
            .map(|dt| format_locale(&dt));

        LinkMetadata {
            title: properties.name,
            description,
            url: properties.url,
            author: properties.author.and_then(|a| a.label()),
            published: properties.published,
            published_locale,
            site_name: None,
            image: properties.featured.or(properties.photo),
            dimensions: None,
        }
    }
}

#[async_trait]
impl PreviewSource for StructuredDataAdapter {
    fn name(&self) -> &'static str {
        "mf2"
    }

    async fn fetch(&self, url: &str) -> Result<Option<Preview>, PreviewError> {
        Ok(self
            .fetch_structured(url)
            .await?
            .map(Preview::StructuredData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const URL: &str = "https://blog.test/2024/trip";

    fn adapter() -> StructuredDataAdapter {
        StructuredDataAdapter::new(Fetcher::new())
    }

    #[test]
    fn test_article_mapping() {
        let html = r#"
            <article class="h-entry">
              <h1 class="p-name">Trip Report</h1>
              <p class="p-summary">We went &lt;hiking&gt; &amp; camping.</p>
              <div class="e-content">A long day on the trail.</div>
              <a class="p-author h-card" href="https://alice.test/">Alice</a>
              <a class="u-url" href="/2024/trip">permalink</a>
              <time class="dt-published" datetime="2024-03-05T14:30:00-08:00">March 5</time>
              <img class="u-photo" src="/small.jpg">
              <img class="u-featured" src="/hero.jpg">
            </article>"#;

        let preview = adapter().extract(html, URL).unwrap();
        assert_eq!(preview.post_type, PostType::Photo);
        assert_eq!(
            preview.metadata,
            LinkMetadata {
                title: Some("Trip Report".into()),
                description: Some("We went &lt;hiking&gt; &amp; camping.".into()),
                url: Some("https://blog.test/2024/trip".into()),
                author: Some("Alice".into()),
                published: Some("2024-03-05T14:30:00-08:00".into()),
                published_locale: Some("05 Mar, 2024 02:30 PM".into()),
                site_name: None,
                image: Some("https://blog.test/hero.jpg".into()),
                dimensions: None,
            }
        );
    }

    #[test]
    fn test_content_used_without_summary() {
        let html = r#"<div class="h-entry"><div class="e-content"><p>Hello <em>there</em></p></div></div>"#;
        let preview = adapter().extract(html, URL).unwrap();
        assert_eq!(preview.post_type, PostType::Note);
        assert_eq!(preview.metadata.description.as_deref(), Some("Hello there"));
        assert!(preview.metadata.title.is_none());
    }

    #[test]
    fn test_long_summary_is_elided() {
        let summary = "a".repeat(600);
        let html = format!(r#"<div class="h-entry"><p class="p-summary">{summary}</p></div>"#);
        let preview = adapter().extract(&html, URL).unwrap();

        let description = preview.metadata.description.unwrap();
        assert_eq!(description.chars().count(), 500);
        assert!(description.ends_with("..."));
        assert_eq!(&description[..497], &summary[..497]);
    }

    #[test]
    fn test_escaped_summary_stays_within_limit() {
        let summary = "a &amp; b ".repeat(100);
        let html = format!(r#"<div class="h-entry"><p class="p-summary">{summary}</p></div>"#);
        let preview = adapter().extract(&html, URL).unwrap();

        let description = preview.metadata.description.unwrap();
        assert!(description.chars().count() <= 500);
        assert!(description.ends_with("..."));
        assert!(description.starts_with("a &amp; b a &amp; b"));
        assert!(!description.trim_end_matches("...").ends_with('&'));
        assert!(!description.contains("&am..."));
    }

    #[test]
    fn test_type_only_entry_is_discarded() {
        let html = r#"<div class="h-entry"><a class="u-like-of" href="https://other.test/post"></a></div>"#;
        assert!(adapter().extract(html, URL).is_none());
    }

    #[test]
    fn test_page_without_entry() {
        assert!(adapter().extract("<p>plain page</p>", URL).is_none());

        let card_only = r#"<div class="h-card"><span class="p-name">Alice</span></div>"#;
        assert!(adapter().extract(card_only, URL).is_none());
    }
}
