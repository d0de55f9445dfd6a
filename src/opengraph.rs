use crate::enrichment::ImageDimensionEnricher;
use crate::metadata::{ImageDimensions, LinkMetadata};
use crate::structured_data::DEFAULT_DESCRIPTION_LIMIT;
use crate::utils::{format_locale, parse_published, plain_to_capped_html, resolve_url};
use crate::{Fetcher, Preview, PreviewError, PreviewSource};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

/// OpenGraph tag extractor, responsible for reading `og:*` meta tags from page content
#[derive(Clone, Default)]
pub struct OpenGraphExtractor {
    scrape_fallback: bool,
    description_limit: Option<usize>,
}

impl OpenGraphExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fall back to `<title>` and `meta[name=description]` when the OpenGraph tags are missing.
    pub fn with_scrape_fallback(mut self, enabled: bool) -> Self {
        self.scrape_fallback = enabled;
        self
    }

    pub fn with_description_limit(mut self, limit: usize) -> Self {
        self.description_limit = Some(limit);
        self
    }

    /// `None` unless the page carries a title or a description.
    pub fn extract(&self, html: &str, url: &str) -> Option<LinkMetadata> {
        let document = Html::parse_document(html);

        let mut title = meta_property(&document, "og:title");
        let mut description = meta_property(&document, "og:description");
        if self.scrape_fallback {
            title = title.or_else(|| title_tag(&document));
            description = description.or_else(|| meta_name(&document, "description"));
        }

        if title.is_none() && description.is_none() {
            debug!(url = %url, "No usable OpenGraph text");
            return None;
        }

        let limit = self.description_limit.unwrap_or(DEFAULT_DESCRIPTION_LIMIT);
        let description = description.map(|d| plain_to_capped_html(&d, limit));

        let image = meta_property(&document, "og:image")
            .or_else(|| meta_property(&document, "og:image:url"))
            .or_else(|| meta_property(&document, "og:image:secure_url"))
            .map(|src| resolve_url(url, &src));

        let dimensions = image.as_ref().and_then(|_| {
            let width = meta_property(&document, "og:image:width")?.parse().ok()?;
            let height = meta_property(&document, "og:image:height")?.parse().ok()?;
            Some(ImageDimensions::new(width, height))
        });

        let published = meta_property(&document, "article:published_time");
        let published_locale = published
            .as_deref()
            .and_then(parse_published)
            .map(|dt| format_locale(&dt));

        Some(LinkMetadata {
            title,
            description,
            url: meta_property(&document, "og:url").map(|u| resolve_url(url, &u)),
            author: meta_property(&document, "article:author"),
            published,
            published_locale,
            site_name: meta_property(&document, "og:site_name"),
            image,
            dimensions,
        })
    }
}

/// `og:*` tags, published under either `property=` or `name=`.
fn meta_property(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(
        r#"meta[property="{property}"], meta[name="{property}"]"#
    ))
    .ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn meta_name(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[name="{name}"]"#)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn title_tag(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Last source in the resolution order: OpenGraph meta tags.
#[derive(Clone)]
pub struct OpenGraphAdapter {
    fetcher: Fetcher,
    enricher: ImageDimensionEnricher,
    extractor: OpenGraphExtractor,
}

impl OpenGraphAdapter {
    pub fn new(fetcher: Fetcher) -> Self {
        Self::with_extractor(fetcher, OpenGraphExtractor::new())
    }

    pub fn with_extractor(fetcher: Fetcher, extractor: OpenGraphExtractor) -> Self {
        Self {
            enricher: ImageDimensionEnricher::new(fetcher.clone()),
            fetcher,
            extractor,
        }
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_open_graph(&self, url: &str) -> Result<Option<LinkMetadata>, PreviewError> {
        let html = self.fetcher.fetch_html(url).await?;
        let Some(mut metadata) = self.extractor.extract(&html, url) else {
            return Ok(None);
        };

        self.enricher.enrich(&mut metadata).await;
        Ok(Some(metadata))
    }
}

#[async_trait]
impl PreviewSource for OpenGraphAdapter {
    fn name(&self) -> &'static str {
        "opengraph"
    }

    async fn fetch(&self, url: &str) -> Result<Option<Preview>, PreviewError> {
        Ok(self.fetch_open_graph(url).await?.map(Preview::OpenGraph))
    }
}
