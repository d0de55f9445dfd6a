use crate::oembed::{EmbedAdapter, ProviderRegistry};
use crate::opengraph::{OpenGraphAdapter, OpenGraphExtractor};
use crate::structured_data::{StructuredDataAdapter, DEFAULT_DESCRIPTION_LIMIT};
use crate::{Fetcher, Preview, PreviewError, PreviewGenerator, PreviewSource};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// Images wider than this are considered good enough to settle on a source.
pub const DEFAULT_IMAGE_WIDTH_THRESHOLD: u32 = 300;

pub struct ResolverConfig {
    pub image_width_threshold: u32,
    pub description_limit: usize,
    /// Let the OpenGraph source fall back to `<title>`/`meta[name=description]`.
    pub scrape_fallback: bool,
    pub fetcher: Option<Fetcher>,
    pub providers: Option<ProviderRegistry>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            image_width_threshold: DEFAULT_IMAGE_WIDTH_THRESHOLD,
            description_limit: DEFAULT_DESCRIPTION_LIMIT,
            scrape_fallback: false,
            fetcher: None,
            providers: None,
        }
    }
}

/// Resolves a URL to a single preview by consulting oEmbed providers,
/// microformats2 markup and OpenGraph tags, in that order.
#[derive(Clone)]
pub struct PreviewResolver {
    embed: Arc<dyn PreviewSource>,
    structured: Arc<dyn PreviewSource>,
    open_graph: Arc<dyn PreviewSource>,
    image_width_threshold: u32,
}

impl Default for PreviewResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewResolver {
    pub fn new() -> Self {
        Self::new_with_config(ResolverConfig::default())
    }

    pub fn new_with_config(config: ResolverConfig) -> Self {
        let fetcher = config.fetcher.unwrap_or_default();
        let providers = config
            .providers
            .unwrap_or_else(|| ProviderRegistry::with_defaults(&fetcher));

        let extractor = OpenGraphExtractor::new()
            .with_scrape_fallback(config.scrape_fallback)
            .with_description_limit(config.description_limit);

        debug!(
            providers = providers.len(),
            threshold = config.image_width_threshold,
            "PreviewResolver initialized"
        );

        Self {
            embed: Arc::new(EmbedAdapter::new(providers)),
            structured: Arc::new(
                StructuredDataAdapter::new(fetcher.clone())
                    .with_description_limit(config.description_limit),
            ),
            open_graph: Arc::new(OpenGraphAdapter::with_extractor(fetcher, extractor)),
            image_width_threshold: config.image_width_threshold,
        }
    }

    /// Build a resolver over arbitrary sources.
    pub fn with_sources(
        embed: Arc<dyn PreviewSource>,
        structured: Arc<dyn PreviewSource>,
        open_graph: Arc<dyn PreviewSource>,
    ) -> Self {
        Self {
            embed,
            structured,
            open_graph,
            image_width_threshold: DEFAULT_IMAGE_WIDTH_THRESHOLD,
        }
    }

    pub fn with_image_width_threshold(mut self, threshold: u32) -> Self {
        self.image_width_threshold = threshold;
        self
    }

    fn has_large_image(&self, preview: &Option<Preview>) -> bool {
        preview
            .as_ref()
            .and_then(Preview::image_width)
            .is_some_and(|width| width > self.image_width_threshold)
    }

    /// Resolve `url` to at most one preview. Results from different sources
    /// are never merged.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn preview(&self, url: &str) -> Result<Option<Preview>, PreviewError> {
        let _ = Url::parse(url)?;

        if let Some(embed) = self.embed.fetch(url).await? {
            debug!(url = %url, source = self.embed.name(), "Using embed");
            return Ok(Some(embed));
        }

        let structured = self.structured.fetch(url).await?;
        if self.has_large_image(&structured) {
            debug!(url = %url, source = self.structured.name(), "Structured data has a large image");
            return Ok(structured);
        }

        let open_graph = self.open_graph.fetch(url).await?;
        if structured.is_none() {
            debug!(url = %url, found = open_graph.is_some(), "No structured data, using OpenGraph result");
            return Ok(open_graph);
        }

        if self.has_large_image(&open_graph) {
            debug!(url = %url, source = self.open_graph.name(), "OpenGraph has the larger image");
            return Ok(open_graph);
        }

        debug!(url = %url, source = self.structured.name(), "Falling back to structured data");
        Ok(structured)
    }
}

#[async_trait]
impl PreviewGenerator for PreviewResolver {
    async fn generate_preview(&self, url: &str) -> Result<Option<Preview>, PreviewError> {
        self.preview(url).await
    }
}
