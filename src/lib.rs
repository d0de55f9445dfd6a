use async_trait::async_trait;
use serde::Serialize;

mod enrichment;
mod error;
mod fetcher;
pub mod interpret;
#[cfg(feature = "logging")]
mod logging;
mod metadata;
pub mod mf2;
mod oembed;
mod opengraph;
mod preview_resolver;
mod structured_data;
mod utils;

pub use enrichment::{decode_dimensions, ImageDimensionEnricher};
pub use error::PreviewError;
pub use fetcher::{Fetcher, FetcherConfig};
#[cfg(feature = "logging")]
pub use logging::{log_error_card, log_preview_card, setup_logging, LogConfig};
pub use metadata::{EmbedPreview, ImageDimensions, LinkMetadata, PostType, StructuredPreview};
pub use oembed::{
    scheme_to_regex, EmbedAdapter, EmbedProvider, OEmbedProvider, OEmbedResponse,
    ProviderRegistry, NOEMBED_ENDPOINT, NOEMBED_PROVIDERS,
};
pub use opengraph::{OpenGraphAdapter, OpenGraphExtractor};
pub use preview_resolver::{PreviewResolver, ResolverConfig, DEFAULT_IMAGE_WIDTH_THRESHOLD};
pub use structured_data::{StructuredDataAdapter, DEFAULT_DESCRIPTION_LIMIT};
pub use utils::{elide, elide_html, format_locale, parse_published, plain_to_capped_html, plain_to_html};

/// A link preview, tagged with the source it came from.
///
/// Serializes to a flat map: embeds carry oEmbed keys including `html`,
/// metadata previews carry `title`, `description`, `image`, `image:width`
/// and friends. Structured previews add `type` as `mf2:<post type>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Preview {
    Embed(EmbedPreview),
    StructuredData(StructuredPreview),
    OpenGraph(LinkMetadata),
}

impl Preview {
    /// Normalized metadata, absent for embeds.
    pub fn metadata(&self) -> Option<&LinkMetadata> {
        match self {
            Preview::Embed(_) => None,
            Preview::StructuredData(structured) => Some(&structured.metadata),
            Preview::OpenGraph(metadata) => Some(metadata),
        }
    }

    pub fn image_width(&self) -> Option<u32> {
        self.metadata().and_then(LinkMetadata::image_width)
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Preview::Embed(embed) => embed.title.as_deref(),
            _ => self.metadata().and_then(|m| m.title.as_deref()),
        }
    }

    /// Value of the `type` key, when the preview has one.
    pub fn type_tag(&self) -> Option<String> {
        match self {
            Preview::Embed(embed) => Some(embed.kind.clone()),
            Preview::StructuredData(structured) => Some(structured.post_type.tag()),
            Preview::OpenGraph(_) => None,
        }
    }
}

/// One place a preview can come from. `Ok(None)` means the source had
/// nothing usable for this URL.
#[async_trait]
pub trait PreviewSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, url: &str) -> Result<Option<Preview>, PreviewError>;
}

#[async_trait]
pub trait PreviewGenerator {
    async fn generate_preview(&self, url: &str) -> Result<Option<Preview>, PreviewError>;
}
