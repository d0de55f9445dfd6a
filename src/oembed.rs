use crate::metadata::EmbedPreview;
use crate::{Fetcher, Preview, PreviewError, PreviewSource};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

pub const NOEMBED_ENDPOINT: &str = "https://noembed.com/embed";
pub const NOEMBED_PROVIDERS: &str = "https://noembed.com/providers";

/// Raw oEmbed document as returned by a provider endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OEmbedResponse {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_url: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub provider_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    pub height: Option<u32>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    pub thumbnail_width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    pub thumbnail_height: Option<u32>,
    /// noembed answers unsupported URLs with `{"error": "..."}`.
    #[serde(default)]
    pub error: Option<String>,
}

// Providers send dimensions as numbers, numeric strings or null.
fn lenient_dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl OEmbedResponse {
    /// Turn the response into an embed, rejecting anything without markup.
    pub fn into_embed(self) -> Option<EmbedPreview> {
        let html = self.html.filter(|h| !h.trim().is_empty())?;
        Some(EmbedPreview {
            kind: self.kind.unwrap_or_else(|| "rich".to_string()),
            html,
            url: self.url,
            title: self.title,
            author_name: self.author_name,
            author_url: self.author_url,
            provider_name: self.provider_name,
            provider_url: self.provider_url,
            width: self.width,
            height: self.height,
            thumbnail_url: self.thumbnail_url,
            thumbnail_width: self.thumbnail_width,
            thumbnail_height: self.thumbnail_height,
        })
    }
}

/// A backend that can turn some URLs into oEmbed documents.
#[async_trait]
pub trait EmbedProvider: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, url: &str) -> bool;

    /// `Ok(None)` means the provider had no embed for this URL.
    async fn extract(&self, url: &str) -> Result<Option<OEmbedResponse>, PreviewError>;
}

/// Convert an oEmbed URL scheme (`https://*.youtube.com/watch*`) into an
/// anchored regex. Either http or https is accepted; a wildcard in the host
/// never crosses into the path.
pub fn scheme_to_regex(scheme: &str) -> Result<Regex, regex::Error> {
    let rest = scheme
        .strip_prefix("https://")
        .or_else(|| scheme.strip_prefix("http://"))
        .unwrap_or(scheme);
    let (host, path) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
    let glob = |part: &str, star: &str| {
        part.split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(star)
    };
    Regex::new(&format!(
        "^https?://{}{}$",
        glob(host, "[^/]*"),
        glob(path, ".*")
    ))
}

/// Generic JSON oEmbed endpoint.
#[derive(Clone)]
pub struct OEmbedProvider {
    name: String,
    endpoint: String,
    patterns: Vec<Regex>,
    fetcher: Fetcher,
}

impl OEmbedProvider {
    /// Build from oEmbed URL schemes. Schemes that fail to compile are skipped.
    pub fn new(name: &str, endpoint: &str, schemes: &[&str], fetcher: Fetcher) -> Self {
        let patterns = schemes
            .iter()
            .filter_map(|scheme| match scheme_to_regex(scheme) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(provider = %name, scheme = %scheme, error = %e, "Skipping invalid scheme");
                    None
                }
            })
            .collect();
        Self::with_patterns(name, endpoint, patterns, fetcher)
    }

    pub fn with_patterns(name: &str, endpoint: &str, patterns: Vec<Regex>, fetcher: Fetcher) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            patterns,
            fetcher,
        }
    }

    fn request_url(&self, url: &str) -> Result<String, PreviewError> {
        let mut request = Url::parse(&self.endpoint)?;
        request
            .query_pairs_mut()
            .append_pair("url", url)
            .append_pair("format", "json");
        Ok(request.into())
    }
}

#[async_trait]
impl EmbedProvider for OEmbedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(url))
    }

    #[instrument(level = "debug", skip(self), fields(provider = %self.name))]
    async fn extract(&self, url: &str) -> Result<Option<OEmbedResponse>, PreviewError> {
        let request = self.request_url(url)?;
        let response: OEmbedResponse = self.fetcher.fetch_json(&request, &self.name).await?;

        if let Some(error) = &response.error {
            debug!(provider = %self.name, error = %error, "Provider reported no embed");
            return Ok(None);
        }
        Ok(Some(response))
    }
}

#[derive(Debug, Deserialize)]
struct NoembedProviderEntry {
    name: String,
    #[serde(default)]
    patterns: Vec<String>,
}

/// Ordered set of embed providers. Built once by the caller and shared.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn EmbedProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: EmbedProvider + 'static>(&mut self, provider: P) {
        self.providers.push(Arc::new(provider));
    }

    pub fn with_provider<P: EmbedProvider + 'static>(mut self, provider: P) -> Self {
        self.register(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Providers whose schemes match `url`, in registration order.
    pub fn matching<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a Arc<dyn EmbedProvider>> {
        self.providers.iter().filter(move |p| p.matches(url))
    }

    /// Well-known providers that publish their own oEmbed endpoints.
    pub fn with_defaults(fetcher: &Fetcher) -> Self {
        let known: &[(&str, &str, &[&str])] = &[
            (
                "YouTube",
                "https://www.youtube.com/oembed",
                &[
                    "https://*.youtube.com/watch*",
                    "https://youtube.com/watch*",
                    "https://*.youtube.com/shorts/*",
                    "https://youtu.be/*",
                ],
            ),
            (
                "Vimeo",
                "https://vimeo.com/api/oembed.json",
                &["https://vimeo.com/*", "https://player.vimeo.com/video/*"],
            ),
            (
                "Twitter",
                "https://publish.twitter.com/oembed",
                &[
                    "https://twitter.com/*/status/*",
                    "https://mobile.twitter.com/*/status/*",
                    "https://x.com/*/status/*",
                ],
            ),
            (
                "Flickr",
                "https://www.flickr.com/services/oembed/",
                &["https://*.flickr.com/photos/*", "https://flic.kr/p/*"],
            ),
            (
                "SoundCloud",
                "https://soundcloud.com/oembed",
                &["https://soundcloud.com/*"],
            ),
            (
                "Spotify",
                "https://open.spotify.com/oembed",
                &["https://open.spotify.com/*"],
            ),
        ];

        let mut registry = Self::new();
        for (name, endpoint, schemes) in known {
            registry.register(OEmbedProvider::new(name, endpoint, schemes, fetcher.clone()));
        }
        debug!(providers = registry.len(), "Default provider registry built");
        registry
    }

    /// Load noembed.com's provider list and route matching URLs through noembed.
    pub async fn bootstrap_noembed(fetcher: &Fetcher) -> Result<Self, PreviewError> {
        Self::bootstrap_noembed_from(fetcher, NOEMBED_PROVIDERS, NOEMBED_ENDPOINT).await
    }

    #[instrument(level = "debug", skip(fetcher), err)]
    pub async fn bootstrap_noembed_from(
        fetcher: &Fetcher,
        providers_url: &str,
        endpoint: &str,
    ) -> Result<Self, PreviewError> {
        let entries: Vec<NoembedProviderEntry> =
            fetcher.fetch_json(providers_url, "noembed").await?;

        let mut registry = Self::new();
        for entry in entries {
            let patterns: Vec<Regex> = entry
                .patterns
                .iter()
                .filter_map(|p| match Regex::new(p) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(provider = %entry.name, pattern = %p, error = %e, "Skipping invalid pattern");
                        None
                    }
                })
                .collect();
            if patterns.is_empty() {
                continue;
            }
            registry.register(OEmbedProvider::with_patterns(
                &entry.name,
                endpoint,
                patterns,
                fetcher.clone(),
            ));
        }

        debug!(providers = registry.len(), "noembed provider registry loaded");
        Ok(registry)
    }
}

/// First source in the resolution order: a ready-made embed from a provider.
#[derive(Clone)]
pub struct EmbedAdapter {
    registry: Arc<ProviderRegistry>,
}

impl EmbedAdapter {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// The first provider that answers decides; an answer without `html` is no embed.
    pub async fn fetch_embed(&self, url: &str) -> Option<EmbedPreview> {
        for provider in self.registry.matching(url) {
            match provider.extract(url).await {
                Ok(Some(response)) => {
                    let embed = response.into_embed();
                    if embed.is_none() {
                        debug!(provider = %provider.name(), url = %url, "Embed has no html, rejecting");
                    }
                    return embed;
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!(provider = %provider.name(), url = %url, error = %e, "Embed provider failed");
                    continue;
                }
            }
        }
        None
    }
}

#[async_trait]
impl PreviewSource for EmbedAdapter {
    fn name(&self) -> &'static str {
        "oembed"
    }

    async fn fetch(&self, url: &str) -> Result<Option<Preview>, PreviewError> {
        Ok(self.fetch_embed(url).await.map(Preview::Embed))
    }
}
