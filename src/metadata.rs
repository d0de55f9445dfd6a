use serde::{Serialize, Serializer};
use std::fmt;

/// Pixel size of a preview image. Width and height always travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageDimensions {
    #[serde(rename = "image:width")]
    pub width: u32,
    #[serde(rename = "image:height")]
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Normalized metadata shared by the microformats2 and OpenGraph sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub dimensions: Option<ImageDimensions>,
}

impl LinkMetadata {
    /// True when the metadata has something worth showing as text.
    pub fn has_text(&self) -> bool {
        self.title.is_some() || self.description.is_some()
    }

    pub fn image_width(&self) -> Option<u32> {
        self.dimensions.map(|d| d.width)
    }

    pub fn needs_dimensions(&self) -> bool {
        self.image.is_some() && self.dimensions.is_none()
    }
}

/// Post kind derived from an entry's microformats2 properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostType {
    Note,
    Article,
    Photo,
    Video,
    Audio,
    Reply,
    Like,
    Repost,
    Rsvp,
    Bookmark,
    Checkin,
    Event,
    Follow,
    Read,
    Watch,
    Listen,
    Quotation,
    Invite,
    Tag,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Note => "note",
            PostType::Article => "article",
            PostType::Photo => "photo",
            PostType::Video => "video",
            PostType::Audio => "audio",
            PostType::Reply => "reply",
            PostType::Like => "like",
            PostType::Repost => "repost",
            PostType::Rsvp => "rsvp",
            PostType::Bookmark => "bookmark",
            PostType::Checkin => "checkin",
            PostType::Event => "event",
            PostType::Follow => "follow",
            PostType::Read => "read",
            PostType::Watch => "watch",
            PostType::Listen => "listen",
            PostType::Quotation => "quotation",
            PostType::Invite => "invite",
            PostType::Tag => "tag",
        }
    }

    /// Source-qualified tag used as the `type` of a structured preview.
    pub fn tag(&self) -> String {
        format!("mf2:{}", self.as_str())
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn serialize_mf2_tag<S: Serializer>(post_type: &PostType, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&post_type.tag())
}

/// Preview built from a page's microformats2 markup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredPreview {
    #[serde(rename = "type", serialize_with = "serialize_mf2_tag")]
    pub post_type: PostType,
    #[serde(flatten)]
    pub metadata: LinkMetadata,
}

/// Ready-to-render embed returned by an oEmbed provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmbedPreview {
    #[serde(rename = "type")]
    pub kind: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_height: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_preview_serializes_flat() {
        let preview = StructuredPreview {
            post_type: PostType::Note,
            metadata: LinkMetadata {
                description: Some("short".into()),
                image: Some("https://a.test/p.png".into()),
                dimensions: Some(ImageDimensions::new(400, 300)),
                ..Default::default()
            },
        };

        assert_eq!(
            serde_json::to_value(&preview).unwrap(),
            json!({
                "type": "mf2:note",
                "description": "short",
                "image": "https://a.test/p.png",
                "image:width": 400,
                "image:height": 300,
            })
        );
    }

    #[test]
    fn test_missing_dimensions_are_omitted() {
        let metadata = LinkMetadata {
            title: Some("Title".into()),
            image: Some("https://a.test/p.png".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&metadata).unwrap();
        assert!(value.get("image:width").is_none());
        assert!(value.get("image:height").is_none());
        assert!(metadata.needs_dimensions());
    }
}
