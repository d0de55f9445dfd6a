use crate::metadata::{ImageDimensions, LinkMetadata};
use crate::{Fetcher, PreviewError};
use image::ImageReader;
use std::io::Cursor;
use tracing::{debug, instrument, warn};

/// Fills in `image:width`/`image:height` by downloading the image.
#[derive(Clone)]
pub struct ImageDimensionEnricher {
    fetcher: Fetcher,
}

impl ImageDimensionEnricher {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Download `image_url` and read its pixel size. Errors propagate.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn measure(&self, image_url: &str) -> Result<ImageDimensions, PreviewError> {
        let bytes = self.fetcher.fetch_bytes(image_url).await?;
        decode_dimensions(&bytes)
    }

    /// Set dimensions on `metadata` if it has an image without them.
    ///
    /// A failed download or decode leaves the dimensions unset; the rest of
    /// the metadata is kept.
    pub async fn enrich(&self, metadata: &mut LinkMetadata) {
        if !metadata.needs_dimensions() {
            return;
        }
        let Some(image_url) = metadata.image.clone() else {
            return;
        };

        match self.measure(&image_url).await {
            Ok(dimensions) => {
                debug!(
                    image = %image_url,
                    width = dimensions.width,
                    height = dimensions.height,
                    "Measured image"
                );
                metadata.dimensions = Some(dimensions);
            }
            Err(e) => {
                warn!(image = %image_url, error = %e, "Could not measure image, omitting dimensions");
            }
        }
    }
}

/// Read width and height from encoded image bytes without decoding pixels.
pub fn decode_dimensions(bytes: &[u8]) -> Result<ImageDimensions, PreviewError> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PreviewError::ImageDecodeError(format!("Failed to detect image format: {e}")))?
        .into_dimensions()
        .map_err(|e| PreviewError::ImageDecodeError(format!("Failed to read dimensions: {e}")))?;

    Ok(ImageDimensions::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut buf), format)
            .unwrap();
        buf
    }

    #[test]
    fn test_decode_dimensions() {
        let png = encode(400, 300, ImageFormat::Png);
        assert_eq!(decode_dimensions(&png).unwrap(), ImageDimensions::new(400, 300));

        let jpeg = encode(12, 7, ImageFormat::Jpeg);
        assert_eq!(decode_dimensions(&jpeg).unwrap(), ImageDimensions::new(12, 7));
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode_dimensions(b"definitely not an image").unwrap_err();
        assert!(matches!(err, PreviewError::ImageDecodeError(_)));
    }

    #[tokio::test]
    async fn test_enrich_skips_without_image() {
        let enricher = ImageDimensionEnricher::new(Fetcher::new());
        let mut metadata = LinkMetadata {
            title: Some("No image".into()),
            ..Default::default()
        };
        enricher.enrich(&mut metadata).await;
        assert!(metadata.dimensions.is_none());

        let mut measured = LinkMetadata {
            image: Some("http://127.0.0.1:9/never-fetched.png".into()),
            dimensions: Some(ImageDimensions::new(10, 20)),
            ..Default::default()
        };
        enricher.enrich(&mut measured).await;
        assert_eq!(measured.dimensions, Some(ImageDimensions::new(10, 20)));
    }
}
