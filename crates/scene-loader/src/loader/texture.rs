use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use crate::texture::TextureAssetFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub size: (u32, u32),
    pub format: TextureAssetFormat,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum ImageDecodeError {
    UnsupportedMime(String),
    UnknownFormat,
    Decode(String),
}

impl Display for ImageDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ImageDecodeError::UnsupportedMime(mime) => write!(f, "Unsupported image MIME {}", mime),
            ImageDecodeError::UnknownFormat => write!(f, "Unknown image format"),
            ImageDecodeError::Decode(error) => write!(f, "Bad image: {}", error),
        }
    }
}

impl Error for ImageDecodeError {}

/// Turns encoded image bytes into pixels.
pub trait ImageDecoder: Send + Sync {
    /// Whether images of this MIME type can be decoded.
    fn supports(&self, mime: &str) -> bool;

    /// Decodes an image. Without a MIME type the format is guessed from the
    /// data.
    fn decode(&self, data: &[u8], mime: Option<&str>) -> Result<DecodedImage, ImageDecodeError>;
}

/// Decodes nothing. Every texture fails to load.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImageDecoder;

impl ImageDecoder for NoImageDecoder {
    fn supports(&self, _mime: &str) -> bool {
        false
    }

    fn decode(&self, _data: &[u8], mime: Option<&str>) -> Result<DecodedImage, ImageDecodeError> {
        Err(mime
            .map(|mime| ImageDecodeError::UnsupportedMime(mime.to_string()))
            .unwrap_or(ImageDecodeError::UnknownFormat))
    }
}

#[cfg(feature = "image-decoder")]
pub use self::image_crate::ImageCrateDecoder;

#[cfg(feature = "image-decoder")]
mod image_crate {
    use std::io::Cursor;

    use image::{guess_format, DynamicImage, GenericImageView, ImageFormat, ImageReader};

    use crate::texture::TextureAssetFormat;

    use super::{DecodedImage, ImageDecodeError, ImageDecoder};

    /// Decoder backed by the `image` crate.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ImageCrateDecoder;

    fn to_le_bytes(data: Vec<u16>) -> Vec<u8> {
        data.into_iter().flat_map(|item| item.to_le_bytes()).collect()
    }

    fn convert_image(image: DynamicImage) -> DecodedImage {
        let size = image.dimensions();
        let (data, format) = match image {
            DynamicImage::ImageLuma8(image) => (image.into_vec(), TextureAssetFormat::Ru8),
            DynamicImage::ImageLumaA8(image) => (image.into_vec(), TextureAssetFormat::Rgu8),
            DynamicImage::ImageRgb8(image) => (image.into_vec(), TextureAssetFormat::Rgbu8),
            DynamicImage::ImageRgba8(image) => (image.into_vec(), TextureAssetFormat::Rgbau8),
            DynamicImage::ImageLuma16(image) => {
                (to_le_bytes(image.into_vec()), TextureAssetFormat::Ru16)
            }
            DynamicImage::ImageLumaA16(image) => {
                (to_le_bytes(image.into_vec()), TextureAssetFormat::Rgu16)
            }
            DynamicImage::ImageRgb16(image) => {
                (to_le_bytes(image.into_vec()), TextureAssetFormat::Rgbu16)
            }
            DynamicImage::ImageRgba16(image) => {
                (to_le_bytes(image.into_vec()), TextureAssetFormat::Rgbau16)
            }
            DynamicImage::ImageRgb32F(image) => {
                let converted: DynamicImage = image.into();
                (
                    to_le_bytes(converted.into_rgb16().into_vec()),
                    TextureAssetFormat::Rgbu16,
                )
            }
            DynamicImage::ImageRgba32F(image) => {
                let converted: DynamicImage = image.into();
                (
                    to_le_bytes(converted.into_rgba16().into_vec()),
                    TextureAssetFormat::Rgbau16,
                )
            }
            other => (other.into_rgba8().into_vec(), TextureAssetFormat::Rgbau8),
        };
        DecodedImage { size, format, data }
    }

    impl ImageDecoder for ImageCrateDecoder {
        fn supports(&self, mime: &str) -> bool {
            ImageFormat::from_mime_type(mime)
                .map(|format| format.reading_enabled())
                .unwrap_or(false)
        }

        fn decode(
            &self,
            data: &[u8],
            mime: Option<&str>,
        ) -> Result<DecodedImage, ImageDecodeError> {
            let format = match mime {
                Some(mime) => ImageFormat::from_mime_type(mime)
                    .ok_or_else(|| ImageDecodeError::UnsupportedMime(mime.to_string()))?,
                None => guess_format(data).map_err(|_| ImageDecodeError::UnknownFormat)?,
            };
            let image = ImageReader::with_format(Cursor::new(data), format)
                .decode()
                .map_err(|error| ImageDecodeError::Decode(error.to_string()))?;
            Ok(convert_image(image))
        }
    }
}

#[cfg(all(test, feature = "image-decoder"))]
mod test {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbaImage};

    use crate::texture::TextureAssetFormat;

    use super::{ImageCrateDecoder, ImageDecoder};

    #[test]
    fn test_decode_png() {
        let image = RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        let mut encoded = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut encoded, ImageFormat::Png)
            .unwrap();
        let encoded = encoded.into_inner();

        let decoder = ImageCrateDecoder;
        assert!(decoder.supports("image/png"));
        let decoded = decoder.decode(&encoded, Some("image/png")).unwrap();
        assert_eq!(decoded.size, (2, 3));
        assert_eq!(decoded.format, TextureAssetFormat::Rgbau8);
        assert_eq!(&decoded.data[0..4], &[10, 20, 30, 255]);

        let guessed = decoder.decode(&encoded, None).unwrap();
        assert_eq!(guessed, decoded);
        assert!(decoder.decode(&[1, 2, 3], Some("image/png")).is_err());
    }
}
