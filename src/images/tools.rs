use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::images::ConversionError;

const JPEG_QUALITY: u8 = 85;

/// Raster formats the service accepts as a conversion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpg,
    Gif,
    Png,
    Bmp,
}

impl ImageFormat {
    /// Every supported target, in the order it is advertised to clients.
    pub const ALL: [ImageFormat; 4] = [
        ImageFormat::Jpg,
        ImageFormat::Gif,
        ImageFormat::Png,
        ImageFormat::Bmp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Png => "png",
            ImageFormat::Bmp => "bmp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Png => "image/png",
            ImageFormat::Bmp => "image/bmp",
        }
    }

    /// Resolve the format from a cache file name such as `0a1b.png`.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        file_name
            .rsplit_once('.')
            .and_then(|(_, ext)| ext.parse().ok())
    }

    fn codec_format(&self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpg => image::ImageFormat::Jpeg,
            ImageFormat::Gif => image::ImageFormat::Gif,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = ConversionError;

    // Exact match only: "JPG" or "jpeg" are rejected like any other unknown name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageFormat::ALL
            .iter()
            .copied()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| ConversionError::UnsupportedFormat(format!("{} is not supported", s)))
    }
}

/// Decode/encode capability used by the conversion service.
pub trait ImageCodec: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, ConversionError>;

    fn encode(&self, img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ConversionError>;
}

/// Codec backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateCodec;

impl ImageCodec for ImageCrateCodec {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, ConversionError> {
        image::load_from_memory(data)
            .map_err(|e| ConversionError::Decode(format!("Failed to load image: {}", e)))
    }

    fn encode(&self, img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ConversionError> {
        let mut output = Vec::new();

        match format {
            ImageFormat::Jpg => {
                // JPEG carries no alpha channel
                let rgb = img.to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY);
                encoder
                    .encode_image(&rgb)
                    .map_err(|e| ConversionError::Encode(format!("JPEG encoding failed: {}", e)))?;
            }
            ImageFormat::Gif | ImageFormat::Png | ImageFormat::Bmp => {
                img.write_to(&mut Cursor::new(&mut output), format.codec_format())
                    .map_err(|e| {
                        ConversionError::Encode(format!(
                            "{} encoding failed: {}",
                            format.as_str().to_uppercase(),
                            e
                        ))
                    })?;
            }
        }

        if output.is_empty() {
            return Err(ConversionError::Encode(format!("{} is not supported", format)));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn checkerboard(width: u32, height: u32) -> DynamicImage {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn parses_only_exact_format_names() {
        assert_eq!("png".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("bmp".parse::<ImageFormat>().unwrap(), ImageFormat::Bmp);

        for name in ["svg", "JPG", "jpeg", "", "webp"] {
            let err = name.parse::<ImageFormat>().unwrap_err();
            assert!(matches!(err, ConversionError::UnsupportedFormat(_)), "{}", name);
        }
    }

    #[test]
    fn advertises_formats_in_order() {
        let names: Vec<_> = ImageFormat::ALL.iter().map(|f| f.as_str()).collect();
        assert_eq!(names, vec!["jpg", "gif", "png", "bmp"]);
    }

    #[test]
    fn resolves_format_from_file_name() {
        assert_eq!(ImageFormat::from_file_name("abc.gif"), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::from_file_name("abc.tiff"), None);
        assert_eq!(ImageFormat::from_file_name("abc"), None);
    }

    #[test]
    fn every_format_encodes_to_its_own_signature() {
        let codec = ImageCrateCodec;
        let source = checkerboard(10, 10);

        for format in ImageFormat::ALL {
            let bytes = codec.encode(&source, format).unwrap();
            let guessed = image::guess_format(&bytes).unwrap();
            assert_eq!(guessed, format.codec_format());

            let decoded = codec.decode(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (10, 10));
        }
    }

    #[test]
    fn rejects_bytes_that_are_not_an_image() {
        let err = ImageCrateCodec.decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ConversionError::Decode(_)));
    }
}
