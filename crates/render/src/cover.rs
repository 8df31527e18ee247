use crate::error::{ErrorKind, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use exn::ResultExt;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::fmt;
use std::sync::Arc;

const JPEG_PREFIX: &str = "data:image/jpeg;base64,";

/// An encoded cover thumbnail: a self-contained `data:` URI.
///
/// Cheap to clone; every clone shares the same encoded string.
#[derive(Clone, PartialEq, Eq)]
pub struct Cover(Arc<str>);

impl Cover {
    /// Encode `image` as a JPEG at `quality` (1-100).
    pub fn encode_jpeg(image: RgbaImage, quality: u8) -> Result<Self> {
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
            .encode_image(&rgb)
            .or_raise(|| ErrorKind::Encode)?;
        Ok(Self(format!("{JPEG_PREFIX}{}", STANDARD.encode(&jpeg)).into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the encoded representation, which is what storage quotas
    /// and the durable admission threshold measure.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode the image bytes behind the URI, e.g. to write them to disk.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        let (_, payload) = self.0.split_once(";base64,")?;
        STANDARD.decode(payload).ok()
    }
}

impl From<String> for Cover {
    fn from(encoded: String) -> Self {
        Self(encoded.into())
    }
}

impl fmt::Debug for Cover {
    // Covers run to megabytes; never dump them into logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cover").field("len", &self.len()).finish()
    }
}
