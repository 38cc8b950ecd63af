//! Exhibit preparation: decoded image bytes → an embeddable JPEG XObject.
//!
//! JPEG input is embedded byte-for-byte as a `DCTDecode` stream, so the image
//! inside the dossier is exactly the file archived as `evidence_<n>.jpg`. The
//! bytes are still fully decoded once to prove they are a usable picture and
//! to learn the dimensions; a truncated or corrupt JPEG fails here instead of
//! producing a broken page.
//!
//! Anything else the `image` crate can read (PNG, WebP) is flattened to RGB
//! and re-encoded as JPEG. CMYK JPEGs take the same path, because readers
//! disagree on inverted Adobe CMYK.

use crate::error::ItemError;
use image::codecs::jpeg::JpegDecoder;
use image::error::{LimitError, LimitErrorKind};
use image::{
    ColorType, DynamicImage, ExtendedColorType, ImageDecoder, ImageError, ImageFormat, Limits,
};
use std::io::Cursor;
use tracing::debug;

/// Colour space of an embedded JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    Gray,
    Rgb,
}

impl JpegColorSpace {
    pub fn pdf_name(self) -> &'static str {
        match self {
            JpegColorSpace::Gray => "DeviceGray",
            JpegColorSpace::Rgb => "DeviceRGB",
        }
    }
}

/// An image ready to be written as an image XObject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExhibitImage {
    pub width: u32,
    pub height: u32,
    pub color_space: JpegColorSpace,
    /// Complete JPEG file.
    pub jpeg: Vec<u8>,
    /// Whether `jpeg` is the submitted file unchanged.
    pub passthrough: bool,
}

/// Turn decoded evidence bytes into an [`ExhibitImage`].
///
/// `position` is only used to label the error.
pub fn prepare_exhibit(position: usize, bytes: &[u8]) -> Result<ExhibitImage, ItemError> {
    let fail = |detail: String| ItemError::ExhibitRender { position, detail };

    let format = image::guess_format(bytes).map_err(|e| fail(e.to_string()))?;

    if format == ImageFormat::Jpeg {
        if let Some(image) = passthrough_jpeg(bytes).map_err(|e| fail(e.to_string()))? {
            debug!(
                "Exhibit #{}: embedding JPEG as-is ({}x{})",
                position, image.width, image.height
            );
            return Ok(image);
        }
    }

    let decoded = image::load_from_memory(bytes).map_err(|e| fail(e.to_string()))?;
    let image = transcode(&decoded).map_err(|e| fail(e.to_string()))?;
    debug!(
        "Exhibit #{}: transcoded {:?} → JPEG ({}x{})",
        position, format, image.width, image.height
    );
    Ok(image)
}

/// Validate a JPEG and describe it for pass-through embedding. Returns
/// `Ok(None)` when the colour model needs transcoding.
///
/// The header's claimed size is checked against the default decoder memory
/// limit before the pixel buffer is allocated.
fn passthrough_jpeg(bytes: &[u8]) -> Result<Option<ExhibitImage>, ImageError> {
    let mut decoder = JpegDecoder::new(Cursor::new(bytes))?;
    let limits = Limits::default();
    let pixel_bytes = decoder.total_bytes();
    if limits.max_alloc.is_some_and(|max| pixel_bytes > max) {
        return Err(out_of_memory());
    }
    decoder.set_limits(limits)?;
    let (width, height) = decoder.dimensions();
    let color_space = match decoder.original_color_type() {
        ExtendedColorType::L8 => JpegColorSpace::Gray,
        ExtendedColorType::Rgb8 => JpegColorSpace::Rgb,
        _ => return Ok(None),
    };

    // Full decode: headers alone do not catch truncated scan data.
    let pixel_len = usize::try_from(pixel_bytes).map_err(|_| out_of_memory())?;
    let mut pixels = vec![0u8; pixel_len];
    decoder.read_image(&mut pixels)?;

    Ok(Some(ExhibitImage {
        width,
        height,
        color_space,
        jpeg: bytes.to_vec(),
        passthrough: true,
    }))
}

fn out_of_memory() -> ImageError {
    ImageError::Limits(LimitError::from_kind(LimitErrorKind::InsufficientMemory))
}

fn transcode(decoded: &DynamicImage) -> Result<ExhibitImage, ImageError> {
    let (flattened, color_space) = match decoded.color() {
        ColorType::L8 | ColorType::L16 => {
            (DynamicImage::ImageLuma8(decoded.to_luma8()), JpegColorSpace::Gray)
        }
        _ => (DynamicImage::ImageRgb8(decoded.to_rgb8()), JpegColorSpace::Rgb),
    };

    let mut jpeg = Vec::new();
    flattened.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;

    Ok(ExhibitImage {
        width: flattened.width(),
        height: flattened.height(),
        color_space,
        jpeg,
        passthrough: false,
    })
}

/// Largest `(width, height)` with the image's aspect ratio that fits inside
/// `max_w × max_h`.
pub fn fit_within(width: u32, height: u32, max_w: f32, max_h: f32) -> (f32, f32) {
    if width == 0 || height == 0 {
        return (0.0, 0.0);
    }
    let scale = (max_w / width as f32).min(max_h / height as f32);
    (width as f32 * scale, height as f32 * scale)
}
