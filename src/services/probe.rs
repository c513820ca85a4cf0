// src/services/probe.rs
use crate::errors::SquishError;
use crate::models::{Format, ImageMetadata};
use image::metadata::Orientation;
use image::{ImageDecoder, ImageFormat, ImageReader};
use std::io::Cursor;

/// Header-level inspection of an image byte buffer. Reads container and EXIF
/// metadata only; pixel data stays untouched until the transcoder runs.
pub fn probe(data: &[u8]) -> Result<(ImageMetadata, Orientation), SquishError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| SquishError::Decode(e.to_string()))?;

    let format = match reader.format() {
        Some(format) => source_format(format)?,
        None => {
            return Err(SquishError::Decode(
                "unrecognized image container".to_string(),
            ));
        }
    };

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| SquishError::Decode(e.to_string()))?;

    // A missing or unreadable orientation tag is the same as "normal".
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);
    let (width, height) = decoder.dimensions();
    let has_alpha = decoder.color_type().has_alpha();

    let webp_lossless = match format {
        Format::WebP => webp_is_lossless(data),
        _ => None,
    };

    let metadata = ImageMetadata {
        width,
        height,
        format,
        orientation: exif_code(orientation),
        has_alpha,
        webp_lossless,
    };

    Ok((metadata, orientation))
}

fn source_format(format: ImageFormat) -> Result<Format, SquishError> {
    match format {
        ImageFormat::Png => Ok(Format::Png),
        ImageFormat::Jpeg => Ok(Format::Jpeg),
        ImageFormat::WebP => Ok(Format::WebP),
        ImageFormat::Avif => Ok(Format::Avif),
        ImageFormat::Gif => Ok(Format::Gif),
        other => Err(SquishError::Decode(format!(
            "unsupported source format: {}",
            other.extensions_str().first().copied().unwrap_or("unknown")
        ))),
    }
}

fn exif_code(orientation: Orientation) -> u8 {
    match orientation {
        Orientation::NoTransforms => 1,
        Orientation::FlipHorizontal => 2,
        Orientation::Rotate180 => 3,
        Orientation::FlipVertical => 4,
        Orientation::Rotate90FlipH => 5,
        Orientation::Rotate90 => 6,
        Orientation::Rotate270FlipH => 7,
        Orientation::Rotate270 => 8,
    }
}

/// WebP stores lossy frames in a `VP8 ` chunk and lossless frames in `VP8L`.
/// Extended files (`VP8X`) keep the frame chunk further in, so walk the RIFF
/// chunk list instead of assuming a fixed layout.
fn webp_is_lossless(data: &[u8]) -> Option<bool> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WEBP" {
        return None;
    }

    let mut offset = 12;
    while offset + 8 <= data.len() {
        let fourcc = &data[offset..offset + 4];
        let size = u32::from_le_bytes(data[offset + 4..offset + 8].try_into().ok()?) as usize;
        match fourcc {
            b"VP8 " => return Some(false),
            b"VP8L" => return Some(true),
            _ => {}
        }
        // Chunk payloads are padded to even length.
        offset += 8 + size + (size & 1);
    }
    None
}
