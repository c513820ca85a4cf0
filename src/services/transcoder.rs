// src/services/transcoder.rs
use crate::errors::SquishError;
use crate::models::{Format, TransformPlan};
use image::DynamicImage;
use image::codecs::avif::AvifEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use std::io::Write;

/// AVIF speed preset: 1 is slowest/best compression, 10 fastest.
const AVIF_SPEED: u8 = 4;

pub struct Transcoder;

impl Transcoder {
    pub fn new() -> Self {
        Self
    }

    /// Apply a plan to a decoded image, writing the encoded result through
    /// `out` as it is produced. Orientation is baked in whether or not the
    /// plan reports it; resize and format follow the plan.
    pub fn execute<W: Write>(
        &self,
        mut image: DynamicImage,
        orientation: Orientation,
        plan: &TransformPlan,
        mut out: W,
    ) -> Result<(), SquishError> {
        image.apply_orientation(orientation);

        if let Some((width, height)) = plan.resize_to {
            // Fit inside the requested box, preserving aspect ratio. The
            // planner already clamped the box to the source dimensions, so
            // this never enlarges.
            image = image.resize(width, height, FilterType::Lanczos3);
        }

        match plan.format {
            Format::Png => image
                .write_with_encoder(PngEncoder::new(out))
                .map_err(|e| SquishError::encode("png", e.to_string())),
            Format::Jpeg => {
                // JPEG has no alpha channel; flatten before encoding.
                DynamicImage::ImageRgb8(image.to_rgb8())
                    .write_with_encoder(JpegEncoder::new_with_quality(out, plan.quality))
                    .map_err(|e| SquishError::encode("jpeg", e.to_string()))
            }
            Format::Gif => {
                let mut encoder = GifEncoder::new(out);
                encoder
                    .encode_frame(image::Frame::new(image.to_rgba8()))
                    .map_err(|e| SquishError::encode("gif", e.to_string()))
            }
            Format::WebP if plan.lossless => image
                .write_with_encoder(WebPEncoder::new_lossless(out))
                .map_err(|e| SquishError::encode("webp", e.to_string())),
            Format::WebP => {
                let rgba = image.to_rgba8();
                let (width, height) = rgba.dimensions();
                let encoded = webp::Encoder::from_rgba(&rgba, width, height)
                    .encode_simple(false, f32::from(plan.quality))
                    .map_err(|e| SquishError::encode("webp", format!("{e:?}")))?;
                out.write_all(&encoded)
                    .map_err(|e| SquishError::encode("webp", e.to_string()))
            }
            Format::Avif => {
                // The AVIF encoder has no true lossless mode; a lossless
                // plan maps to the top quality setting.
                let quality = if plan.lossless { 100 } else { plan.quality };
                image
                    .write_with_encoder(AvifEncoder::new_with_speed_quality(
                        out, AVIF_SPEED, quality,
                    ))
                    .map_err(|e| SquishError::encode("avif", e.to_string()))
            }
        }
    }
}
