// src/services/classifier.rs
use crate::errors::SquishError;
use crate::models::{Classification, ImageMetadata, PixelStats, StatsOutcome};
use image::{DynamicImage, GenericImageView};
use log::warn;

/// Entropy above this reads as photographic content. Tuned on a small corpus
/// of screenshots, drawings, and photos; adjust per deployment image set.
pub const PHOTO_ENTROPY_THRESHOLD: f64 = 6.0;

/// Recommend lossy or lossless encoding for an image.
///
/// Sources that already went through a lossy encoder (JPEG, lossy WebP) gain
/// nothing from lossless output, so they short-circuit without touching
/// pixel data. Everything else is measured: opaque, high-entropy images are
/// treated as photographs and steered to lossy output, while graphics,
/// screenshots, and anything carrying transparency stay lossless.
///
/// A failed measurement never fails the request; the verdict falls back to
/// lossy with the error recorded in the stats outcome.
pub fn classify(metadata: &ImageMetadata, image: &DynamicImage) -> Classification {
    if metadata.already_lossy() {
        return Classification {
            lossy_preferred: true,
            stats: None,
        };
    }

    match measure(image) {
        Ok(stats) => Classification {
            lossy_preferred: stats.is_opaque && stats.entropy > PHOTO_ENTROPY_THRESHOLD,
            stats: Some(StatsOutcome::Measured(stats)),
        },
        Err(err) => {
            warn!("Failed to analyze image stats: {err}");
            Classification {
                lossy_preferred: true,
                stats: Some(StatsOutcome::Failed {
                    error: err.to_string(),
                }),
            }
        }
    }
}

/// Compute opacity, Shannon entropy over the luma histogram, and the
/// standard deviation of the first channel.
pub fn measure(image: &DynamicImage) -> Result<PixelStats, SquishError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(SquishError::Statistics("image has no pixels".to_string()));
    }
    let total = f64::from(width) * f64::from(height);

    let rgba = image.to_rgba8();
    let is_opaque =
        !image.color().has_alpha() || rgba.pixels().all(|pixel| pixel[3] == u8::MAX);

    let gray = image.to_luma8();
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }
    let mut entropy = 0.0;
    for &count in &histogram {
        if count > 0 {
            let p = count as f64 / total;
            entropy -= p * p.log2();
        }
    }

    let mean = rgba.pixels().map(|pixel| f64::from(pixel[0])).sum::<f64>() / total;
    let variance = rgba
        .pixels()
        .map(|pixel| {
            let delta = f64::from(pixel[0]) - mean;
            delta * delta
        })
        .sum::<f64>()
        / total;

    Ok(PixelStats {
        is_opaque,
        entropy,
        std_dev: variance.sqrt(),
    })
}
