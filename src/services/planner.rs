// src/services/planner.rs
use crate::models::{Action, Classification, ImageMetadata, TransformPlan, TransformRequest};

/// Decide which operations a request needs.
///
/// Pure function of the probed metadata and the request, except that the
/// classifier closure is consulted lazily when the caller did not pin the
/// lossless setting. The action order is fixed: orient, then scale:down,
/// then convert.
pub fn plan(
    metadata: &ImageMetadata,
    request: &TransformRequest,
    quality: u8,
    classify: impl FnOnce() -> Classification,
) -> TransformPlan {
    let mut actions = Vec::new();

    // The transcoder bakes the orientation in unconditionally; it shows up
    // as an action only when the tag asks for an actual transform.
    if metadata.orientation != 1 {
        actions.push(Action::Orient);
    }

    // Zero means "no constraint on that axis". Negative values are not
    // special-cased: they fall through the plain comparison and trigger a
    // resize, and `bound` then leaves the axis unconstrained, so the scale
    // ends up a no-op.
    let needs_resize = (request.width != 0 && request.width < i64::from(metadata.width))
        || (request.height != 0 && request.height < i64::from(metadata.height));

    let resize_to = if needs_resize {
        actions.push(Action::ScaleDown);
        Some((
            bound(request.width, metadata.width),
            bound(request.height, metadata.height),
        ))
    } else {
        None
    };

    let format = request.target.resolve(metadata.format);
    if request.target.converts_from(metadata.format) {
        actions.push(Action::Convert(format));
    }

    let lossless = match request.lossless {
        Some(explicit) => explicit,
        None => !classify().lossy_preferred,
    };

    TransformPlan {
        actions,
        format,
        lossless,
        quality,
        resize_to,
    }
}

/// Clamp a requested bound to the source dimension so the fit-inside resize
/// can never enlarge. Non-positive values leave the axis unconstrained.
fn bound(requested: i64, source: u32) -> u32 {
    if requested > 0 {
        requested.min(i64::from(source)) as u32
    } else {
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Format, StatsOutcome, TargetFormat};

    fn metadata(width: u32, height: u32, format: Format) -> ImageMetadata {
        ImageMetadata {
            width,
            height,
            format,
            orientation: 1,
            has_alpha: false,
            webp_lossless: None,
        }
    }

    fn request(width: i64, height: i64, target: TargetFormat) -> TransformRequest {
        TransformRequest {
            width,
            height,
            target,
            lossless: None,
        }
    }

    fn prefers_lossless() -> Classification {
        Classification {
            lossy_preferred: false,
            stats: None,
        }
    }

    fn prefers_lossy() -> Classification {
        Classification {
            lossy_preferred: true,
            stats: Some(StatsOutcome::Measured(crate::models::PixelStats {
                is_opaque: true,
                entropy: 7.5,
                std_dev: 40.0,
            })),
        }
    }

    #[test]
    fn scales_down_when_width_constrains() {
        let plan = plan(
            &metadata(2000, 1500, Format::Png),
            &request(100, 0, TargetFormat::Copy),
            80,
            prefers_lossless,
        );
        assert_eq!(plan.actions, vec![Action::ScaleDown]);
        assert_eq!(plan.format, Format::Png);
        assert_eq!(plan.content_type(), "image/png");
        assert_eq!(plan.resize_to, Some((100, 1500)));
    }

    #[test]
    fn converts_without_scaling_when_unconstrained() {
        let plan = plan(
            &metadata(2000, 1500, Format::Png),
            &request(0, 0, TargetFormat::WebP),
            80,
            prefers_lossless,
        );
        assert_eq!(plan.actions, vec![Action::Convert(Format::WebP)]);
        assert_eq!(plan.content_type(), "image/webp");
        assert_eq!(plan.resize_to, None);
    }

    #[test]
    fn scales_and_converts_in_pipeline_order() {
        let plan = plan(
            &metadata(2000, 1500, Format::Png),
            &request(50, 0, TargetFormat::Avif),
            80,
            prefers_lossless,
        );
        assert_eq!(
            plan.actions,
            vec![Action::ScaleDown, Action::Convert(Format::Avif)]
        );
        assert_eq!(plan.content_type(), "image/avif");
    }

    #[test]
    fn never_upscales() {
        let plan = plan(
            &metadata(2000, 1500, Format::Png),
            &request(5000, 0, TargetFormat::Copy),
            80,
            prefers_lossless,
        );
        assert!(plan.actions.is_empty());
        assert_eq!(plan.resize_to, None);
    }

    #[test]
    fn height_alone_can_trigger_the_resize() {
        let plan = plan(
            &metadata(2000, 1500, Format::Png),
            &request(5000, 100, TargetFormat::Copy),
            80,
            prefers_lossless,
        );
        assert_eq!(plan.actions, vec![Action::ScaleDown]);
        // Width bound clamps to the source so the fit can never enlarge.
        assert_eq!(plan.resize_to, Some((2000, 100)));
    }

    #[test]
    fn copy_never_converts() {
        let plan = plan(
            &metadata(2000, 1500, Format::Jpeg),
            &request(0, 0, TargetFormat::Copy),
            80,
            prefers_lossy,
        );
        assert!(plan.actions.is_empty());
        assert_eq!(plan.content_type(), "image/jpeg");
    }

    #[test]
    fn converting_to_the_source_format_is_a_noop() {
        let plan = plan(
            &metadata(2000, 1500, Format::WebP),
            &request(0, 0, TargetFormat::WebP),
            80,
            prefers_lossless,
        );
        assert!(plan.actions.is_empty());
        assert_eq!(plan.content_type(), "image/webp");
    }

    #[test]
    fn orientation_is_reported_first() {
        let mut source = metadata(2000, 1500, Format::Jpeg);
        source.orientation = 6;
        let plan = plan(
            &source,
            &request(100, 0, TargetFormat::WebP),
            80,
            prefers_lossy,
        );
        assert_eq!(
            plan.actions,
            vec![
                Action::Orient,
                Action::ScaleDown,
                Action::Convert(Format::WebP)
            ]
        );
    }

    #[test]
    fn normal_orientation_is_not_reported() {
        let plan = plan(
            &metadata(2000, 1500, Format::Jpeg),
            &request(0, 0, TargetFormat::Copy),
            80,
            prefers_lossy,
        );
        assert!(!plan.actions.contains(&Action::Orient));
    }

    #[test]
    fn negative_dimensions_trigger_a_noop_scale() {
        let plan = plan(
            &metadata(2000, 1500, Format::Png),
            &request(-1, -1, TargetFormat::Copy),
            80,
            prefers_lossless,
        );
        assert_eq!(plan.actions, vec![Action::ScaleDown]);
        assert_eq!(plan.resize_to, Some((2000, 1500)));
    }

    #[test]
    fn explicit_override_skips_the_classifier() {
        let mut req = request(0, 0, TargetFormat::WebP);
        req.lossless = Some(false);
        let plan_lossy = plan(&metadata(100, 100, Format::Png), &req, 80, || {
            panic!("classifier must not run when the override is set")
        });
        assert!(!plan_lossy.lossless);

        req.lossless = Some(true);
        let plan_lossless = plan(&metadata(100, 100, Format::Png), &req, 80, || {
            panic!("classifier must not run when the override is set")
        });
        assert!(plan_lossless.lossless);
    }

    #[test]
    fn classifier_decides_when_no_override() {
        let req = request(0, 0, TargetFormat::WebP);
        let source = metadata(100, 100, Format::Png);

        let plan_photo = plan(&source, &req, 80, prefers_lossy);
        assert!(!plan_photo.lossless);

        let plan_graphic = plan(&source, &req, 80, prefers_lossless);
        assert!(plan_graphic.lossless);
    }

    #[test]
    fn quality_is_carried_into_the_plan() {
        let plan = plan(
            &metadata(100, 100, Format::Png),
            &request(0, 0, TargetFormat::WebP),
            92,
            prefers_lossy,
        );
        assert_eq!(plan.quality, 92);
    }
}
