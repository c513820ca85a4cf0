// src/handlers.rs
use crate::AppState;
use crate::errors::SquishError;
use crate::models::{MetadataResponse, StatsOutcome, TargetFormat, TransformRequest, truthy};
use crate::services::{classifier, planner, probe, stream};
use actix_web::{HttpRequest, HttpResponse, web};
use log::{debug, error};
use std::collections::HashMap;
use std::io::{BufWriter, Write};

/// Buffered window between the encoder and the response-body channel, so the
/// encoder's small writes coalesce into reasonably sized chunks.
const WRITE_BUFFER_SIZE: usize = 64 * 1024;
/// Chunks in flight between the encode task and the response body.
const BODY_CHANNEL_CAPACITY: usize = 8;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/resize").route(web::post().to(resize_image)))
        .service(web::resource("/resize/{format}").route(web::post().to(resize_image)))
        .service(web::resource("/metadata").route(web::post().to(image_metadata)))
        .service(web::resource("/").route(web::get().to(usage)));
}

pub async fn resize_image(
    req: HttpRequest,
    payload: web::Payload,
    query: web::Query<HashMap<String, String>>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, SquishError> {
    // The conversion target comes from the route and is validated before the
    // body is touched; an unsupported target is rejected no matter what the
    // stream contains.
    let target = match req.match_info().get("format") {
        Some(segment) => TargetFormat::parse(segment)?,
        None => TargetFormat::Copy,
    };
    let request = TransformRequest::from_query(target, &query, &data.config);

    let body = stream::read_body(payload).await?;
    let (metadata, orientation) = probe::probe(&body)?;
    debug!(
        "Image info: width={}, height={}, format={}",
        metadata.width, metadata.height, metadata.format
    );

    let image =
        image::load_from_memory(&body).map_err(|e| SquishError::Decode(e.to_string()))?;

    let plan = planner::plan(&metadata, &request, data.config.quality, || {
        let verdict = classifier::classify(&metadata, &image);
        if let Some(StatsOutcome::Measured(stats)) = &verdict.stats {
            debug!(
                "Image stats: opaque={}, entropy={:.2}, stdDev={:.2}",
                stats.is_opaque, stats.entropy, stats.std_dev
            );
        }
        verdict
    });

    let (writer, body_stream) = stream::body_channel(BODY_CHANNEL_CAPACITY);
    let errors = writer.error_handle();
    let transcoder = data.transcoder.clone();
    let task_plan = plan.clone();
    actix_web::rt::task::spawn_blocking(move || {
        let mut out = BufWriter::with_capacity(WRITE_BUFFER_SIZE, writer);
        let result = transcoder
            .execute(image, orientation, &task_plan, &mut out)
            .and_then(|()| {
                out.flush()
                    .map_err(|e| SquishError::encode(task_plan.format.as_str(), e.to_string()))
            });
        if let Err(err) = result {
            // Headers are committed by the time the encoder runs, so a
            // failure here can only degrade the body.
            error!("Image processing failed: {err}");
            errors.send(err);
        }
    });

    Ok(HttpResponse::Ok()
        .content_type(plan.content_type())
        .insert_header(("X-Result-Actions", plan.actions_header()))
        .insert_header(("X-Result-Lossless", plan.lossless.to_string()))
        .streaming(body_stream))
}

pub async fn image_metadata(
    payload: web::Payload,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, SquishError> {
    let include_stats = truthy(query.get("stats"));

    let body = stream::read_body(payload).await?;
    let (metadata, _) = probe::probe(&body)?;

    let stats = if include_stats {
        let image =
            image::load_from_memory(&body).map_err(|e| SquishError::Decode(e.to_string()))?;
        Some(match classifier::measure(&image) {
            Ok(stats) => StatsOutcome::Measured(stats),
            Err(err) => StatsOutcome::Failed {
                error: err.to_string(),
            },
        })
    } else {
        None
    };

    Ok(HttpResponse::Ok().json(MetadataResponse::new(&metadata, stats)))
}

pub async fn usage() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(
            [
                "POST to /resize/[webp|avif] to convert to WebP or AVIF.",
                "POST to /resize to resize keeping the original format.",
                "POST to /metadata to inspect an image without transforming it.",
                "Query parameter \"width\" can be used to specify the maximum width.",
                "Any EXIF transformations will be baked in to the output.",
            ]
            .join("\n"),
        )
}
