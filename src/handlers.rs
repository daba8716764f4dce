// src/handlers.rs
use crate::{
    AppState,
    demo::{ShareInfo, download_file_name},
    errors::ReviveError,
    models::{ImageReference, InputImage, OptionSet, RestorationOutcome},
    registry::RunSnapshot,
};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, http::header, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use log::info;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/restorations", web::post().to(start_restoration))
            .route("/restorations/{run_id}", web::get().to(get_restoration))
            .route("/restorations/{run_id}", web::delete().to(cancel_restoration))
            .route(
                "/restorations/{run_id}/comparison",
                web::get().to(get_comparison),
            )
            .route("/restorations/{run_id}/result", web::get().to(get_result))
            .route("/restorations/{run_id}/share", web::get().to(get_share)),
    )
    .route("/health", web::get().to(health_check));
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ReviveError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        other => Err(ReviveError::Validation(format!(
            "Invalid value for {}: {}",
            name, other
        ))),
    }
}

/// Longest value accepted for an option flag field.
const FLAG_FIELD_LIMIT: usize = 64;

/// Appends a chunk, refusing to grow `body` past `limit`.
fn append_chunk(
    body: &mut BytesMut,
    chunk: &[u8],
    name: &str,
    limit: usize,
) -> Result<(), ReviveError> {
    if body.len() + chunk.len() > limit {
        return Err(ReviveError::Validation(format!(
            "Field {} is larger than {} bytes",
            name, limit
        )));
    }
    body.extend_from_slice(chunk);
    Ok(())
}

fn result_path(run_id: &Uuid) -> String {
    format!("/api/v1/restorations/{}/result", run_id)
}

fn outcome_summary(snapshot: &RunSnapshot) -> serde_json::Value {
    match &snapshot.outcome {
        None => serde_json::Value::Null,
        Some(RestorationOutcome::Success(image)) => serde_json::json!({
            "status": "success",
            "media_type": image.media_type(),
            "result_url": result_path(&snapshot.run_id),
        }),
        Some(RestorationOutcome::Failure(reason)) => serde_json::json!({
            "status": "failure",
            "reason": reason.code(),
            "message": reason.to_string(),
        }),
    }
}

async fn load_snapshot(data: &AppState, run_id: Uuid) -> Result<RunSnapshot, ReviveError> {
    data.registry
        .snapshot(&run_id)
        .await
        .ok_or_else(|| ReviveError::NotFound(format!("restoration run {}", run_id)))
}

/// The restored image, or the response to send while there is none.
fn finished_image(snapshot: &RunSnapshot) -> Result<ImageReference, HttpResponse> {
    match &snapshot.outcome {
        Some(RestorationOutcome::Success(image)) => Ok(image.clone()),
        Some(RestorationOutcome::Failure(reason)) => {
            Err(HttpResponse::UnprocessableEntity().json(serde_json::json!({
                "error": reason.code(),
                "message": reason.to_string()
            })))
        }
        None => Err(HttpResponse::Conflict().json(serde_json::json!({
            "error": "Still processing",
            "progress": snapshot.progress.percent
        }))),
    }
}

pub async fn start_restoration(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let mut options = OptionSet::default();
    let mut image: Option<InputImage> = None;

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().to_string();
        let limit = match name.as_str() {
            "image" => data.image_processor.max_bytes(),
            _ => FLAG_FIELD_LIMIT,
        };

        let mut body = BytesMut::new();
        while let Some(chunk) = field.try_next().await? {
            append_chunk(&mut body, &chunk, &name, limit)?;
        }

        match name.as_str() {
            "image" => {
                image = Some(InputImage {
                    filename: field.content_disposition().get_filename().map(String::from),
                    content_type: field.content_type().map(|ct| ct.to_string()),
                    data: body.freeze(),
                });
            }
            "basic" | "advanced" | "colorize" | "hd" => {
                let raw = String::from_utf8_lossy(&body);
                let value = parse_flag(&name, &raw)?;
                match name.as_str() {
                    "basic" => options.basic = value,
                    "advanced" => options.advanced = value,
                    "colorize" => options.colorize = value,
                    _ => options.hd = value,
                }
            }
            _ => {}
        }
    }

    if let Some(image) = &image {
        let info = data.image_processor.validate_image(image)?;
        info!(
            "Accepted {} upload {}x{} ({} bytes)",
            info.mime_type,
            info.width,
            info.height,
            image.data.len()
        );
    }

    let run_id = data.registry.create(image, options).await;
    let snapshot = load_snapshot(&data, run_id).await?;

    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "run_id": run_id,
        "options": options,
        "labels": options.labels(),
        "demo": snapshot.demo
    })))
}

pub async fn get_restoration(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let snapshot = load_snapshot(&data, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "run_id": snapshot.run_id,
        "phase": snapshot.phase,
        "progress": snapshot.progress,
        "options": snapshot.options,
        "labels": snapshot.options.labels(),
        "demo": snapshot.demo,
        "outcome": outcome_summary(&snapshot),
        "created_at": snapshot.created_at
    })))
}

pub async fn cancel_restoration(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let run_id = path.into_inner();
    if !data.registry.cancel(&run_id).await {
        return Err(ReviveError::NotFound(format!("restoration run {}", run_id)).into());
    }
    Ok(HttpResponse::NoContent().finish())
}

pub async fn get_comparison(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let snapshot = load_snapshot(&data, path.into_inner()).await?;
    let after = match finished_image(&snapshot) {
        Ok(image) => image,
        Err(response) => return Ok(response),
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "before": snapshot.before.to_src(),
        "after": after.to_src()
    })))
}

pub async fn get_result(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let snapshot = load_snapshot(&data, path.into_inner()).await?;
    let image = match finished_image(&snapshot) {
        Ok(image) => image,
        Err(response) => return Ok(response),
    };

    match &image {
        ImageReference::Url { url } => Ok(HttpResponse::Found()
            .insert_header((header::LOCATION, url.as_str()))
            .finish()),
        ImageReference::Data { mime_type, .. } => {
            let bytes = image.decode()?.unwrap_or_default();
            let file_name = download_file_name(&image, chrono::Utc::now());
            Ok(HttpResponse::Ok()
                .content_type(mime_type.as_str())
                .insert_header((
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ))
                .body(bytes))
        }
    }
}

pub async fn get_share(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let snapshot = load_snapshot(&data, path.into_inner()).await?;
    let image = match finished_image(&snapshot) {
        Ok(image) => image,
        Err(response) => return Ok(response),
    };

    let url = match image {
        ImageReference::Url { url } => url,
        ImageReference::Data { .. } => result_path(&snapshot.run_id),
    };

    Ok(HttpResponse::Ok().json(ShareInfo::for_result(url)))
}

async fn health_check(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "photorevive",
        "version": env!("CARGO_PKG_VERSION"),
        "live": data.registry.is_live(),
        "active_runs": data.registry.len().await
    }))
}
