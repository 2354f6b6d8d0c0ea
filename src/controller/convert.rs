use std::path::Path;

use actix_multipart::{Field, Multipart};
use actix_web::dev::HttpServiceFactory;
use actix_web::http::StatusCode;
use actix_web::{post, web, HttpResponse, Responder, ResponseError};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use futures_util::TryStreamExt;

use serde::Serialize;

use thiserror::Error;

use tokio::io::AsyncWriteExt;

use crate::media::{Conversion, MediaPipeline, PipelineError};

/// Multipart field holding the uploaded video
const VIDEO_FIELD: &str = "video";
const UPLOAD_FILE_NAME: &str = "upload";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub transcript: String,
    pub gif_base64: String,
}

/// Video conversion endpoint
#[tracing::instrument(name = "Convert an uploaded video", skip(payload, pipeline))]
#[post("")]
async fn convert(
    mut payload: Multipart,
    pipeline: web::Data<MediaPipeline>,
) -> Result<impl Responder, ConvertError> {
    let work_dir = tokio::task::spawn_blocking(tempfile::tempdir)
        .await
        .map_err(std::io::Error::from)??;

    let result = convert_in(&mut payload, &pipeline, work_dir.path()).await;

    // Removes the upload along with everything the pipeline wrote
    match tokio::task::spawn_blocking(move || work_dir.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Failed to remove scratch directory"),
        Err(e) => tracing::warn!(error = %e, "Scratch directory cleanup did not finish"),
    }

    let conversion = result?;

    Ok(HttpResponse::Ok().json(ConvertResponse {
        transcript: conversion.transcript,
        gif_base64: BASE64.encode(conversion.gif),
    }))
}

async fn convert_in(
    payload: &mut Multipart,
    pipeline: &MediaPipeline,
    work_dir: &Path,
) -> Result<Conversion, ConvertError> {
    let video = work_dir.join(UPLOAD_FILE_NAME);

    if !save_video(payload, &video).await? {
        tracing::warn!("No file uploaded");
        return Err(ConvertError::NoUpload);
    }
    tracing::info!("File received");

    pipeline.convert(&video, work_dir).await.map_err(|e| {
        tracing::error!(error.cause_chain = ?e, "Failed to process video");
        ConvertError::Pipeline(e)
    })
}

/// Stream the first `video` file part to `dest`, returning whether one was found
async fn save_video(payload: &mut Multipart, dest: &Path) -> Result<bool, ConvertError> {
    while let Some(mut field) = payload.try_next().await.map_err(ConvertError::upload)? {
        let is_video_file = field.name() == VIDEO_FIELD
            && field.content_disposition().get_filename().is_some();

        if !is_video_file {
            drain(&mut field).await?;
            continue;
        }

        let mut file = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = field.try_next().await.map_err(ConvertError::upload)? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        return Ok(true);
    }

    Ok(false)
}

async fn drain(field: &mut Field) -> Result<(), ConvertError> {
    while field.try_next().await.map_err(ConvertError::upload)?.is_some() {}
    Ok(())
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("No file uploaded.")]
    NoUpload,

    #[error("Malformed upload: {0}")]
    Upload(String),

    #[error("Failed to process video")]
    Io(#[from] std::io::Error),

    #[error("Failed to process video")]
    Pipeline(PipelineError),
}

impl ConvertError {
    fn upload(e: actix_multipart::MultipartError) -> Self {
        Self::Upload(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for ConvertError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NoUpload | Self::Upload(_) => StatusCode::BAD_REQUEST,
            Self::Io(_) | Self::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

/// Media conversion API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/convert").service(convert)
}
