/// Generation and the caller's video collection
use actix_web::{http::header, web, HttpResponse};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{AuthenticatedUser, GenerateVideoRequest, MessageResponse, VideoResponse};
use crate::AppState;

pub const VIDEO_ID_HEADER: &str = "x-video-id";

/// Blocks for the whole provider call, then streams the video bytes back.
pub async fn generate(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<GenerateVideoRequest>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let generated = state
        .videos
        .generate(user.user_id, &body.prompt, body.title.as_deref())
        .await?;

    let file_name = match generated.content_type {
        "video/webm" => "generated-video.webm",
        _ => "generated-video.mp4",
    };

    Ok(HttpResponse::Ok()
        .content_type(generated.content_type)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{file_name}\""),
        ))
        .insert_header((VIDEO_ID_HEADER, generated.video.id.to_string()))
        .body(generated.bytes))
}

pub async fn list(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse> {
    let videos: Vec<VideoResponse> = state
        .videos
        .list(user.user_id)
        .await?
        .into_iter()
        .map(VideoResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(videos))
}

pub async fn get(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    video_id: web::Path<String>,
) -> Result<HttpResponse> {
    let video_id = parse_video_id(&video_id)?;
    let video = state.videos.get(user.user_id, video_id).await?;
    Ok(HttpResponse::Ok().json(VideoResponse::from(video)))
}

pub async fn delete(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    video_id: web::Path<String>,
) -> Result<HttpResponse> {
    let video_id = parse_video_id(&video_id)?;
    state.videos.delete(user.user_id, video_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Video deleted successfully")))
}

fn parse_video_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation("Invalid video ID".to_string()))
}
