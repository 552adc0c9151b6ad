use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::error::Result;
use crate::models::{AuthenticatedUser, ProjectsParams};
use crate::AppState;

pub async fn stats(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse> {
    let stats = state.dashboard.stats(user.user_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

pub async fn projects(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    params: web::Query<ProjectsParams>,
) -> Result<HttpResponse> {
    let projects = state
        .dashboard
        .projects(
            user.user_id,
            params.search.as_deref(),
            params.sort.as_deref(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(projects))
}
