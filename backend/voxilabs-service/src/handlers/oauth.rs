/// Google sign-in endpoints
use actix_web::{http::header, web, HttpResponse};
use tracing::warn;

use crate::error::{AppError, Result};
use crate::models::{AuthUrlResponse, GoogleCallbackQuery, GoogleCallbackRequest, OAuthResponse};
use crate::services::{GoogleOAuthClient, SignedIn};
use crate::AppState;

fn client(state: &AppState) -> Result<&GoogleOAuthClient> {
    state.oauth.as_ref().ok_or(AppError::OAuthNotConfigured)
}

async fn complete_sign_in(state: &AppState, code: &str) -> Result<SignedIn> {
    let profile = client(state)?.exchange_code(code).await?;
    state.auth.sign_in_with_google(&profile).await
}

pub async fn authorization_url(state: web::Data<AppState>) -> Result<HttpResponse> {
    let auth_url = client(&state)?.authorization_url();
    Ok(HttpResponse::Ok().json(AuthUrlResponse { auth_url }))
}

/// Browser redirect target. Always answers with a redirect to the client app.
pub async fn callback_redirect(
    state: web::Data<AppState>,
    query: web::Query<GoogleCallbackQuery>,
) -> HttpResponse {
    let query = query.into_inner();

    let outcome = match (query.code, query.error) {
        (_, Some(error)) => Err(error),
        (Some(code), None) if !code.trim().is_empty() => complete_sign_in(&state, code.trim())
            .await
            .map_err(|e| {
                warn!(error = %e, "Google sign-in failed");
                e.public_message()
            }),
        _ => Err("Authorization code is required".to_string()),
    };

    let location = match outcome {
        Ok(signed_in) => format!(
            "{}/auth-callback?token={}",
            state.client_url,
            urlencoding::encode(&signed_in.token)
        ),
        Err(reason) => format!(
            "{}/login?error={}",
            state.client_url,
            urlencoding::encode(&reason)
        ),
    };

    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Code exchange for clients that handle the redirect themselves.
pub async fn callback_json(
    state: web::Data<AppState>,
    body: web::Json<GoogleCallbackRequest>,
) -> Result<HttpResponse> {
    let code = body.code.trim();
    if code.is_empty() {
        return Err(AppError::Validation(
            "Authorization code is required".to_string(),
        ));
    }

    let signed_in = complete_sign_in(&state, code).await?;
    Ok(HttpResponse::Ok().json(OAuthResponse {
        success: true,
        message: "Google authentication successful".to_string(),
        token: signed_in.token,
        user: signed_in.user,
    }))
}
