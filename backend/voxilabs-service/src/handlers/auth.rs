/// Account endpoints under `/api/auth`
use actix_web::{web, HttpRequest, HttpResponse};

use super::validated;
use crate::error::Result;
use crate::middleware::bearer_token;
use crate::models::{
    AuthResponse, AuthenticatedUser, EmailRequest, LoginRequest, MessageResponse, ProfileUpdate,
    RegisterRequest, RegisterResponse, ResetPasswordRequest, UpdateProfileRequest,
    VerifyOtpRequest,
};
use crate::AppState;

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let req = validated(body.into_inner().normalized())?;
    let email = state.auth.register(req).await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "User registered successfully. Please check your email for verification code."
            .to_string(),
        email,
    }))
}

pub async fn verify_email(
    state: web::Data<AppState>,
    body: web::Json<VerifyOtpRequest>,
) -> Result<HttpResponse> {
    let req = validated(body.into_inner().normalized())?;
    state.auth.verify_email(&req.email, &req.otp).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Email verified successfully")))
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let req = validated(body.into_inner().normalized())?;
    let signed_in = state.auth.login(&req.email, &req.password).await?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        message: "Login successful".to_string(),
        token: signed_in.token,
        user: signed_in.user,
    }))
}

pub async fn verify_login_otp(
    state: web::Data<AppState>,
    body: web::Json<VerifyOtpRequest>,
) -> Result<HttpResponse> {
    let req = validated(body.into_inner().normalized())?;
    let signed_in = state.auth.verify_login_otp(&req.email, &req.otp).await?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        message: "Login successful".to_string(),
        token: signed_in.token,
        user: signed_in.user,
    }))
}

pub async fn resend_otp(
    state: web::Data<AppState>,
    body: web::Json<EmailRequest>,
) -> Result<HttpResponse> {
    let req = validated(body.into_inner().normalized())?;
    state.auth.resend_otp(&req.email).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("OTP resent successfully")))
}

/// Always succeeds; an absent or unknown token simply has nothing to revoke.
pub async fn logout(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let token = bearer_token(req.headers());
    state.auth.logout(token.as_deref()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Logged out successfully")))
}

pub async fn forgot_password(
    state: web::Data<AppState>,
    body: web::Json<EmailRequest>,
) -> Result<HttpResponse> {
    let req = validated(body.into_inner().normalized())?;
    state.auth.forgot_password(&req.email).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Password reset instructions sent to your email",
    )))
}

pub async fn reset_password(
    state: web::Data<AppState>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse> {
    let req = validated(body.into_inner())?;
    state
        .auth
        .reset_password(&req.token, &req.new_password)
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Password reset successful")))
}

pub async fn me(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse> {
    let profile = state.auth.current_user(user.user_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn update_me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let req = validated(body.into_inner().normalized())?;
    let update = ProfileUpdate {
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
        image: req.image,
    };

    let profile = state.auth.update_profile(user.user_id, update).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Stored files go first; rows (sessions, videos) follow the user row.
pub async fn delete_me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    state.videos.purge_files(user.user_id).await?;
    state.auth.delete_account(user.user_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Account deleted successfully")))
}
