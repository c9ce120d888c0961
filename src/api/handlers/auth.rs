//! # Auth Handlers
//!
//! Handler‌های مربوط به ورود با کد یکبار مصرف

use axum::extract::State;

use crate::{
    api::extractors::{BearerToken, RequestContext, ValidatedJson},
    error::Result,
    models::{
        ApiResponse, LoginResponse, OtpSentResponse, SendOtpRequest, TokenResponse,
        VerifyOtpRequest,
    },
    services::AppState,
};

// =====================================
// Send OTP
// =====================================
/// ارسال کد ورود با پیامک
///
/// # Endpoint
/// `POST /api/auth/otp`
///
/// # Request Body
/// ```json
/// { "phone": "09121234567" }
/// ```
///
/// # Response
/// ```json
/// { "message": "code sent", "data": { "phone": "0912***4567", "expires_in": 120 } }
/// ```
pub async fn send_otp(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(request): ValidatedJson<SendOtpRequest>,
) -> Result<ApiResponse<OtpSentResponse>> {
    let response = state.auth_service.send_otp(request).await?;

    ctx.logger
        .with_field("phone", &response.phone)
        .info("otp requested");

    Ok(ApiResponse::ok(response).with_message("code sent"))
}

// =====================================
// Verify OTP
// =====================================
/// تایید کد و صدور توکن
///
/// # Endpoint
/// `POST /api/auth/verify`
///
/// # Request Body
/// ```json
/// { "phone": "09121234567", "code": "482913" }
/// ```
pub async fn verify_otp(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(request): ValidatedJson<VerifyOtpRequest>,
) -> Result<ApiResponse<LoginResponse>> {
    let response = state.auth_service.verify_otp(request).await?;

    ctx.logger
        .with_field("user_id", &response.user.id)
        .with_field("new_user", response.is_new_user)
        .info("user logged in");

    let message = if response.is_new_user {
        "welcome"
    } else {
        "logged in"
    };
    Ok(ApiResponse::ok(response).with_message(message))
}

// =====================================
// Refresh Token
// =====================================
/// تمدید توکن
///
/// # Endpoint
/// `POST /api/auth/refresh`
///
/// # Headers
/// `Authorization: Bearer <token>`
pub async fn refresh_token(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<ApiResponse<TokenResponse>> {
    let response = state.auth_service.refresh_token(&token).await?;
    Ok(ApiResponse::ok(response))
}
