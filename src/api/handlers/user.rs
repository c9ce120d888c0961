//! # User Handlers
//!
//! Handler‌های پروفایل کاربر (نیاز به احراز هویت)

use axum::extract::State;

use crate::{
    api::extractors::{AuthUser, RequestContext, ValidatedJson},
    error::Result,
    models::{ApiResponse, UpdateProfileRequest, UserResponse},
    services::AppState,
};

/// گرفتن پروفایل کاربر فعلی
///
/// # Endpoint
/// `GET /api/me`
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<UserResponse>> {
    let user = state.user_service.get_profile(&user_id).await?;
    Ok(ApiResponse::ok(user))
}

/// بروزرسانی پروفایل کاربر فعلی
///
/// # Endpoint
/// `PATCH /api/me`
///
/// # Request Body
/// ```json
/// { "name": "سارا محمدی" }
/// ```
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ctx: RequestContext,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> Result<ApiResponse<UserResponse>> {
    let user = state.user_service.update_profile(&user_id, request).await?;

    ctx.logger.with_field("user_id", &user.id).info("profile updated");

    Ok(ApiResponse::ok(user).with_message("profile updated"))
}
