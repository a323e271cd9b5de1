use axum::extract::{FromRef, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use tracing::{info, instrument, warn};

use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{
    clear_session_cookie, session_cookie, token_from_headers, AuthUser,
};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
    UpdateProfileRequest, UserResponse,
};
use crate::users::repo_types::User;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/getuser", get(get_user))
        .route("/loginstatus", get(login_status))
        .route("/updateuser", patch(update_user))
        .route("/changepassword", patch(change_password))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    let new_user = payload.validate()?;

    if User::find_by_email(&state.db, &new_user.email).await?.is_some() {
        warn!(email = %new_user.email, "registration with taken email");
        return Err(ApiError::Validation("Email is already in use.".into()));
    }

    let password_hash = hash_password(&new_user.password)?;
    // concurrent duplicate registrations lose at the unique constraint
    let user = User::create(&state.db, &new_user.name, &new_user.email, &password_hash).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&token, keys.ttl)?);

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    let credentials = payload.validate()?;

    let user = User::find_by_email(&state.db, &credentials.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %credentials.email, "login with unknown email");
            ApiError::NotFound("User not found, please register.".into())
        })?;

    if !verify_password(&credentials.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::Auth("Invalid email or password.".into()));
    }

    // Sign the token only after the password checks out.
    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&token, keys.ttl)?);

    info!(user_id = %user.id, "user logged in");
    Ok((
        StatusCode::OK,
        headers,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

#[instrument]
async fn logout() -> (HeaderMap, Json<MessageResponse>) {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, clear_session_cookie());
    (
        headers,
        Json(MessageResponse {
            message: "Logged out successfully.".into(),
        }),
    )
}

#[instrument(skip(state))]
async fn get_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".into()))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, headers))]
async fn login_status(State(state): State<AppState>, headers: HeaderMap) -> Json<bool> {
    let Some(token) = token_from_headers(&headers) else {
        return Json(false);
    };
    let keys = JwtKeys::from_ref(&state);
    Json(keys.verify(&token).is_ok())
}

#[instrument(skip(state, payload))]
async fn update_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let patch = payload.validate()?;

    let user = User::update_profile(&state.db, user_id, &patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".into()))?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<String, ApiError> {
    let change = payload.validate()?;

    // the row can vanish between the extractor's check and this load
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Validation("User not found.".into()))?;

    if !verify_password(&change.old_password, &user.password_hash)? {
        warn!(user_id = %user.id, "password change with wrong old password");
        return Err(ApiError::Auth("Old password is incorrect.".into()));
    }

    let password_hash = hash_password(&change.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok("Password changed successfully.".to_string())
}
