use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::oid::ObjectId;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::{
    models::CurrentUser,
    services::auth_service::{self, AuthError},
    AppState,
};

fn is_valid_email(email: &str) -> bool {
    let re = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    re.is_match(email)
}

fn message(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "message": msg }))).into_response()
}

fn auth_error_response(err: AuthError) -> Response {
    match &err {
        // Not an error for the client; nudge them to the login page.
        AuthError::UserExists => (
            StatusCode::OK,
            Json(json!({ "message": err.to_string(), "redirectToLogin": true })),
        )
            .into_response(),
        AuthError::InvalidCredentials | AuthError::AlreadyVerified => {
            message(StatusCode::BAD_REQUEST, &err.to_string())
        }
        AuthError::NotVerified | AuthError::InvalidOtp => {
            message(StatusCode::FORBIDDEN, &err.to_string())
        }
        AuthError::UserNotFound => message(StatusCode::NOT_FOUND, &err.to_string()),
        AuthError::Server(detail) => {
            tracing::error!(error = %detail, "auth failure");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}

fn parse_user_id(raw: &str) -> Result<ObjectId, Response> {
    ObjectId::parse_str(raw).map_err(|_| message(StatusCode::BAD_REQUEST, "Invalid user id"))
}

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

// POST /api/users/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Response {
    let username = payload.username.as_deref().map(str::trim).unwrap_or("");
    let email = payload.email.as_deref().map(str::trim).unwrap_or("");
    let password = payload.password.as_deref().unwrap_or("");

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return message(StatusCode::BAD_REQUEST, "All fields are required.");
    }
    if !is_valid_email(email) {
        return message(StatusCode::BAD_REQUEST, "Invalid email.");
    }

    match auth_service::register(&state, username, email, password).await {
        Ok(user_id) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "User registered. OTP sent to email.",
                "userId": user_id.to_hex(),
            })),
        )
            .into_response(),
        Err(e) => auth_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpPayload {
    pub user_id: Option<String>,
    pub otp: Option<String>,
}

// POST /api/users/verify-otp
pub async fn verify_otp(State(state): State<AppState>, Json(payload): Json<OtpPayload>) -> Response {
    let (user_id, otp) = match (payload.user_id.as_deref(), payload.otp.as_deref()) {
        (Some(id), Some(otp)) if !otp.trim().is_empty() => (id, otp.trim()),
        _ => return message(StatusCode::BAD_REQUEST, "All fields are required."),
    };

    let user_id = match parse_user_id(user_id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match auth_service::verify_otp(&state, user_id, otp).await {
        Ok(()) => message(StatusCode::OK, "Email verified successfully"),
        Err(e) => auth_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub password: Option<String>,
}

// POST /api/users/login
pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> Response {
    let email = payload.email.as_deref().map(str::trim).unwrap_or("");
    let password = payload.password.as_deref().unwrap_or("");

    if email.is_empty() || password.is_empty() {
        return message(StatusCode::BAD_REQUEST, "All fields are required.");
    }

    match auth_service::login(&state, email, password).await {
        Ok(user_id) => Json(json!({
            "message": "OTP sent to email",
            "userId": user_id.to_hex(),
        }))
        .into_response(),
        Err(e) => auth_error_response(e),
    }
}

// POST /api/users/verify-login-otp
pub async fn verify_login_otp(
    State(state): State<AppState>,
    Json(payload): Json<OtpPayload>,
) -> Response {
    let (user_id, otp) = match (payload.user_id.as_deref(), payload.otp.as_deref()) {
        (Some(id), Some(otp)) if !otp.trim().is_empty() => (id, otp.trim()),
        _ => return message(StatusCode::BAD_REQUEST, "All fields are required."),
    };

    let user_id = match parse_user_id(user_id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match auth_service::verify_login_otp(&state, user_id, otp).await {
        Ok((token, user)) => Json(json!({
            "token": token,
            "user": {
                "id": user.id.to_hex(),
                "username": user.username,
                "email": user.email,
            }
        }))
        .into_response(),
        Err(e) => auth_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendPayload {
    pub user_id: Option<String>,
}

// POST /api/users/resend-otp
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<ResendPayload>,
) -> Response {
    let Some(raw) = payload.user_id.as_deref() else {
        return message(StatusCode::BAD_REQUEST, "All fields are required.");
    };

    let user_id = match parse_user_id(raw) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match auth_service::resend_otp(&state, user_id).await {
        Ok(()) => message(StatusCode::OK, "OTP resent to email"),
        Err(e) => auth_error_response(e),
    }
}

// GET /api/users/me
pub async fn me(user: Option<Extension<CurrentUser>>) -> Response {
    let Some(Extension(u)) = user else {
        return message(StatusCode::UNAUTHORIZED, "Invalid token");
    };

    Json(json!({
        "user": {
            "id": u.id.to_hex(),
            "username": u.username,
            "email": u.email,
        }
    }))
    .into_response()
}
