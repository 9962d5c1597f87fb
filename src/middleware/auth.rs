use axum::{
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    models::{CurrentUser, User},
    AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    // user id as hex string
    pub sub: String,
    // expiry (unix timestamp seconds)
    pub exp: usize,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    raw.strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn decode_user_id(state: &AppState, token: &str) -> Option<ObjectId> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.settings.jwt_secret.as_bytes()),
        &validation,
    )
    .ok()?;

    ObjectId::parse_str(&decoded.claims.sub).ok()
}

/// Decodes the Bearer token (if any) and stores the matching user in request
/// extensions so handlers can access it. Invalid or missing tokens simply
/// leave the extension unset; `require_auth` decides whether that is fatal.
pub async fn inject_current_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(req.headers()) {
        if let Some(user_id) = decode_user_id(&state, token) {
            let users = state.db.collection::<User>("users");

            if let Ok(Some(user)) = users.find_one(doc! { "_id": user_id }, None).await {
                req.extensions_mut().insert(CurrentUser::from(user));
            }
        }
    }

    next.run(req).await
}

/// Route layer for the order endpoints: 401 JSON unless
/// `inject_current_user` attached a CurrentUser.
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    if req.extensions().get::<CurrentUser>().is_none() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Authentication required" })),
        )
            .into_response();
    }

    next.run(req).await
}
