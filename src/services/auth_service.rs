use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use mongodb::bson::{doc, oid::ObjectId, Bson};
use rand::Rng;
use thiserror::Error;

use crate::models::{CurrentUser, User};
use crate::AppState;

use super::clock::Clock;
use super::notifier::OtpNotifier;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("User already exists. Please login.")]
    UserExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email not verified. Please verify your email.")]
    NotVerified,
    #[error("Already verified")]
    AlreadyVerified,
    #[error("Invalid or expired OTP")]
    InvalidOtp,
    #[error("User not found")]
    UserNotFound,
    #[error("server error: {0}")]
    Server(String),
}

fn server_err<E: std::fmt::Display>(e: E) -> AuthError {
    AuthError::Server(e.to_string())
}

#[derive(serde::Serialize)]
struct Claims {
    sub: String,
    exp: usize,
}

pub fn make_jwt(state: &AppState, user_id: &ObjectId) -> Result<String, AuthError> {
    let exp = (Utc::now() + Duration::days(1)).timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_hex(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.settings.jwt_secret.as_bytes()),
    )
    .map_err(server_err)
}

fn generate_otp() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// Store a fresh OTP on the user and hand it to the notifier. Delivery
/// mechanics (mail, SMS, log) are the notifier's business.
async fn issue_otp(state: &AppState, user: &User) -> Result<(), AuthError> {
    let otp = generate_otp();
    let expires = state.clock.now_ms() + state.settings.otp_ttl_minutes * 60 * 1000;

    state
        .db
        .collection::<User>("users")
        .update_one(
            doc! { "_id": user.id },
            doc! { "$set": { "otp": &otp, "otp_expires": expires } },
            None,
        )
        .await
        .map_err(server_err)?;

    state
        .notifier
        .send_otp(&user.email, &user.username, &otp)
        .await
        .map_err(AuthError::Server)?;

    Ok(())
}

/// Create an unverified user and send the first OTP. An existing username or
/// email is not an error to the client; they are told to log in instead.
pub async fn register(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<ObjectId, AuthError> {
    let users = state.db.collection::<User>("users");

    let existing = users
        .find_one(
            doc! { "$or": [ { "username": username }, { "email": email } ] },
            None,
        )
        .await
        .map_err(server_err)?;
    if existing.is_some() {
        return Err(AuthError::UserExists);
    }

    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(server_err)?;

    let insert = users
        .clone_with_type::<mongodb::bson::Document>()
        .insert_one(
            doc! {
                "username": username,
                "email": email,
                "password_hash": password_hash,
                "is_verified": false,
            },
            None,
        )
        .await
        .map_err(server_err)?;

    let user_id = insert
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AuthError::Server("insert returned no id".to_string()))?;

    let user = users
        .find_one(doc! { "_id": user_id }, None)
        .await
        .map_err(server_err)?
        .ok_or(AuthError::UserNotFound)?;

    issue_otp(state, &user).await?;

    tracing::info!(user_id = %user_id, "user registered, verification OTP sent");
    Ok(user_id)
}

fn otp_matches(state: &AppState, user: &User, otp: &str) -> bool {
    match (&user.otp, user.otp_expires) {
        (Some(stored), Some(expires)) => stored == otp && expires >= state.clock.now_ms(),
        _ => false,
    }
}

async fn clear_otp(
    state: &AppState,
    user_id: ObjectId,
    mark_verified: bool,
) -> Result<(), AuthError> {
    let mut set = doc! { "otp": Bson::Null, "otp_expires": Bson::Null };
    if mark_verified {
        set.insert("is_verified", true);
    }

    state
        .db
        .collection::<User>("users")
        .update_one(doc! { "_id": user_id }, doc! { "$set": set }, None)
        .await
        .map_err(server_err)?;
    Ok(())
}

/// Confirm the registration OTP and mark the account verified.
pub async fn verify_otp(state: &AppState, user_id: ObjectId, otp: &str) -> Result<(), AuthError> {
    let users = state.db.collection::<User>("users");

    let user = users
        .find_one(doc! { "_id": user_id }, None)
        .await
        .map_err(server_err)?
        .ok_or(AuthError::UserNotFound)?;

    if user.is_verified {
        return Err(AuthError::AlreadyVerified);
    }
    if !otp_matches(state, &user, otp) {
        return Err(AuthError::InvalidOtp);
    }

    clear_otp(state, user_id, true).await
}

/// Password check, then a login OTP. The JWT is only issued once that OTP is
/// verified.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<ObjectId, AuthError> {
    let users = state.db.collection::<User>("users");

    let user = users
        .find_one(doc! { "email": email }, None)
        .await
        .map_err(server_err)?
        .ok_or(AuthError::InvalidCredentials)?;

    if !bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
        return Err(AuthError::InvalidCredentials);
    }
    if !user.is_verified {
        return Err(AuthError::NotVerified);
    }

    issue_otp(state, &user).await?;
    Ok(user.id)
}

/// Confirm the login OTP; returns the session token and the user projection.
pub async fn verify_login_otp(
    state: &AppState,
    user_id: ObjectId,
    otp: &str,
) -> Result<(String, CurrentUser), AuthError> {
    let users = state.db.collection::<User>("users");

    let user = users
        .find_one(doc! { "_id": user_id }, None)
        .await
        .map_err(server_err)?
        .ok_or(AuthError::UserNotFound)?;

    if !otp_matches(state, &user, otp) {
        return Err(AuthError::InvalidOtp);
    }

    clear_otp(state, user_id, false).await?;

    let token = make_jwt(state, &user_id)?;
    Ok((token, CurrentUser::from(user)))
}

pub async fn resend_otp(state: &AppState, user_id: ObjectId) -> Result<(), AuthError> {
    let user = state
        .db
        .collection::<User>("users")
        .find_one(doc! { "_id": user_id }, None)
        .await
        .map_err(server_err)?
        .ok_or(AuthError::UserNotFound)?;

    issue_otp(state, &user).await
}

#[cfg(test)]
mod tests {
    use super::generate_otp;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
