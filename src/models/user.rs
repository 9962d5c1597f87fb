use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub username: String,
    pub email: String,
    pub password_hash: String,

    #[serde(default)]
    pub is_verified: bool,

    // One-time code pending verification, if any (unix-millis expiry).
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub otp_expires: Option<i64>,
}

/// Authenticated identity injected into request extensions by the auth
/// middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub username: String,
    pub email: String,
}

impl From<User> for CurrentUser {
    fn from(u: User) -> Self {
        CurrentUser {
            id: u.id,
            username: u.username,
            email: u.email,
        }
    }
}
