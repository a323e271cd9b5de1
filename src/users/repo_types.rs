use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 digest, never exposed in JSON
    pub photo: String,
    pub phone: String,
    pub bio: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Store-level profile patch; `None` keeps the stored value. Email is not
/// part of the patch: it is immutable after registration.
#[derive(Debug)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
}
