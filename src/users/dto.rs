use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::users::repo_types::{ProfilePatch, User};

/// Longest accepted bio, in characters.
pub const BIO_MAX_CHARS: usize = 250;

/// Shortest accepted plaintext password, applied to every path that sets
/// one.
pub const PASSWORD_MIN_CHARS: usize = 8;

const PASSWORD_POLICY_MESSAGE: &str = "Password must be at least 8 characters.";

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Empty and whitespace-only strings count as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Request body for registration. Fields are optional so missing input
/// reads as a validation failure, not a body-decode rejection.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Validated registration input. The password is still plaintext here;
/// hashing happens at the handler.
#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<NewUser, ApiError> {
        let name = self.name.unwrap_or_default().trim().to_string();
        let email = normalize_email(self.email.as_deref().unwrap_or_default());
        let password = self.password.unwrap_or_default();

        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ApiError::Validation("All fields are required.".into()));
        }
        if !is_valid_email(&email) {
            return Err(ApiError::Validation("Please provide a valid email.".into()));
        }
        if password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(ApiError::Validation(PASSWORD_POLICY_MESSAGE.into()));
        }

        Ok(NewUser {
            name,
            email,
            password,
        })
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Validated login input.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, ApiError> {
        let email = normalize_email(self.email.as_deref().unwrap_or_default());
        let password = self.password.unwrap_or_default();

        if email.is_empty() || password.is_empty() {
            return Err(ApiError::Validation("All fields are required.".into()));
        }

        Ok(Credentials { email, password })
    }
}

/// Request body for profile updates. Email is not a field: it is immutable
/// after registration, so a supplied value is dropped during deserialization.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(self) -> Result<ProfilePatch, ApiError> {
        let patch = ProfilePatch {
            name: non_empty(self.name).map(|n| n.trim().to_string()),
            phone: non_empty(self.phone),
            bio: non_empty(self.bio),
            photo: non_empty(self.photo),
        };

        if let Some(bio) = &patch.bio {
            if bio.chars().count() > BIO_MAX_CHARS {
                return Err(ApiError::Validation(
                    "Bio must be 250 characters or fewer.".into(),
                ));
            }
        }

        Ok(patch)
    }
}

/// Request body for password changes. Wire names stay camelCase.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub password: Option<String>,
}

/// Validated password-change input.
#[derive(Debug)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(self) -> Result<PasswordChange, ApiError> {
        let old_password = self.old_password.unwrap_or_default();
        let new_password = self.password.unwrap_or_default();

        if old_password.is_empty() || new_password.is_empty() {
            return Err(ApiError::Validation(
                "Please provide the old and new password.".into(),
            ));
        }
        if new_password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(ApiError::Validation(PASSWORD_POLICY_MESSAGE.into()));
        }

        Ok(PasswordChange {
            old_password,
            new_password,
        })
    }
}

/// Public profile returned to clients; never carries the password.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub phone: String,
    pub bio: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            photo: user.photo,
            phone: user.phone,
            bio: user.bio,
        }
    }
}

/// Body returned by register and login: the profile plus the session token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
}

/// Generic message body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn registration_normalizes_the_email() {
        let new_user = register("Ada", "  Ada@Example.COM ", "longenough")
            .validate()
            .expect("valid");
        assert_eq!(new_user.email, "ada@example.com");
        assert_eq!(new_user.name, "Ada");
    }

    #[test]
    fn registration_requires_every_field() {
        let request = RegisterRequest {
            name: Some("Ada".into()),
            email: None,
            password: Some("longenough".into()),
        };
        assert!(matches!(
            request.validate(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn registration_treats_empty_strings_as_missing() {
        let err = register("", "ada@example.com", "longenough")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn registration_rejects_bad_email() {
        let err = register("Ada", "not-an-email", "longenough")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn registration_rejects_short_password() {
        let err = register("Ada", "ada@example.com", "seven77")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn eight_character_password_is_accepted() {
        assert!(register("Ada", "ada@example.com", "eight888").validate().is_ok());
    }

    #[test]
    fn login_requires_both_fields() {
        let request = LoginRequest {
            email: Some("ada@example.com".into()),
            password: Some("".into()),
        };
        assert!(matches!(
            request.validate(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn profile_patch_keeps_absent_fields_absent() {
        let patch = UpdateProfileRequest {
            name: None,
            phone: Some("+44 20 7946 0000".into()),
            bio: Some("".into()),
            photo: None,
        }
        .validate()
        .expect("valid");
        assert_eq!(patch.name, None);
        assert_eq!(patch.phone.as_deref(), Some("+44 20 7946 0000"));
        assert_eq!(patch.bio, None, "empty string counts as absent");
        assert_eq!(patch.photo, None);
    }

    #[test]
    fn profile_patch_rejects_overlong_bio() {
        let request = UpdateProfileRequest {
            name: None,
            phone: None,
            bio: Some("x".repeat(BIO_MAX_CHARS + 1)),
            photo: None,
        };
        assert!(matches!(
            request.validate(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn profile_patch_ignores_a_supplied_email() {
        let request: UpdateProfileRequest =
            serde_json::from_str(r#"{"email": "new@example.com", "name": "Ada"}"#)
                .expect("deserialize");
        let patch = request.validate().expect("valid");
        assert_eq!(patch.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn change_password_uses_camel_case_wire_names() {
        let request: ChangePasswordRequest =
            serde_json::from_str(r#"{"oldPassword": "previous1", "password": "replacement"}"#)
                .expect("deserialize");
        let change = request.validate().expect("valid");
        assert_eq!(change.old_password, "previous1");
        assert_eq!(change.new_password, "replacement");
    }

    #[test]
    fn change_password_applies_the_length_policy() {
        let request = ChangePasswordRequest {
            old_password: Some("previous1".into()),
            password: Some("short".into()),
        };
        assert!(matches!(
            request.validate(),
            Err(ApiError::Validation(_))
        ));
    }
}
