//! Accounts and access tokens.
//!
//! Users log in with their phone number. Passwords are stored as Argon2 PHC
//! strings; sessions are stateless HS256 tokens carrying the user's role.

use crate::{
    config::server::JwtSettings,
    core::string_enum,
    entities::{User, user},
    errors::{Error, Result, field_errors, map_unique_violation},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 6;

string_enum! {
    /// What a user may do
    pub enum Role("role") {
        Admin => "admin",
        Customer => "customer",
    }
}

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub name: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

/// The authenticated caller of a request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    /// Whether the caller may use the back office.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl TryFrom<Claims> for CurrentUser {
    type Error = Error;

    fn try_from(claims: Claims) -> Result<Self> {
        Ok(Self {
            id: claims.sub.parse().map_err(|_| Error::Unauthorized)?,
            name: claims.name,
            role: claims.role,
        })
    }
}

/// Issues and validates access tokens.
#[derive(Clone)]
pub struct JwtService {
    settings: JwtSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.settings.issuer)
            .field("expiration_minutes", &self.settings.expiration_minutes)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Creates a service from token settings.
    #[must_use]
    pub fn new(settings: JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            settings,
        }
    }

    /// Issues a token for a user.
    pub fn issue_token(&self, user: &user::Model) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            role: user.role.parse()?,
            exp: (now + Duration::minutes(self.settings.expiration_minutes)).timestamp(),
            iat: now.timestamp(),
            iss: self.settings.issuer.clone(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Validates a token's signature, expiry and issuer.
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.settings.issuer]);
        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }

    /// Strips the `Bearer ` prefix from an `Authorization` header value.
    #[must_use]
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ").map(str::trim)
    }
}

/// Hashes a password with Argon2 and a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })
}

/// Checks a password against a stored PHC string.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| Error::PasswordHash {
        message: e.to_string(),
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Sign-up form
#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(email(message = "Email is not a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Login form
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub phone: String,
    pub password: String,
}

/// Successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: user::Model,
}

async fn insert_user<C>(
    db: &C,
    name: &str,
    phone: &str,
    email: Option<String>,
    password: &str,
    role: Role,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    user::ActiveModel {
        name: Set(name.to_string()),
        phone: Set(phone.to_string()),
        email: Set(email),
        password_hash: Set(hash_password(password)?),
        role: Set(role.as_str().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| map_unique_violation(e, "phone"))
}

/// Creates a customer account.
///
/// # Errors
/// - `Error::Validation` for a missing name or phone, or a short password
/// - `Error::DuplicateKey` on `phone` if the number is already registered
pub async fn register(db: &DatabaseConnection, mut input: RegisterInput) -> Result<user::Model> {
    input.name = input.name.trim().to_string();
    input.phone = input.phone.trim().to_string();
    input.email = input
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    if let Err(errors) = input.validate() {
        return Err(Error::Validation {
            fields: field_errors(&errors),
        });
    }

    let user = insert_user(
        db,
        &input.name,
        &input.phone,
        input.email,
        &input.password,
        Role::Customer,
    )
    .await?;
    tracing::info!(user_id = user.id, "User registered");
    Ok(user)
}

/// Checks credentials and issues a token.
///
/// # Errors
/// Returns `Error::Unauthorized` for an unknown phone or a wrong password alike.
pub async fn login(
    db: &DatabaseConnection,
    jwt: &JwtService,
    input: LoginInput,
) -> Result<LoginResponse> {
    let user = User::find()
        .filter(user::Column::Phone.eq(input.phone.trim()))
        .one(db)
        .await?
        .ok_or(Error::Unauthorized)?;

    if !verify_password(&input.password, &user.password_hash)? {
        tracing::warn!(user_id = user.id, "Failed login attempt");
        return Err(Error::Unauthorized);
    }

    let token = jwt.issue_token(&user)?;
    tracing::info!(user_id = user.id, role = %user.role, "User logged in");
    Ok(LoginResponse { token, user })
}

/// Makes sure an administrator with this phone exists.
///
/// An existing account is promoted to admin; its password is left alone.
pub async fn ensure_admin<C>(db: &C, name: &str, phone: &str, password: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let phone = phone.trim();
    if let Some(existing) = User::find()
        .filter(user::Column::Phone.eq(phone))
        .one(db)
        .await?
    {
        if existing.role == Role::Admin.as_str() {
            return Ok(existing);
        }
        let mut promoted: user::ActiveModel = existing.into();
        promoted.role = Set(Role::Admin.as_str().to_string());
        let promoted = promoted.update(db).await?;
        tracing::info!(user_id = promoted.id, "Promoted user to admin");
        return Ok(promoted);
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::invalid_field(
            "password",
            "Password must be at least 6 characters",
        ));
    }
    let admin = insert_user(db, name.trim(), phone, None, password, Role::Admin).await?;
    tracing::info!(user_id = admin.id, "Created admin account");
    Ok(admin)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn register_input(phone: &str, password: &str) -> RegisterInput {
        RegisterInput {
            name: "Noura".to_string(),
            phone: phone.to_string(),
            email: None,
            password: password.to_string(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let stored = hash_password("secret123").unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(verify_password("secret123", &stored).unwrap());
        assert!(!verify_password("secret124", &stored).unwrap());
    }

    #[test]
    fn test_token_issue_and_validate() {
        let jwt = test_jwt();
        let user = user::Model {
            id: 7,
            name: "Admin".to_string(),
            phone: "0500000000".to_string(),
            email: None,
            password_hash: String::new(),
            role: "admin".to_string(),
            created_at: Utc::now(),
        };

        let token = jwt.issue_token(&user).unwrap();
        let claims = jwt.validate_token(&token).unwrap();
        let current = CurrentUser::try_from(claims).unwrap();
        assert_eq!(current.id, 7);
        assert!(current.is_admin());

        assert!(matches!(jwt.validate_token("garbage"), Err(Error::Token(_))));
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }

    #[tokio::test]
    async fn test_register_then_login() -> Result<()> {
        let db = setup_test_db().await?;
        let jwt = test_jwt();
        let user = register(&db, register_input(" 0511111111 ", "hunter22")).await?;
        assert_eq!(user.phone, "0511111111");
        assert_eq!(user.role, "customer");

        let response = login(
            &db,
            &jwt,
            LoginInput {
                phone: "0511111111".to_string(),
                password: "hunter22".to_string(),
            },
        )
        .await?;
        assert_eq!(response.user.id, user.id);
        let claims = jwt.validate_token(&response.token)?;
        assert_eq!(claims.role, Role::Customer);

        let json = serde_json::to_string(&response.user).unwrap();
        assert!(!json.contains("argon2"));

        Ok(())
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() -> Result<()> {
        let db = setup_test_db().await?;

        let short = register(&db, register_input("0512345678", "12345")).await;
        assert!(matches!(short, Err(Error::Validation { ref fields }) if fields[0].field == "password"));

        let no_phone = register(&db, register_input("  ", "123456")).await;
        assert!(matches!(no_phone, Err(Error::Validation { ref fields }) if fields[0].field == "phone"));

        register(&db, register_input("0512345678", "123456")).await?;
        let duplicate = register(&db, register_input("0512345678", "abcdef")).await;
        assert!(matches!(duplicate, Err(Error::DuplicateKey { ref field }) if field == "phone"));

        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_credentials_are_unauthorized() -> Result<()> {
        let db = setup_test_db().await?;
        let jwt = test_jwt();
        register(&db, register_input("0533333333", "correct-horse")).await?;

        for (phone, password) in [("0533333333", "wrong"), ("0599999999", "correct-horse")] {
            let result = login(
                &db,
                &jwt,
                LoginInput {
                    phone: phone.to_string(),
                    password: password.to_string(),
                },
            )
            .await;
            assert!(matches!(result, Err(Error::Unauthorized)));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent_and_promotes() -> Result<()> {
        let db = setup_test_db().await?;
        let first = ensure_admin(&db, "Owner", "0540000000", "admin-pass").await?;
        let again = ensure_admin(&db, "Owner", "0540000000", "other-pass").await?;
        assert_eq!(first.id, again.id);
        assert_eq!(again.role, "admin");

        let customer = register(&db, register_input("0541111111", "123456")).await?;
        let promoted = ensure_admin(&db, "Manager", "0541111111", "ignored").await?;
        assert_eq!(promoted.id, customer.id);
        assert_eq!(promoted.role, "admin");

        Ok(())
    }
}
