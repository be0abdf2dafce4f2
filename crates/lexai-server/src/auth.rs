//! User accounts: signup, login and bearer-token authentication.
//!
//! Passwords are stored as Argon2 PHC strings. Access tokens are HS256 JWTs
//! whose `sub` is the user id.

use std::sync::Arc;
use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, rand_core::RngCore, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use axum::{
    async_trait,
    extract::{
        rejection::{FormRejection, JsonRejection},
        FromRequestParts, State,
    },
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::store::{Store, User};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: u64,
}

/// Signing keys and lifetime for access tokens.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Keys from a fresh random secret. Tokens do not survive a restart.
    pub fn random(ttl: Duration) -> Self {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self::new(&secret, ttl)
    }

    pub fn issue(&self, user_id: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: Utc::now().timestamp().max(0) as u64 + self.ttl.as_secs(),
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// The user id of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Option<i64> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).ok()?;
        data.claims.sub.parse().ok()
    }
}

async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

async fn verify_password(password: String, stored_hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || password_matches(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn password_matches(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Issued on signup and login.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
}

/// Account operations over the store.
#[derive(Clone)]
pub struct Accounts {
    store: Store,
    tokens: Arc<TokenKeys>,
}

impl Accounts {
    pub fn new(store: Store, tokens: TokenKeys) -> Self {
        Self {
            store,
            tokens: Arc::new(tokens),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn token_for(&self, user: User) -> Result<TokenResponse, ApiError> {
        let access_token = self
            .tokens
            .issue(user.id)
            .map_err(|e| ApiError::Internal(format!("Token signing failed: {}", e)))?;
        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            user_id: user.id,
            email: user.email,
            full_name: user.full_name,
        })
    }

    /// The user named by the request's bearer token.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<User, ApiError> {
        let token = bearer_token(headers).ok_or(ApiError::NotAuthenticated)?;
        let user_id = self.tokens.verify(token).ok_or(ApiError::InvalidToken)?;
        self.store
            .user_by_id(user_id)
            .await?
            .ok_or(ApiError::InvalidToken)
    }
}

/// Extractor for routes that require a signed-in user.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        state.accounts.authenticate(&parts.headers).await.map(CurrentUser)
    }
}

#[derive(Debug, Deserialize)]
struct SignupRequest {
    email: String,
    password: String,
    full_name: String,
}

/// OAuth2 password-grant form; the email travels as `username`.
#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
}

async fn signup(
    State(state): State<AppState>,
    request: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = request?;
    let accounts = &state.accounts;

    if accounts
        .store
        .user_by_email(request.email.clone())
        .await?
        .is_some()
    {
        return Err(ApiError::EmailTaken);
    }

    let password_hash = hash_password(request.password).await?;
    let user = accounts
        .store
        .create_user(request.email, password_hash, request.full_name)
        .await?;
    tracing::info!(user_id = user.id, "User registered");

    accounts.token_for(user).map(Json)
}

async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Form(form) = form?;
    let accounts = &state.accounts;

    let Some(found) = accounts.store.user_by_email(form.username).await? else {
        return Err(ApiError::InvalidCredentials);
    };
    if !verify_password(form.password, found.password_hash).await? {
        tracing::debug!(user_id = found.user.id, "Password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    accounts.token_for(found.user).map(Json)
}

async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn keys() -> TokenKeys {
        TokenKeys::new(b"test-secret", Duration::from_secs(1800))
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let hash = hash_password("hunter22".to_string()).await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("hunter22"));

        assert!(password_matches("hunter22", &hash));
        assert!(!password_matches("hunter23", &hash));
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!password_matches("anything", "not-a-phc-string"));
        assert!(!password_matches("", ""));
    }

    #[test]
    fn test_token_round_trip() {
        let keys = keys();
        let token = keys.issue(42).unwrap();
        assert_eq!(keys.verify(&token), Some(42));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = TokenKeys::new(b"other-secret", Duration::from_secs(60))
            .issue(42)
            .unwrap();
        assert_eq!(keys().verify(&token), None);
        assert_eq!(keys().verify("not.a.jwt"), None);
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = Claims {
            sub: "42".to_string(),
            exp: Utc::now().timestamp() as u64 - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert_eq!(keys().verify(&token), None);
    }

    #[test]
    fn test_random_keys_differ() {
        let ttl = Duration::from_secs(60);
        let token = TokenKeys::random(ttl).issue(1).unwrap();
        assert_eq!(TokenKeys::random(ttl).verify(&token), None);
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
