use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Extension, State},
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::api::{success, ApiResponse};
use crate::error::ApiError;
use crate::main_lib::AppState;

/// Closed set of account roles carried in access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Organizer,
    Vendor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Organizer => "organizer",
            Role::Vendor => "vendor",
        }
    }

    /// Whether this role may call routes guarded by `scope`.
    pub fn allows(self, scope: Scope) -> bool {
        match (scope, self) {
            (Scope::Authenticated, _) => true,
            (Scope::Admin, Role::Admin) => true,
            (Scope::Admin, Role::User | Role::Organizer | Role::Vendor) => false,
            (Scope::Organizer, Role::Admin | Role::Organizer) => true,
            (Scope::Organizer, Role::User | Role::Vendor) => false,
            (Scope::TicketDesk, Role::Admin | Role::Organizer | Role::Vendor) => true,
            (Scope::TicketDesk, Role::User) => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Route groups and the roles they admit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Authenticated,
    Admin,
    /// Organizers and admins.
    Organizer,
    /// Organizers, admins and vendors scanning tickets at the door.
    TicketDesk,
}

#[derive(Debug)]
pub enum AuthError {
    Unauthorized,
    Forbidden,
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized => ApiError::Unauthorized("Unauthorized".to_string()),
            AuthError::Forbidden => {
                ApiError::Forbidden("Your role does not allow this action".to_string())
            }
            AuthError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Caller identity resolved by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub token_id: String,
    pub expires_at: i64,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            token_id: claims.jti,
            expires_at: claims.exp,
        }
    }
}

/// Token ids revoked before their natural expiry.
pub trait RevokedTokenStore: Send + Sync {
    fn is_revoked(&self, token_id: &str) -> bool;

    /// Remembers `token_id` until `expires_at` (unix seconds).
    fn revoke(&self, token_id: &str, expires_at: i64);

    /// Forgets entries whose token would have expired anyway. Returns how many were dropped.
    fn purge_expired(&self, now: i64) -> usize;
}

#[derive(Default)]
pub struct InMemoryRevokedTokens {
    entries: DashMap<String, i64>,
}

impl InMemoryRevokedTokens {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RevokedTokenStore for InMemoryRevokedTokens {
    fn is_revoked(&self, token_id: &str) -> bool {
        self.entries.contains_key(token_id)
    }

    fn revoke(&self, token_id: &str, expires_at: i64) {
        self.entries.insert(token_id.to_string(), expires_at);
    }

    fn purge_expired(&self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before - self.entries.len()
    }
}

pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
    revoked: Arc<dyn RevokedTokenStore>,
}

impl AuthManager {
    pub fn new(
        jwt_secret: &[u8],
        token_ttl: Duration,
        revoked: Arc<dyn RevokedTokenStore>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret),
            decoding_key: DecodingKey::from_secret(jwt_secret),
            validation,
            token_ttl,
            revoked,
        }
    }

    /// Signs an access token. Sign-in itself happens in the identity
    /// provider; this is the issuing half shared with it.
    pub fn issue_token(&self, user_id: &str, email: &str, role: Role) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.token_ttl.as_secs() as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {e}")))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!("Rejected access token: {err}");
                AuthError::Unauthorized
            })?;
        if self.revoked.is_revoked(&claims.jti) {
            return Err(AuthError::Unauthorized);
        }
        Ok(claims)
    }

    pub fn revoke(&self, user: &AuthUser) {
        self.revoked.revoke(&user.token_id, user.expires_at);
    }

    pub fn purge_revoked(&self) -> usize {
        self.revoked.purge_expired(Utc::now().timestamp())
    }
}

/// Accepts a base64 key that decodes to 32 bytes, or a raw 32-byte ASCII string.
pub fn decode_secret_key(raw: &str) -> anyhow::Result<Vec<u8>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        anyhow::bail!("JWT secret cannot be empty");
    }
    match BASE64.decode(trimmed) {
        Ok(bytes) if bytes.len() == 32 => Ok(bytes),
        _ if trimmed.len() == 32 => Ok(trimmed.as_bytes().to_vec()),
        _ => anyhow::bail!("JWT secret must be base64 of 32 bytes or a 32-byte ASCII string"),
    }
}

fn bearer_token(request: &Request<Body>) -> Result<&str, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::Unauthorized)?;

    let mut parts = header.splitn(2, ' ');
    let (Some(scheme), Some(token)) = (parts.next(), parts.next()) else {
        return Err(AuthError::Unauthorized);
    };
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(AuthError::Unauthorized);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Unauthorized);
    }
    Ok(token)
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = state.auth.validate_token(bearer_token(&request)?)?;
    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Rejects callers whose role is outside `scope`. Must run after [`require_auth`].
pub async fn require_scope(
    State(scope): State<Scope>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::Unauthorized)?;
    if !user.role.allows(scope) {
        tracing::debug!(user_id = %user.user_id, role = %user.role, ?scope, "Role rejected");
        return Err(AuthError::Forbidden);
    }
    Ok(next.run(request).await)
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<ApiResponse<()>> {
    state.auth.revoke(&user);
    tracing::info!(user_id = %user.user_id, "Access token revoked");
    success("Logged out", ())
}
