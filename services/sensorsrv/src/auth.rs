//! Auth gate
//!
//! Issues and validates short-lived HS256 bearer tokens for a principal looked
//! up through a [`PrincipalDirectory`]. Nothing is stored server-side: a token
//! is valid iff its signature checks out and `now < exp`.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use errors::{AuthFailure, MonitorError, MonitorResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Fixed token lifetime
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Principal ID
    pub exp: i64,    // Expiration time (UTC seconds)
    pub iat: i64,    // Issued at (UTC seconds)
    pub jti: Uuid,   // Token ID
}

/// An authenticated identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub username: String,
}

/// Principal attached to request extensions by [`require_bearer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal(pub String);

/// Credential source used at login
pub trait PrincipalDirectory: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Option<Principal>;
}

/// Single built-in user
pub struct StaticPrincipalDirectory {
    username: String,
    password: String,
}

impl StaticPrincipalDirectory {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for StaticPrincipalDirectory {
    fn default() -> Self {
        Self::new("admin", "password")
    }
}

impl PrincipalDirectory for StaticPrincipalDirectory {
    fn authenticate(&self, username: &str, password: &str) -> Option<Principal> {
        (username == self.username && password == self.password).then(|| Principal {
            id: self.username.clone(),
            username: self.username.clone(),
        })
    }
}

/// A freshly issued credential
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub principal_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates bearer tokens
pub struct AuthGate {
    directory: Arc<dyn PrincipalDirectory>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthGate {
    pub fn new(secret: &str, directory: Arc<dyn PrincipalDirectory>) -> Self {
        Self {
            directory,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Exchange a username/password pair for a token valid for one hour
    pub fn issue(&self, username: &str, password: &str) -> MonitorResult<IssuedToken> {
        self.issue_at(username, password, Utc::now())
    }

    pub fn issue_at(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> MonitorResult<IssuedToken> {
        let Some(principal) = self.directory.authenticate(username, password) else {
            warn!(username, "Login rejected");
            return Err(AuthFailure::InvalidCredentials.into());
        };

        let expires_at = now + Duration::seconds(TOKEN_LIFETIME_SECS);
        let claims = Claims {
            sub: principal.id.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| MonitorError::Internal(format!("Failed to generate token: {}", e)))?;

        info!(principal = %principal.id, "Token issued");
        Ok(IssuedToken {
            token,
            principal_id: principal.id,
            expires_at,
        })
    }

    /// Validate a raw token, returning the embedded principal id
    pub fn validate(&self, token: Option<&str>) -> MonitorResult<String> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: Option<&str>, now: DateTime<Utc>) -> MonitorResult<String> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AuthFailure::Missing)?;

        // Expiry is checked below against the caller's clock
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                AuthFailure::Malformed
            })?;

        if now.timestamp() >= claims.exp {
            return Err(AuthFailure::Expired.into());
        }

        Ok(claims.sub)
    }

    /// Validate an `Authorization` header value
    pub fn validate_header(&self, header_value: Option<&str>) -> MonitorResult<String> {
        match header_value {
            None => Err(AuthFailure::Missing.into()),
            Some(value) => {
                // Auth scheme names are case-insensitive
                let (scheme, token) = value
                    .trim_start()
                    .split_once(' ')
                    .ok_or(AuthFailure::Malformed)?;
                if !scheme.eq_ignore_ascii_case("bearer") {
                    return Err(AuthFailure::Malformed.into());
                }
                self.validate(Some(token.trim()))
            },
        }
    }
}

/// Middleware guarding protected routes
///
/// ```rust,ignore
/// Router::new()
///     .route("/events", get(list_events))
///     .route_layer(middleware::from_fn_with_state(gate, require_bearer))
/// ```
pub async fn require_bearer(
    State(gate): State<Arc<AuthGate>>,
    mut req: Request,
    next: Next,
) -> Result<Response, MonitorError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().map_err(|_| MonitorError::from(AuthFailure::Malformed)))
        .transpose()?;

    let principal = gate.validate_header(header_value)?;
    req.extensions_mut().insert(AuthenticatedPrincipal(principal));

    Ok(next.run(req).await)
}
