/*!
 * # Authentication and Authorization Module
 *
 * Bearer tokens are issued by the identity service; this crate only
 * validates them (HS256, shared secret) and turns the claims into an
 * [`AuthUser`]. Authorization decisions go through a single function,
 * [`can_edit`], so every mutating handler asks the same question the same
 * way.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

mod capability;
mod roles;

pub use capability::{can_edit, require_edit, Resource};
pub use roles::Role;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,          // Subject (user ID)
    pub name: Option<String>, // Display name
    pub role: String,         // One of the dealer roles, e.g. "Sales Manager"
    pub iat: i64,             // Issued at time
    pub exp: i64,             // Expiration time
}

/// Authenticated principal extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub role: Role,
}

impl AuthUser {
    /// Check if the user holds a specific role
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    /// Directors and super admins may edit anything
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Director | Role::SuperAdmin)
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let role = Role::from_str(&claims.role).ok_or_else(|| {
            warn!(role = %claims.role, "token carries an unknown role");
            AuthError::InvalidToken
        })?;
        Ok(Self {
            user_id,
            name: claims.name,
            role,
        })
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Clock skew tolerated when checking `exp`
    pub leeway_secs: u64,
}

impl AuthConfig {
    pub fn new(jwt_secret: String) -> Self {
        Self {
            jwt_secret,
            leeway_secs: 30,
        }
    }
}

/// Validates bearer tokens issued by the identity service
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.config.leeway_secs;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Resolve the principal behind an `Authorization: Bearer` header
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingAuth)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or(AuthError::MissingToken)?;

        AuthUser::try_from(self.validate_token(token)?)
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingAuth,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Authentication service not available")]
    ServiceUnavailable,
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::ServiceUnavailable => ServiceError::InternalError(err.to_string()),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// Pulls the principal the auth middleware stored in the request extensions.
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Authentication middleware that extracts and validates auth tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => return AuthError::ServiceUnavailable.into_response(),
    };

    match auth_service.authenticate(request.headers()) {
        Ok(user) => {
            debug!(user_id = %user.user_id, role = %user.role, "request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit_test_secret_for_bititec_tokens_with_enough_length_0123456789";

    fn token(sub: &str, role: &str, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            name: Some("Wanjiru".into()),
            role: role.to_string(),
            iat: now,
            exp: now + exp_offset,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(SECRET.into()))
    }

    #[test]
    fn valid_token_yields_principal() {
        let id = Uuid::new_v4();
        let user = service()
            .authenticate(&headers_with(&token(&id.to_string(), "Inventory Manager", 600)))
            .unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.role, Role::InventoryManager);
        assert!(!user.is_admin());
    }

    #[test]
    fn expired_token_is_rejected() {
        let err = service()
            .authenticate(&headers_with(&token(&Uuid::new_v4().to_string(), "Director", -3600)))
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = service()
            .authenticate(&headers_with(&token(&Uuid::new_v4().to_string(), "Intern", 600)))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn missing_header_maps_to_unauthorized() {
        let err = service().authenticate(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AuthError::MissingAuth));
        assert_eq!(
            ServiceError::from(err).status_code(),
            axum::http::StatusCode::UNAUTHORIZED
        );
    }
}
