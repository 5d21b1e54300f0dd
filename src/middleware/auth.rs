use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::header};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    error::{AppError, AppResult},
    models::Role,
    state::AppState,
};

/// Caller identity resolved from the auth provider's session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Per-request session context, passed explicitly into every service call.
/// Anonymous when the request carries no valid token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session(pub Option<SessionUser>);

impl Session {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn signed_in(user: SessionUser) -> Self {
        Self(Some(user))
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.0.as_ref()
    }

    pub fn require_user(&self) -> AppResult<&SessionUser> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }

    pub fn require_admin(&self) -> AppResult<&SessionUser> {
        match self.0.as_ref() {
            Some(user) if user.is_admin() => Ok(user),
            _ => Err(AppError::Unauthorized),
        }
    }

    /// Resource owner or admin.
    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> AppResult<&SessionUser> {
        let user = self.require_user()?;
        if user.is_admin() || user.user_id == owner_id {
            Ok(user)
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

/// Verifies session tokens signed with the secret shared with the auth provider.
#[derive(Clone)]
pub struct SessionVerifier {
    decoding: DecodingKey,
}

impl SessionVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn verify(&self, token: &str) -> Option<SessionUser> {
        let decoded = match decode::<Claims>(token, &self.decoding, &Validation::default()) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::debug!(error = %err, "rejected session token");
                return None;
            }
        };
        let user_id = Uuid::parse_str(&decoded.claims.sub).ok()?;
        Some(SessionUser {
            user_id,
            role: decoded.claims.role,
            name: decoded.claims.name,
            email: decoded.claims.email,
        })
    }

    /// Resolve a session from an `Authorization` header value.
    pub fn session_from_header(&self, value: Option<&str>) -> Session {
        let user = value
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .and_then(|token| self.verify(token));
        Session(user)
    }
}

/// Sign a session token the way the auth provider does. Used by the seed tool
/// and tests; production tokens come from the provider.
pub fn issue_token(secret: &str, user: &SessionUser, ttl: Duration) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.user_id.to_string(),
        role: user.role,
        name: user.name.clone(),
        email: user.email.clone(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        Ok(state.sessions.session_from_header(header_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-with-enough-length";

    fn user(role: Role) -> SessionUser {
        SessionUser {
            user_id: Uuid::new_v4(),
            role,
            name: "Amina".into(),
            email: "amina@example.com".into(),
        }
    }

    #[test]
    fn valid_token_yields_signed_in_session() {
        let admin = user(Role::Admin);
        let token = issue_token(SECRET, &admin, Duration::hours(1)).unwrap();
        let verifier = SessionVerifier::new(SECRET);

        let session = verifier.session_from_header(Some(&format!("Bearer {token}")));
        assert_eq!(session.user(), Some(&admin));
        assert!(session.require_admin().is_ok());
    }

    #[test]
    fn bad_or_missing_token_is_anonymous() {
        let token = issue_token("another-secret", &user(Role::Admin), Duration::hours(1)).unwrap();
        let verifier = SessionVerifier::new(SECRET);

        assert_eq!(verifier.session_from_header(None), Session::anonymous());
        assert_eq!(
            verifier.session_from_header(Some(&format!("Bearer {token}"))),
            Session::anonymous()
        );
        assert_eq!(verifier.session_from_header(Some("Basic abc")), Session::anonymous());
    }

    #[test]
    fn expired_token_is_anonymous() {
        let token = issue_token(SECRET, &user(Role::Regular), Duration::hours(-2)).unwrap();
        let verifier = SessionVerifier::new(SECRET);
        assert!(verifier.verify(&token).is_none());
    }

    #[test]
    fn role_checks() {
        let customer = user(Role::Regular);
        let session = Session::signed_in(customer.clone());
        assert!(matches!(session.require_admin(), Err(AppError::Unauthorized)));
        assert!(session.require_owner_or_admin(customer.user_id).is_ok());
        assert!(matches!(
            session.require_owner_or_admin(Uuid::new_v4()),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            Session::anonymous().require_user(),
            Err(AppError::Unauthorized)
        ));
        let admin = Session::signed_in(user(Role::Admin));
        assert!(admin.require_owner_or_admin(Uuid::new_v4()).is_ok());
    }
}
