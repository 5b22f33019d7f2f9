//! Bearer-token verification middleware

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Claims carried by the hosted auth provider's tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Facility the user belongs to
    pub facility_id: Uuid,
    /// `facility_staff` or `client`
    pub role: String,
    /// Expiry (unix seconds)
    pub exp: usize,
}

/// The authenticated caller, inserted as a request extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub facility_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        self.role == "facility_staff"
    }

    /// Guard for staff-only operations
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Extract the bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Require a valid bearer token on the request.
///
/// On success the decoded [`AuthUser`] is inserted as an extension for
/// handlers to pick up; anything else is a 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;

    let key = DecodingKey::from_secret(state.config.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        ApiError::Unauthorized
    })?;

    let user_id: Uuid = data
        .claims
        .sub
        .parse()
        .map_err(|_| ApiError::Unauthorized)?;

    req.extensions_mut().insert(AuthUser {
        user_id,
        facility_id: data.claims.facility_id,
        role: data.claims.role,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"test-secret-test-secret-test-secret!";

    fn token_for(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn claims(role: &str, exp: usize) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            facility_id: Uuid::new_v4(),
            role: role.to_string(),
            exp,
        }
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn valid_token_round_trips() {
        let far_future = 4_102_444_800; // 2100-01-01
        let claims = claims("facility_staff", far_future);
        let token = token_for(&claims);

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(SECRET),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, claims.sub);
        assert_eq!(decoded.claims.facility_id, claims.facility_id);
        assert_eq!(decoded.claims.role, "facility_staff");
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = claims("facility_staff", 1_000_000_000); // 2001
        let token = token_for(&claims);

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(SECRET),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let far_future = 4_102_444_800;
        let claims = claims("client", far_future);
        let token = token_for(&claims);

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"a-completely-different-secret-value"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }

    #[test]
    fn staff_guard() {
        let staff = AuthUser {
            user_id: Uuid::new_v4(),
            facility_id: Uuid::new_v4(),
            role: "facility_staff".to_string(),
        };
        assert!(staff.require_staff().is_ok());

        let client = AuthUser {
            user_id: Uuid::new_v4(),
            facility_id: Uuid::new_v4(),
            role: "client".to_string(),
        };
        assert!(matches!(client.require_staff(), Err(ApiError::Forbidden)));
    }
}
