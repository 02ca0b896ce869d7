use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest};
use rocket::{Request, State};
use std::ops::Deref;

use super::token::Tokens;
use crate::db::DbConnection;
use crate::types::ApiError;
use crate::users::models::User;

/// The user a request was authenticated as. Handlers that take this guard
/// only run once the bearer token has been verified and its user loaded.
#[derive(Debug)]
pub struct AuthUser(pub User);

impl Deref for AuthUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

impl AuthUser {
    pub fn into_inner(self) -> User {
        self.0
    }
}

/// Extracts the token from an `Authorization` header value. A leading
/// `Bearer ` is stripped; anything left is handed to verification as is.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?;
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Missing token: 401. Token that fails verification: 403. Verified token
/// whose user no longer exists: 401.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = match bearer_token(request.headers().get_one("Authorization")) {
            Some(token) => token,
            None => return Outcome::Error((Status::Unauthorized, ApiError::Unauthorized)),
        };

        let tokens = match request.guard::<&State<Tokens>>().await {
            Outcome::Success(tokens) => tokens,
            _ => {
                return Outcome::Error((
                    Status::InternalServerError,
                    ApiError::Internal("token service is not configured"),
                ))
            }
        };

        let claims = match tokens.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                log::warn!("rejected bearer token: {:?}", e);
                return Outcome::Error((Status::Forbidden, ApiError::Forbidden));
            }
        };

        let conn = match request.guard::<DbConnection>().await {
            Outcome::Success(conn) => conn,
            _ => {
                return Outcome::Error((
                    Status::ServiceUnavailable,
                    ApiError::Internal("database unavailable"),
                ))
            }
        };

        let user_id = claims.id;
        match conn.run(move |c| Ok(User::find(c, user_id)?)).await {
            Ok(Some(user)) => Outcome::Success(AuthUser(user)),
            Ok(None) => {
                log::warn!("token for user {} who no longer exists", user_id);
                Outcome::Error((Status::Unauthorized, ApiError::Unauthorized))
            }
            Err(e) => {
                log::error!("failed to load user {}: {:?}", user_id, e);
                Outcome::Error((e.status(), e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::bearer_token;

    #[test]
    fn missing_or_empty_header_has_no_token() {
        assert_eq!(bearer_token(None), None);
        assert_eq!(bearer_token(Some("")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Bearer    ")), None);
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(Some("Bearer invalidtoken")), Some("invalidtoken"));
    }

    #[test]
    fn other_schemes_are_passed_through_for_verification() {
        assert_eq!(bearer_token(Some("Token abc")), Some("Token abc"));
    }
}
