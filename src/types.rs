use diesel::pg::PgConnection;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

pub trait Validate
where
    Self: Sized,
{
    type Error;
    fn validate(self, connection: &mut PgConnection) -> Result<Self, Self::Error>;
}

#[derive(Debug)]
pub enum ApiError {
    Diesel(DieselError),
    Validation(ValidationError),
    BadRequest(&'static str),
    NotFound(&'static str),
    /// Reported with status 400, the same code clients already handle for
    /// duplicate likes and follows.
    Conflict(&'static str),
    InvalidCredentials,
    Unauthorized,
    Forbidden,
    Internal(&'static str),
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> ApiError {
        ApiError::Diesel(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> ApiError {
        ApiError::Validation(err)
    }
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Diesel(DieselError::NotFound) => Status::NotFound,
            ApiError::Diesel(_) | ApiError::Internal(_) => Status::InternalServerError,
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::Conflict(_) => {
                Status::BadRequest
            }
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::InvalidCredentials | ApiError::Unauthorized => Status::Unauthorized,
            ApiError::Forbidden => Status::Forbidden,
        }
    }

    /// Maps a unique-key violation to `Conflict`, leaving other errors as they are.
    pub fn on_unique_violation(err: DieselError, message: &'static str) -> ApiError {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ApiError::Conflict(message)
            }
            other => ApiError::Diesel(other),
        }
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize, Default)]
pub struct ValidationError(HashMap<String, Vec<String>>);

impl ValidationError {
    pub fn add_error<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) {
        let entry = self.0.entry(key.into()).or_default();
        entry.push(val.into());
    }

    pub fn from<K: Into<String>, V: Into<String>>(key: K, val: V) -> Self {
        let mut error = ValidationError::default();
        error.add_error(key, val);
        error
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn merge(&mut self, other: ValidationError) {
        for (key, errors) in other.0.into_iter() {
            let entry = self.0.entry(key).or_default();
            entry.extend(errors);
        }
    }

    pub fn empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(|errors| errors.as_slice())
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let body = match self {
            ApiError::Diesel(DieselError::NotFound) => json!({ "error": "Not found" }),
            ApiError::Diesel(error) => {
                log::error!("{} {}: database error: {}", req.method(), req.uri(), error);
                json!({ "error": "Internal server error" })
            }
            ApiError::Internal(message) => {
                log::error!("{} {}: {}", req.method(), req.uri(), message);
                json!({ "error": message })
            }
            ApiError::Validation(errors) => {
                json!({ "error": "Validation failed", "errors": errors })
            }
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message) => json!({ "error": message }),
            ApiError::InvalidCredentials => json!({ "error": "Invalid email or password" }),
            ApiError::Unauthorized => json!({ "error": "Unauthorized" }),
            ApiError::Forbidden => json!({ "error": "Forbidden" }),
        };
        (status, Json(body)).respond_to(req)
    }
}

impl<T> Validate for Json<T>
where
    T: Validate,
{
    type Error = <T as Validate>::Error;
    fn validate(self, connection: &mut PgConnection) -> Result<Self, Self::Error> {
        let inner = self.into_inner();
        let validated = inner.validate(connection)?;
        Ok(Json(validated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_reuse_bad_request() {
        assert_eq!(ApiError::Conflict("dup").status(), Status::BadRequest);
        assert_eq!(ApiError::BadRequest("bad").status(), Status::BadRequest);
    }

    #[test]
    fn auth_failures_keep_distinct_codes() {
        assert_eq!(ApiError::Unauthorized.status(), Status::Unauthorized);
        assert_eq!(ApiError::InvalidCredentials.status(), Status::Unauthorized);
        assert_eq!(ApiError::Forbidden.status(), Status::Forbidden);
    }

    #[test]
    fn diesel_not_found_is_404() {
        assert_eq!(ApiError::from(DieselError::NotFound).status(), Status::NotFound);
        assert_eq!(
            ApiError::from(DieselError::RollbackTransaction).status(),
            Status::InternalServerError
        );
    }

    #[test]
    fn unique_violation_becomes_conflict() {
        let err = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(String::from("duplicate key")),
        );
        match ApiError::on_unique_violation(err, "Already following user") {
            ApiError::Conflict(message) => assert_eq!(message, "Already following user"),
            other => panic!("unexpected error: {:?}", other),
        }
        match ApiError::on_unique_violation(DieselError::NotFound, "ignored") {
            ApiError::Diesel(DieselError::NotFound) => {}
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn validation_errors_merge_per_field() {
        let mut errors = ValidationError::from("email", "Invalid email: x");
        let mut other = ValidationError::from("email", "Email already exists");
        other.add_error("password", "Password too short");
        errors.merge(other);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("email").map(|e| e.len()), Some(2));
        assert!(!errors.empty());
    }
}
