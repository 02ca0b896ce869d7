use diesel::insert_into;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{AuthUser, Tokens};
use crate::db::DbConnection;
use crate::follow;
use crate::types::{ApiError, ApiResult, Validate, ValidationError};

pub mod models;
mod utils;

use self::utils::*;

#[derive(Debug, Deserialize)]
pub struct Registration {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl Validate for Registration {
    type Error = ApiError;
    fn validate(self, connection: &mut PgConnection) -> Result<Self, Self::Error> {
        let mut errors = ValidationError::default();

        if let Err(e) = validate_name(&self.name) {
            errors.merge(e);
        }

        match validate_email(&self.email, connection) {
            Ok(_) => {}
            Err(ApiError::Validation(e)) => errors.merge(e),
            Err(other) => return Err(other),
        }

        if let Err(e) = validate_password(&self.password) {
            errors.merge(e);
        }

        if errors.empty() {
            Ok(self)
        } else {
            Err(errors.into())
        }
    }
}

#[post("/register", data = "<registration>")]
pub async fn register(
    connection: DbConnection,
    registration: Json<Registration>,
) -> Result<(Status, Json<Value>), ApiError> {
    let registration = registration.into_inner();
    let user = connection
        .run(move |conn| {
            use crate::db::schema::users::dsl::*;

            let registration = registration.validate(conn)?;
            let hashed = models::User::make_password(&registration.password).map_err(|e| {
                log::error!("failed to hash password: {}", e);
                ApiError::Internal("Internal server error")
            })?;
            let new_user = models::NewUser {
                name: registration.name,
                email: registration.email,
                password: hashed,
            };

            insert_into(users)
                .values(&new_user)
                .get_result::<models::User>(conn)
                .map_err(|e| ApiError::on_unique_violation(e, "Email already exists"))
        })
        .await?;

    Ok((
        Status::Created,
        Json(json!({ "id": user.id, "name": user.name, "email": user.email })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct Login {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[post("/authenticate", data = "<login>")]
pub async fn authenticate(
    connection: DbConnection,
    tokens: &State<Tokens>,
    login: Json<Login>,
) -> ApiResult<Value> {
    let login = login.into_inner();
    let user = connection
        .run(move |conn| {
            let user = models::User::find_by_email(conn, &login.email)?
                .ok_or(ApiError::InvalidCredentials)?;
            if user.verify_password(&login.password) {
                Ok(user)
            } else {
                Err(ApiError::InvalidCredentials)
            }
        })
        .await?;

    let token = tokens.issue(user.id, &user.email).map_err(|e| {
        log::error!("failed to sign token for user {}: {:?}", user.id, e);
        ApiError::Internal("Internal server error")
    })?;
    Ok(Json(json!({ "token": token })))
}

#[get("/user")]
pub async fn current(user: AuthUser, connection: DbConnection) -> ApiResult<Value> {
    let user_id = user.id;
    let (followers, followings) = connection
        .run(move |conn| {
            let followers = follow::follower_count(conn, user_id)?;
            let followings = follow::following_count(conn, user_id)?;
            Ok((followers, followings))
        })
        .await?;

    Ok(Json(json!({
        "name": user.name,
        "email": user.email,
        "followers": followers,
        "followings": followings,
    })))
}
