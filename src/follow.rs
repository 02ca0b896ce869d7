use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{delete, insert_into, select};
use rocket::serde::json::Json;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::db::schema::follows;
use crate::db::DbConnection;
use crate::types::{ApiError, ApiResult};
use crate::users::models::User;
use crate::utils::parse_id;

#[derive(Debug, Insertable)]
#[diesel(table_name = follows)]
pub struct NewFollow {
    pub follower_id: i32,
    pub followed_id: i32,
}

pub fn is_following(connection: &mut PgConnection, follower: i32, followed: i32) -> QueryResult<bool> {
    select(exists(follows::table.find((follower, followed)))).get_result(connection)
}

pub fn follower_count(connection: &mut PgConnection, user_id: i32) -> QueryResult<i64> {
    follows::table
        .filter(follows::followed_id.eq(user_id))
        .count()
        .get_result(connection)
}

pub fn following_count(connection: &mut PgConnection, user_id: i32) -> QueryResult<i64> {
    follows::table
        .filter(follows::follower_id.eq(user_id))
        .count()
        .get_result(connection)
}

/// Records that `follower` follows `target_id` and returns the followed user.
pub fn follow_user(
    connection: &mut PgConnection,
    follower: &User,
    target_id: i32,
) -> Result<User, ApiError> {
    if follower.id == target_id {
        return Err(ApiError::BadRequest("You cannot follow yourself."));
    }

    connection.transaction::<_, ApiError, _>(|conn| {
        let target = User::find(conn, target_id)?.ok_or(ApiError::NotFound("User not found"))?;

        if is_following(conn, follower.id, target.id)? {
            return Err(ApiError::Conflict("Already following user"));
        }

        let edge = NewFollow {
            follower_id: follower.id,
            followed_id: target.id,
        };
        insert_into(follows::table)
            .values(&edge)
            .execute(conn)
            .map_err(|e| match e {
                // lost a race with a concurrent delete of the target
                DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                    ApiError::NotFound("User not found")
                }
                other => ApiError::on_unique_violation(other, "Already following user"),
            })?;

        Ok(target)
    })
}

pub fn unfollow_user(
    connection: &mut PgConnection,
    follower: &User,
    target_id: i32,
) -> Result<(), ApiError> {
    if follower.id == target_id {
        return Err(ApiError::BadRequest("You cannot unfollow yourself."));
    }

    connection.transaction::<_, ApiError, _>(|conn| {
        if !is_following(conn, follower.id, target_id)? {
            return Err(ApiError::NotFound("User is not being followed"));
        }

        let removed = delete(follows::table.find((follower.id, target_id))).execute(conn)?;
        if removed == 0 {
            return Err(ApiError::Internal("Could not unfollow user"));
        }
        Ok(())
    })
}

#[post("/follow/<id>")]
pub async fn follow(user: AuthUser, connection: DbConnection, id: Result<i32, &str>) -> ApiResult<Value> {
    let target_id = parse_id(id, "Required id to follow")?;
    let follower = user.into_inner();
    let follower_id = follower.id;
    let followed = connection
        .run(move |conn| follow_user(conn, &follower, target_id))
        .await?;
    log::info!("user {} followed user {}", follower_id, followed.id);
    Ok(Json(json!({
        "message": format!("You are now following {}", followed.name)
    })))
}

#[post("/unfollow/<id>")]
pub async fn unfollow(user: AuthUser, connection: DbConnection, id: Result<i32, &str>) -> ApiResult<Value> {
    let target_id = parse_id(id, "Required id to unfollow")?;
    let follower = user.into_inner();
    let follower_id = follower.id;
    connection
        .run(move |conn| unfollow_user(conn, &follower, target_id))
        .await?;
    log::info!("user {} unfollowed user {}", follower_id, target_id);
    Ok(Json(json!({ "message": "Unfollowed successfully" })))
}
