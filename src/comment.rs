use chrono::{DateTime, Utc};
use diesel::insert_into;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::db::schema::post_comments;
use crate::db::DbConnection;
use crate::post::Post;
use crate::types::ApiError;
use crate::utils::{parse_id, serialize_date};

#[derive(Debug, Serialize, Queryable, Identifiable)]
#[diesel(table_name = post_comments)]
pub struct Comment {
    pub id: i32,
    pub user_id: i32,
    pub post_id: i32,
    pub comment: String,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = post_comments)]
pub struct NewComment {
    pub user_id: i32,
    pub post_id: i32,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    comment: Option<String>,
}

#[post("/comment/<id>", data = "<body>")]
pub async fn add(
    user: AuthUser,
    connection: DbConnection,
    id: Result<i32, &str>,
    body: Json<CommentBody>,
) -> Result<(Status, Json<Value>), ApiError> {
    let post_id = parse_id(id, "Invalid post ID")?;
    let text = body
        .into_inner()
        .comment
        .ok_or(ApiError::BadRequest("Please provide a comment"))?;

    let new_comment = NewComment {
        user_id: user.id,
        post_id,
        comment: text,
    };
    let comment = connection
        .run(move |conn| {
            if !Post::exists(conn, post_id)? {
                return Err(ApiError::NotFound("Post not found"));
            }
            let comment = insert_into(post_comments::table)
                .values(&new_comment)
                .get_result::<Comment>(conn)?;
            Ok(comment)
        })
        .await?;

    Ok((Status::Created, Json(json!({ "comment_id": comment.id }))))
}
