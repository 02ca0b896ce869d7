use chrono::{DateTime, Utc};
use diesel::dsl::{count_star, exists};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::{delete as diesel_delete, insert_into, select};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::AuthUser;
use crate::db::schema::{post_comments, post_likes, posts};
use crate::db::DbConnection;
use crate::types::{ApiError, ApiResult};
use crate::utils::{parse_id, serialize_date};

const INVALID_POST_ID: &str = "Invalid post ID";
const POST_NOT_FOUND: &str = "Post not found";

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: i32,
    #[serde(skip_serializing)]
    pub user_id: i32,
    pub title: String,
    pub description: String,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: DateTime<Utc>,
}

/// A post together with its like and comment counts.
#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i32,
    pub title: String,
    pub description: String,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: DateTime<Utc>,
    pub likes: i64,
    pub comments: i64,
}

impl PostView {
    fn from(post: Post, likes: i64, comments: i64) -> Self {
        PostView {
            id: post.id,
            title: post.title,
            description: post.description,
            created_at: post.created_at,
            likes,
            comments,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost {
    pub user_id: i32,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = post_likes)]
pub struct NewLike {
    pub user_id: i32,
    pub post_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreatePost {
    title: Option<String>,
    description: Option<String>,
}

impl CreatePost {
    fn into_fields(self) -> Result<(String, String), ApiError> {
        match (self.title, self.description) {
            (Some(title), Some(description)) => {
                if title.trim().is_empty() || description.trim().is_empty() {
                    Err(ApiError::BadRequest("title and description cannot be empty"))
                } else {
                    Ok((title, description))
                }
            }
            _ => Err(ApiError::BadRequest("Please provide a title and description")),
        }
    }
}

impl Post {
    pub fn load(connection: &mut PgConnection, post_id: i32) -> QueryResult<Option<Post>> {
        posts::table.find(post_id).first::<Post>(connection).optional()
    }

    pub fn exists(connection: &mut PgConnection, post_id: i32) -> QueryResult<bool> {
        select(exists(posts::table.find(post_id))).get_result(connection)
    }

    pub fn like_count(connection: &mut PgConnection, post_id: i32) -> QueryResult<i64> {
        post_likes::table
            .filter(post_likes::post_id.eq(post_id))
            .count()
            .get_result(connection)
    }

    pub fn comment_count(connection: &mut PgConnection, post_id: i32) -> QueryResult<i64> {
        post_comments::table
            .filter(post_comments::post_id.eq(post_id))
            .count()
            .get_result(connection)
    }

    /// Posts owned by `owner`, newest first, each with its like and comment
    /// counts. Counts come from separate grouped queries so that likes and
    /// comments do not multiply each other.
    pub fn load_for_owner(connection: &mut PgConnection, owner: i32) -> QueryResult<Vec<PostView>> {
        let owned = posts::table
            .filter(posts::user_id.eq(owner))
            .order((posts::created_at.desc(), posts::id.desc()))
            .load::<Post>(connection)?;
        if owned.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = owned.iter().map(|post| post.id).collect();

        let likes = post_likes::table
            .filter(post_likes::post_id.eq_any(&ids))
            .group_by(post_likes::post_id)
            .select((post_likes::post_id, count_star()))
            .load::<(i32, i64)>(connection)?
            .into_iter()
            .collect::<HashMap<_, _>>();

        let comments = post_comments::table
            .filter(post_comments::post_id.eq_any(&ids))
            .group_by(post_comments::post_id)
            .select((post_comments::post_id, count_star()))
            .load::<(i32, i64)>(connection)?
            .into_iter()
            .collect::<HashMap<_, _>>();

        Ok(owned
            .into_iter()
            .map(|post| {
                let like_count = likes.get(&post.id).cloned().unwrap_or(0);
                let comment_count = comments.get(&post.id).cloned().unwrap_or(0);
                PostView::from(post, like_count, comment_count)
            })
            .collect())
    }
}

#[post("/posts", data = "<form>")]
pub async fn create(user: AuthUser, connection: DbConnection, form: Json<CreatePost>) -> ApiResult<Post> {
    let (title, description) = form.into_inner().into_fields()?;
    let new_post = NewPost {
        user_id: user.id,
        title,
        description,
    };

    let post = connection
        .run(move |conn| Ok(insert_into(posts::table).values(&new_post).get_result::<Post>(conn)?))
        .await?;
    Ok(Json(post))
}

#[delete("/posts/<id>")]
pub async fn delete(user: AuthUser, connection: DbConnection, id: Result<i32, &str>) -> ApiResult<Value> {
    let post_id = parse_id(id, INVALID_POST_ID)?;
    let owner = user.id;

    // ownership is part of the filter; someone else's post looks missing
    let removed = connection
        .run(move |conn| {
            Ok(diesel_delete(
                posts::table
                    .filter(posts::id.eq(post_id))
                    .filter(posts::user_id.eq(owner)),
            )
            .execute(conn)?)
        })
        .await?;

    if removed == 0 {
        return Err(ApiError::NotFound(
            "Post not found or you do not have permission to delete it",
        ));
    }
    Ok(Json(json!({ "message": "Post deleted successfully" })))
}

#[get("/posts/<id>")]
pub async fn get(_user: AuthUser, connection: DbConnection, id: Result<i32, &str>) -> ApiResult<PostView> {
    let post_id = parse_id(id, INVALID_POST_ID)?;
    let view = connection
        .run(move |conn| {
            let post = Post::load(conn, post_id)?.ok_or(ApiError::NotFound(POST_NOT_FOUND))?;
            let likes = Post::like_count(conn, post.id)?;
            let comments = Post::comment_count(conn, post.id)?;
            Ok(PostView::from(post, likes, comments))
        })
        .await?;
    Ok(Json(view))
}

#[get("/all_posts")]
pub async fn all(user: AuthUser, connection: DbConnection) -> ApiResult<Vec<PostView>> {
    let owner = user.id;
    let posts = connection
        .run(move |conn| Ok(Post::load_for_owner(conn, owner)?))
        .await?;
    Ok(Json(posts))
}

#[post("/like/<id>")]
pub async fn like(user: AuthUser, connection: DbConnection, id: Result<i32, &str>) -> ApiResult<&'static str> {
    let post_id = parse_id(id, INVALID_POST_ID)?;
    let user_id = user.id;

    connection
        .run(move |conn| {
            if !Post::exists(conn, post_id)? {
                return Err(ApiError::NotFound(POST_NOT_FOUND));
            }

            let already_liked = select(exists(
                post_likes::table
                    .filter(post_likes::user_id.eq(user_id))
                    .filter(post_likes::post_id.eq(post_id)),
            ))
            .get_result::<bool>(conn)?;
            if already_liked {
                return Err(ApiError::Conflict("You have already liked this post"));
            }

            insert_into(post_likes::table)
                .values(&NewLike { user_id, post_id })
                .execute(conn)
                .map_err(|e| ApiError::on_unique_violation(e, "You have already liked this post"))?;
            Ok(())
        })
        .await?;

    Ok(Json("success"))
}

#[post("/unlike/<id>")]
pub async fn unlike(user: AuthUser, connection: DbConnection, id: Result<i32, &str>) -> ApiResult<Value> {
    let post_id = parse_id(id, INVALID_POST_ID)?;
    let user_id = user.id;

    let removed = connection
        .run(move |conn| {
            Ok(diesel_delete(
                post_likes::table
                    .filter(post_likes::user_id.eq(user_id))
                    .filter(post_likes::post_id.eq(post_id)),
            )
            .execute(conn)?)
        })
        .await?;

    if removed == 0 {
        return Err(ApiError::NotFound("Post not found or not liked by user"));
    }
    Ok(Json(json!({ "message": "Post unliked successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create(title: Option<&str>, description: Option<&str>) -> CreatePost {
        CreatePost {
            title: title.map(str::to_owned),
            description: description.map(str::to_owned),
        }
    }

    #[test]
    fn missing_fields_are_rejected() {
        match create(Some("title"), None).into_fields() {
            Err(ApiError::BadRequest(message)) => {
                assert_eq!(message, "Please provide a title and description")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn blank_fields_are_rejected() {
        match create(Some("title"), Some("  ")).into_fields() {
            Err(ApiError::BadRequest(message)) => {
                assert_eq!(message, "title and description cannot be empty")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn complete_fields_pass_through() {
        let (title, description) = create(Some("Hello"), Some("World")).into_fields().unwrap();
        assert_eq!(title, "Hello");
        assert_eq!(description, "World");
    }

    #[test]
    fn post_view_serializes_counts() {
        let post = Post {
            id: 3,
            user_id: 9,
            title: "Hello".to_owned(),
            description: "World".to_owned(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };
        let json = serde_json::to_value(PostView::from(post, 2, 1)).unwrap();

        assert_eq!(
            json,
            json!({
                "id": 3,
                "title": "Hello",
                "description": "World",
                "created_at": "2024-01-02T03:04:05.000Z",
                "likes": 2,
                "comments": 1,
            })
        );
    }

    #[test]
    fn post_hides_owner() {
        let post = Post {
            id: 3,
            user_id: 9,
            title: "Hello".to_owned(),
            description: "World".to_owned(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(post).unwrap();
        assert!(json.get("user_id").is_none());
        assert_eq!(json["title"], "Hello");
    }
}
