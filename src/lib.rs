#[macro_use]
extern crate rocket;
#[macro_use]
extern crate diesel;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;

pub mod auth;
pub mod comment;
pub mod config;
pub mod db;
pub mod follow;
pub mod post;
pub mod types;
pub mod users;
pub mod utils;

use rocket::request::Request;
use rocket::serde::json::Json;
use rocket::{Build, Rocket};
use serde_json::{json, Value};

pub use crate::config::Config;

fn error_body(message: &str) -> Json<Value> {
    Json(json!({ "error": message }))
}

#[catch(400)]
fn bad_request(_req: &Request) -> Json<Value> {
    error_body("Bad request")
}

#[catch(401)]
fn unauthorized(_req: &Request) -> Json<Value> {
    error_body("Unauthorized")
}

#[catch(403)]
fn forbidden(_req: &Request) -> Json<Value> {
    error_body("Forbidden")
}

#[catch(404)]
fn not_found(_req: &Request) -> Json<Value> {
    error_body("Not found")
}

#[catch(422)]
fn unprocessable(_req: &Request) -> Json<Value> {
    error_body("Unprocessable request body")
}

#[catch(500)]
fn internal_error(_req: &Request) -> Json<Value> {
    error_body("Internal server error")
}

#[catch(503)]
fn unavailable(_req: &Request) -> Json<Value> {
    error_body("Service unavailable")
}

#[get("/")]
fn index() -> &'static str {
    "welcome"
}

/// Assembles the application: pool, token service, routes and catchers.
/// Migrations run first when the configuration asks for them.
pub fn rocket(config: &Config) -> db::Result<Rocket<Build>> {
    // building first installs Rocket's logger for the steps below
    let rocket = rocket::build();

    let pool = db::init_pool(config)?;
    if config.run_migrations {
        db::run_migrations(&pool)?;
    }
    let tokens = auth::Tokens::new(&config.jwt_secret, config.token_ttl);

    Ok(rocket
        .manage(pool)
        .manage(tokens)
        .mount("/", routes![index])
        .mount(
            "/api",
            routes![
                users::register,
                users::authenticate,
                users::current,
                follow::follow,
                follow::unfollow,
                post::create,
                post::delete,
                post::get,
                post::all,
                post::like,
                post::unlike,
                comment::add,
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                unprocessable,
                internal_error,
                unavailable
            ],
        ))
}
