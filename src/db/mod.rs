use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager, PoolError};
use diesel::result::Error as DieselError;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rocket::http::Status;
use rocket::outcome::{try_outcome, Outcome};
use rocket::request::{self, FromRequest};
use rocket::tokio::task;
use rocket::{Request, State};
use std::time::Duration;

use crate::config::Config;
use crate::types::ApiError;

pub mod schema;
pub mod seed;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

// An alias to the type for a pool of Diesel Postgres connections.
pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub struct DbConnection(pub r2d2::PooledConnection<ConnectionManager<PgConnection>>);

error_chain! {
    foreign_links {
        R2D2(PoolError);
        Diesel(DieselError);
    }
}

/// Attempts to retrieve a single connection from the managed database pool. If
/// no pool is currently managed, fails with an `InternalServerError` status. If
/// no connections are available, fails with a `ServiceUnavailable` status.
///
/// The checkout blocks, so it runs on the blocking thread pool.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for DbConnection {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<DbConnection, ()> {
        let pool = try_outcome!(request.guard::<&State<Pool>>().await).inner().clone();
        match task::spawn_blocking(move || pool.get()).await {
            Ok(Ok(conn)) => Outcome::Success(DbConnection(conn)),
            Ok(Err(e)) => {
                log::error!("could not check out a database connection: {}", e);
                Outcome::Error((Status::ServiceUnavailable, ()))
            }
            Err(e) => {
                log::error!("connection checkout task failed: {}", e);
                Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}

impl DbConnection {
    /// Runs `work` with the connection on the blocking thread pool and hands
    /// the connection back to the pool once it returns.
    pub async fn run<F, T>(self, work: F) -> ::std::result::Result<T, ApiError>
    where
        F: FnOnce(&mut PgConnection) -> ::std::result::Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let DbConnection(mut conn) = self;
        match task::spawn_blocking(move || work(&mut conn)).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("database task failed: {}", e);
                Err(ApiError::Internal("Internal server error"))
            }
        }
    }
}

/// Builds the pool without opening connections up front; the first checkout
/// connects.
pub fn init_pool(config: &Config) -> Result<Pool> {
    let manager = ConnectionManager::<PgConnection>::new(config.database_url.as_str());
    Ok(Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(Duration::from_secs(config.pool_timeout))
        .build_unchecked(manager))
}

pub fn run_migrations(pool: &Pool) -> Result<()> {
    let mut pooled = pool.get()?;
    let conn: &mut PgConnection = &mut pooled;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::from(format!("failed to run migrations: {}", e)))?;
    for version in applied {
        log::info!("applied migration {}", version);
    }
    Ok(())
}
