use dotenv::dotenv;
use std::env;

use crate::db::{Result, ResultExt};

const DEFAULT_POOL_SIZE: u32 = 10;
const DEFAULT_POOL_TIMEOUT_SECS: u64 = 30;

/// Process settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Lifetime of issued tokens in seconds. `None` issues tokens that never expire.
    pub token_ttl: Option<i64>,
    pub pool_size: u32,
    /// Seconds to wait for a pooled connection before giving up.
    pub pool_timeout: u64,
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").chain_err(|| "DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").chain_err(|| "JWT_SECRET must be set")?;
        if jwt_secret.is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let token_ttl = match env::var("TOKEN_TTL_SECS") {
            Ok(ttl) => Some(parse_ttl(&ttl)?),
            Err(_) => None,
        };

        let pool_size = match env::var("DATABASE_POOL_SIZE") {
            Ok(size) => size
                .parse::<u32>()
                .chain_err(|| "DATABASE_POOL_SIZE must be a positive integer")?,
            Err(_) => DEFAULT_POOL_SIZE,
        };
        if pool_size == 0 {
            bail!("DATABASE_POOL_SIZE must be at least 1");
        }

        let pool_timeout = match env::var("DATABASE_POOL_TIMEOUT_SECS") {
            Ok(secs) => secs
                .parse::<u64>()
                .chain_err(|| "DATABASE_POOL_TIMEOUT_SECS must be a number of seconds")?,
            Err(_) => DEFAULT_POOL_TIMEOUT_SECS,
        };
        if pool_timeout == 0 {
            bail!("DATABASE_POOL_TIMEOUT_SECS must be at least 1");
        }

        let run_migrations = env::var("RUN_MIGRATIONS")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        Ok(Config {
            database_url,
            jwt_secret,
            token_ttl,
            pool_size,
            pool_timeout,
            run_migrations,
        })
    }
}

fn parse_ttl(value: &str) -> Result<i64> {
    let ttl = value
        .trim()
        .parse::<i64>()
        .chain_err(|| "TOKEN_TTL_SECS must be a number of seconds")?;
    if ttl <= 0 {
        bail!("TOKEN_TTL_SECS must be positive");
    }
    Ok(ttl)
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::{parse_flag, parse_ttl};

    #[test]
    fn flags() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(" Off "));
        assert!(!parse_flag("0"));
    }

    #[test]
    fn ttl_must_be_positive() {
        assert_eq!(parse_ttl("3600").unwrap(), 3600);
        assert!(parse_ttl("0").is_err());
        assert!(parse_ttl("-1").is_err());
        assert!(parse_ttl("soon").is_err());
    }
}
