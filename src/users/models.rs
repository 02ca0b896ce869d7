use argon2::password_hash::{self, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use rand::rngs::OsRng;
use serde::Serialize;

use crate::db::schema::users;
use crate::utils::serialize_date;

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Hashes a cleartext password into a PHC string with a fresh salt.
    pub fn make_password(password: &str) -> Result<String, password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        let parsed = match PasswordHash::new(&self.password) {
            Ok(hash) => hash,
            Err(e) => {
                log::error!("stored password hash for user {} is unreadable: {}", self.id, e);
                return false;
            }
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }

    pub fn find(connection: &mut PgConnection, user_id: i32) -> QueryResult<Option<User>> {
        use crate::db::schema::users::dsl::*;
        users.find(user_id).first::<User>(connection).optional()
    }

    pub fn find_by_email(connection: &mut PgConnection, address: &str) -> QueryResult<Option<User>> {
        use crate::db::schema::users::dsl::*;
        users
            .filter(email.eq(address))
            .first::<User>(connection)
            .optional()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_password(password: &str) -> User {
        User {
            id: 1,
            name: "John Doe".to_owned(),
            email: "johndoe@example.com".to_owned(),
            password: User::make_password(password).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn passwords_are_hashed_and_verified() {
        let user = user_with_password("password1");
        assert_ne!(user.password, "password1");
        assert!(user.verify_password("password1"));
        assert!(!user.verify_password("wrongpassword"));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = User::make_password("password1").unwrap();
        let b = User::make_password("password1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn cleartext_rows_never_verify() {
        let mut user = user_with_password("password1");
        user.password = "password1".to_owned();
        assert!(!user.verify_password("password1"));
    }

    #[test]
    fn password_is_not_serialized() {
        let user = user_with_password("password1");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "johndoe@example.com");
    }
}
