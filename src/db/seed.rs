use diesel::insert_into;
use diesel::pg::PgConnection;
use diesel::prelude::*;

use super::schema::users;
use super::{Error, Result};
use crate::users::models::{NewUser, User};

/// Demo accounts as `(name, email, password)`.
pub const DEMO_USERS: [(&str, &str, &str); 3] = [
    ("John Doe", "johndoe@example.com", "password1"),
    ("Jane Doe", "janedoe@example.com", "password2"),
    ("Bob Smith", "bobsmith@example.com", "password3"),
];

/// Inserts the demo accounts, skipping emails that already exist. Returns how
/// many rows were added.
pub fn seed(connection: &mut PgConnection) -> Result<usize> {
    let mut inserted = 0;
    for &(name, email, password) in DEMO_USERS.iter() {
        let hashed = User::make_password(password)
            .map_err(|e| Error::from(format!("failed to hash password for {}: {}", email, e)))?;
        let new_user = NewUser {
            name: name.to_owned(),
            email: email.to_owned(),
            password: hashed,
        };
        inserted += insert_into(users::table)
            .values(&new_user)
            .on_conflict(users::email)
            .do_nothing()
            .execute(connection)?;
    }
    Ok(inserted)
}
