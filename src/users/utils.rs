use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::select;
use regex::Regex;

use crate::types::{ApiError, ValidationError};

lazy_static! {
    static ref EMAIL_RE: Regex = {
        let pattern = r"(?i)\A[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\z";
        Regex::new(pattern).unwrap()
    };
}

pub const MIN_PASSWORD_LEN: usize = 5;

pub fn validate_email_re(email: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(email) {
        Err(ValidationError::from(
            "email",
            format!("Invalid email: {}", email),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(ValidationError::from("name", "Name cannot be empty"))
    } else {
        Ok(())
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LEN {
        Err(ValidationError::from("password", "Password too short"))
    } else {
        Ok(())
    }
}

pub fn validate_email(email_to_validate: &str, connection: &mut PgConnection) -> Result<(), ApiError> {
    use crate::db::schema::users::dsl::*;

    let mut errors = match validate_email_re(email_to_validate) {
        Ok(()) => ValidationError::default(),
        Err(e) => e,
    };

    let email_exists =
        select(exists(users.filter(email.eq(email_to_validate)))).get_result::<bool>(connection)?;
    if email_exists {
        errors.add_error("email", "Email already exists");
    }

    if errors.empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert!(validate_email_re("johndoe@example.com").is_ok());
        assert!(validate_email_re("jane.doe+tag@mail.example.org").is_ok());
        assert!(validate_email_re("John@Example.com").is_ok());
        assert!(validate_email_re("not-an-email").is_err());
        assert!(validate_email_re("missing@tld").is_err());
        assert!(validate_email_re("").is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("pass1").is_ok());
        assert!(validate_password("pass").is_err());
    }

    #[test]
    fn names() {
        assert!(validate_name("Bob Smith").is_ok());
        assert!(validate_name("   ").is_err());
    }
}
