pub mod guard;
pub mod token;

pub use self::guard::AuthUser;
pub use self::token::{Claims, TokenError, Tokens};
