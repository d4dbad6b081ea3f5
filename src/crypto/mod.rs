pub mod password;
mod phi_audit;

pub use password::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password must be at least {0} characters")]
    TooShort(usize),

    #[error("Stored password hash is malformed")]
    MalformedHash,

    #[error("Wrong password")]
    WrongPassword,
}
