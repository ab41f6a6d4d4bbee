use thiserror::Error;

use crate::domain::errors::EmailDeliveryError;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for display name validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserNameError {
    #[error("Please tell us your name")]
    Empty,

    #[error("Name too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Please provide your email")]
    Missing,

    #[error("Please provide a valid email: {0}")]
    InvalidFormat(String),
}

/// Error for new-password policy failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Please provide a password and passwordConfirm")]
    Missing,

    #[error("Password too short: minimum {min} characters")]
    TooShort { min: usize },

    #[error("Password too long: maximum {max} characters")]
    TooLong { max: usize },

    #[error("Passwords are not the same")]
    Mismatch,
}

/// Error for role parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("Unknown role: {0}")]
    Unknown(String),
}

/// Why a request could not be tied to a live identity.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("You are not logged in! Please log in to get access.")]
    NotLoggedIn,

    #[error("Invalid token. Please log in again.")]
    InvalidToken,

    #[error("Your token has expired. Please log in again.")]
    TokenExpired,

    #[error("The user belonging to this token no longer exists.")]
    UserGone,

    #[error("User recently changed password! Please log in again.")]
    PasswordChanged,

    #[error("Incorrect email or password")]
    IncorrectCredentials,
}

/// Top-level error for all account operations
#[derive(Debug, Clone, Error)]
pub enum UserError {
    // Value object validation errors (automatically converted via #[from])
    #[error("Invalid user ID: {0}")]
    InvalidUserId(#[from] UserIdError),

    #[error("{0}")]
    InvalidName(#[from] UserNameError),

    #[error("{0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0}")]
    InvalidPassword(#[from] PasswordPolicyError),

    #[error("{0}")]
    InvalidRole(#[from] RoleError),

    #[error("{0}")]
    Validation(String),

    // Access control
    #[error("{0}")]
    Unauthenticated(AuthFailure),

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Your current password is wrong.")]
    InvalidCredentials,

    #[error("Token is invalid or has expired")]
    InvalidOrExpiredToken,

    // Domain-level errors
    #[error("{0}")]
    NotFound(String),

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    // Infrastructure errors
    #[error("There was an error sending the email. Try again later!")]
    EmailDelivery(#[from] EmailDeliveryError),

    #[error("Password hashing error: {0}")]
    Password(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl UserError {
    /// True for failures caused by the caller's input rather than the service.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            UserError::InvalidUserId(_)
                | UserError::InvalidName(_)
                | UserError::InvalidEmail(_)
                | UserError::InvalidPassword(_)
                | UserError::InvalidRole(_)
                | UserError::Validation(_)
        )
    }
}

impl From<AuthFailure> for UserError {
    fn from(reason: AuthFailure) -> Self {
        UserError::Unauthenticated(reason)
    }
}
