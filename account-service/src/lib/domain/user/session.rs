use std::sync::Arc;

use auth::Authenticator;

use crate::domain::user::models::User;
use crate::user::errors::UserError;

/// Freshly minted bearer token together with the account it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Turns a verified account into a session.
#[derive(Clone)]
pub struct SessionIssuer {
    authenticator: Arc<Authenticator>,
}

impl SessionIssuer {
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self { authenticator }
    }

    /// Issue a token for `user` and strip its password hash.
    ///
    /// # Errors
    /// * `Token` - Token signing failed
    pub fn establish(&self, user: User) -> Result<Session, UserError> {
        let token = self
            .authenticator
            .issue_token(user.id)
            .map_err(|e| UserError::Token(e.to_string()))?;

        Ok(Session {
            token,
            user: user.without_password(),
        })
    }
}
