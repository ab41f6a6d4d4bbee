use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::crud::models::ListQuery;
use crate::domain::errors::EmailDeliveryError;
use crate::domain::user::models::ChangePasswordCommand;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::PasswordSelection;
use crate::domain::user::models::PendingReset;
use crate::domain::user::models::ResetPasswordCommand;
use crate::domain::user::models::SignupCommand;
use crate::domain::user::models::UpdateProfileCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserPatch;
use crate::domain::user::session::Session;
use crate::user::errors::UserError;

/// What a forgot-password request resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRequestOutcome {
    /// A reset link was enqueued for the account owner.
    Sent,
    /// No active account matched and the lookup miss is being concealed.
    Concealed,
}

/// Port for account domain service operations.
#[async_trait]
pub trait AccountServicePort: Send + Sync + 'static {
    /// Register a new account and open a session for it.
    ///
    /// # Arguments
    /// * `command` - Validated name, email and password
    ///
    /// # Returns
    /// Session for the new account
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `Password` - Hashing failed
    /// * `DatabaseError` - Database operation failed
    async fn signup(&self, command: SignupCommand) -> Result<Session, UserError>;

    /// Verify email and password and open a session.
    ///
    /// # Errors
    /// * `Unauthenticated(IncorrectCredentials)` - Unknown email or wrong password
    /// * `DatabaseError` - Database operation failed
    async fn login(&self, command: LoginCommand) -> Result<Session, UserError>;

    /// Resolve a presented bearer token to a live user.
    ///
    /// # Arguments
    /// * `token` - Raw token, `None` when the request carried none
    ///
    /// # Returns
    /// The token owner, without password hash
    ///
    /// # Errors
    /// * `Unauthenticated` - Missing, invalid or expired token; owner gone,
    ///   deactivated, or changed password after the token was issued
    async fn authenticate(&self, token: Option<&str>) -> Result<User, UserError>;

    /// Start a password reset for the account registered under `email`.
    ///
    /// # Errors
    /// * `NotFound` - No active account with that email (unless concealed)
    /// * `EmailDelivery` - Reset link could not be enqueued; the pending reset
    ///   has been cleared again
    async fn forgot_password(&self, email: &str) -> Result<ResetRequestOutcome, UserError>;

    /// Exchange a reset secret for a new password and open a session.
    ///
    /// # Errors
    /// * `InvalidOrExpiredToken` - No account holds a live reset for the
    ///   secret, or a concurrent exchange redeemed it first
    async fn reset_password(&self, command: ResetPasswordCommand) -> Result<Session, UserError>;

    /// Change the password of an authenticated user and open a new session.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Current password does not match, or the
    ///   password was changed concurrently
    async fn update_password(
        &self,
        user: &User,
        command: ChangePasswordCommand,
    ) -> Result<Session, UserError>;

    /// Apply name/email changes to the caller's own account.
    ///
    /// # Errors
    /// * `Validation` - Neither name nor email given
    /// * `NotFound` - Account vanished meanwhile
    /// * `EmailAlreadyExists` - New email is already registered
    async fn update_me(&self, user: &User, command: UpdateProfileCommand)
        -> Result<User, UserError>;

    /// Soft-delete the caller's own account.
    async fn deactivate(&self, user: &User) -> Result<(), UserError>;
}

/// Persistence operations for user aggregate.
///
/// Lookups honour [`PasswordSelection`]: with `Omit` the returned record has
/// no `password_hash`.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist new user to storage.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: User) -> Result<User, UserError>;

    /// Retrieve user by identifier, active or not.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    async fn find_by_id(
        &self,
        id: &UserId,
        selection: PasswordSelection,
    ) -> Result<Option<User>, UserError>;

    /// Retrieve an active user by (normalized) email address.
    async fn find_by_email(
        &self,
        email: &str,
        selection: PasswordSelection,
    ) -> Result<Option<User>, UserError>;

    /// Retrieve the active user holding a reset with this digest that
    /// expires strictly after `now`.
    async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, UserError>;

    /// Apply a partial update.
    ///
    /// # Returns
    /// Updated user (without password), None if the id is unknown
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - New email is already registered
    async fn update_partial(&self, id: &UserId, patch: UserPatch)
        -> Result<Option<User>, UserError>;

    /// Record a pending reset on an active account, replacing any earlier one.
    ///
    /// Only the two reset columns are written.
    ///
    /// # Returns
    /// False if no active account has this id
    async fn store_pending_reset(
        &self,
        id: &UserId,
        reset: &PendingReset,
    ) -> Result<bool, UserError>;

    /// Drop the pending reset, provided it still carries `digest`.
    ///
    /// A reset issued by a later request is left untouched.
    async fn clear_pending_reset(&self, id: &UserId, digest: &str) -> Result<(), UserError>;

    /// Exchange a live reset for a new password hash in a single write.
    ///
    /// Matches only an active account whose reset has `digest` and expires
    /// strictly after `now`. The hash, `password_changed_at = now` and the
    /// cleared reset are stored together, so a secret redeems at most once.
    ///
    /// # Returns
    /// Updated user (without password), None if nothing matched
    async fn redeem_reset(
        &self,
        digest: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, UserError>;

    /// Swap the password hash, provided the stored one is still
    /// `current_hash`. Refreshes `password_changed_at` and clears any
    /// pending reset in the same write.
    ///
    /// # Returns
    /// Updated user (without password), None if the account is gone,
    /// inactive, or its hash changed meanwhile
    async fn replace_password(
        &self,
        id: &UserId,
        current_hash: &str,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, UserError>;

    /// Page through active users.
    async fn list_active(&self, query: &ListQuery) -> Result<Vec<User>, UserError>;

    /// Physically remove a user.
    ///
    /// # Returns
    /// The removed user, None if the id is unknown
    async fn delete(&self, id: &UserId) -> Result<Option<User>, UserError>;
}

/// Message handed to the email transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound email delivery.
#[async_trait]
pub trait EmailSender: Send + Sync + 'static {
    /// Hand a message to the transport.
    ///
    /// # Errors
    /// * `Rejected` - Transport refused the message
    /// * `Unavailable` - Transport could not be reached
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailDeliveryError>;
}
