use std::sync::Arc;

use async_trait::async_trait;
use auth::reset::digest_secret;
use auth::Authenticator;
use auth::JwtError;
use auth::ResetToken;
use chrono::Duration;
use chrono::Utc;

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
use crate::domain::user::session::SessionIssuer;
use crate::user::errors::AuthFailure;
use crate::user::errors::UserError;
use crate::user::ports::AccountServicePort;
use crate::user::ports::EmailSender;
use crate::user::ports::OutgoingEmail;
use crate::user::ports::ResetRequestOutcome;
use crate::user::ports::UserRepository;

/// Settings for the forgot-password flow.
#[derive(Debug, Clone)]
pub struct ResetSettings {
    pub token_ttl: Duration,
    /// Prefix of the mailed link; `/resetPassword/{secret}` is appended.
    pub url_base: String,
    pub conceal_unknown_accounts: bool,
}

/// Domain service implementation for account operations.
///
/// Concrete implementation of AccountServicePort with dependency injection.
pub struct AccountService<UR, ES>
where
    UR: UserRepository,
    ES: EmailSender,
{
    repository: Arc<UR>,
    mailer: Arc<ES>,
    authenticator: Arc<Authenticator>,
    sessions: SessionIssuer,
    reset: ResetSettings,
}

impl<UR, ES> AccountService<UR, ES>
where
    UR: UserRepository,
    ES: EmailSender,
{
    /// Create a new account service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `mailer` - Outbound email implementation
    /// * `authenticator` - Password hashing and token signing
    /// * `reset` - Forgot-password settings
    ///
    /// # Returns
    /// Configured account service instance
    pub fn new(
        repository: Arc<UR>,
        mailer: Arc<ES>,
        authenticator: Arc<Authenticator>,
        reset: ResetSettings,
    ) -> Self {
        Self {
            repository,
            mailer,
            sessions: SessionIssuer::new(Arc::clone(&authenticator)),
            authenticator,
            reset,
        }
    }

    // Argon2 runs on the blocking pool.
    async fn hash_password(&self, password: &str) -> Result<String, UserError> {
        let authenticator = Arc::clone(&self.authenticator);
        let password = password.to_string();

        tokio::task::spawn_blocking(move || authenticator.hash_password(&password))
            .await
            .map_err(|e| UserError::Unknown(format!("Hashing task failed: {}", e)))?
            .map_err(|e| UserError::Password(e.to_string()))
    }

    async fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, UserError> {
        let authenticator = Arc::clone(&self.authenticator);
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();

        tokio::task::spawn_blocking(move || authenticator.verify_password(&password, &stored_hash))
            .await
            .map_err(|e| UserError::Unknown(format!("Verification task failed: {}", e)))?
            .map_err(|e| UserError::Password(e.to_string()))
    }

    fn unknown_account(&self) -> Result<ResetRequestOutcome, UserError> {
        if self.reset.conceal_unknown_accounts {
            tracing::info!("Password reset requested for unknown account");
            return Ok(ResetRequestOutcome::Concealed);
        }
        Err(UserError::NotFound(
            "There is no user with that email address.".to_string(),
        ))
    }

    fn reset_email(&self, user: &User, secret: &str) -> OutgoingEmail {
        let url = format!(
            "{}/resetPassword/{}",
            self.reset.url_base.trim_end_matches('/'),
            secret
        );

        OutgoingEmail {
            to: user.email.as_str().to_string(),
            subject: format!(
                "Your password reset token (valid for {} min)",
                self.reset.token_ttl.num_minutes()
            ),
            body: format!(
                "Forgot your password? Submit a PATCH request with your new password and \
                 passwordConfirm to: {}.\nIf you didn't forget your password, please ignore \
                 this email!",
                url
            ),
        }
    }
}

#[async_trait]
impl<UR, ES> AccountServicePort for AccountService<UR, ES>
where
    UR: UserRepository,
    ES: EmailSender,
{
    async fn signup(&self, command: SignupCommand) -> Result<Session, UserError> {
        let password_hash = self.hash_password(command.password.expose()).await?;
        let user = User::register(command.name, command.email, password_hash);

        let created_user = self.repository.create(user).await?;
        tracing::info!(user_id = %created_user.id, "Account created");

        self.sessions.establish(created_user)
    }

    async fn login(&self, command: LoginCommand) -> Result<Session, UserError> {
        let user = self
            .repository
            .find_by_email(&command.email, PasswordSelection::Include)
            .await?;

        let Some(user) = user else {
            tracing::warn!("Login attempt for unknown account");
            return Err(AuthFailure::IncorrectCredentials.into());
        };
        let Some(stored_hash) = user.password_hash.clone() else {
            return Err(AuthFailure::IncorrectCredentials.into());
        };

        if !self.verify_password(&command.password, &stored_hash).await? {
            tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AuthFailure::IncorrectCredentials.into());
        }

        tracing::info!(user_id = %user.id, "Login succeeded");
        self.sessions.establish(user)
    }

    async fn authenticate(&self, token: Option<&str>) -> Result<User, UserError> {
        let token = token.ok_or(AuthFailure::NotLoggedIn)?;

        let verified = self.authenticator.verify_token(token).map_err(|e| {
            tracing::warn!("Token rejected: {}", e);
            match e {
                JwtError::TokenExpired => AuthFailure::TokenExpired,
                _ => AuthFailure::InvalidToken,
            }
        })?;

        let user_id =
            UserId::from_string(&verified.subject).map_err(|_| AuthFailure::InvalidToken)?;

        let user = self
            .repository
            .find_by_id(&user_id, PasswordSelection::Omit)
            .await?
            .filter(|user| user.active)
            .ok_or_else(|| {
                tracing::warn!(user_id = %user_id, "Token owner no longer exists");
                AuthFailure::UserGone
            })?;

        if user.changed_password_after(verified.issued_at) {
            tracing::warn!(user_id = %user.id, "Token predates password change");
            return Err(AuthFailure::PasswordChanged.into());
        }

        Ok(user.without_password())
    }

    async fn forgot_password(&self, email: &str) -> Result<ResetRequestOutcome, UserError> {
        let email = email.trim().to_lowercase();

        let user = match self
            .repository
            .find_by_email(&email, PasswordSelection::Omit)
            .await?
        {
            Some(user) => user,
            None => return self.unknown_account(),
        };

        let token = ResetToken::generate().map_err(|e| UserError::Unknown(e.to_string()))?;
        let pending = PendingReset {
            token_digest: token.digest().to_string(),
            expires_at: Utc::now() + self.reset.token_ttl,
        };

        // Deactivated between lookup and write
        if !self.repository.store_pending_reset(&user.id, &pending).await? {
            return self.unknown_account();
        }

        let email = self.reset_email(&user, token.secret());
        if let Err(e) = self.mailer.send(email).await {
            tracing::error!(user_id = %user.id, "Failed to send reset email: {}", e);

            self.repository
                .clear_pending_reset(&user.id, &pending.token_digest)
                .await?;

            return Err(UserError::EmailDelivery(e));
        }

        tracing::info!(user_id = %user.id, "Password reset link issued");
        Ok(ResetRequestOutcome::Sent)
    }

    async fn reset_password(&self, command: ResetPasswordCommand) -> Result<Session, UserError> {
        let digest = digest_secret(&command.secret);

        // Cheap rejection before hashing; the redeem below is what decides.
        if self
            .repository
            .find_by_reset_digest(&digest, Utc::now())
            .await?
            .is_none()
        {
            tracing::warn!("Reset attempted with unknown or expired secret");
            return Err(UserError::InvalidOrExpiredToken);
        }

        let password_hash = self.hash_password(command.new_password.expose()).await?;

        let user = self
            .repository
            .redeem_reset(&digest, &password_hash, Utc::now())
            .await?
            .ok_or_else(|| {
                tracing::warn!("Reset secret was redeemed or expired meanwhile");
                UserError::InvalidOrExpiredToken
            })?;
        tracing::info!(user_id = %user.id, "Password reset completed");

        self.sessions.establish(user)
    }

    async fn update_password(
        &self,
        user: &User,
        command: ChangePasswordCommand,
    ) -> Result<Session, UserError> {
        let stored = self
            .repository
            .find_by_id(&user.id, PasswordSelection::Include)
            .await?
            .ok_or(UserError::Unauthenticated(AuthFailure::UserGone))?;

        let stored_hash = stored
            .password_hash
            .ok_or_else(|| UserError::Unknown("Stored password hash missing".to_string()))?;

        if !self
            .verify_password(&command.current_password, &stored_hash)
            .await?
        {
            tracing::warn!(user_id = %user.id, "Password change rejected: wrong current password");
            return Err(UserError::InvalidCredentials);
        }

        let password_hash = self.hash_password(command.new_password.expose()).await?;

        let changed = self
            .repository
            .replace_password(&user.id, &stored_hash, &password_hash, Utc::now())
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %user.id, "Password changed concurrently");
                UserError::InvalidCredentials
            })?;
        tracing::info!(user_id = %changed.id, "Password changed");

        self.sessions.establish(changed)
    }

    async fn update_me(
        &self,
        user: &User,
        command: UpdateProfileCommand,
    ) -> Result<User, UserError> {
        let patch = UserPatch::from(command);
        if patch.is_empty() {
            return Err(UserError::Validation(
                "Please provide a name or an email to update.".to_string(),
            ));
        }

        self.repository
            .update_partial(&user.id, patch)
            .await?
            .map(User::without_password)
            .ok_or(UserError::NotFound(user.id.to_string()))
    }

    async fn deactivate(&self, user: &User) -> Result<(), UserError> {
        self.repository
            .update_partial(&user.id, UserPatch::deactivate())
            .await?
            .ok_or(UserError::NotFound(user.id.to_string()))?;

        tracing::info!(user_id = %user.id, "Account deactivated");
        Ok(())
    }
}
