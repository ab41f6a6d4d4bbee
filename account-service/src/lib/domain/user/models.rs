use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::user::errors::EmailError;
use crate::user::errors::PasswordPolicyError;
use crate::user::errors::RoleError;
use crate::user::errors::UserIdError;
use crate::user::errors::UserNameError;

/// User aggregate entity.
///
/// `password_hash` is only populated when the record was loaded with
/// [`PasswordSelection::Include`]; everything handed back to callers goes
/// through [`User::without_password`] first.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: UserName,
    pub email: EmailAddress,
    pub password_hash: Option<String>,
    pub role: Role,
    pub active: bool,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub pending_reset: Option<PendingReset>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a freshly registered account.
    ///
    /// # Arguments
    /// * `name` - Validated display name
    /// * `email` - Validated email address
    /// * `password_hash` - Argon2 PHC string of the chosen password
    ///
    /// # Returns
    /// Active user with the default role and no password history
    pub fn register(name: UserName, email: EmailAddress, password_hash: String) -> Self {
        Self {
            id: UserId::new(),
            name,
            email,
            password_hash: Some(password_hash),
            role: Role::default(),
            active: true,
            password_changed_at: None,
            pending_reset: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the password was changed after a token was issued.
    ///
    /// Compared at millisecond resolution, the precision tokens carry.
    ///
    /// # Arguments
    /// * `issued_at` - Issue instant recovered from a verified token
    ///
    /// # Returns
    /// True if the token predates the latest password change
    pub fn changed_password_after(&self, issued_at: DateTime<Utc>) -> bool {
        self.password_changed_at
            .map(|changed| changed.timestamp_millis() > issued_at.timestamp_millis())
            .unwrap_or(false)
    }

    /// Replace the credential and close any outstanding reset.
    pub fn change_password(&mut self, password_hash: String, now: DateTime<Utc>) {
        self.password_hash = Some(password_hash);
        self.password_changed_at = Some(now);
        self.pending_reset = None;
    }

    /// Copy of the record that is safe to hand outside the domain.
    pub fn without_password(mut self) -> Self {
        self.password_hash = None;
        self
    }
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Arguments
    /// * `s` - UUID string to parse
    ///
    /// # Returns
    /// Parsed UserId
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Display name value type
///
/// Surrounding whitespace is trimmed; the result must be 1-64 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserName(String);

impl UserName {
    const MAX_LENGTH: usize = 64;

    /// Create a new valid display name.
    ///
    /// # Errors
    /// * `Empty` - Nothing left after trimming
    /// * `TooLong` - More than 64 characters
    pub fn new(name: String) -> Result<Self, UserNameError> {
        let name = name.trim();
        let length = name.chars().count();

        if length == 0 {
            Err(UserNameError::Empty)
        } else if length > Self::MAX_LENGTH {
            Err(UserNameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser and stores the
/// trimmed, lower-cased form so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Arguments
    /// * `email` - Raw email string
    ///
    /// # Returns
    /// Validated EmailAddress value object
    ///
    /// # Errors
    /// * `Missing` - Blank input
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(EmailError::Missing);
        }

        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    /// Get email as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Authorization role attached to every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "guide" => Ok(Role::Guide),
            "lead-guide" => Ok(Role::LeadGuide),
            "admin" => Ok(Role::Admin),
            other => Err(RoleError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outstanding password reset: digest of the mailed secret and its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReset {
    pub token_digest: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingReset {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// New password together with its confirmation, checked against policy.
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(String);

impl NewPassword {
    const MIN_LENGTH: usize = 8;
    const MAX_LENGTH: usize = 128;

    /// Validate a new password and its confirmation.
    ///
    /// # Errors
    /// * `Missing` - Either field is absent
    /// * `TooShort` / `TooLong` - Length outside 8-128 characters
    /// * `Mismatch` - Confirmation differs
    pub fn new(
        password: Option<String>,
        confirmation: Option<String>,
    ) -> Result<Self, PasswordPolicyError> {
        let (password, confirmation) = match (password, confirmation) {
            (Some(p), Some(c)) if !p.is_empty() && !c.is_empty() => (p, c),
            _ => return Err(PasswordPolicyError::Missing),
        };

        let length = password.chars().count();
        if length < Self::MIN_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if length > Self::MAX_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if password != confirmation {
            return Err(PasswordPolicyError::Mismatch);
        }

        Ok(Self(password))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NewPassword(<redacted>)")
    }
}

/// Whether a lookup should load the stored password hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSelection {
    Include,
    Omit,
}

/// Partial update of non-credential fields.
///
/// Passwords never travel through a patch; see `ChangePasswordCommand` and
/// `ResetPasswordCommand`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<UserName>,
    pub email: Option<EmailAddress>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl UserPatch {
    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none() && self.active.is_none()
    }

    pub fn deactivate() -> Self {
        Self {
            active: Some(false),
            ..Self::default()
        }
    }
}

/// Command to register a new account
#[derive(Debug)]
pub struct SignupCommand {
    pub name: UserName,
    pub email: EmailAddress,
    pub password: NewPassword,
}

/// Command to log in with email and password
#[derive(Debug)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

impl LoginCommand {
    /// Require both credentials to be present.
    ///
    /// # Errors
    /// * `Validation` - Either field missing or blank
    pub fn new(email: Option<String>, password: Option<String>) -> Result<Self, String> {
        match (email, password) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Ok(Self {
                    email: email.trim().to_lowercase(),
                    password,
                })
            }
            _ => Err("Please provide email and password!".to_string()),
        }
    }
}

/// Command to change the password of an authenticated user
#[derive(Debug)]
pub struct ChangePasswordCommand {
    pub current_password: String,
    pub new_password: NewPassword,
}

/// Command to exchange a mailed reset secret for a new password
#[derive(Debug)]
pub struct ResetPasswordCommand {
    pub secret: String,
    pub new_password: NewPassword,
}

/// Command to update the caller's own profile
#[derive(Debug, Default)]
pub struct UpdateProfileCommand {
    pub name: Option<UserName>,
    pub email: Option<EmailAddress>,
}

impl From<UpdateProfileCommand> for UserPatch {
    fn from(command: UpdateProfileCommand) -> Self {
        Self {
            name: command.name,
            email: command.email,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn sample_user() -> User {
        User::register(
            UserName::new("Jonas".to_string()).unwrap(),
            EmailAddress::new("jonas@example.com".to_string()).unwrap(),
            "$argon2id$hash".to_string(),
        )
    }

    #[test]
    fn test_email_is_normalized() {
        let email = EmailAddress::new("  Jonas@Example.COM ".to_string()).unwrap();
        assert_eq!(email.as_str(), "jonas@example.com");
    }

    #[test]
    fn test_email_rejects_garbage() {
        assert!(matches!(
            EmailAddress::new("not-an-email".to_string()),
            Err(EmailError::InvalidFormat(_))
        ));
        assert_eq!(EmailAddress::new("   ".to_string()), Err(EmailError::Missing));
    }

    #[test]
    fn test_name_is_trimmed_and_bounded() {
        assert_eq!(UserName::new("  Ada ".to_string()).unwrap().as_str(), "Ada");
        assert_eq!(UserName::new(" ".to_string()), Err(UserNameError::Empty));
        assert!(matches!(
            UserName::new("a".repeat(65)),
            Err(UserNameError::TooLong { max: 64, actual: 65 })
        ));
    }

    #[test]
    fn test_new_password_policy() {
        let ok = NewPassword::new(Some("pass1234".into()), Some("pass1234".into()));
        assert_eq!(ok.unwrap().expose(), "pass1234");

        assert_eq!(
            NewPassword::new(Some("short".into()), Some("short".into())),
            Err(PasswordPolicyError::TooShort { min: 8 })
        );
        assert_eq!(
            NewPassword::new(Some("pass1234".into()), Some("pass12345".into())),
            Err(PasswordPolicyError::Mismatch)
        );
        assert_eq!(
            NewPassword::new(Some("pass1234".into()), None),
            Err(PasswordPolicyError::Missing)
        );
        assert_eq!(
            NewPassword::new(Some("x".repeat(129)), Some("x".repeat(129))),
            Err(PasswordPolicyError::TooLong { max: 128 })
        );
    }

    #[test]
    fn test_new_password_debug_is_redacted() {
        let password = NewPassword::new(Some("pass1234".into()), Some("pass1234".into())).unwrap();
        assert!(!format!("{:?}", password).contains("pass1234"));
    }

    #[test]
    fn test_role_round_trips_through_strings() {
        for role in [Role::User, Role::Guide, Role::LeadGuide, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_changed_password_after() {
        let mut user = sample_user();
        let issued = Utc::now();
        assert!(!user.changed_password_after(issued));

        user.password_changed_at = Some(issued - Duration::seconds(5));
        assert!(!user.changed_password_after(issued));

        user.password_changed_at = Some(issued + Duration::milliseconds(1));
        assert!(user.changed_password_after(issued));
    }

    #[test]
    fn test_changed_password_same_millisecond_is_not_after() {
        let mut user = sample_user();
        let issued = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        user.password_changed_at = Some(issued + Duration::microseconds(300));
        assert!(!user.changed_password_after(issued));
    }

    #[test]
    fn test_change_password_clears_pending_reset() {
        let mut user = sample_user();
        let now = Utc::now();
        user.pending_reset = Some(PendingReset {
            token_digest: "abc".to_string(),
            expires_at: now + Duration::minutes(10),
        });

        user.change_password("$argon2id$new".to_string(), now);

        assert_eq!(user.password_hash.as_deref(), Some("$argon2id$new"));
        assert_eq!(user.password_changed_at, Some(now));
        assert!(user.pending_reset.is_none());
    }

    #[test]
    fn test_login_command_requires_both_fields() {
        assert!(LoginCommand::new(Some("a@b.com".into()), None).is_err());
        assert!(LoginCommand::new(None, Some("secret".into())).is_err());
        assert!(LoginCommand::new(Some(" ".into()), Some("secret".into())).is_err());

        let command = LoginCommand::new(Some(" A@B.com ".into()), Some("secret".into())).unwrap();
        assert_eq!(command.email, "a@b.com");
    }

    #[test]
    fn test_pending_reset_liveness_is_strict() {
        let now = Utc::now();
        let reset = PendingReset {
            token_digest: "d".to_string(),
            expires_at: now,
        };
        assert!(!reset.is_live(now));
        assert!(reset.is_live(now - Duration::seconds(1)));
    }
}
