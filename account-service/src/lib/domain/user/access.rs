use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::user::errors::AuthFailure;
use crate::user::errors::UserError;

/// Admit `user` only if its role is in `allowed`.
///
/// A missing identity fails closed: the role check must never run ahead of
/// authentication.
///
/// # Errors
/// * `Unauthenticated(NotLoggedIn)` - No resolved identity
/// * `Forbidden` - Role not in the allow-list
pub fn restrict_to(user: Option<&User>, allowed: &[Role]) -> Result<(), UserError> {
    let user = user.ok_or(UserError::Unauthenticated(AuthFailure::NotLoggedIn))?;

    if allowed.contains(&user.role) {
        Ok(())
    } else {
        tracing::warn!(user_id = %user.id, role = %user.role, "Role not permitted");
        Err(UserError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::models::EmailAddress;
    use crate::domain::user::models::UserName;

    fn user_with(role: Role) -> User {
        let mut user = User::register(
            UserName::new("Leo".to_string()).unwrap(),
            EmailAddress::new("leo@example.com".to_string()).unwrap(),
            "$argon2id$hash".to_string(),
        );
        user.role = role;
        user
    }

    #[test]
    fn test_admits_listed_roles() {
        let guide = user_with(Role::LeadGuide);
        assert!(restrict_to(Some(&guide), &[Role::Admin, Role::LeadGuide]).is_ok());
    }

    #[test]
    fn test_rejects_unlisted_roles() {
        let user = user_with(Role::User);
        assert!(matches!(
            restrict_to(Some(&user), &[Role::Admin]),
            Err(UserError::Forbidden)
        ));
        assert!(matches!(
            restrict_to(Some(&user), &[]),
            Err(UserError::Forbidden)
        ));
    }

    #[test]
    fn test_fails_closed_without_identity() {
        assert!(matches!(
            restrict_to(None, &[Role::User, Role::Admin]),
            Err(UserError::Unauthenticated(AuthFailure::NotLoggedIn))
        ));
    }
}
