// ── Authenticated session ──

use gopark_api::types::{Role, User};
use secrecy::SecretString;

/// The logged-in user and their bearer token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: SecretString,
}

impl Session {
    pub fn new(user: User, token: SecretString) -> Self {
        Self { user, token }
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.user.role == role
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_employee(&self) -> bool {
        self.has_role(Role::Employee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_helpers() {
        let session = Session::new(
            User {
                id: "admin".into(),
                username: "admin".into(),
                role: Role::Admin,
            },
            SecretString::from("tok".to_string()),
        );
        assert!(session.is_admin());
        assert!(!session.is_employee());
        assert!(session.has_role(Role::Admin));
        assert_eq!(session.username(), "admin");
    }
}
