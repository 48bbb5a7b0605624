use nexgen_auth::{Principal, User};

/// Authenticated user for a request, inserted by the auth middleware.
///
/// Always the freshly loaded record (through the user cache), never just the
/// token claims.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    user: User,
}

impl CurrentUser {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn principal(&self) -> Principal {
        Principal::from_user(&self.user)
    }

    /// Name shown on records the user creates; falls back to the email.
    pub fn display_name(&self) -> &str {
        if self.user.name.trim().is_empty() {
            &self.user.email
        } else {
            &self.user.name
        }
    }
}
