//! User accounts.
//!
//! Plain records plus the validated commands that create and update them.
//! Hashing happens in the caller so these types stay free of crypto.

use serde::{Deserialize, Serialize};

use nexgen_core::{DomainError, DomainResult, Entity, RoleId, UserId};

use crate::roles::SystemRole;

// ─────────────────────────────────────────────────────────────────────────────
// Record
// ─────────────────────────────────────────────────────────────────────────────

/// Stored user. Never serialize this to clients: it carries the hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub hashed_password: String,
    pub role: RoleId,
    pub is_active: bool,
    pub is_superadmin: bool,
}

impl User {
    pub fn apply_changes(&mut self, changes: &UserChanges) {
        if let Some(email) = &changes.email {
            self.email = email.clone();
        }
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(hash) = &changes.hashed_password {
            self.hashed_password = hash.clone();
        }
        if let Some(role) = changes.role {
            self.role = role;
        }
        if let Some(active) = changes.is_active {
            self.is_active = active;
        }
        if let Some(flag) = changes.is_superadmin {
            self.is_superadmin = flag;
        }
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Insert payload: a validated [`CreateUser`] with the password already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub email: String,
    pub name: String,
    pub hashed_password: String,
    pub role: RoleId,
    pub is_active: bool,
    pub is_superadmin: bool,
}

impl UserDraft {
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            email: self.email,
            name: self.name,
            hashed_password: self.hashed_password,
            role: self.role,
            is_active: self.is_active,
            is_superadmin: self.is_superadmin,
        }
    }
}

/// Partial update applied by stores. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub hashed_password: Option<String>,
    pub role: Option<RoleId>,
    pub is_active: Option<bool>,
    pub is_superadmin: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        *self == UserChanges::default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
    #[serde(default = "default_role", rename = "role_id", alias = "role")]
    pub role: RoleId,
    #[serde(default)]
    pub is_superadmin: bool,
}

fn default_role() -> RoleId {
    SystemRole::User.id()
}

impl CreateUser {
    /// Normalize email/name and check the password is present.
    pub fn validate(self) -> DomainResult<Self> {
        let email = normalize_email(&self.email)?;
        if self.password.is_empty() {
            return Err(DomainError::validation("password cannot be empty"));
        }
        Ok(Self {
            email,
            name: self.name.trim().to_string(),
            ..self
        })
    }

    pub fn into_draft(self, hashed_password: String) -> UserDraft {
        UserDraft {
            email: self.email,
            name: self.name,
            hashed_password,
            role: self.role,
            is_active: true,
            is_superadmin: self.is_superadmin,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUser {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, rename = "role_id", alias = "role")]
    pub role: Option<RoleId>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_superadmin: Option<bool>,
}

impl UpdateUser {
    pub fn validate(self) -> DomainResult<Self> {
        let email = self.email.as_deref().map(normalize_email).transpose()?;
        if matches!(self.password.as_deref(), Some("")) {
            return Err(DomainError::validation("password cannot be empty"));
        }
        Ok(Self {
            email,
            name: self.name.map(|n| n.trim().to_string()),
            ..self
        })
    }

    /// Split off the plaintext password; the rest maps onto [`UserChanges`].
    pub fn into_changes(self, hashed_password: Option<String>) -> UserChanges {
        UserChanges {
            email: self.email,
            name: self.name,
            hashed_password,
            role: self.role,
            is_active: self.is_active,
            is_superadmin: self.is_superadmin,
        }
    }
}

/// Lowercase and sanity-check an email address.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(DomainError::validation(format!("invalid email address: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(email: &str, password: &str) -> CreateUser {
        CreateUser {
            email: email.into(),
            name: " Ana ".into(),
            password: password.into(),
            role: SystemRole::User.id(),
            is_superadmin: false,
        }
    }

    #[test]
    fn normalizes_email() {
        assert_eq!(normalize_email(" Ana@Example.COM ").unwrap(), "ana@example.com");
    }

    #[test]
    fn rejects_malformed_emails() {
        for bad in ["", "ana", "@example.com", "ana@", "ana@example", "a@b@c.com", "a b@c.com", "ana@.com"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn create_user_requires_password() {
        assert!(create("ana@example.com", "").validate().is_err());
        let ok = create("ANA@example.com", "pw").validate().unwrap();
        assert_eq!(ok.email, "ana@example.com");
        assert_eq!(ok.name, "Ana");
    }

    #[test]
    fn create_user_defaults_role_to_plain_user() {
        let cmd: CreateUser = serde_json::from_str(r#"{"email":"a@b.io","password":"x"}"#).unwrap();
        assert_eq!(cmd.role, RoleId::new(99));
        assert!(!cmd.is_superadmin);
    }

    #[test]
    fn draft_starts_active() {
        let draft = create("ana@example.com", "pw").validate().unwrap().into_draft("hash".into());
        assert!(draft.is_active);
        assert_eq!(draft.hashed_password, "hash");
    }

    #[test]
    fn apply_changes_only_touches_present_fields() {
        let mut user = create("ana@example.com", "pw")
            .validate()
            .unwrap()
            .into_draft("h".into())
            .into_user(UserId::new(1));
        user.apply_changes(&UserChanges {
            is_active: Some(false),
            role: Some(RoleId::new(18)),
            ..UserChanges::default()
        });
        assert!(!user.is_active);
        assert_eq!(user.role, RoleId::new(18));
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.hashed_password, "h");
    }

    #[test]
    fn update_rejects_empty_password_and_bad_email() {
        assert!(UpdateUser { password: Some(String::new()), ..Default::default() }.validate().is_err());
        assert!(UpdateUser { email: Some("nope".into()), ..Default::default() }.validate().is_err());
    }
}
