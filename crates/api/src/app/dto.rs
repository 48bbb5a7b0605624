use serde::{Deserialize, Serialize};

use nexgen_auth::{Permission, PermissionInput, Role, User};
use nexgen_core::{RoleId, UserId};
use nexgen_infra::Page;
use nexgen_procurement::Requisition;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// OAuth2 password-flow form; `username` carries the email.
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
    /// OAuth2 clients send `password`; absent is accepted too.
    #[serde(default)]
    pub grant_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    #[serde(default)]
    pub role_id: Option<RoleId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }
}

#[derive(Debug, Deserialize)]
pub struct PermissionsUpdate {
    pub role_id: RoleId,
    #[serde(default)]
    pub permissions: Vec<PermissionInput>,
}

// -------------------------
// Response DTOs
// -------------------------

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserOut {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role_id: RoleId,
    pub is_active: bool,
    pub is_superadmin: bool,
}

impl From<&User> for UserOut {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone(),
            role_id: u.role,
            is_active: u.is_active,
            is_superadmin: u.is_superadmin,
        }
    }
}

pub fn users_out(users: &[User]) -> Vec<UserOut> {
    users.iter().map(UserOut::from).collect()
}

#[derive(Debug, Serialize)]
pub struct MeOut {
    #[serde(flatten)]
    pub user: UserOut,
    pub role_name: Option<String>,
    pub accessible_paths: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Serialize)]
pub struct DecisionOut {
    pub message: &'static str,
    pub pr: Requisition,
}

#[derive(Debug, Serialize)]
pub struct MessageOut {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_out_hides_hash() {
        let user = User {
            id: UserId::new(3),
            email: "a@x.io".into(),
            name: "A".into(),
            hashed_password: "$argon2id$secret".into(),
            role: RoleId::new(99),
            is_active: true,
            is_superadmin: false,
        };
        let json = serde_json::to_value(UserOut::from(&user)).unwrap();
        assert_eq!(json["role_id"], 99);
        assert!(json.get("hashed_password").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn assign_role_tolerates_missing_field() {
        let req: AssignRoleRequest = serde_json::from_str("{}").unwrap();
        assert!(req.role_id.is_none());
    }
}
