use nexgen_core::{RoleId, UserId};

use crate::roles::SystemRole;
use crate::user::User;

/// A fully resolved principal for authorization decisions.
///
/// Built from the freshly loaded user record, never from token claims alone,
/// so deactivation and role changes apply to tokens already in circulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: RoleId,
    pub is_active: bool,
    pub is_superadmin: bool,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            is_active: user.is_active,
            is_superadmin: user.is_superadmin,
        }
    }

    pub fn system_role(&self) -> Option<SystemRole> {
        SystemRole::from_id(self.role)
    }

    /// Superadmin flag or the SUPER_ADMIN role.
    pub fn has_superadmin_rights(&self) -> bool {
        self.is_superadmin || self.system_role() == Some(SystemRole::SuperAdmin)
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self::from_user(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: SystemRole, flag: bool) -> Principal {
        Principal {
            user_id: UserId::new(1),
            role: role.id(),
            is_active: true,
            is_superadmin: flag,
        }
    }

    #[test]
    fn superadmin_rights_come_from_flag_or_role() {
        assert!(principal(SystemRole::User, true).has_superadmin_rights());
        assert!(principal(SystemRole::SuperAdmin, false).has_superadmin_rights());
        assert!(!principal(SystemRole::Admin, false).has_superadmin_rights());
    }

    #[test]
    fn custom_roles_have_no_system_role() {
        let mut p = principal(SystemRole::User, false);
        p.role = RoleId::new(140);
        assert_eq!(p.system_role(), None);
    }
}
