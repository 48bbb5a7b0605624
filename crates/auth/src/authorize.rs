use std::collections::{HashMap, HashSet};

use thiserror::Error;

use nexgen_core::RoleId;

use crate::permissions::{Action, ModuleGrant};
use crate::principal::Principal;
use crate::roles::SystemRole;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Inactive user")]
    InactiveUser,

    #[error("Superadmin access required")]
    SuperadminRequired,

    #[error("Access denied")]
    AccessDenied { path: String },

    #[error("forbidden: missing '{action}' permission on module '{module}'")]
    MissingModulePermission { module: String, action: Action },
}

/// Static allow-list of role ids per top-level route area.
///
/// Keys are the first path segment (`/settings`, `/procurement`, ...), so
/// `/settings/users` resolves through the `/settings` entry with one lookup.
#[derive(Debug, Clone, Default)]
pub struct RouteAccessTable {
    routes: HashMap<String, HashSet<RoleId>>,
}

impl RouteAccessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, path: &str, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.routes
            .entry(route_key(path).to_string())
            .or_default()
            .extend(roles);
        self
    }

    /// Areas of the ERP front end and the built-in roles that may open them.
    pub fn default_table() -> Self {
        use SystemRole::*;

        let ids = |roles: &[SystemRole]| roles.iter().map(|r| r.id()).collect::<Vec<_>>();

        Self::new()
            .with_route("/dashboard", ids(&SystemRole::ALL))
            .with_route("/settings", ids(&[Admin]))
            .with_route("/sales", ids(&[Admin, SalesManager, SalesRep]))
            .with_route("/inventory", ids(&[Admin, InventoryManager]))
            .with_route("/crm", ids(&[Admin, CrmManager, SalesManager]))
            .with_route("/hr", ids(&[Admin, HrManager]))
            .with_route("/finance", ids(&[Admin, FinanceManager]))
            .with_route("/quality", ids(&[Admin, QualityManager, ProductionManager]))
            .with_route("/logistics", ids(&[Admin, LogisticsManager]))
            .with_route("/production", ids(&[Admin, ProductionManager, PlantManager]))
            .with_route("/procurement", ids(&[Admin, ProcurementManager, PlantManager]))
            .with_route("/plant-maintenance", ids(&[Admin, PlantManager]))
    }

    pub fn allowed_roles(&self, path: &str) -> Option<&HashSet<RoleId>> {
        self.routes.get(route_key(path))
    }

    /// SUPER_ADMIN passes everywhere; unknown paths allow nobody else.
    pub fn enforce_access(&self, role: RoleId, path: &str) -> Result<(), AuthzError> {
        if role == SystemRole::SuperAdmin.id() {
            return Ok(());
        }
        match self.allowed_roles(path) {
            Some(roles) if roles.contains(&role) => Ok(()),
            _ => Err(AuthzError::AccessDenied {
                path: path.to_string(),
            }),
        }
    }

    /// Route areas a role may open, sorted. Drives the client's navigation.
    pub fn accessible_paths(&self, role: RoleId) -> Vec<String> {
        let mut paths: Vec<String> = self
            .routes
            .iter()
            .filter(|(_, roles)| role == SystemRole::SuperAdmin.id() || roles.contains(&role))
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }
}

fn route_key(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.get(1..).and_then(|rest| rest.find('/')) {
        Some(idx) => &trimmed[..idx + 1],
        None => trimmed,
    }
}

pub fn require_active(principal: &Principal) -> Result<(), AuthzError> {
    if principal.is_active {
        Ok(())
    } else {
        Err(AuthzError::InactiveUser)
    }
}

pub fn require_superadmin(principal: &Principal) -> Result<(), AuthzError> {
    require_active(principal)?;
    if principal.has_superadmin_rights() {
        Ok(())
    } else {
        Err(AuthzError::SuperadminRequired)
    }
}

/// Module-level check against the role's permission row for `module`.
///
/// - No IO
/// - Missing row denies
/// - Superadmins bypass
pub fn authorize_module(
    principal: &Principal,
    module: &str,
    grant: Option<&ModuleGrant>,
    action: Action,
) -> Result<(), AuthzError> {
    require_active(principal)?;
    if principal.has_superadmin_rights() {
        return Ok(());
    }
    match grant {
        Some(g) if g.allows(action) => Ok(()),
        _ => Err(AuthzError::MissingModulePermission {
            module: module.to_string(),
            action,
        }),
    }
}
