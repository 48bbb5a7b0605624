use serde::{Deserialize, Serialize};

use nexgen_core::{DomainError, DomainResult, Entity, ModuleId, PermissionId, RoleId};

/// Action checked against a role's grant on a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Edit,
    Approve,
    Delete,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Approve => "approve",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four capability flags a role holds on one module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleGrant {
    #[serde(default)]
    pub can_view: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_approve: bool,
    #[serde(default)]
    pub can_delete: bool,
}

impl ModuleGrant {
    pub const NONE: ModuleGrant = ModuleGrant {
        can_view: false,
        can_edit: false,
        can_approve: false,
        can_delete: false,
    };

    pub const ALL: ModuleGrant = ModuleGrant {
        can_view: true,
        can_edit: true,
        can_approve: true,
        can_delete: true,
    };

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.can_view,
            Action::Edit => self.can_edit,
            Action::Approve => self.can_approve,
            Action::Delete => self.can_delete,
        }
    }
}

/// ERP functional area (e.g. "procurement").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    pub description: Option<String>,
}

impl Entity for Module {
    type Id = ModuleId;

    fn id(&self) -> ModuleId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewModule {
    pub name: String,
    pub description: Option<String>,
}

impl NewModule {
    /// Module names are stored lowercase so lookups by name are stable.
    pub fn validate(self) -> DomainResult<Self> {
        let name = self.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(DomainError::validation("module name cannot be empty"));
        }
        if name.len() > 100 {
            return Err(DomainError::validation("module name is longer than 100 characters"));
        }
        Ok(Self {
            name,
            description: self.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        })
    }
}

/// Role-to-module permission row. At most one per (role, module).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub role_id: RoleId,
    pub module_id: ModuleId,
    #[serde(flatten)]
    pub grant: ModuleGrant,
}

impl Entity for Permission {
    type Id = PermissionId;

    fn id(&self) -> PermissionId {
        self.id
    }
}

/// One entry of a bulk permission upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionInput {
    pub role_id: RoleId,
    pub module_id: ModuleId,
    #[serde(flatten)]
    pub grant: ModuleGrant,
}
