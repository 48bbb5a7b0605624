use core::str::FromStr;

use serde::{Deserialize, Serialize};

use nexgen_core::{DomainError, DomainResult, Entity, RoleId};

/// Built-in roles with fixed ids.
///
/// These are seeded into the roles table at bootstrap so that `users.role`
/// always references a real row. Roles created through the API get ids from
/// 100 upwards and never collide with this catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemRole {
    SuperAdmin,
    Admin,
    SalesManager,
    InventoryManager,
    CrmManager,
    HrManager,
    FinanceManager,
    QualityManager,
    LogisticsManager,
    ProductionManager,
    ProcurementManager,
    PlantManager,
    SalesRep,
    User,
}

impl SystemRole {
    pub const ALL: [SystemRole; 14] = [
        SystemRole::SuperAdmin,
        SystemRole::Admin,
        SystemRole::SalesManager,
        SystemRole::InventoryManager,
        SystemRole::CrmManager,
        SystemRole::HrManager,
        SystemRole::FinanceManager,
        SystemRole::QualityManager,
        SystemRole::LogisticsManager,
        SystemRole::ProductionManager,
        SystemRole::ProcurementManager,
        SystemRole::PlantManager,
        SystemRole::SalesRep,
        SystemRole::User,
    ];

    /// First id handed out to roles created at runtime.
    pub const FIRST_CUSTOM_ID: i64 = 100;

    pub const fn id(self) -> RoleId {
        RoleId::new(match self {
            SystemRole::SuperAdmin => 1,
            SystemRole::Admin => 2,
            SystemRole::SalesManager => 10,
            SystemRole::InventoryManager => 11,
            SystemRole::CrmManager => 12,
            SystemRole::HrManager => 13,
            SystemRole::FinanceManager => 14,
            SystemRole::QualityManager => 15,
            SystemRole::LogisticsManager => 16,
            SystemRole::ProductionManager => 17,
            SystemRole::ProcurementManager => 18,
            SystemRole::PlantManager => 19,
            SystemRole::SalesRep => 20,
            SystemRole::User => 99,
        })
    }

    pub fn from_id(id: RoleId) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.id() == id)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SystemRole::SuperAdmin => "SUPER_ADMIN",
            SystemRole::Admin => "ADMIN",
            SystemRole::SalesManager => "SALES_MANAGER",
            SystemRole::InventoryManager => "INVENTORY_MANAGER",
            SystemRole::CrmManager => "CRM_MANAGER",
            SystemRole::HrManager => "HR_MANAGER",
            SystemRole::FinanceManager => "FINANCE_MANAGER",
            SystemRole::QualityManager => "QUALITY_MANAGER",
            SystemRole::LogisticsManager => "LOGISTICS_MANAGER",
            SystemRole::ProductionManager => "PRODUCTION_MANAGER",
            SystemRole::ProcurementManager => "PROCUREMENT_MANAGER",
            SystemRole::PlantManager => "PLANT_MANAGER",
            SystemRole::SalesRep => "SALES_REP",
            SystemRole::User => "USER",
        }
    }

    /// Human-readable name, e.g. "Super Admin".
    pub fn display_name(self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for SystemRole {
    fn default() -> Self {
        SystemRole::User
    }
}

impl core::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| DomainError::validation(format!("invalid role: {s}")))
    }
}

/// Role row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
}

impl Role {
    /// Row seeded for a built-in role.
    pub fn system(role: SystemRole) -> Self {
        Self {
            id: role.id(),
            name: role.as_str().to_string(),
            description: Some(role.display_name()),
        }
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> RoleId {
        self.id
    }
}

/// Command to create a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
}

impl NewRole {
    /// Trim and validate; returns the normalized command.
    pub fn validate(self) -> DomainResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("role name cannot be empty"));
        }
        if name.len() > 100 {
            return Err(DomainError::validation("role name is longer than 100 characters"));
        }
        Ok(Self {
            name,
            description: self.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_catalogue() {
        for role in SystemRole::ALL {
            assert_eq!(SystemRole::from_id(role.id()), Some(role));
        }
        assert_eq!(SystemRole::from_id(RoleId::new(3)), None);
    }

    #[test]
    fn system_ids_stay_below_custom_range() {
        assert!(SystemRole::ALL.iter().all(|r| r.id().get() < SystemRole::FIRST_CUSTOM_ID));
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("super_admin".parse::<SystemRole>().unwrap(), SystemRole::SuperAdmin);
        assert_eq!(" Sales_Rep ".parse::<SystemRole>().unwrap(), SystemRole::SalesRep);
        assert!("janitor".parse::<SystemRole>().is_err());
    }

    #[test]
    fn display_name_is_title_cased() {
        assert_eq!(SystemRole::SuperAdmin.display_name(), "Super Admin");
        assert_eq!(SystemRole::HrManager.display_name(), "Hr Manager");
    }

    #[test]
    fn new_role_rejects_blank_name() {
        let err = NewRole { name: "   ".into(), description: None }.validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
