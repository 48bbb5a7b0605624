//! Startup bootstrap: built-in roles, the procurement module, first superadmin.

use nexgen_auth::{hash_password, normalize_email, NewModule, Role, SystemRole, UserDraft};

use crate::store::{StoreError, Stores};

/// Module name the requisition endpoints check permissions against.
pub const PROCUREMENT_MODULE: &str = "procurement";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub roles_created: usize,
    pub modules_created: usize,
    pub superadmin_created: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid superadmin credentials: {0}")]
    Credentials(String),
}

/// Idempotent: rows that already exist are left as they are.
pub async fn bootstrap(
    stores: &Stores,
    superadmin_email: &str,
    superadmin_password: &str,
) -> Result<BootstrapReport, BootstrapError> {
    let mut report = BootstrapReport::default();

    for role in SystemRole::ALL {
        if stores.roles.insert_if_absent(&Role::system(role)).await? {
            report.roles_created += 1;
        }
    }

    if stores.modules.find_by_name(PROCUREMENT_MODULE).await?.is_none() {
        stores
            .modules
            .create(NewModule {
                name: PROCUREMENT_MODULE.to_string(),
                description: Some("Purchase requisitions".to_string()),
            })
            .await?;
        report.modules_created += 1;
    }

    let email = normalize_email(superadmin_email).map_err(|e| BootstrapError::Credentials(e.to_string()))?;
    if stores.users.find_by_email(&email).await?.is_none() {
        if superadmin_password.is_empty() {
            return Err(BootstrapError::Credentials("password cannot be empty".into()));
        }
        let hashed_password =
            hash_password(superadmin_password).map_err(|e| BootstrapError::Credentials(e.to_string()))?;
        stores
            .users
            .create(UserDraft {
                email: email.clone(),
                name: "Super Admin".to_string(),
                hashed_password,
                role: SystemRole::SuperAdmin.id(),
                is_active: true,
                is_superadmin: true,
            })
            .await?;
        report.superadmin_created = true;
        tracing::info!(%email, "created initial superadmin");
    }

    tracing::info!(
        roles_created = report.roles_created,
        modules_created = report.modules_created,
        superadmin_created = report.superadmin_created,
        "bootstrap complete"
    );
    Ok(report)
}
