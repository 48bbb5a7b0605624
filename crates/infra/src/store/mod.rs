//! Storage abstraction for accounts, RBAC rows and requisitions.
//!
//! Two implementations: [`memory::InMemoryStore`] for tests/dev and
//! [`postgres::PostgresStore`] for persistent deployments. Handlers only see
//! the traits through [`Stores`].

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use nexgen_auth::{Module, NewModule, NewRole, Permission, PermissionInput, Role, User, UserChanges, UserDraft};
use nexgen_core::{ModuleId, RequisitionId, RoleId, UserId};
use nexgen_procurement::{Requisition, RequisitionDraft, RequisitionStatus};

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unique constraint hit (duplicate email, role name, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Referenced row does not exist.
    #[error("missing reference: {0}")]
    MissingReference(String),

    #[error("storage error: {0}")]
    Backend(String),
}

/// Offset pagination shared by every list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub const MAX_LIMIT: i64 = 100;

    /// Negative skips become 0; limit is clamped to `0..=MAX_LIMIT`.
    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            skip: skip.unwrap_or(0).max(0),
            limit: limit.unwrap_or(Self::MAX_LIMIT).clamp(0, Self::MAX_LIMIT),
        }
    }

    pub(crate) fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.skip as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `Conflict` when the email is taken.
    async fn create(&self, draft: UserDraft) -> Result<User, StoreError>;
    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError>;
    /// Lookup by already-normalized (lowercase) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list(&self, page: Page) -> Result<Vec<User>, StoreError>;
    /// `Ok(None)` when the user does not exist.
    async fn update(&self, id: UserId, changes: &UserChanges) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Assigns an id from the custom range. `Conflict` on duplicate name.
    async fn create(&self, role: NewRole) -> Result<Role, StoreError>;
    /// Insert with a fixed id unless a role with that id exists. Returns
    /// whether a row was written.
    async fn insert_if_absent(&self, role: &Role) -> Result<bool, StoreError>;
    async fn get(&self, id: RoleId) -> Result<Option<Role>, StoreError>;
    async fn list(&self, page: Page) -> Result<Vec<Role>, StoreError>;
}

#[async_trait]
pub trait ModuleStore: Send + Sync {
    async fn create(&self, module: NewModule) -> Result<Module, StoreError>;
    async fn get(&self, id: ModuleId) -> Result<Option<Module>, StoreError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Module>, StoreError>;
    async fn list(&self, page: Page) -> Result<Vec<Module>, StoreError>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn list_for_role(&self, role_id: RoleId) -> Result<Vec<Permission>, StoreError>;
    async fn get(&self, role_id: RoleId, module_id: ModuleId) -> Result<Option<Permission>, StoreError>;
    /// Insert or overwrite the (role, module) row.
    async fn upsert(&self, input: &PermissionInput) -> Result<Permission, StoreError>;
}

#[async_trait]
pub trait RequisitionStore: Send + Sync {
    /// Assigns `id` and the next `pr_number` for the draft's year atomically.
    async fn create(&self, draft: RequisitionDraft) -> Result<Requisition, StoreError>;
    async fn get(&self, id: RequisitionId) -> Result<Option<Requisition>, StoreError>;
    async fn list(&self, page: Page) -> Result<Vec<Requisition>, StoreError>;
    /// Compare-and-set on status. `Ok(None)` when the row is missing or no
    /// longer in `from`.
    async fn transition(
        &self,
        id: RequisitionId,
        from: RequisitionStatus,
        to: RequisitionStatus,
    ) -> Result<Option<Requisition>, StoreError>;
}

/// Every store behind trait objects, cheap to clone into handler state.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub roles: Arc<dyn RoleStore>,
    pub modules: Arc<dyn ModuleStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub requisitions: Arc<dyn RequisitionStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(InMemoryStore::new()))
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::from_backend(Arc::new(PostgresStore::new(pool)))
    }

    fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UserStore + RoleStore + ModuleStore + PermissionStore + RequisitionStore + 'static,
    {
        Self {
            users: backend.clone(),
            roles: backend.clone(),
            modules: backend.clone(),
            permissions: backend.clone(),
            requisitions: backend,
        }
    }
}
