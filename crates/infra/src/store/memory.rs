//! In-memory store for tests/dev.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Datelike;

use nexgen_auth::{Module, NewModule, NewRole, Permission, PermissionInput, Role, SystemRole, User, UserChanges, UserDraft};
use nexgen_core::{Entity, ModuleId, PermissionId, RequisitionId, RoleId, UserId};
use nexgen_procurement::{Requisition, RequisitionDraft, RequisitionStatus};

use super::{ModuleStore, Page, PermissionStore, RequisitionStore, RoleStore, StoreError, UserStore};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    roles: BTreeMap<RoleId, Role>,
    modules: BTreeMap<ModuleId, Module>,
    permissions: BTreeMap<PermissionId, Permission>,
    requisitions: BTreeMap<RequisitionId, Requisition>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// All tables behind one lock, ordered by id like a `SERIAL` column.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }
}

fn values<K, V: Clone>(map: &BTreeMap<K, V>) -> Vec<V> {
    map.values().cloned().collect()
}

/// Insert (or replace) a row under its own id.
fn put<E>(map: &mut BTreeMap<E::Id, E>, row: &E)
where
    E: Entity + Clone,
    E::Id: Ord,
{
    map.insert(row.id(), row.clone());
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create(&self, draft: UserDraft) -> Result<User, StoreError> {
        let mut t = self.write()?;
        if t.users.values().any(|u| u.email == draft.email) {
            return Err(StoreError::Conflict(format!("email {} already exists", draft.email)));
        }
        if !t.roles.contains_key(&draft.role) {
            return Err(StoreError::MissingReference(format!("role {}", draft.role)));
        }
        let user = draft.into_user(UserId::new(t.next_id()));
        put(&mut t.users, &user);
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, page: Page) -> Result<Vec<User>, StoreError> {
        Ok(page.slice(&values(&self.read()?.users)))
    }

    async fn update(&self, id: UserId, changes: &UserChanges) -> Result<Option<User>, StoreError> {
        let mut t = self.write()?;
        if let Some(email) = &changes.email {
            if t.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Conflict(format!("email {email} already exists")));
            }
        }
        if let Some(role) = changes.role {
            if !t.roles.contains_key(&role) {
                return Err(StoreError::MissingReference(format!("role {role}")));
            }
        }
        Ok(t.users.get_mut(&id).map(|user| {
            user.apply_changes(changes);
            user.clone()
        }))
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn create(&self, role: NewRole) -> Result<Role, StoreError> {
        let mut t = self.write()?;
        if t.roles.values().any(|r| r.name == role.name) {
            return Err(StoreError::Conflict(format!("role {} already exists", role.name)));
        }
        let last = t.roles.keys().next_back().map(|id| id.get()).unwrap_or(0);
        let id = RoleId::new((last + 1).max(SystemRole::FIRST_CUSTOM_ID));
        let role = Role {
            id,
            name: role.name,
            description: role.description,
        };
        put(&mut t.roles, &role);
        Ok(role)
    }

    async fn insert_if_absent(&self, role: &Role) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        if t.roles.contains_key(&role.id) {
            return Ok(false);
        }
        if t.roles.values().any(|r| r.name == role.name) {
            return Err(StoreError::Conflict(format!("role {} already exists", role.name)));
        }
        put(&mut t.roles, role);
        Ok(true)
    }

    async fn get(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        Ok(self.read()?.roles.get(&id).cloned())
    }

    async fn list(&self, page: Page) -> Result<Vec<Role>, StoreError> {
        Ok(page.slice(&values(&self.read()?.roles)))
    }
}

#[async_trait]
impl ModuleStore for InMemoryStore {
    async fn create(&self, module: NewModule) -> Result<Module, StoreError> {
        let mut t = self.write()?;
        if t.modules.values().any(|m| m.name == module.name) {
            return Err(StoreError::Conflict(format!("module {} already exists", module.name)));
        }
        let module = Module {
            id: ModuleId::new(t.next_id()),
            name: module.name,
            description: module.description,
        };
        put(&mut t.modules, &module);
        Ok(module)
    }

    async fn get(&self, id: ModuleId) -> Result<Option<Module>, StoreError> {
        Ok(self.read()?.modules.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Module>, StoreError> {
        Ok(self.read()?.modules.values().find(|m| m.name == name).cloned())
    }

    async fn list(&self, page: Page) -> Result<Vec<Module>, StoreError> {
        Ok(page.slice(&values(&self.read()?.modules)))
    }
}

#[async_trait]
impl PermissionStore for InMemoryStore {
    async fn list_for_role(&self, role_id: RoleId) -> Result<Vec<Permission>, StoreError> {
        Ok(self
            .read()?
            .permissions
            .values()
            .filter(|p| p.role_id == role_id)
            .cloned()
            .collect())
    }

    async fn get(&self, role_id: RoleId, module_id: ModuleId) -> Result<Option<Permission>, StoreError> {
        Ok(self
            .read()?
            .permissions
            .values()
            .find(|p| p.role_id == role_id && p.module_id == module_id)
            .cloned())
    }

    async fn upsert(&self, input: &PermissionInput) -> Result<Permission, StoreError> {
        let mut t = self.write()?;
        if !t.roles.contains_key(&input.role_id) {
            return Err(StoreError::MissingReference(format!("role {}", input.role_id)));
        }
        if !t.modules.contains_key(&input.module_id) {
            return Err(StoreError::MissingReference(format!("module {}", input.module_id)));
        }
        let existing = t
            .permissions
            .values_mut()
            .find(|p| p.role_id == input.role_id && p.module_id == input.module_id);
        if let Some(row) = existing {
            row.grant = input.grant;
            return Ok(row.clone());
        }
        let row = Permission {
            id: PermissionId::new(t.next_id()),
            role_id: input.role_id,
            module_id: input.module_id,
            grant: input.grant,
        };
        put(&mut t.permissions, &row);
        Ok(row)
    }
}

#[async_trait]
impl RequisitionStore for InMemoryStore {
    async fn create(&self, draft: RequisitionDraft) -> Result<Requisition, StoreError> {
        let mut t = self.write()?;
        let year = draft.created_on.year();
        let in_year = t
            .requisitions
            .values()
            .filter(|r| r.created_at.year() == year)
            .count();
        let id = RequisitionId::new(t.next_id());
        let pr = draft.into_requisition(id, in_year as u32 + 1);
        put(&mut t.requisitions, &pr);
        Ok(pr)
    }

    async fn get(&self, id: RequisitionId) -> Result<Option<Requisition>, StoreError> {
        Ok(self.read()?.requisitions.get(&id).cloned())
    }

    async fn list(&self, page: Page) -> Result<Vec<Requisition>, StoreError> {
        Ok(page.slice(&values(&self.read()?.requisitions)))
    }

    async fn transition(
        &self,
        id: RequisitionId,
        from: RequisitionStatus,
        to: RequisitionStatus,
    ) -> Result<Option<Requisition>, StoreError> {
        let mut t = self.write()?;
        Ok(match t.requisitions.get_mut(&id) {
            Some(pr) if pr.status == from => {
                pr.status = to;
                Some(pr.clone())
            }
            _ => None,
        })
    }
}
