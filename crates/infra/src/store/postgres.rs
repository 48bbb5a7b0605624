//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |----------------------|------------|----------|
//! | `23505` | `Conflict` | duplicate email / role name / module name |
//! | `23503` | `MissingReference` | role or module id does not exist |
//! | other | `Backend` | connectivity, pool closed, bad row |

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use nexgen_auth::{Module, ModuleGrant, NewModule, NewRole, Permission, PermissionInput, Role, User, UserChanges, UserDraft};
use nexgen_core::{ModuleId, PermissionId, RequisitionId, RoleId, UserId};
use nexgen_procurement::{pr_number, Requisition, RequisitionDraft, RequisitionStatus};

use super::{ModuleStore, Page, PermissionStore, RequisitionStore, RoleStore, StoreError, UserStore};

const USER_COLUMNS: &str = "id, email, name, hashed_password, role, is_active, is_superadmin";
const PERMISSION_COLUMNS: &str = "id, role_id, module_id, can_view, can_edit, can_approve, can_delete";
const REQUISITION_COLUMNS: &str = "id, pr_number, requested_by, dept, amount, items, status, created_at";

/// Serializes PR numbering across concurrent inserts (`pg_advisory_xact_lock` key).
const PR_NUMBER_LOCK: i64 = 0x5052_4e55_4d42; // "PRNUMB"

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::MissingReference(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        hashed_password: row.try_get("hashed_password")?,
        role: RoleId::new(row.try_get("role")?),
        is_active: row.try_get("is_active")?,
        is_superadmin: row.try_get("is_superadmin")?,
    })
}

fn role_from_row(row: &PgRow) -> Result<Role, sqlx::Error> {
    Ok(Role {
        id: RoleId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
    })
}

fn module_from_row(row: &PgRow) -> Result<Module, sqlx::Error> {
    Ok(Module {
        id: ModuleId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
    })
}

fn permission_from_row(row: &PgRow) -> Result<Permission, sqlx::Error> {
    Ok(Permission {
        id: PermissionId::new(row.try_get("id")?),
        role_id: RoleId::new(row.try_get("role_id")?),
        module_id: ModuleId::new(row.try_get("module_id")?),
        grant: ModuleGrant {
            can_view: row.try_get("can_view")?,
            can_edit: row.try_get("can_edit")?,
            can_approve: row.try_get("can_approve")?,
            can_delete: row.try_get("can_delete")?,
        },
    })
}

fn requisition_from_row(row: &PgRow) -> Result<Requisition, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Requisition {
        id: RequisitionId::new(row.try_get("id")?),
        pr_number: row.try_get("pr_number")?,
        requested_by: row.try_get("requested_by")?,
        dept: row.try_get("dept")?,
        amount: row.try_get("amount")?,
        items: row.try_get("items")?,
        status: RequisitionStatus::parse(&status).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        created_at: row.try_get("created_at")?,
    })
}

/// Map rows with `f`, tagging decode failures with `operation`.
fn decode_all<T>(
    operation: &str,
    rows: Vec<PgRow>,
    f: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> Result<Vec<T>, StoreError> {
    rows.iter()
        .map(|row| f(row).map_err(|e| map_sqlx_error(operation, e)))
        .collect()
}

fn decode_one<T>(
    operation: &str,
    row: Option<PgRow>,
    f: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> Result<Option<T>, StoreError> {
    row.as_ref()
        .map(f)
        .transpose()
        .map_err(|e| map_sqlx_error(operation, e))
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, draft), fields(email = %draft.email), err)]
    async fn create(&self, draft: UserDraft) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (email, name, hashed_password, role, is_active, is_superadmin) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&draft.email)
            .bind(&draft.name)
            .bind(&draft.hashed_password)
            .bind(draft.role.get())
            .bind(draft.is_active)
            .bind(draft.is_superadmin)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_user", e))?;
        user_from_row(&row).map_err(|e| map_sqlx_error("create_user", e))
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        decode_one("get_user", row, user_from_row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        decode_one("find_user_by_email", row, user_from_row)
    }

    async fn list(&self, page: Page) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id OFFSET $1 LIMIT $2");
        let rows = sqlx::query(&sql)
            .bind(page.skip)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        decode_all("list_users", rows, user_from_row)
    }

    #[instrument(skip(self, changes), fields(user_id = %id), err)]
    async fn update(&self, id: UserId, changes: &UserChanges) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "UPDATE users SET \
                email = COALESCE($2, email), \
                name = COALESCE($3, name), \
                hashed_password = COALESCE($4, hashed_password), \
                role = COALESCE($5, role), \
                is_active = COALESCE($6, is_active), \
                is_superadmin = COALESCE($7, is_superadmin) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(changes.email.as_deref())
            .bind(changes.name.as_deref())
            .bind(changes.hashed_password.as_deref())
            .bind(changes.role.map(RoleId::get))
            .bind(changes.is_active)
            .bind(changes.is_superadmin)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;
        decode_one("update_user", row, user_from_row)
    }
}

#[async_trait]
impl RoleStore for PostgresStore {
    async fn create(&self, role: NewRole) -> Result<Role, StoreError> {
        let row = sqlx::query("INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING id, name, description")
            .bind(&role.name)
            .bind(role.description.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_role", e))?;
        role_from_row(&row).map_err(|e| map_sqlx_error("create_role", e))
    }

    async fn insert_if_absent(&self, role: &Role) -> Result<bool, StoreError> {
        let result = sqlx::query("INSERT INTO roles (id, name, description) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING")
            .bind(role.id.get())
            .bind(&role.name)
            .bind(role.description.as_deref())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_role", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn get(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        let row = sqlx::query("SELECT id, name, description FROM roles WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_role", e))?;
        decode_one("get_role", row, role_from_row)
    }

    async fn list(&self, page: Page) -> Result<Vec<Role>, StoreError> {
        let rows = sqlx::query("SELECT id, name, description FROM roles ORDER BY id OFFSET $1 LIMIT $2")
            .bind(page.skip)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;
        decode_all("list_roles", rows, role_from_row)
    }
}

#[async_trait]
impl ModuleStore for PostgresStore {
    async fn create(&self, module: NewModule) -> Result<Module, StoreError> {
        let row = sqlx::query("INSERT INTO modules (name, description) VALUES ($1, $2) RETURNING id, name, description")
            .bind(&module.name)
            .bind(module.description.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_module", e))?;
        module_from_row(&row).map_err(|e| map_sqlx_error("create_module", e))
    }

    async fn get(&self, id: ModuleId) -> Result<Option<Module>, StoreError> {
        let row = sqlx::query("SELECT id, name, description FROM modules WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_module", e))?;
        decode_one("get_module", row, module_from_row)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Module>, StoreError> {
        let row = sqlx::query("SELECT id, name, description FROM modules WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_module_by_name", e))?;
        decode_one("find_module_by_name", row, module_from_row)
    }

    async fn list(&self, page: Page) -> Result<Vec<Module>, StoreError> {
        let rows = sqlx::query("SELECT id, name, description FROM modules ORDER BY id OFFSET $1 LIMIT $2")
            .bind(page.skip)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_modules", e))?;
        decode_all("list_modules", rows, module_from_row)
    }
}

#[async_trait]
impl PermissionStore for PostgresStore {
    async fn list_for_role(&self, role_id: RoleId) -> Result<Vec<Permission>, StoreError> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE role_id = $1 ORDER BY module_id");
        let rows = sqlx::query(&sql)
            .bind(role_id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_permissions", e))?;
        decode_all("list_permissions", rows, permission_from_row)
    }

    async fn get(&self, role_id: RoleId, module_id: ModuleId) -> Result<Option<Permission>, StoreError> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE role_id = $1 AND module_id = $2");
        let row = sqlx::query(&sql)
            .bind(role_id.get())
            .bind(module_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_permission", e))?;
        decode_one("get_permission", row, permission_from_row)
    }

    async fn upsert(&self, input: &PermissionInput) -> Result<Permission, StoreError> {
        let sql = format!(
            "INSERT INTO permissions (role_id, module_id, can_view, can_edit, can_approve, can_delete) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (role_id, module_id) DO UPDATE SET \
                can_view = EXCLUDED.can_view, \
                can_edit = EXCLUDED.can_edit, \
                can_approve = EXCLUDED.can_approve, \
                can_delete = EXCLUDED.can_delete \
             RETURNING {PERMISSION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(input.role_id.get())
            .bind(input.module_id.get())
            .bind(input.grant.can_view)
            .bind(input.grant.can_edit)
            .bind(input.grant.can_approve)
            .bind(input.grant.can_delete)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("upsert_permission", e))?;
        permission_from_row(&row).map_err(|e| map_sqlx_error("upsert_permission", e))
    }
}

#[async_trait]
impl RequisitionStore for PostgresStore {
    #[instrument(skip(self, draft), fields(dept = %draft.dept), err)]
    async fn create(&self, draft: RequisitionDraft) -> Result<Requisition, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_requisition", e))?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(PR_NUMBER_LOCK)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_requisition", e))?;

        let year = draft.created_on.year();
        let (start, end) = year_bounds(year)?;
        let in_year: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM purchase_requisitions WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_requisition", e))?;

        let number = pr_number(draft.created_on, in_year as u32 + 1);
        let sql = format!(
            "INSERT INTO purchase_requisitions (pr_number, requested_by, dept, amount, items, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {REQUISITION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&number)
            .bind(&draft.requested_by)
            .bind(&draft.dept)
            .bind(draft.amount)
            .bind(draft.items)
            .bind(RequisitionStatus::Pending.as_str())
            .bind(draft.created_on)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_requisition", e))?;
        let pr = requisition_from_row(&row).map_err(|e| map_sqlx_error("create_requisition", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_requisition", e))?;
        Ok(pr)
    }

    async fn get(&self, id: RequisitionId) -> Result<Option<Requisition>, StoreError> {
        let sql = format!("SELECT {REQUISITION_COLUMNS} FROM purchase_requisitions WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_requisition", e))?;
        decode_one("get_requisition", row, requisition_from_row)
    }

    async fn list(&self, page: Page) -> Result<Vec<Requisition>, StoreError> {
        let sql = format!("SELECT {REQUISITION_COLUMNS} FROM purchase_requisitions ORDER BY id OFFSET $1 LIMIT $2");
        let rows = sqlx::query(&sql)
            .bind(page.skip)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_requisitions", e))?;
        decode_all("list_requisitions", rows, requisition_from_row)
    }

    async fn transition(
        &self,
        id: RequisitionId,
        from: RequisitionStatus,
        to: RequisitionStatus,
    ) -> Result<Option<Requisition>, StoreError> {
        let sql = format!(
            "UPDATE purchase_requisitions SET status = $3 WHERE id = $1 AND status = $2 RETURNING {REQUISITION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("transition_requisition", e))?;
        decode_one("transition_requisition", row, requisition_from_row)
    }
}

fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate), StoreError> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1);
    let end = NaiveDate::from_ymd_opt(year + 1, 1, 1);
    start
        .zip(end)
        .ok_or_else(|| StoreError::Backend(format!("date out of range for year {year}")))
}
