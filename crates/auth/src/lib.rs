//! `nexgen-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it owns the
//! role catalogue, JWT issuance/validation, password hashing and the RBAC
//! policy checks. Callers load users and permission rows themselves.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{
    authorize_module, require_active, require_superadmin, AuthzError, RouteAccessTable,
};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{extract_bearer, IssuedToken, JwtError, JwtService};
pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::{Action, Module, ModuleGrant, NewModule, Permission, PermissionInput};
pub use principal::Principal;
pub use roles::{NewRole, Role, SystemRole};
pub use user::{CreateUser, UpdateUser, User, UserChanges, UserDraft, normalize_email};
