//! Module-permission guard for the requisition endpoints.
//!
//! Loads the caller's role row for the `procurement` module and defers the
//! decision to [`nexgen_auth::authorize_module`].

use nexgen_auth::{authorize_module, Action, Principal};
use nexgen_infra::{seed::PROCUREMENT_MODULE, Stores};

use crate::app::errors::ApiError;

pub async fn authorize_procurement(stores: &Stores, principal: &Principal, action: Action) -> Result<(), ApiError> {
    // Superadmins never need the lookup.
    if principal.has_superadmin_rights() {
        return authorize_module(principal, PROCUREMENT_MODULE, None, action).map_err(ApiError::from);
    }

    let grant = match stores.modules.find_by_name(PROCUREMENT_MODULE).await? {
        Some(module) => stores
            .permissions
            .get(principal.role, module.id)
            .await?
            .map(|p| p.grant),
        None => None,
    };

    authorize_module(principal, PROCUREMENT_MODULE, grant.as_ref(), action).map_err(|e| {
        tracing::warn!(user_id = %principal.user_id, role = %principal.role, %action, "procurement access denied");
        ApiError::from(e)
    })
}
