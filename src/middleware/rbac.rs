// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, organization::OrganizationContext},
    models::organization::MemberRole,
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// Permissões concedidas a cada cargo da membership.
pub fn role_grants(role: MemberRole, slug: &str) -> bool {
    match role {
        MemberRole::Owner => true,
        MemberRole::Admin => slug != PermBillingManage::slug(),
        MemberRole::Member => slug == PermHrWrite::slug(),
    }
}

/// 2. O Extractor (Guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_request_parts(parts, state)
            .await
            .unwrap_or_default();

        let ctx = parts
            .extensions
            .get::<OrganizationContext>()
            .ok_or_else(|| AppError::OrganizationNotFound.to_api_error(&locale, &app_state.i18n_store))?;

        let required_perm = T::slug();
        if !role_grants(ctx.role, required_perm) {
            return Err(AppError::Forbidden(required_perm.to_string())
                .to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermBillingWrite;
impl PermissionDef for PermBillingWrite {
    fn slug() -> &'static str { "billing:write" }
}

pub struct PermBillingManage;
impl PermissionDef for PermBillingManage {
    fn slug() -> &'static str { "billing:manage" }
}

pub struct PermHrWrite;
impl PermissionDef for PermHrWrite {
    fn slug() -> &'static str { "hr:write" }
}

pub struct PermHrApprove;
impl PermissionDef for PermHrApprove {
    fn slug() -> &'static str { "hr:approve" }
}

pub struct PermHrManage;
impl PermissionDef for PermHrManage {
    fn slug() -> &'static str { "hr:manage" }
}

pub struct PermDocumentsWrite;
impl PermissionDef for PermDocumentsWrite {
    fn slug() -> &'static str { "documents:write" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_can_only_file_leave_requests() {
        assert!(role_grants(MemberRole::Member, PermHrWrite::slug()));
        assert!(!role_grants(MemberRole::Member, PermHrApprove::slug()));
        assert!(!role_grants(MemberRole::Member, PermBillingWrite::slug()));
    }

    #[test]
    fn only_owners_manage_the_subscription() {
        assert!(role_grants(MemberRole::Owner, PermBillingManage::slug()));
        assert!(!role_grants(MemberRole::Admin, PermBillingManage::slug()));
        assert!(role_grants(MemberRole::Admin, PermHrApprove::slug()));
        assert!(role_grants(MemberRole::Admin, PermHrManage::slug()));
        assert!(!role_grants(MemberRole::Member, PermHrManage::slug()));
    }
}
