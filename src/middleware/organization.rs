// src/middleware/organization.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::{authenticate, AuthenticatedUser},
        i18n::Locale,
    },
    models::organization::MemberRole,
};

// Cabeçalho opcional para escolher a organização quando o usuário tem várias
const ORGANIZATION_ID_HEADER: &str = "x-organization-id";

/// Organização resolvida a partir da membership do usuário.
/// Só este middleware constrói o valor; os repositórios exigem-no.
#[derive(Debug, Clone)]
pub struct OrganizationContext {
    pub organization_id: Uuid,
    pub role: MemberRole,
}

fn requested_organization(headers: &HeaderMap) -> Result<Option<Uuid>, AppError> {
    match headers.get(ORGANIZATION_ID_HEADER) {
        None => Ok(None),
        Some(value) => {
            let value_str = value
                .to_str()
                .map_err(|_| AppError::InvalidInput("X-Organization-Id".into()))?;
            Uuid::parse_str(value_str)
                .map(Some)
                .map_err(|_| AppError::InvalidInput("X-Organization-Id (UUID)".into()))
        }
    }
}

async fn resolve(app_state: &AppState, headers: &HeaderMap) -> Result<(AuthenticatedUser, OrganizationContext), AppError> {
    let user = authenticate(app_state, headers)?;
    let requested = requested_organization(headers)?;

    let membership = match requested {
        Some(organization_id) => {
            app_state
                .organization_repo
                .find_membership(user.id, organization_id)
                .await?
        }
        None => app_state.organization_repo.first_membership(user.id).await?,
    }
    .ok_or(AppError::OrganizationNotFound)?;

    let ctx = OrganizationContext {
        organization_id: membership.organization_id,
        role: membership.role,
    };

    Ok((AuthenticatedUser(user), ctx))
}

// Auth + membership: todas as rotas de dados passam por aqui
pub async fn organization_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (user, ctx) = resolve(&app_state, request.headers())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tracing::debug!(user_id = %user.0.id, organization_id = %ctx.organization_id, "Contexto resolvido");

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for OrganizationContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OrganizationContext>()
            .cloned()
            .ok_or_else(|| AppError::OrganizationNotFound.to_api_error(&Locale::default(), &Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_is_optional_but_must_be_a_uuid() {
        let mut headers = HeaderMap::new();
        assert!(matches!(requested_organization(&headers), Ok(None)));

        let id = Uuid::new_v4();
        headers.insert(ORGANIZATION_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(requested_organization(&headers).unwrap(), Some(id));

        headers.insert(ORGANIZATION_ID_HEADER, HeaderValue::from_static("loja-1"));
        assert!(matches!(requested_organization(&headers), Err(AppError::InvalidInput(_))));
    }
}
