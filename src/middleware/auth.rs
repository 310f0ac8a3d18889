// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::User,
};

fn request_locale(parts_headers: &axum::http::HeaderMap) -> Locale {
    Locale::from_header(
        parts_headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
    )
}

/// Valida o Bearer token e devolve o usuário.
pub(crate) fn authenticate(
    app_state: &AppState,
    headers: &axum::http::HeaderMap,
) -> Result<User, AppError> {
    let bearer = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::Unauthenticated)?;

    app_state.auth_service.validate_token(bearer.token())
}

// Rotas que só precisam do usuário (sem organização)
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&app_state, request.headers()).map_err(|e| {
        e.to_api_error(&request_locale(request.headers()), &app_state.i18n_store)
    })?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                AppError::Unauthenticated
                    .to_api_error(&request_locale(&parts.headers), &Default::default())
            })
    }
}
