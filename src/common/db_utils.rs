// src/common/db_utils.rs

use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::organization::OrganizationContext;

// ---
// Helper RLS: a "chave" para o banco de dados
// ---
/// Adquire uma conexão da pool e define as variáveis usadas pelas
/// políticas de RLS. As variáveis valem para a sessão inteira e são
/// sobrescritas a cada aquisição.
pub(crate) async fn get_rls_connection(
    app_state: &AppState,
    org: &OrganizationContext,
    user: &AuthenticatedUser,
) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>, AppError> {
    let mut conn = app_state.db_pool.acquire().await?;

    sqlx::query("SELECT set_config('app.organization_id', $1, false), set_config('app.user_id', $2, false)")
        .bind(org.organization_id.to_string())
        .bind(user.0.id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(conn)
}
