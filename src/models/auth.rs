// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::organization::UserOrganization;

// Estrutura de dados ("claims") dentro do JWT emitido pelo provedor de identidade
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time
    #[serde(default)]
    pub email: Option<String>,
}

/// Usuário autenticado (só o que o token carrega; o cadastro é externo).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    #[schema(example = "marie@atelier-dupont.fr")]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub organizations: Vec<UserOrganization>,
}
