// src/models/customer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Customer {
    pub id: Uuid,

    #[schema(ignore)]
    pub organization_id: Uuid,

    #[schema(example = "Boulangerie Martin")]
    pub name: String,

    #[schema(example = "compta@boulangerie-martin.fr")]
    pub email: Option<String>,

    #[schema(example = "3 place du Marché, 69002 Lyon")]
    pub address: Option<String>,

    #[schema(example = "FR83404833048")]
    pub vat_number: Option<String>,

    pub created_at: DateTime<Utc>,
}
