// src/db/settings_repo.rs

use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    middleware::organization::OrganizationContext,
    models::settings::{OrganizationSettings, UpdateSettingsRequest, DEFAULT_PAYMENT_TERMS_DAYS},
};

#[derive(Clone, Default)]
pub struct SettingsRepository;

impl SettingsRepository {
    pub async fn get_settings<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
    ) -> Result<OrganizationSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Organização que nunca salvou nada recebe os padrões
        let settings = sqlx::query_as::<_, OrganizationSettings>(
            "SELECT * FROM organization_settings WHERE organization_id = $1",
        )
        .bind(org.organization_id)
        .fetch_optional(executor)
        .await?;

        Ok(settings.unwrap_or_else(|| OrganizationSettings::empty(org.organization_id)))
    }

    pub async fn upsert_settings<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        input: &UpdateSettingsRequest,
    ) -> Result<OrganizationSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT (Insert or Update). Campos numéricos ausentes mantêm o valor atual.
        let settings = sqlx::query_as::<_, OrganizationSettings>(
            r#"
            INSERT INTO organization_settings (
                organization_id, company_name, siret, vat_number, address, iban, bic,
                payment_terms_days, default_vat_rate
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, $10), COALESCE($9, 20))
            ON CONFLICT (organization_id)
            DO UPDATE SET
                company_name = EXCLUDED.company_name,
                siret = EXCLUDED.siret,
                vat_number = EXCLUDED.vat_number,
                address = EXCLUDED.address,
                iban = EXCLUDED.iban,
                bic = EXCLUDED.bic,
                payment_terms_days = COALESCE($8, organization_settings.payment_terms_days),
                default_vat_rate = COALESCE($9, organization_settings.default_vat_rate),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(org.organization_id)
        .bind(input.company_name.as_deref())
        .bind(input.siret.as_deref())
        .bind(input.vat_number.as_deref())
        .bind(input.address.as_deref())
        .bind(input.iban.as_deref())
        .bind(input.bic.as_deref())
        .bind(input.payment_terms_days)
        .bind(input.default_vat_rate)
        .bind(DEFAULT_PAYMENT_TERMS_DAYS)
        .fetch_one(executor)
        .await?;

        Ok(settings)
    }
}
