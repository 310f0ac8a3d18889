// src/services/document_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use genpdf::{elements, style, Alignment, Element};
use image::Luma;
use qrcode::QrCode;
use rust_decimal::Decimal;
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CustomerRepository, DocumentRepository, InvoiceRepository, SettingsRepository},
    middleware::organization::OrganizationContext,
    models::{
        customer::Customer,
        document::{DocumentKind, DocumentLink, GeneratedDocument},
        invoice::{Invoice, InvoiceItem},
        settings::OrganizationSettings,
    },
    services::storage::{Storage, UrlSigner},
};

const FONT_FAMILY: &str = "Roboto";

/// Conteúdo do QR Code EPC (SEPA Credit Transfer, versão 002, UTF-8).
pub fn epc_qr_payload(
    beneficiary: &str,
    iban: &str,
    bic: Option<&str>,
    amount: Decimal,
    reference: &str,
) -> String {
    let iban: String = iban.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase();
    // O padrão limita o nome a 70 caracteres
    let beneficiary: String = beneficiary.chars().take(70).collect();

    [
        "BCD",
        "002",
        "1",
        "SCT",
        bic.unwrap_or_default().trim(),
        beneficiary.as_str(),
        iban.as_str(),
        &format!("EUR{:.2}", amount),
        "",
        "",
        reference,
    ]
    .join("\n")
}

pub fn invoice_storage_key(organization_id: Uuid, number: &str) -> String {
    format!("documents/{organization_id}/invoices/{number}.pdf")
}

/// Anexa URLs assinadas e válidas por alguns minutos a cada documento.
pub fn sign_documents(
    documents: Vec<GeneratedDocument>,
    signer: &UrlSigner,
    now: i64,
) -> Result<Vec<DocumentLink>, AppError> {
    documents
        .into_iter()
        .map(|document| {
            let url = signer.sign(&document.storage_key, now)?;
            Ok(DocumentLink { document, url })
        })
        .collect()
}

// Tudo o que a renderização precisa, já fora da transação
struct InvoicePrint {
    invoice: Invoice,
    items: Vec<InvoiceItem>,
    customer: Customer,
    settings: OrganizationSettings,
    today: NaiveDate,
}

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::Document(e.to_string())
}

fn render_invoice(fonts_dir: &str, print: InvoicePrint) -> Result<Vec<u8>, AppError> {
    let InvoicePrint { invoice, items, customer, settings, today } = print;

    let font_family = genpdf::fonts::from_files(fonts_dir, FONT_FAMILY, None)
        .map_err(|e| AppError::Document(format!("fontes em {fonts_dir}: {e}")))?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Facture {}", invoice.number));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // --- VENDEDOR ---
    let seller = settings.company_name.clone().unwrap_or_else(|| "—".to_string());
    doc.push(elements::Paragraph::new(seller.clone()).styled(style::Style::new().bold().with_font_size(18)));
    if let Some(address) = &settings.address {
        doc.push(elements::Paragraph::new(address.clone()).styled(style::Style::new().with_font_size(9)));
    }
    if let Some(siret) = &settings.siret {
        doc.push(elements::Paragraph::new(format!("SIRET : {siret}")).styled(style::Style::new().with_font_size(9)));
    }
    if let Some(vat) = &settings.vat_number {
        doc.push(elements::Paragraph::new(format!("TVA intracom. : {vat}")).styled(style::Style::new().with_font_size(9)));
    }

    doc.push(elements::Break::new(1.5));

    // --- CABEÇALHO ---
    doc.push(
        elements::Paragraph::new(format!("FACTURE {}", invoice.number))
            .styled(style::Style::new().bold().with_font_size(14)),
    );
    doc.push(elements::Paragraph::new(format!("Date d'émission : {}", invoice.issue_date.format("%d/%m/%Y"))));
    doc.push(elements::Paragraph::new(format!("Échéance : {}", invoice.due_date.format("%d/%m/%Y"))));
    if invoice.effective_status(today) == crate::models::invoice::InvoiceStatus::Cancelled {
        doc.push(elements::Paragraph::new("ANNULÉE").styled(style::Style::new().bold()));
    }

    doc.push(elements::Break::new(1));
    doc.push(elements::Paragraph::new(format!("Client : {}", customer.name)).styled(style::Style::new().bold()));
    if let Some(address) = &customer.address {
        doc.push(elements::Paragraph::new(address.clone()));
    }
    if let Some(vat) = &customer.vat_number {
        doc.push(elements::Paragraph::new(format!("TVA : {vat}")));
    }

    doc.push(elements::Break::new(2));

    // --- LINHAS ---
    // Pesos: Descrição (5), Qté (1), PU HT (2), TVA (1), Total HT (2)
    let mut table = elements::TableLayout::new(vec![5, 1, 2, 1, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let bold = style::Style::new().bold();
    table
        .row()
        .element(elements::Paragraph::new("Désignation").styled(bold))
        .element(elements::Paragraph::new("Qté").styled(bold))
        .element(elements::Paragraph::new("PU HT").styled(bold))
        .element(elements::Paragraph::new("TVA").styled(bold))
        .element(elements::Paragraph::new("Total HT").styled(bold))
        .push()
        .map_err(pdf_error)?;

    for item in &items {
        table
            .row()
            .element(elements::Paragraph::new(item.label.clone()))
            .element(elements::Paragraph::new(item.qty.normalize().to_string()))
            .element(elements::Paragraph::new(format!("{:.2} €", item.unit_price)))
            .element(elements::Paragraph::new(format!("{} %", item.vat_rate.normalize())))
            .element(elements::Paragraph::new(format!("{:.2} €", item.qty * item.unit_price)))
            .push()
            .map_err(pdf_error)?;
    }

    doc.push(table);
    doc.push(elements::Break::new(1.5));

    // --- TOTAIS ---
    for (label, value, size) in [
        ("Total HT", invoice.total_ht, 10),
        ("TVA", invoice.total_vat, 10),
        ("Total TTC", invoice.total_ttc, 12),
    ] {
        doc.push(
            elements::Paragraph::new(format!("{label} : {value:.2} €"))
                .aligned(Alignment::Right)
                .styled(style::Style::new().bold().with_font_size(size)),
        );
    }

    if let Some(notes) = &invoice.notes {
        doc.push(elements::Break::new(1));
        doc.push(elements::Paragraph::new(notes.clone()).styled(style::Style::new().italic()));
    }

    // --- PAGAMENTO (QR EPC) ---
    if let Some(iban) = &settings.iban {
        doc.push(elements::Break::new(2));
        doc.push(
            elements::Paragraph::new("RÈGLEMENT PAR VIREMENT")
                .styled(style::Style::new().bold().with_font_size(12)),
        );
        doc.push(elements::Paragraph::new(format!("IBAN : {iban}")));
        if let Some(bic) = &settings.bic {
            doc.push(elements::Paragraph::new(format!("BIC : {bic}")));
        }

        let payload = epc_qr_payload(&seller, iban, settings.bic.as_deref(), invoice.total_ttc, &invoice.number);
        let code = QrCode::new(payload.as_bytes()).map_err(pdf_error)?;
        let image_buffer = code.render::<Luma<u8>>().build();
        let pdf_image = elements::Image::from_dynamic_image(image::DynamicImage::ImageLuma8(image_buffer))
            .map_err(pdf_error)?
            .with_scale(genpdf::Scale::new(0.5, 0.5));

        doc.push(pdf_image);
    }

    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(pdf_error)?;

    Ok(buffer)
}

#[derive(Clone)]
pub struct DocumentService {
    invoice_repo: InvoiceRepository,
    customer_repo: CustomerRepository,
    settings_repo: SettingsRepository,
    repo: DocumentRepository,
    storage: Arc<dyn Storage>,
    fonts_dir: String,
}

impl DocumentService {
    pub fn new(
        invoice_repo: InvoiceRepository,
        customer_repo: CustomerRepository,
        settings_repo: SettingsRepository,
        repo: DocumentRepository,
        storage: Arc<dyn Storage>,
        fonts_dir: &str,
    ) -> Self {
        Self {
            invoice_repo,
            customer_repo,
            settings_repo,
            repo,
            storage,
            fonts_dir: fonts_dir.to_string(),
        }
    }

    /// Gera o PDF da fatura, guarda uma cópia no armazenamento e devolve
    /// `(número, bytes)`.
    pub async fn generate_invoice_pdf<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
        today: NaiveDate,
    ) -> Result<(String, Vec<u8>), AppError>
    where
        E: Acquire<'e, Database = Postgres, Connection = &'e mut sqlx::PgConnection>,
    {
        let mut conn = executor.acquire().await?;

        // 1. Busca os dados
        let invoice = self.invoice_repo.find_invoice(&mut *conn, org, invoice_id).await?;
        let items = self.invoice_repo.list_items(&mut *conn, org, invoice_id).await?;
        let customer = self.customer_repo.find_customer(&mut *conn, org, invoice.customer_id).await?;
        let settings = self.settings_repo.get_settings(&mut *conn, org).await?;

        let number = invoice.number.clone();
        let print = InvoicePrint { invoice, items, customer, settings, today };

        // 2. Renderização é CPU pura: fora do runtime assíncrono
        let fonts_dir = self.fonts_dir.clone();
        let pdf = tokio::task::spawn_blocking(move || render_invoice(&fonts_dir, print))
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))??;

        // 3. Guarda e registra
        let key = invoice_storage_key(org.organization_id, &number);
        self.storage.put(&key, pdf.clone()).await?;
        self.repo
            .record_document(&mut *conn, org, DocumentKind::InvoicePdf, &key)
            .await?;

        tracing::info!(organization_id = %org.organization_id, invoice_id = %invoice_id, key = %key, "PDF da fatura gerado");

        Ok((number, pdf))
    }

    pub async fn list_documents<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
    ) -> Result<Vec<GeneratedDocument>, AppError>
    where
        E: Acquire<'e, Database = Postgres, Connection = &'e mut sqlx::PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        self.repo.list_documents(&mut *conn, org).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn epc_payload_follows_the_sepa_layout() {
        let payload = epc_qr_payload(
            "Atelier Dupont SARL",
            "FR76 3000 6000 0112 3456 7890 189",
            Some("AGRIFRPP"),
            Decimal::from(240),
            "FAC-2026-0001",
        );

        let lines: Vec<&str> = payload.split('\n').collect();
        assert_eq!(
            lines,
            vec![
                "BCD",
                "002",
                "1",
                "SCT",
                "AGRIFRPP",
                "Atelier Dupont SARL",
                "FR7630006000011234567890189",
                "EUR240.00",
                "",
                "",
                "FAC-2026-0001",
            ]
        );
    }

    #[test]
    fn epc_payload_without_bic() {
        let payload = epc_qr_payload("X", "fr7630006000011234567890189", None, "12.5".parse().unwrap(), "R");
        assert!(payload.contains("\n\nX\nFR7630006000011234567890189\nEUR12.50\n"));
    }

    #[test]
    fn storage_keys_are_prefixed_by_organization() {
        let org = Uuid::nil();
        assert_eq!(
            invoice_storage_key(org, "FAC-2026-0001"),
            "documents/00000000-0000-0000-0000-000000000000/invoices/FAC-2026-0001.pdf"
        );
    }

    #[test]
    fn listed_documents_carry_signed_urls() {
        let signer = UrlSigner::new("http://localhost:3000", "secret");
        let document = GeneratedDocument {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            kind: DocumentKind::PayrollExport,
            storage_key: "payroll-exports/org/2026-09-x.csv".into(),
            created_at: Utc::now(),
        };

        let links = sign_documents(vec![document], &signer, 1_700_000_000).unwrap();
        assert!(links[0].url.contains("/files/payroll-exports/org/2026-09-x.csv?expires=1700000900&signature="));
    }
}
