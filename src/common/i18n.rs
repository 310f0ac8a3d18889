// src/common/i18n.rs

use std::{collections::HashMap, sync::Arc};

const DEFAULT_LANG: &str = "en";

// (chave, en, fr, pt)
const MESSAGES: &[(&str, &str, &str, &str)] = &[
    ("unauthenticated",
        "Authentication required.",
        "Authentification requise.",
        "Autenticação obrigatória."),
    ("invalid_token",
        "Invalid or expired authentication token.",
        "Jeton d'authentification invalide ou expiré.",
        "Token de autenticação inválido ou expirado."),
    ("forbidden",
        "You need the '{permission}' permission to perform this action.",
        "La permission '{permission}' est requise pour cette action.",
        "Você precisa da permissão '{permission}' para realizar esta ação."),
    ("organization_not_found",
        "Organization not found for the current user.",
        "Aucune organisation trouvée pour l'utilisateur courant.",
        "Organização não encontrada para o usuário atual."),
    ("validation_failed",
        "One or more fields are invalid.",
        "Un ou plusieurs champs sont invalides.",
        "Um ou mais campos são inválidos."),
    ("invalid_input",
        "Invalid input: {detail}",
        "Donnée invalide : {detail}",
        "Entrada inválida: {detail}"),
    ("resource_not_found",
        "Resource not found. {resource}",
        "Ressource introuvable. {resource}",
        "Recurso não encontrado. {resource}"),
    ("unique_violation",
        "Already exists: {detail}",
        "Existe déjà : {detail}",
        "Já existe: {detail}"),
    ("webhook_signature_invalid",
        "Invalid webhook signature.",
        "Signature du webhook invalide.",
        "Assinatura do webhook inválida."),
    ("internal",
        "An unexpected error occurred.",
        "Une erreur inattendue s'est produite.",
        "Ocorreu um erro inesperado."),
    ("state.invoice_locked",
        "This invoice has been sent and can no longer be edited.",
        "Cette facture a été envoyée et ne peut plus être modifiée.",
        "Esta fatura já foi enviada e não pode mais ser editada."),
    ("state.invoice_paid",
        "A paid invoice cannot be deleted or cancelled.",
        "Une facture payée ne peut pas être supprimée ni annulée.",
        "Uma fatura paga não pode ser excluída nem cancelada."),
    ("state.invoice_not_draft",
        "Only draft invoices can be sent.",
        "Seules les factures en brouillon peuvent être envoyées.",
        "Apenas faturas em rascunho podem ser enviadas."),
    ("state.invoice_cancelled",
        "This invoice is cancelled.",
        "Cette facture est annulée.",
        "Esta fatura está cancelada."),
    ("state.leave_already_decided",
        "This leave request has already been decided.",
        "Cette demande de congé a déjà été traitée.",
        "Este pedido de férias já foi decidido."),
    ("validation.required",
        "This field is required.",
        "Ce champ est obligatoire.",
        "Este campo é obrigatório."),
    ("validation.length",
        "Invalid length.",
        "Longueur invalide.",
        "Tamanho inválido."),
    ("validation.email",
        "Invalid e-mail address.",
        "Adresse e-mail invalide.",
        "E-mail inválido."),
    ("validation.range",
        "Value out of range.",
        "Valeur hors limites.",
        "Valor fora do intervalo."),
    ("validation.scale",
        "Too many decimal places.",
        "Trop de décimales.",
        "Casas decimais demais."),
    ("validation.date_order",
        "The end date must be on or after the start date.",
        "La date de fin doit être postérieure ou égale à la date de début.",
        "A data final deve ser igual ou posterior à data inicial."),
    ("validation.month_format",
        "Expected a month as YYYY-MM.",
        "Mois attendu au format AAAA-MM.",
        "Mês esperado no formato AAAA-MM."),
];

/// Catálogo de mensagens traduzidas, montado uma vez na inicialização.
#[derive(Clone)]
pub struct I18nStore {
    messages: Arc<HashMap<&'static str, HashMap<&'static str, &'static str>>>,
    expose_internal_errors: bool,
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new(false)
    }
}

impl I18nStore {
    /// `expose_internal_errors` devolve o texto real dos erros 500
    /// (apenas em desenvolvimento).
    pub fn new(expose_internal_errors: bool) -> Self {
        let mut messages: HashMap<&'static str, HashMap<&'static str, &'static str>> =
            HashMap::new();

        for (key, en, fr, pt) in MESSAGES {
            for (lang, text) in [("en", *en), ("fr", *fr), ("pt", *pt)] {
                messages.entry(lang).or_default().insert(*key, text);
            }
        }

        Self { messages: Arc::new(messages), expose_internal_errors }
    }

    pub fn expose_internal_errors(&self) -> bool {
        self.expose_internal_errors
    }

    /// Busca a mensagem no idioma pedido, depois no padrão, e por fim
    /// devolve a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.lookup(lang, key)
            .or_else(|| self.lookup(DEFAULT_LANG, key))
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }

    pub fn translate_with(&self, lang: &str, key: &str, args: &[(&str, &str)]) -> String {
        let mut text = self.translate(lang, key);
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text.trim_end().to_string()
    }

    fn lookup(&self, lang: &str, key: &str) -> Option<&'static str> {
        self.messages.get(lang).and_then(|m| m.get(key)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_english_then_key() {
        let store = I18nStore::new(false);
        assert_eq!(store.translate("de", "unauthenticated"), "Authentication required.");
        assert_eq!(store.translate("fr", "missing.key"), "missing.key");
    }

    #[test]
    fn interpolates_arguments() {
        let store = I18nStore::new(false);
        let text = store.translate_with("pt", "forbidden", &[("permission", "hr:approve")]);
        assert_eq!(text, "Você precisa da permissão 'hr:approve' para realizar esta ação.");
    }
}
