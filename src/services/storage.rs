// src/services/storage.rs

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tokio::fs;

use crate::common::error::AppError;

type HmacSha256 = Hmac<Sha256>;

// Validade das URLs assinadas
pub const SIGNED_URL_TTL_SECS: i64 = 15 * 60;

/// Armazenamento de objetos (PDFs, exportações). Injetado no `AppState`.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), AppError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Chaves são caminhos relativos simples: nada de `..`, raiz ou `\`.
pub fn validate_key(key: &str) -> Result<(), AppError> {
    let invalid = || AppError::InvalidInput(format!("storage key '{key}'"));

    if key.is_empty() || key.contains('\\') {
        return Err(invalid());
    }
    let all_normal = Path::new(key)
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !all_normal {
        return Err(invalid());
    }
    Ok(())
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    // Os diretórios são criados sob demanda no primeiro `put`
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }
}

fn io_error(key: &str, e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::ResourceNotFound(key.to_string())
    } else {
        AppError::Storage(format!("{key}: {e}"))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), AppError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| io_error(key, e))?;
        }
        fs::write(&path, data).await.map_err(|e| io_error(key, e))?;

        tracing::debug!(key, "Objeto gravado");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.path_for(key)?;
        fs::read(&path).await.map_err(|e| io_error(key, e))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }
}

// =============================================================================
//  URLs ASSINADAS
// =============================================================================

/// Gera e confere URLs temporárias para `GET /files/{*key}`.
#[derive(Clone)]
pub struct UrlSigner {
    base_url: String,
    secret: String,
}

impl UrlSigner {
    pub fn new(base_url: &str, secret: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.to_string(),
        }
    }

    fn mac(&self, key: &str, expires: i64) -> Result<HmacSha256, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("HMAC key: {e}")))?;
        mac.update(key.as_bytes());
        mac.update(b"|");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }

    pub fn signature(&self, key: &str, expires: i64) -> Result<String, AppError> {
        Ok(hex::encode(self.mac(key, expires)?.finalize().into_bytes()))
    }

    /// URL válida por `SIGNED_URL_TTL_SECS` a partir de `now`.
    pub fn sign(&self, key: &str, now: i64) -> Result<String, AppError> {
        let expires = now + SIGNED_URL_TTL_SECS;
        let signature = self.signature(key, expires)?;
        Ok(format!("{}/files/{key}?expires={expires}&signature={signature}", self.base_url))
    }

    pub fn verify(&self, key: &str, expires: i64, signature: &str, now: i64) -> Result<(), AppError> {
        let denied = || AppError::Forbidden("signed-url".into());

        if expires < now {
            return Err(denied());
        }
        let provided = hex::decode(signature).map_err(|_| denied())?;
        let expected = self.mac(key, expires)?.finalize().into_bytes();

        if bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            Ok(())
        } else {
            Err(denied())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_and_absolute_keys() {
        assert!(validate_key("documents/org/invoices/FAC-2026-0001.pdf").is_ok());
        for key in ["", "../etc/passwd", "documents/../../x", "/etc/passwd", "a\\b", "./a"] {
            assert!(validate_key(key).is_err(), "{key} deveria ser rejeitada");
        }
    }

    #[tokio::test]
    async fn local_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.put("payroll-exports/org/2026-09.csv", b"a,b\n".to_vec()).await.unwrap();
        assert_eq!(storage.get("payroll-exports/org/2026-09.csv").await.unwrap(), b"a,b\n");

        storage.delete("payroll-exports/org/2026-09.csv").await.unwrap();
        assert!(matches!(
            storage.get("payroll-exports/org/2026-09.csv").await,
            Err(AppError::ResourceNotFound(_))
        ));
        // apagar de novo não é erro
        storage.delete("payroll-exports/org/2026-09.csv").await.unwrap();
    }

    #[tokio::test]
    async fn local_storage_refuses_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        assert!(matches!(
            storage.put("../outside.txt", b"x".to_vec()).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn signed_urls_expire_and_bind_the_key() {
        let signer = UrlSigner::new("http://localhost:3000/", "secret");
        let now = 1_700_000_000;

        let url = signer.sign("documents/org/a.pdf", now).unwrap();
        assert!(url.starts_with("http://localhost:3000/files/documents/org/a.pdf?expires="));

        let expires = now + SIGNED_URL_TTL_SECS;
        let signature = signer.signature("documents/org/a.pdf", expires).unwrap();

        assert!(signer.verify("documents/org/a.pdf", expires, &signature, now).is_ok());
        assert!(signer.verify("documents/org/b.pdf", expires, &signature, now).is_err());
        assert!(signer.verify("documents/org/a.pdf", expires, &signature, expires + 1).is_err());
        assert!(signer.verify("documents/org/a.pdf", expires, "zz", now).is_err());
    }
}
