// src/services/auth.rs

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    models::auth::{Claims, User},
};

// A emissão da sessão é do provedor de identidade externo;
// aqui apenas validamos o JWT que ele assinou.
#[derive(Clone)]
pub struct AuthService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(jwt_secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejeitado");
                AppError::InvalidToken
            })?;

        Ok(User {
            id: token_data.claims.sub,
            email: token_data.claims.email,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    pub fn issue_token(secret: &str, user_id: Uuid, ttl_secs: i64) -> String {
        let claims = Claims {
            sub: user_id,
            exp: (Utc::now().timestamp() + ttl_secs) as usize,
            email: Some("marie@atelier-dupont.fr".into()),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .expect("encode token")
    }

    #[test]
    fn accepts_token_signed_with_shared_secret() {
        let service = AuthService::new("secret", None);
        let user_id = Uuid::new_v4();

        let user = service.validate_token(&issue_token("secret", user_id, 3600)).unwrap();

        assert_eq!(user.id, user_id);
        assert_eq!(user.email.as_deref(), Some("marie@atelier-dupont.fr"));
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let service = AuthService::new("secret", None);

        let forged = issue_token("other", Uuid::new_v4(), 3600);
        assert!(matches!(service.validate_token(&forged), Err(AppError::InvalidToken)));

        let expired = issue_token("secret", Uuid::new_v4(), -3600);
        assert!(matches!(service.validate_token(&expired), Err(AppError::InvalidToken)));
    }
}
