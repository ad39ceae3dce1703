//! JWT 校验
//!
//! 配置了公钥 PEM 时使用 RS256，否则使用共享密钥 HS256。
//! 同一个校验器也作为推送中继的 `Authenticator`。

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use notification_relay::{Authenticator, RelayError};
use serde::{Deserialize, Serialize};
use wastelink_shared::config::AuthConfig;

use crate::error::ApiError;

/// 身份提供方签发的令牌载荷
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// 用户 ID
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// JWT 校验器
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// HS256 共享密钥
    pub fn hs256(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Self::base_validation(Algorithm::HS256),
        }
    }

    /// RS256 公钥
    pub fn rs256(public_key_pem: &str) -> Result<Self, ApiError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| ApiError::Internal(format!("JWT 公钥无效: {}", e)))?;
        Ok(Self {
            decoding_key,
            validation: Self::base_validation(Algorithm::RS256),
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, ApiError> {
        let mut verifier = match (&config.jwt_public_key_pem, &config.jwt_secret) {
            (Some(pem), _) if !pem.trim().is_empty() => Self::rs256(pem)?,
            (_, Some(secret)) if !secret.is_empty() => Self::hs256(secret),
            _ => {
                return Err(ApiError::Internal(
                    "未配置 JWT 密钥或公钥".to_string(),
                ));
            }
        };

        if let Some(issuer) = config.issuer.as_deref() {
            verifier = verifier.with_issuer(issuer);
        }
        if let Some(audience) = config.audience.as_deref() {
            verifier = verifier.with_audience(audience);
        }
        Ok(verifier)
    }

    fn base_validation(algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        // 未配置 audience 时不校验 aud
        validation.validate_aud = false;
        validation
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.validate_aud = true;
        self
    }

    /// 验证并解析令牌
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::Unauthorized("Token 已过期".to_string()),
                ErrorKind::InvalidToken => ApiError::Unauthorized("无效的 Token".to_string()),
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    ApiError::Unauthorized("Token 签发方不匹配".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        if token_data.claims.sub.is_empty() {
            return Err(ApiError::Unauthorized("Token 缺少用户标识".to_string()));
        }

        Ok(token_data.claims)
    }
}

#[async_trait]
impl Authenticator for JwtVerifier {
    async fn authenticate(&self, token: &str) -> notification_relay::Result<String> {
        self.verify_token(token)
            .map(|claims| claims.sub)
            .map_err(|e| RelayError::Unauthorized(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use super::Claims;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    pub const SECRET: &str = "test-secret";

    pub fn claims(sub: &str, ttl_secs: i64) -> Claims {
        let now = Utc::now();
        Claims {
            sub: sub.to_string(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: Some(now.timestamp()),
            email: None,
            phone_number: None,
            name: None,
        }
    }

    pub fn sign<T: serde::Serialize>(claims: &T, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    pub fn token(sub: &str) -> String {
        sign(&claims(sub, 3600), SECRET)
    }
}

#[cfg(test)]
mod tests {
    use super::test_tokens::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verify_valid_token() {
        let verifier = JwtVerifier::hs256(SECRET);
        let claims = verifier.verify_token(&token("household-1")).unwrap();
        assert_eq!(claims.sub, "household-1");
    }

    #[test]
    fn test_reject_expired_and_forged() {
        let verifier = JwtVerifier::hs256(SECRET);

        // 超过默认 60 秒宽限
        let expired = sign(&claims("u1", -3600), SECRET);
        assert!(matches!(
            verifier.verify_token(&expired),
            Err(ApiError::Unauthorized(msg)) if msg.contains("过期")
        ));

        let forged = sign(&claims("u1", 3600), "other-secret");
        assert!(verifier.verify_token(&forged).is_err());
        assert!(verifier.verify_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_issuer_and_audience() {
        let verifier = JwtVerifier::hs256(SECRET)
            .with_issuer("https://securetoken.google.com/wastelink")
            .with_audience("wastelink");

        let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp();
        let good = sign(
            &json!({
                "sub": "u1",
                "exp": exp,
                "iss": "https://securetoken.google.com/wastelink",
                "aud": "wastelink"
            }),
            SECRET,
        );
        assert!(verifier.verify_token(&good).is_ok());

        let wrong_aud = sign(
            &json!({
                "sub": "u1",
                "exp": exp,
                "iss": "https://securetoken.google.com/wastelink",
                "aud": "other"
            }),
            SECRET,
        );
        assert!(verifier.verify_token(&wrong_aud).is_err());
    }

    #[test]
    fn test_from_config() {
        let config = AuthConfig {
            jwt_secret: None,
            jwt_public_key_pem: None,
            issuer: None,
            audience: None,
        };
        assert!(JwtVerifier::from_config(&config).is_err());

        let config = AuthConfig {
            jwt_secret: Some(SECRET.to_string()),
            ..config
        };
        let verifier = JwtVerifier::from_config(&config).unwrap();
        assert!(verifier.verify_token(&token("u2")).is_ok());

        let bad_pem = AuthConfig {
            jwt_public_key_pem: Some("not a pem".to_string()),
            ..AuthConfig::default()
        };
        assert!(JwtVerifier::from_config(&bad_pem).is_err());
    }

    #[tokio::test]
    async fn test_relay_authenticator() {
        let verifier = JwtVerifier::hs256(SECRET);
        assert_eq!(
            verifier.authenticate(&token("collector-1")).await.unwrap(),
            "collector-1"
        );
        assert!(matches!(
            verifier.authenticate("garbage").await,
            Err(RelayError::Unauthorized(_))
        ));
    }
}
