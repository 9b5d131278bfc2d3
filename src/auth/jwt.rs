use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, Identity, IdentityProvider};
use crate::config::IdentityConfig;

/// Token claims, using the attribute names of the hosted user pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(
        rename = "cognito:username",
        alias = "username",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
    #[serde(
        rename = "custom:tpa_id",
        alias = "tpa_id",
        alias = "tpaId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tpa_id: Option<String>,
    #[serde(
        rename = "custom:employer_id",
        alias = "employer_id",
        alias = "employerId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub employer_id: Option<String>,
    #[serde(rename = "cognito:groups", alias = "groups", default)]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, expiry: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.into(),
            username: None,
            tpa_id: None,
            employer_id: None,
            groups: Vec::new(),
            iss: None,
            exp: (now + expiry).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn with_tpa(mut self, tpa_id: impl Into<String>) -> Self {
        self.tpa_id = Some(tpa_id.into());
        self
    }

    pub fn with_employer(mut self, employer_id: impl Into<String>) -> Self {
        self.employer_id = Some(employer_id.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.username.unwrap_or_else(|| claims.sub.clone()),
            user_id: claims.sub,
            tpa_id: claims.tpa_id.filter(|t| !t.is_empty()),
            employer_id: claims.employer_id.filter(|e| !e.is_empty()),
            groups: claims.groups,
        }
    }
}

/// HS256 token verification with a shared secret
#[derive(Clone)]
pub struct JwtIdentityProvider {
    secret: String,
    issuer: Option<String>,
}

impl JwtIdentityProvider {
    pub fn new(secret: impl Into<String>, issuer: Option<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer,
        }
    }

    pub fn from_config(identity: &IdentityConfig) -> Self {
        Self::new(identity.jwt_secret.clone(), identity.jwt_issuer.clone())
    }

    pub fn generate_token(&self, mut claims: Claims) -> Result<String, AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::NotConfigured);
        }
        if claims.iss.is_none() {
            claims.iss = self.issuer.clone();
        }

        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::NotConfigured);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn introspect(&self, token: &str) -> Result<Identity, AuthError> {
        self.verify(token).map(Identity::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> JwtIdentityProvider {
        JwtIdentityProvider::new("test-secret", None)
    }

    #[tokio::test]
    async fn round_trips_tenant_and_groups() {
        let provider = provider();
        let token = provider
            .generate_token(Claims::new("user-1", Duration::hours(1)).with_tpa("t1").with_group("ADMIN"))
            .unwrap();

        let identity = provider.introspect(&token).await.unwrap();
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.username, "user-1");
        assert_eq!(identity.tpa_id.as_deref(), Some("t1"));
        assert!(identity.is_member_of("ADMIN"));
    }

    #[test]
    fn claims_use_pool_attribute_names() {
        let claims = Claims::new("u", Duration::hours(1)).with_tpa("t1").with_group("ADMIN");
        let value = serde_json::to_value(&claims).unwrap();

        assert_eq!(value["custom:tpa_id"], "t1");
        assert_eq!(value["cognito:groups"][0], "ADMIN");
    }

    #[test]
    fn plain_claim_names_are_accepted() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "sub": "u", "tpaId": "t9", "groups": ["X"], "exp": 0, "iat": 0
        }))
        .unwrap();

        assert_eq!(claims.tpa_id.as_deref(), Some("t9"));
        assert_eq!(claims.groups, vec!["X"]);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let token = JwtIdentityProvider::new("other", None)
            .generate_token(Claims::new("u", Duration::hours(1)))
            .unwrap();
        assert!(matches!(provider().verify(&token), Err(AuthError::InvalidToken(_))));

        let expired = provider()
            .generate_token(Claims::new("u", Duration::hours(-2)))
            .unwrap();
        assert!(matches!(provider().verify(&expired), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn issuer_is_enforced_when_configured() {
        let strict = JwtIdentityProvider::new("test-secret", Some("issuer-a".into()));
        let foreign = provider()
            .generate_token(Claims::new("u", Duration::hours(1)))
            .unwrap();

        assert!(strict.verify(&foreign).is_err());
        let own = strict.generate_token(Claims::new("u", Duration::hours(1))).unwrap();
        assert!(strict.verify(&own).is_ok());
    }

    #[test]
    fn empty_secret_is_not_configured() {
        let provider = JwtIdentityProvider::new("", None);
        assert_eq!(provider.verify("abc").unwrap_err(), AuthError::NotConfigured);
    }
}
