//! Caller identity: who is making a request, which tenant they belong to,
//! and which groups they are in.

pub mod jwt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use jwt::{Claims, JwtIdentityProvider};

/// Resolved caller identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    /// Tenant attribute attached to the account, if any
    pub tpa_id: Option<String>,
    pub employer_id: Option<String>,
    pub groups: Vec<String>,
}

impl Identity {
    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingToken,

    #[error("Authorization header must use Bearer token format")]
    MalformedHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token verification is not configured")]
    NotConfigured,

    #[error("Unable to determine TPA ID")]
    NoTenant,
}

/// Turns a bearer credential into an [`Identity`]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn introspect(&self, token: &str) -> Result<Identity, AuthError>;
}
