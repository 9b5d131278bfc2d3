// handlers/protected/mod.rs - Protected handlers (caller identity required)
//
// Security Level: bearer token resolved by identity_middleware into a Caller
// Route Prefix: /api/*
//
// Tenant scoping: members of the admin group may name a tenant explicitly
// (path, ?tpaId= or body tpaId); everyone else acts on their own tenant.
pub mod brokers;
pub mod employers;
pub mod tpa;
pub mod users;

use serde::Deserialize;

/// Admin tenant selection from the query string
#[derive(Debug, Default, Deserialize)]
pub struct TpaQuery {
    #[serde(rename = "tpaId")]
    pub tpa_id: Option<String>,
    pub id: Option<String>,
}

impl TpaQuery {
    pub fn requested(&self) -> Option<&str> {
        self.tpa_id
            .as_deref()
            .or(self.id.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}
