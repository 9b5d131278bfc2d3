/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three levels of the configuration tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Tpa,
    Broker,
    Employer,
}

impl EntityKind {
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Tpa => "tpa",
            EntityKind::Broker => "broker",
            EntityKind::Employer => "employer",
        }
    }

    /// Generate a fresh identifier, e.g. `broker_3f2c9a...`
    pub fn generate_id(&self) -> String {
        format!("{}_{}", self.id_prefix(), Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_prefix_and_differ() {
        let a = EntityKind::Broker.generate_id();
        let b = EntityKind::Broker.generate_id();

        assert!(a.starts_with("broker_"));
        assert_ne!(a, b);
        assert!(EntityKind::Employer.generate_id().starts_with("employer_"));
    }
}
