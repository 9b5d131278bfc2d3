use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The whole configuration document, persisted as one JSON object.
///
/// ```json
/// { "tpas": [ { "id": "t1", "name": "T", "brokers": [ { "id": "b1", "name": "Acme", "employers": [] } ] } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tpas: Vec<Tpa>,
    /// Top-level keys this service does not know about, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tpa {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brokers: Vec<Broker>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Broker {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub employers: Vec<Employer>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Employer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Upsert payload for a tenant. `None` fields keep the stored value.
#[derive(Debug, Clone, Default)]
pub struct TpaPatch {
    pub id: String,
    pub name: Option<String>,
    pub brokers: Option<Vec<Broker>>,
    pub extra: Map<String, Value>,
}

/// Upsert payload for a broker. `None` fields keep the stored value.
#[derive(Debug, Clone, Default)]
pub struct BrokerPatch {
    pub id: String,
    pub name: Option<String>,
    pub employers: Option<Vec<Employer>>,
    pub extra: Map<String, Value>,
}

/// Upsert payload for an employer. `None` fields keep the stored value.
#[derive(Debug, Clone, Default)]
pub struct EmployerPatch {
    pub id: String,
    pub name: Option<String>,
    pub extra: Map<String, Value>,
}

fn merge_extra(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

impl Tpa {
    pub fn from_patch(patch: TpaPatch) -> Self {
        Self {
            id: patch.id,
            name: patch.name.unwrap_or_default(),
            brokers: patch.brokers.unwrap_or_default(),
            extra: patch.extra,
        }
    }

    pub fn apply(&mut self, patch: TpaPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(brokers) = patch.brokers {
            self.brokers = brokers;
        }
        merge_extra(&mut self.extra, patch.extra);
    }

    pub fn broker(&self, broker_id: &str) -> Option<&Broker> {
        self.brokers.iter().find(|b| b.id == broker_id)
    }
}

impl Broker {
    pub fn from_patch(patch: BrokerPatch) -> Self {
        Self {
            id: patch.id,
            name: patch.name.unwrap_or_default(),
            employers: patch.employers.unwrap_or_default(),
            extra: patch.extra,
        }
    }

    pub fn apply(&mut self, patch: BrokerPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(employers) = patch.employers {
            self.employers = employers;
        }
        merge_extra(&mut self.extra, patch.extra);
    }

    pub fn employer(&self, employer_id: &str) -> Option<&Employer> {
        self.employers.iter().find(|e| e.id == employer_id)
    }
}

impl Employer {
    pub fn from_patch(patch: EmployerPatch) -> Self {
        Self {
            id: patch.id,
            name: patch.name.unwrap_or_default(),
            extra: patch.extra,
        }
    }

    pub fn apply(&mut self, patch: EmployerPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        merge_extra(&mut self.extra, patch.extra);
    }
}
