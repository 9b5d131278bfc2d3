//! In-memory mutations of the configuration tree.
//!
//! Every operation locates its parent scope by ID with a linear scan and then
//! replaces, appends or removes the child. Nothing here touches storage; the
//! repository persists the whole document afterwards.

use thiserror::Error;

use super::records::{Broker, BrokerPatch, Config, Employer, EmployerPatch, Tpa, TpaPatch};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("TPA with ID {0} not found")]
    TpaNotFound(String),

    #[error("Broker with ID {broker_id} not found for TPA {tpa_id}")]
    BrokerNotFound { tpa_id: String, broker_id: String },
}

impl Config {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tpa(&self, tpa_id: &str) -> Option<&Tpa> {
        self.tpas.iter().find(|t| t.id == tpa_id)
    }

    fn tpa_mut(&mut self, tpa_id: &str) -> Result<&mut Tpa, TreeError> {
        self.tpas
            .iter_mut()
            .find(|t| t.id == tpa_id)
            .ok_or_else(|| TreeError::TpaNotFound(tpa_id.to_string()))
    }

    fn broker_mut(&mut self, tpa_id: &str, broker_id: &str) -> Result<&mut Broker, TreeError> {
        self.tpa_mut(tpa_id)?
            .brokers
            .iter_mut()
            .find(|b| b.id == broker_id)
            .ok_or_else(|| TreeError::BrokerNotFound {
                tpa_id: tpa_id.to_string(),
                broker_id: broker_id.to_string(),
            })
    }

    /// Update the tenant with `patch.id`, or append it when absent.
    pub fn upsert_tpa(&mut self, patch: TpaPatch) -> &Tpa {
        match self.tpas.iter().position(|t| t.id == patch.id) {
            Some(index) => {
                self.tpas[index].apply(patch);
                &self.tpas[index]
            }
            None => {
                self.tpas.push(Tpa::from_patch(patch));
                &self.tpas[self.tpas.len() - 1]
            }
        }
    }

    /// Update or append a broker inside an existing tenant.
    pub fn upsert_broker(&mut self, tpa_id: &str, patch: BrokerPatch) -> Result<&Broker, TreeError> {
        let brokers = &mut self.tpa_mut(tpa_id)?.brokers;

        match brokers.iter().position(|b| b.id == patch.id) {
            Some(index) => {
                brokers[index].apply(patch);
                Ok(&brokers[index])
            }
            None => {
                brokers.push(Broker::from_patch(patch));
                Ok(&brokers[brokers.len() - 1])
            }
        }
    }

    /// Update or append an employer inside an existing broker.
    pub fn upsert_employer(
        &mut self,
        tpa_id: &str,
        broker_id: &str,
        patch: EmployerPatch,
    ) -> Result<&Employer, TreeError> {
        let employers = &mut self.broker_mut(tpa_id, broker_id)?.employers;

        match employers.iter().position(|e| e.id == patch.id) {
            Some(index) => {
                employers[index].apply(patch);
                Ok(&employers[index])
            }
            None => {
                employers.push(Employer::from_patch(patch));
                Ok(&employers[employers.len() - 1])
            }
        }
    }

    /// Remove a broker together with its employers.
    /// Returns `Ok(None)` when the broker was not there.
    pub fn delete_broker(&mut self, tpa_id: &str, broker_id: &str) -> Result<Option<Broker>, TreeError> {
        let brokers = &mut self.tpa_mut(tpa_id)?.brokers;

        Ok(brokers
            .iter()
            .position(|b| b.id == broker_id)
            .map(|index| brokers.remove(index)))
    }

    /// Remove a single employer. Returns `Ok(None)` when the employer was not there.
    pub fn delete_employer(
        &mut self,
        tpa_id: &str,
        broker_id: &str,
        employer_id: &str,
    ) -> Result<Option<Employer>, TreeError> {
        let employers = &mut self.broker_mut(tpa_id, broker_id)?.employers;

        Ok(employers
            .iter()
            .position(|e| e.id == employer_id)
            .map(|index| employers.remove(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityKind;
    use serde_json::Map;

    fn single_tenant() -> Config {
        Config {
            tpas: vec![Tpa {
                id: "t1".into(),
                name: "T".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn broker_patch(id: &str, name: &str) -> BrokerPatch {
        BrokerPatch {
            id: id.into(),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    #[test]
    fn new_broker_gets_empty_employers() {
        let mut config = single_tenant();
        let id = EntityKind::Broker.generate_id();

        let broker = config.upsert_broker("t1", broker_patch(&id, "Acme")).unwrap();
        assert_eq!(broker.id, id);
        assert_eq!(broker.name, "Acme");
        assert!(broker.employers.is_empty());

        assert_eq!(config.tpa("t1").unwrap().brokers.len(), 1);
    }

    #[test]
    fn new_broker_keeps_supplied_employers() {
        let mut config = single_tenant();
        let patch = BrokerPatch {
            employers: Some(vec![Employer { id: "e1".into(), name: "E1".into(), extra: Map::new() }]),
            ..broker_patch("b1", "Acme")
        };

        let broker = config.upsert_broker("t1", patch).unwrap();
        assert_eq!(broker.employers.len(), 1);
    }

    #[test]
    fn existing_broker_update_preserves_employers() {
        let mut config = single_tenant();
        config.upsert_broker("t1", broker_patch("b1", "Acme")).unwrap();
        config
            .upsert_employer("t1", "b1", EmployerPatch { id: "e1".into(), name: Some("E1".into()), ..Default::default() })
            .unwrap();

        let broker = config.upsert_broker("t1", broker_patch("b1", "Acme Renamed")).unwrap();
        assert_eq!(broker.name, "Acme Renamed");
        assert_eq!(broker.employers.len(), 1);
        assert_eq!(config.tpa("t1").unwrap().brokers.len(), 1);
    }

    #[test]
    fn upsert_broker_on_unknown_tenant_fails() {
        let mut config = single_tenant();
        let err = config.upsert_broker("nope", broker_patch("b1", "Acme")).unwrap_err();
        assert_eq!(err, TreeError::TpaNotFound("nope".into()));
        assert_eq!(err.to_string(), "TPA with ID nope not found");
    }

    #[test]
    fn upsert_employer_on_unknown_broker_fails() {
        let mut config = single_tenant();
        let err = config
            .upsert_employer("t1", "ghost", EmployerPatch { id: "e1".into(), ..Default::default() })
            .unwrap_err();

        assert!(matches!(err, TreeError::BrokerNotFound { .. }));
        assert_eq!(err.to_string(), "Broker with ID ghost not found for TPA t1");
    }

    #[test]
    fn add_then_delete_employer_leaves_broker_empty() {
        let mut config = single_tenant();
        config.upsert_broker("t1", broker_patch("b1", "Acme")).unwrap();

        let employer_id = EntityKind::Employer.generate_id();
        config
            .upsert_employer("t1", "b1", EmployerPatch { id: employer_id.clone(), name: Some("E1".into()), ..Default::default() })
            .unwrap();
        assert_eq!(config.tpa("t1").unwrap().brokers[0].employers.len(), 1);

        let removed = config.delete_employer("t1", "b1", &employer_id).unwrap();
        assert_eq!(removed.map(|e| e.name), Some("E1".to_string()));
        assert!(config.tpa("t1").unwrap().brokers[0].employers.is_empty());
    }

    #[test]
    fn delete_broker_cascades_to_employers() {
        let mut config = single_tenant();
        config.upsert_broker("t1", broker_patch("b1", "Acme")).unwrap();
        config.upsert_broker("t1", broker_patch("b2", "Other")).unwrap();
        config
            .upsert_employer("t1", "b1", EmployerPatch { id: "e1".into(), ..Default::default() })
            .unwrap();

        let removed = config.delete_broker("t1", "b1").unwrap().unwrap();
        assert_eq!(removed.employers.len(), 1);

        let tpa = config.tpa("t1").unwrap();
        assert_eq!(tpa.brokers.len(), 1);
        assert!(tpa.broker("b1").is_none());
        assert!(tpa.brokers.iter().all(|b| b.employer("e1").is_none()));
    }

    #[test]
    fn delete_missing_broker_is_a_no_op() {
        let mut config = single_tenant();
        config.upsert_broker("t1", broker_patch("b1", "Acme")).unwrap();
        let before = config.clone();

        assert_eq!(config.delete_broker("t1", "doesnotexist").unwrap(), None);
        assert_eq!(config, before);
    }

    #[test]
    fn delete_employer_requires_existing_path() {
        let mut config = single_tenant();
        assert!(matches!(
            config.delete_employer("t9", "b1", "e1"),
            Err(TreeError::TpaNotFound(_))
        ));
        assert!(matches!(
            config.delete_employer("t1", "b1", "e1"),
            Err(TreeError::BrokerNotFound { .. })
        ));

        config.upsert_broker("t1", broker_patch("b1", "Acme")).unwrap();
        assert_eq!(config.delete_employer("t1", "b1", "e1").unwrap(), None);
    }

    #[test]
    fn upsert_tpa_inserts_then_merges() {
        let mut config = Config::empty();
        config.upsert_tpa(TpaPatch { id: "t1".into(), name: Some("T".into()), ..Default::default() });
        config.upsert_broker("t1", broker_patch("b1", "Acme")).unwrap();

        let tpa = config.upsert_tpa(TpaPatch { id: "t1".into(), name: Some("Renamed".into()), ..Default::default() });
        assert_eq!(tpa.name, "Renamed");
        assert_eq!(tpa.brokers.len(), 1);
        assert_eq!(config.tpas.len(), 1);
    }

    #[test]
    fn same_name_under_different_ids_is_allowed() {
        let mut config = single_tenant();
        config.upsert_broker("t1", broker_patch("b1", "Acme")).unwrap();
        config.upsert_broker("t1", broker_patch("b2", "Acme")).unwrap();
        assert_eq!(config.tpa("t1").unwrap().brokers.len(), 2);
    }
}
