use serde::Serialize;

use super::records::Tpa;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryRole {
    TpaAdmin,
    Broker,
    Employer,
}

/// One account-like entry derived from the tenant tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: DirectoryRole,
    pub tpa_id: String,
    pub tpa_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employer_name: Option<String>,
    pub enabled: bool,
    pub status: &'static str,
}

impl Tpa {
    /// Flatten the tenant into its admin, broker and employer entries, in tree order.
    pub fn directory(&self) -> Vec<DirectoryUser> {
        let entry = |username: String, email: String, name: String, role: DirectoryRole| DirectoryUser {
            username,
            email,
            name,
            role,
            tpa_id: self.id.clone(),
            tpa_name: self.name.clone(),
            broker_id: None,
            broker_name: None,
            employer_id: None,
            employer_name: None,
            enabled: true,
            status: "CONFIRMED",
        };

        let mut users = vec![entry(
            format!("admin_{}", self.id),
            format!("admin@{}.com", self.id),
            format!("{} Admin", self.name),
            DirectoryRole::TpaAdmin,
        )];

        for broker in &self.brokers {
            users.push(DirectoryUser {
                broker_id: Some(broker.id.clone()),
                broker_name: Some(broker.name.clone()),
                ..entry(
                    format!("broker_{}", broker.id),
                    format!("{}@example.com", broker.id),
                    broker.name.clone(),
                    DirectoryRole::Broker,
                )
            });

            for employer in &broker.employers {
                users.push(DirectoryUser {
                    broker_id: Some(broker.id.clone()),
                    broker_name: Some(broker.name.clone()),
                    employer_id: Some(employer.id.clone()),
                    employer_name: Some(employer.name.clone()),
                    ..entry(
                        format!("employer_{}", employer.id),
                        format!("{}@example.com", employer.id),
                        employer.name.clone(),
                        DirectoryRole::Employer,
                    )
                });
            }
        }

        users
    }
}
