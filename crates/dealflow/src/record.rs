//! The analyzed-company row the dashboard works with.

use chrono::NaiveDate;
use dealflow_protocol::StartupRecord;
use serde::Serialize;

/// One analyzed company. `name` is the identity used for deletion and row keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub name: String,
    pub first_interaction: NaiveDate,
    pub last_interaction: NaiveDate,
    pub total_interactions: u32,
    pub contact: String,
    pub analysis_date: NaiveDate,
}

impl Record {
    pub fn new(
        name: impl Into<String>,
        first_interaction: NaiveDate,
        last_interaction: NaiveDate,
        total_interactions: u32,
        contact: impl Into<String>,
        analysis_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            first_interaction,
            last_interaction,
            total_interactions,
            contact: contact.into(),
            analysis_date,
        }
    }
}

impl From<StartupRecord> for Record {
    fn from(wire: StartupRecord) -> Self {
        Self {
            name: wire.name,
            first_interaction: wire.first_interaction_date,
            last_interaction: wire.last_interaction_date,
            total_interactions: wire.total_interactions,
            contact: wire.company_contact,
            analysis_date: wire.analysis_date,
        }
    }
}
