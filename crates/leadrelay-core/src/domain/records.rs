//! CRUD records exposed by repositories and use cases.
//!
//! These are plain DTOs: the repositories own persistence, the use cases only
//! pass them through.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BotConfigId, ClinicId, LeadId, NotificationId, PatientId};

/// Which backend owns a clinic's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClinicSource {
    Legacy,
    Platform,
}

impl ClinicSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ClinicSource::Legacy => "legacy",
            ClinicSource::Platform => "platform",
        }
    }
}

impl fmt::Display for ClinicSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown clinic source {0:?} (expected \"legacy\" or \"platform\")")]
pub struct UnknownClinicSource(pub String);

impl FromStr for ClinicSource {
    type Err = UnknownClinicSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(ClinicSource::Legacy),
            "platform" => Ok(ClinicSource::Platform),
            _ => Err(UnknownClinicSource(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicDto {
    pub id: ClinicId,
    pub source: ClinicSource,
    pub name: String,
    pub timezone: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfigDto {
    pub id: BotConfigId,
    pub clinic_id: ClinicId,
    pub source: ClinicSource,
    pub name: String,
    pub enabled: bool,

    /// Bot-specific settings (prompts, schedules, ...). Opaque to this crate.
    #[serde(default)]
    pub settings: serde_json::Value,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDto {
    pub id: NotificationId,
    pub clinic_id: ClinicId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<LeadId>,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientDto {
    pub id: PatientId,
    pub clinic_id: ClinicId,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Pipeline stage of a lead in the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Scheduled,
    Won,
    Lost,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Scheduled => "scheduled",
            LeadStatus::Won => "won",
            LeadStatus::Lost => "lost",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadDto {
    pub id: LeadId,
    pub clinic_id: ClinicId,
    pub source: ClinicSource,
    pub name: String,
    pub status: LeadStatus,

    /// Number of status changes so far. Identifies each change in its dedup key.
    #[serde(default)]
    pub status_revision: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("legacy", ClinicSource::Legacy)]
    #[case("platform", ClinicSource::Platform)]
    #[case(" Legacy ", ClinicSource::Legacy)]
    fn clinic_source_parses(#[case] raw: &str, #[case] expected: ClinicSource) {
        assert_eq!(raw.parse::<ClinicSource>().unwrap(), expected);
    }

    #[test]
    fn unknown_clinic_source_is_an_error() {
        let err = "dynamo".parse::<ClinicSource>().unwrap_err();
        assert_eq!(err, UnknownClinicSource("dynamo".to_string()));
    }

    #[test]
    fn clinic_source_serializes_lowercase() {
        let s = serde_json::to_string(&ClinicSource::Platform).unwrap();
        assert_eq!(s, "\"platform\"");
    }

    #[test]
    fn notification_without_lead_omits_the_field() {
        let n = NotificationDto {
            id: NotificationId::new("n-1").unwrap(),
            clinic_id: ClinicId::new("42").unwrap(),
            lead_id: None,
            title: "New lead".to_string(),
            body: "A lead arrived".to_string(),
            read: false,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        };
        let v = serde_json::to_value(&n).unwrap();
        assert!(v.get("lead_id").is_none());
        assert_eq!(v["clinic_id"], "42");
    }
}
