use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::is_none;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// Checklist item attached to an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRequirement {
    pub id: Uuid,
    pub application_id: Uuid,
    /// e.g. `essay`, `recommendation`, `transcript`
    pub requirement_type: String,
    pub status: RequirementStatus,
    pub deadline: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRequirement {
    #[serde(default)]
    pub application_id: Uuid,
    pub requirement_type: String,
    #[serde(default)]
    pub status: RequirementStatus,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewRequirement {
    pub fn validate(&self) -> Result<(), Error> {
        if self.requirement_type.trim().is_empty() {
            return Err(Error::bad_request("requirement_type is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementUpdate {
    #[serde(default, skip_serializing_if = "is_none")]
    pub requirement_type: Option<String>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub status: Option<RequirementStatus>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RequirementUpdate {
    pub fn apply_to(&self, requirement: &mut ApplicationRequirement) {
        if let Some(kind) = &self.requirement_type {
            requirement.requirement_type = kind.clone();
        }
        if let Some(status) = self.status {
            requirement.status = status;
        }
        if let Some(deadline) = self.deadline {
            requirement.deadline = Some(deadline);
        }
        if let Some(notes) = &self.notes {
            requirement.notes = Some(notes.clone());
        }
        if let Some(updated_at) = self.updated_at {
            requirement.updated_at = updated_at;
        }
    }
}
