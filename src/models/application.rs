use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{is_none, ApplicationRequirement, University};
use crate::stats::RequirementProgress;

/// Lifecycle of an application
///
/// `not_started → in_progress → submitted → under_review → accepted | rejected | waitlisted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    NotStarted,
    InProgress,
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
    Waitlisted,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 7] = [
        ApplicationStatus::NotStarted,
        ApplicationStatus::InProgress,
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Waitlisted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::NotStarted => "not_started",
            ApplicationStatus::InProgress => "in_progress",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Waitlisted => "waitlisted",
        }
    }

    /// The status a student would usually move to next; `None` once decided
    pub fn next_suggested(&self) -> Option<ApplicationStatus> {
        match self {
            ApplicationStatus::NotStarted => Some(ApplicationStatus::InProgress),
            ApplicationStatus::InProgress => Some(ApplicationStatus::Submitted),
            ApplicationStatus::Submitted => Some(ApplicationStatus::UnderReview),
            ApplicationStatus::UnderReview => Some(ApplicationStatus::Accepted),
            _ => None,
        }
    }

    /// True from `submitted` onward, decisions included
    pub fn is_submitted_or_later(&self) -> bool {
        !matches!(
            self,
            ApplicationStatus::NotStarted | ApplicationStatus::InProgress
        )
    }

    pub fn decision(&self) -> Option<DecisionType> {
        match self {
            ApplicationStatus::Accepted => Some(DecisionType::Accepted),
            ApplicationStatus::Rejected => Some(DecisionType::Rejected),
            ApplicationStatus::Waitlisted => Some(DecisionType::Waitlisted),
            _ => None,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    EarlyDecision,
    EarlyAction,
    RegularDecision,
    RollingAdmission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    Accepted,
    Rejected,
    Waitlisted,
}

/// A student's candidacy for one university
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub student_id: Uuid,
    pub university_id: Uuid,
    pub application_type: Option<ApplicationType>,
    pub deadline: Option<NaiveDate>,
    pub status: ApplicationStatus,
    pub submitted_date: Option<NaiveDate>,
    pub decision_date: Option<NaiveDate>,
    pub decision_type: Option<DecisionType>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload; `student_id` is always taken from the caller, never the body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    #[serde(default)]
    pub student_id: Uuid,
    pub university_id: Uuid,
    #[serde(default)]
    pub application_type: Option<ApplicationType>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationUpdate {
    #[serde(default, skip_serializing_if = "is_none")]
    pub application_type: Option<ApplicationType>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub status: Option<ApplicationStatus>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub submitted_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub decision_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub decision_type: Option<DecisionType>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ApplicationUpdate {
    pub fn status(status: ApplicationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Fills the dates a status change implies when neither the update nor `current` has them
    ///
    /// A decision status always carries its own `decision_type`, and moving
    /// from one decision to another dates the new one.
    pub fn fill_status_dates(&mut self, current: &Application, today: NaiveDate) {
        let Some(status) = self.status else {
            return;
        };

        if status == ApplicationStatus::Submitted
            && self.submitted_date.is_none()
            && current.submitted_date.is_none()
        {
            self.submitted_date = Some(today);
        }

        if let Some(decision) = status.decision() {
            let redecided = current.status != status && current.status.decision().is_some();
            if self.decision_date.is_none() && (current.decision_date.is_none() || redecided) {
                self.decision_date = Some(today);
            }
            if self.decision_type.is_none() {
                self.decision_type = Some(decision);
            }
        }
    }

    pub fn apply_to(&self, application: &mut Application) {
        if let Some(kind) = self.application_type {
            application.application_type = Some(kind);
        }
        if let Some(deadline) = self.deadline {
            application.deadline = Some(deadline);
        }
        if let Some(status) = self.status {
            application.status = status;
        }
        if let Some(date) = self.submitted_date {
            application.submitted_date = Some(date);
        }
        if let Some(date) = self.decision_date {
            application.decision_date = Some(date);
        }
        if let Some(decision) = self.decision_type {
            application.decision_type = Some(decision);
        }
        if let Some(notes) = &self.notes {
            application.notes = Some(notes.clone());
        }
        if let Some(updated_at) = self.updated_at {
            application.updated_at = updated_at;
        }
    }
}

/// Application with its university embedded, as listed to students and parents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationWithUniversity {
    #[serde(flatten)]
    pub application: Application,
    #[serde(default)]
    pub universities: Option<University>,
}

/// Full view of one application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: Application,
    pub universities: Option<University>,
    pub application_requirements: Vec<ApplicationRequirement>,
    pub requirement_progress: RequirementProgress,
}

impl ApplicationDetail {
    pub fn new(
        application: Application,
        university: Option<University>,
        requirements: Vec<ApplicationRequirement>,
    ) -> Self {
        let requirement_progress = RequirementProgress::from_requirements(&requirements);
        Self {
            application,
            universities: university,
            application_requirements: requirements,
            requirement_progress,
        }
    }
}

/// Appends a dated parent note below any existing notes
pub fn append_parent_note(existing: Option<&str>, note: &str, today: NaiveDate) -> String {
    let entry = format!("[Parent note - {}]: {}", today.format("%Y-%m-%d"), note.trim());
    match existing {
        Some(notes) if !notes.trim().is_empty() => format!("{notes}\n\n{entry}"),
        _ => entry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn application(status: ApplicationStatus) -> Application {
        Application {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            university_id: Uuid::new_v4(),
            application_type: Some(ApplicationType::RegularDecision),
            deadline: Some(date(2025, 1, 1)),
            status,
            submitted_date: None,
            decision_date: None,
            decision_type: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn suggests_next_status_until_decided() {
        assert_eq!(
            ApplicationStatus::NotStarted.next_suggested(),
            Some(ApplicationStatus::InProgress)
        );
        assert_eq!(
            ApplicationStatus::UnderReview.next_suggested(),
            Some(ApplicationStatus::Accepted)
        );
        assert_eq!(ApplicationStatus::Rejected.next_suggested(), None);
        assert_eq!(ApplicationStatus::Waitlisted.next_suggested(), None);
    }

    #[test]
    fn submitting_sets_submitted_date_once() {
        let today = date(2024, 10, 1);
        let current = application(ApplicationStatus::InProgress);
        let mut update = ApplicationUpdate::status(ApplicationStatus::Submitted);
        update.fill_status_dates(&current, today);
        assert_eq!(update.submitted_date, Some(today));
        assert_eq!(update.decision_date, None);

        let mut already = application(ApplicationStatus::InProgress);
        already.submitted_date = Some(date(2024, 9, 1));
        let mut update = ApplicationUpdate::status(ApplicationStatus::Submitted);
        update.fill_status_dates(&already, today);
        assert_eq!(update.submitted_date, None);
    }

    #[test]
    fn decision_sets_date_and_type() {
        let today = date(2025, 3, 15);
        let current = application(ApplicationStatus::UnderReview);
        let mut update = ApplicationUpdate::status(ApplicationStatus::Waitlisted);
        update.fill_status_dates(&current, today);

        let mut app = current.clone();
        update.apply_to(&mut app);
        assert_eq!(app.status, ApplicationStatus::Waitlisted);
        assert_eq!(app.decision_date, Some(today));
        assert_eq!(app.decision_type, Some(DecisionType::Waitlisted));
    }

    #[test]
    fn waitlist_to_accepted_replaces_the_decision() {
        let today = date(2025, 5, 1);
        let mut current = application(ApplicationStatus::Waitlisted);
        current.decision_date = Some(date(2025, 3, 15));
        current.decision_type = Some(DecisionType::Waitlisted);

        let mut update = ApplicationUpdate::status(ApplicationStatus::Accepted);
        update.fill_status_dates(&current, today);
        let mut app = current.clone();
        update.apply_to(&mut app);

        assert_eq!(app.status, ApplicationStatus::Accepted);
        assert_eq!(app.decision_type, Some(DecisionType::Accepted));
        assert_eq!(app.decision_date, Some(today));

        // re-saving the same decision keeps its date
        let mut update = ApplicationUpdate::status(ApplicationStatus::Accepted);
        update.fill_status_dates(&app, date(2025, 6, 1));
        assert_eq!(update.decision_date, None);
        assert_eq!(update.decision_type, Some(DecisionType::Accepted));
    }

    #[test]
    fn parent_notes_are_appended() {
        let today = date(2024, 11, 2);
        assert_eq!(
            append_parent_note(None, "Call the counselor", today),
            "[Parent note - 2024-11-02]: Call the counselor"
        );
        assert_eq!(
            append_parent_note(Some("Draft done"), "Looks good", today),
            "Draft done\n\n[Parent note - 2024-11-02]: Looks good"
        );
    }

    #[test]
    fn embedded_university_round_trips_through_flatten() {
        let value = serde_json::json!({
            "id": "7a4f2c1e-0000-4000-8000-000000000001",
            "student_id": "7a4f2c1e-0000-4000-8000-000000000002",
            "university_id": "7a4f2c1e-0000-4000-8000-000000000003",
            "application_type": "early_action",
            "deadline": "2024-11-01",
            "status": "submitted",
            "submitted_date": "2024-10-20",
            "decision_date": null,
            "decision_type": null,
            "notes": null,
            "created_at": "2024-09-01T00:00:00Z",
            "updated_at": "2024-10-20T00:00:00Z",
            "universities": null
        });
        let parsed: ApplicationWithUniversity = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.application.status, ApplicationStatus::Submitted);
        assert_eq!(
            parsed.application.application_type,
            Some(ApplicationType::EarlyAction)
        );
        assert!(parsed.universities.is_none());
    }
}
