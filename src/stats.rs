//! Dashboard aggregates

use chrono::NaiveDate;
use serde::Serialize;

use crate::deadlines::{is_approaching, is_due_this_month, UrgencyPolicy};
use crate::models::{
    Application, ApplicationRequirement, ApplicationStatus, ApplicationType, RequirementStatus,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressDistribution {
    pub not_started: usize,
    pub in_progress: usize,
    /// submitted or under review
    pub submitted: usize,
    /// any decision
    pub completed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeDistribution {
    pub early_decision: usize,
    pub early_action: usize,
    pub regular_decision: usize,
    pub rolling_admission: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudentStats {
    pub total: usize,
    pub submitted: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub waitlisted: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub urgent_deadlines: usize,
    pub this_month_deadlines: usize,
    /// Percent of submitted-or-decided applications that were accepted, one decimal
    pub acceptance_rate: f64,
    pub progress_distribution: ProgressDistribution,
    pub application_types: TypeDistribution,
}

impl StudentStats {
    pub fn compute<'a, I>(applications: I, today: NaiveDate, policy: &UrgencyPolicy) -> Self
    where
        I: IntoIterator<Item = &'a Application>,
    {
        let mut stats = StudentStats::default();

        for app in applications {
            stats.total += 1;
            match app.status {
                ApplicationStatus::NotStarted => stats.not_started += 1,
                ApplicationStatus::InProgress => stats.in_progress += 1,
                ApplicationStatus::Submitted | ApplicationStatus::UnderReview => {
                    stats.submitted += 1
                }
                ApplicationStatus::Accepted => stats.accepted += 1,
                ApplicationStatus::Rejected => stats.rejected += 1,
                ApplicationStatus::Waitlisted => stats.waitlisted += 1,
            }

            if let Some(deadline) = app.deadline {
                if is_approaching(deadline, today, policy.high_days) {
                    stats.urgent_deadlines += 1;
                }
                if is_due_this_month(deadline, today) {
                    stats.this_month_deadlines += 1;
                }
            }

            match app.application_type {
                Some(ApplicationType::EarlyDecision) => stats.application_types.early_decision += 1,
                Some(ApplicationType::EarlyAction) => stats.application_types.early_action += 1,
                Some(ApplicationType::RegularDecision) => {
                    stats.application_types.regular_decision += 1
                }
                Some(ApplicationType::RollingAdmission) => {
                    stats.application_types.rolling_admission += 1
                }
                None => {}
            }
        }

        let decided = stats.accepted + stats.rejected + stats.waitlisted;
        stats.progress_distribution = ProgressDistribution {
            not_started: stats.not_started,
            in_progress: stats.in_progress,
            submitted: stats.submitted,
            completed: decided,
        };
        stats.acceptance_rate = percent(stats.accepted, stats.submitted + decided);
        stats
    }
}

/// Per-student summary on the parent dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParentSummary {
    pub total: usize,
    /// submitted or later, decisions included
    pub submitted: usize,
    pub accepted: usize,
    /// not started or in progress
    pub pending: usize,
}

impl ParentSummary {
    pub fn compute<'a, I>(applications: I) -> Self
    where
        I: IntoIterator<Item = &'a Application>,
    {
        applications
            .into_iter()
            .fold(ParentSummary::default(), |mut summary, app| {
                summary.total += 1;
                if app.status.is_submitted_or_later() {
                    summary.submitted += 1;
                } else {
                    summary.pending += 1;
                }
                if app.status == ApplicationStatus::Accepted {
                    summary.accepted += 1;
                }
                summary
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequirementProgress {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub not_started: usize,
    /// Whole percent completed
    pub progress: u32,
}

impl RequirementProgress {
    pub fn from_requirements(requirements: &[ApplicationRequirement]) -> Self {
        let mut progress = RequirementProgress {
            total: requirements.len(),
            ..Default::default()
        };
        for requirement in requirements {
            match requirement.status {
                RequirementStatus::Completed => progress.completed += 1,
                RequirementStatus::InProgress => progress.in_progress += 1,
                RequirementStatus::NotStarted => progress.not_started += 1,
            }
        }
        if progress.total > 0 {
            progress.progress =
                ((progress.completed as f64 / progress.total as f64) * 100.0).round() as u32;
        }
        progress
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 1000.0).round() / 10.0
}
