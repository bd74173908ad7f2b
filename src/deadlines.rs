//! Deadline urgency
//!
//! One [`UrgencyPolicy`] drives the dashboard stats, the upcoming-deadlines
//! listing and the notification generator.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::ApplicationWithUniversity;

/// Whole calendar days from `today` to `deadline`, negative once it has passed
pub fn days_until(deadline: NaiveDate, today: NaiveDate) -> i64 {
    (deadline - today).num_days()
}

/// `0 <= days <= threshold`
pub fn is_approaching(deadline: NaiveDate, today: NaiveDate, threshold: i64) -> bool {
    (0..=threshold).contains(&days_until(deadline, today))
}

/// Still ahead and inside the current calendar month
pub fn is_due_this_month(deadline: NaiveDate, today: NaiveDate) -> bool {
    deadline >= today && deadline.year() == today.year() && deadline.month() == today.month()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrgencyPolicy {
    pub critical_days: i64,
    pub high_days: i64,
    pub medium_days: i64,
}

impl Default for UrgencyPolicy {
    fn default() -> Self {
        Self {
            critical_days: 3,
            high_days: 7,
            medium_days: 14,
        }
    }
}

impl UrgencyPolicy {
    /// Thresholds are forced to be non-decreasing
    pub fn new(critical_days: i64, high_days: i64, medium_days: i64) -> Self {
        let high_days = high_days.max(critical_days);
        Self {
            critical_days,
            high_days,
            medium_days: medium_days.max(high_days),
        }
    }

    pub fn classify(&self, days: i64) -> Urgency {
        if days <= self.critical_days {
            Urgency::Critical
        } else if days <= self.high_days {
            Urgency::High
        } else if days <= self.medium_days {
            Urgency::Medium
        } else {
            Urgency::Normal
        }
    }
}

/// An application with a deadline inside the requested window
#[derive(Debug, Clone, Serialize)]
pub struct UpcomingDeadline {
    #[serde(flatten)]
    pub application: ApplicationWithUniversity,
    pub days_until: i64,
    pub urgency: Urgency,
}

/// Applications due in `[today, today + window_days]`, soonest first
pub fn upcoming(
    applications: &[ApplicationWithUniversity],
    today: NaiveDate,
    window_days: i64,
    policy: &UrgencyPolicy,
) -> Vec<UpcomingDeadline> {
    let mut result: Vec<UpcomingDeadline> = applications
        .iter()
        .filter_map(|item| {
            let deadline = item.application.deadline?;
            let days = days_until(deadline, today);
            (0..=window_days).contains(&days).then(|| UpcomingDeadline {
                application: item.clone(),
                days_until: days,
                urgency: policy.classify(days),
            })
        })
        .collect();

    result.sort_by_key(|d| (d.days_until, d.application.application.deadline));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Application, ApplicationStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn with_deadline(deadline: Option<NaiveDate>) -> ApplicationWithUniversity {
        ApplicationWithUniversity {
            application: Application {
                id: Uuid::new_v4(),
                student_id: Uuid::new_v4(),
                university_id: Uuid::new_v4(),
                application_type: None,
                deadline,
                status: ApplicationStatus::InProgress,
                submitted_date: None,
                decision_date: None,
                decision_type: None,
                notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            universities: None,
        }
    }

    #[test]
    fn classifies_at_the_boundaries() {
        let policy = UrgencyPolicy::default();
        assert_eq!(policy.classify(0), Urgency::Critical);
        assert_eq!(policy.classify(3), Urgency::Critical);
        assert_eq!(policy.classify(4), Urgency::High);
        assert_eq!(policy.classify(7), Urgency::High);
        assert_eq!(policy.classify(8), Urgency::Medium);
        assert_eq!(policy.classify(14), Urgency::Medium);
        assert_eq!(policy.classify(15), Urgency::Normal);
    }

    #[test]
    fn counts_calendar_days() {
        let today = date(2024, 12, 30);
        assert_eq!(days_until(date(2025, 1, 2), today), 3);
        assert_eq!(days_until(date(2024, 12, 29), today), -1);
        assert!(is_approaching(today, today, 7));
        assert!(!is_approaching(date(2024, 12, 29), today, 7));
        assert!(!is_approaching(date(2025, 1, 7), today, 7));
        assert!(is_due_this_month(date(2024, 12, 31), today));
        assert!(!is_due_this_month(date(2024, 12, 1), today));
        assert!(!is_due_this_month(date(2025, 1, 1), today));
    }

    #[test]
    fn new_keeps_thresholds_ordered() {
        let policy = UrgencyPolicy::new(5, 2, 1);
        assert_eq!(policy.high_days, 5);
        assert_eq!(policy.medium_days, 5);
    }

    #[test]
    fn upcoming_filters_window_and_sorts() {
        let today = date(2024, 10, 1);
        let apps = vec![
            with_deadline(Some(date(2024, 10, 20))),
            with_deadline(Some(date(2024, 9, 30))),
            with_deadline(None),
            with_deadline(Some(date(2024, 10, 3))),
            with_deadline(Some(date(2024, 12, 1))),
        ];

        let result = upcoming(&apps, today, 30, &UrgencyPolicy::default());
        let days: Vec<_> = result.iter().map(|d| d.days_until).collect();
        assert_eq!(days, [2, 19]);
        assert_eq!(result[0].urgency, Urgency::Critical);
        assert_eq!(result[1].urgency, Urgency::Normal);
    }
}
