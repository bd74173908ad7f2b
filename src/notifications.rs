//! Notifications derived from a student's applications
//!
//! Nothing is persisted; the list is rebuilt on every request and the ids
//! are stable so a client can remember which ones it has dismissed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::deadlines::{days_until, UrgencyPolicy};
use crate::models::{ApplicationStatus, ApplicationWithUniversity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Deadline,
    StatusChange,
    Reminder,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub application_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    pub urgent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationFeed {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub urgent_count: usize,
}

impl From<Vec<Notification>> for NotificationFeed {
    fn from(notifications: Vec<Notification>) -> Self {
        let unread_count = notifications.iter().filter(|n| !n.read).count();
        let urgent_count = notifications.iter().filter(|n| !n.read && n.urgent).count();
        Self {
            notifications,
            unread_count,
            urgent_count,
        }
    }
}

struct Builder<'a> {
    application: &'a ApplicationWithUniversity,
    now: DateTime<Utc>,
}

impl Builder<'_> {
    fn university(&self) -> &str {
        self.application
            .universities
            .as_ref()
            .map(|u| u.name.as_str())
            .unwrap_or("your university")
    }

    fn build(
        &self,
        prefix: &str,
        kind: NotificationKind,
        title: &str,
        message: String,
        urgent: bool,
    ) -> Notification {
        let id = self.application.application.id;
        Notification {
            id: format!("{prefix}-{id}"),
            kind,
            title: title.to_string(),
            message,
            application_id: id,
            created_at: self.now,
            read: false,
            urgent,
        }
    }
}

/// Builds the notification list, urgent ones first
pub fn generate(
    applications: &[ApplicationWithUniversity],
    now: DateTime<Utc>,
    policy: &UrgencyPolicy,
) -> Vec<Notification> {
    let today: NaiveDate = now.date_naive();
    let mut notifications = Vec::new();

    for item in applications {
        let application = &item.application;
        let b = Builder {
            application: item,
            now,
        };

        if application.status == ApplicationStatus::Accepted {
            notifications.push(b.build(
                "status-accepted",
                NotificationKind::Success,
                "Accepted!",
                format!("Congratulations! You were admitted to {}", b.university()),
                false,
            ));
        }

        let Some(deadline) = application.deadline else {
            continue;
        };
        let days = days_until(deadline, today);
        let pending = !application.status.is_submitted_or_later();

        if pending && days < 0 {
            notifications.push(b.build(
                "deadline-overdue",
                NotificationKind::Deadline,
                "Deadline passed",
                format!("The deadline for {} has passed", b.university()),
                true,
            ));
        } else if pending && days <= policy.critical_days {
            let when = match days {
                0 => "today".to_string(),
                1 => "in 1 day".to_string(),
                n => format!("in {n} days"),
            };
            notifications.push(b.build(
                "deadline-urgent",
                NotificationKind::Deadline,
                "Urgent deadline",
                format!("The application to {} is due {when}", b.university()),
                true,
            ));
        } else if pending && days <= policy.high_days {
            notifications.push(b.build(
                "deadline-warning",
                NotificationKind::Deadline,
                "Deadline approaching",
                format!("The application to {} is due in {days} days", b.university()),
                false,
            ));
        }

        if application.status == ApplicationStatus::NotStarted
            && days > policy.high_days
            && days <= policy.medium_days
        {
            notifications.push(b.build(
                "reminder-start",
                NotificationKind::Reminder,
                "Time to start",
                format!(
                    "The application to {} has not been started yet",
                    b.university()
                ),
                false,
            ));
        }
    }

    // stable: generation order is kept within each group
    notifications.sort_by_key(|n| !n.urgent);
    notifications
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Application;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 9, 30, 0).unwrap()
    }

    fn app(status: ApplicationStatus, days: Option<i64>) -> ApplicationWithUniversity {
        let today = now().date_naive();
        ApplicationWithUniversity {
            application: Application {
                id: Uuid::new_v4(),
                student_id: Uuid::new_v4(),
                university_id: Uuid::new_v4(),
                application_type: None,
                deadline: days.map(|d| today + Duration::days(d)),
                status,
                submitted_date: None,
                decision_date: None,
                decision_type: None,
                notes: None,
                created_at: now(),
                updated_at: now(),
            },
            universities: None,
        }
    }

    fn ids(list: &[Notification]) -> Vec<String> {
        list.iter()
            .map(|n| n.id.split('-').take(2).collect::<Vec<_>>().join("-"))
            .collect()
    }

    #[test]
    fn deadline_bands() {
        let policy = UrgencyPolicy::default();
        let apps = vec![
            app(ApplicationStatus::InProgress, Some(5)),
            app(ApplicationStatus::InProgress, Some(3)),
            app(ApplicationStatus::InProgress, Some(-2)),
            app(ApplicationStatus::InProgress, Some(20)),
        ];
        let result = generate(&apps, now(), &policy);
        assert_eq!(
            ids(&result),
            ["deadline-urgent", "deadline-overdue", "deadline-warning"]
        );
        assert_eq!(result[0].application_id, apps[1].application.id);
    }

    #[test]
    fn submitted_applications_get_no_deadline_alerts() {
        let policy = UrgencyPolicy::default();
        let apps = vec![
            app(ApplicationStatus::Submitted, Some(1)),
            app(ApplicationStatus::UnderReview, Some(-1)),
            app(ApplicationStatus::Rejected, Some(2)),
        ];
        assert!(generate(&apps, now(), &policy).is_empty());
    }

    #[test]
    fn acceptance_and_start_reminder() {
        let policy = UrgencyPolicy::default();
        let accepted = app(ApplicationStatus::Accepted, None);
        let idle = app(ApplicationStatus::NotStarted, Some(10));
        let result = generate(&[accepted.clone(), idle.clone()], now(), &policy);

        assert_eq!(result.len(), 2);
        assert_eq!(
            result[0].id,
            format!("status-accepted-{}", accepted.application.id)
        );
        assert_eq!(result[0].kind, NotificationKind::Success);
        assert_eq!(
            result[1].id,
            format!("reminder-start-{}", idle.application.id)
        );
    }

    #[test]
    fn feed_counts() {
        let policy = UrgencyPolicy::default();
        let apps = vec![
            app(ApplicationStatus::NotStarted, Some(0)),
            app(ApplicationStatus::InProgress, Some(6)),
        ];
        let feed = NotificationFeed::from(generate(&apps, now(), &policy));
        assert_eq!(feed.unread_count, 2);
        assert_eq!(feed.urgent_count, 1);
        assert!(feed.notifications[0].message.ends_with("due today"));
    }
}
