use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::is_none;
use crate::error::Error;

/// Student profile, one per authenticated student user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    /// Identity-provider user id
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub graduation_year: Option<i32>,
    pub gpa: Option<f64>,
    pub sat_score: Option<i32>,
    pub act_score: Option<i32>,
    pub target_countries: Option<Vec<String>>,
    pub intended_majors: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewStudent {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub graduation_year: Option<i32>,
    pub gpa: Option<f64>,
    pub sat_score: Option<i32>,
    pub act_score: Option<i32>,
    pub target_countries: Option<Vec<String>>,
    pub intended_majors: Option<Vec<String>>,
}

impl NewStudent {
    pub fn validate(&self) -> Result<(), Error> {
        validate_scores(self.gpa, self.sat_score, self.act_score)
    }
}

/// Fields a student may change on their own profile; absent fields are kept
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentUpdate {
    #[serde(default, skip_serializing_if = "is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub graduation_year: Option<i32>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub gpa: Option<f64>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub sat_score: Option<i32>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub act_score: Option<i32>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub target_countries: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub intended_majors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StudentUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(Error::bad_request("name must not be empty"));
        }
        validate_scores(self.gpa, self.sat_score, self.act_score)
    }

    pub fn apply_to(&self, student: &mut Student) {
        if let Some(name) = &self.name {
            student.name = name.clone();
        }
        if let Some(year) = self.graduation_year {
            student.graduation_year = Some(year);
        }
        if let Some(gpa) = self.gpa {
            student.gpa = Some(gpa);
        }
        if let Some(sat) = self.sat_score {
            student.sat_score = Some(sat);
        }
        if let Some(act) = self.act_score {
            student.act_score = Some(act);
        }
        if let Some(countries) = &self.target_countries {
            student.target_countries = Some(countries.clone());
        }
        if let Some(majors) = &self.intended_majors {
            student.intended_majors = Some(majors.clone());
        }
        if let Some(updated_at) = self.updated_at {
            student.updated_at = updated_at;
        }
    }
}

fn validate_scores(gpa: Option<f64>, sat: Option<i32>, act: Option<i32>) -> Result<(), Error> {
    if matches!(gpa, Some(g) if !(0.0..=5.0).contains(&g)) {
        return Err(Error::bad_request("gpa must be between 0 and 5"));
    }
    if matches!(sat, Some(s) if !(400..=1600).contains(&s)) {
        return Err(Error::bad_request("sat_score must be between 400 and 1600"));
    }
    if matches!(act, Some(a) if !(1..=36).contains(&a)) {
        return Err(Error::bad_request("act_score must be between 1 and 36"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_scores() {
        let update = StudentUpdate {
            sat_score: Some(1700),
            ..Default::default()
        };
        assert!(matches!(update.validate(), Err(Error::BadRequest(_))));

        let update = StudentUpdate {
            gpa: Some(3.9),
            act_score: Some(34),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn partial_update_serializes_only_present_fields() {
        let update = StudentUpdate {
            name: Some("Ada".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "name": "Ada" })
        );
    }
}
