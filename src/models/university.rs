use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Catalog entry, shared by every user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct University {
    pub id: Uuid,
    pub name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub us_news_ranking: Option<i32>,
    /// Fraction between 0 and 1
    pub acceptance_rate: Option<f64>,
    pub application_system: Option<String>,
    pub tuition_in_state: Option<i64>,
    pub tuition_out_state: Option<i64>,
    pub application_fee: Option<i64>,
    /// Free-form deadlines object, e.g. `{"early_decision": "2025-11-01"}`
    pub deadlines: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Catalog search; acceptance rates are fractions here, the HTTP layer converts percentages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniversityQuery {
    /// Substring of name, city or state
    pub search: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub min_ranking: Option<i32>,
    pub max_ranking: Option<i32>,
    pub min_acceptance_rate: Option<f64>,
    pub max_acceptance_rate: Option<f64>,
    pub application_system: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl UniversityQuery {
    /// In-process evaluation of the filters, matching the PostgREST query
    pub fn matches(&self, university: &University) -> bool {
        fn contains(haystack: &Option<String>, needle: &str) -> bool {
            haystack
                .as_deref()
                .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false)
        }

        if let Some(search) = self.search.as_deref() {
            let in_name = university.name.to_lowercase().contains(&search.to_lowercase());
            if !in_name && !contains(&university.city, search) && !contains(&university.state, search)
            {
                return false;
            }
        }
        if let Some(country) = self.country.as_deref() {
            if !contains(&university.country, country) {
                return false;
            }
        }
        if let Some(state) = self.state.as_deref() {
            if !contains(&university.state, state) {
                return false;
            }
        }

        let ranking = university.us_news_ranking;
        if self.min_ranking.is_some() || self.max_ranking.is_some() {
            let Some(rank) = ranking else {
                return false;
            };
            if self.min_ranking.map_or(false, |min| rank < min)
                || self.max_ranking.map_or(false, |max| rank > max)
            {
                return false;
            }
        }

        let rate = university.acceptance_rate;
        if self.min_acceptance_rate.is_some() || self.max_acceptance_rate.is_some() {
            let Some(rate) = rate else {
                return false;
            };
            if self.min_acceptance_rate.map_or(false, |min| rate < min)
                || self.max_acceptance_rate.map_or(false, |max| rate > max)
            {
                return false;
            }
        }

        if let Some(system) = self.application_system.as_deref() {
            if university.application_system.as_deref() != Some(system) {
                return false;
            }
        }

        true
    }
}

/// Ranking ascending with unranked universities last, then by name
pub fn catalog_order(a: &University, b: &University) -> Ordering {
    match (a.us_news_ranking, b.us_news_ranking) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn university(name: &str, city: &str, rank: Option<i32>, rate: Option<f64>) -> University {
        University {
            id: Uuid::new_v4(),
            name: name.to_string(),
            country: Some("United States".to_string()),
            state: Some("California".to_string()),
            city: Some(city.to_string()),
            us_news_ranking: rank,
            acceptance_rate: rate,
            application_system: Some("Common App".to_string()),
            tuition_in_state: None,
            tuition_out_state: None,
            application_fee: None,
            deadlines: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn search_covers_name_city_and_state() {
        let stanford = university("Stanford University", "Stanford", Some(3), Some(0.04));
        let query = UniversityQuery {
            search: Some("stan".into()),
            ..Default::default()
        };
        assert!(query.matches(&stanford));

        let query = UniversityQuery {
            search: Some("califor".into()),
            ..Default::default()
        };
        assert!(query.matches(&stanford));

        let query = UniversityQuery {
            search: Some("boston".into()),
            ..Default::default()
        };
        assert!(!query.matches(&stanford));
    }

    #[test]
    fn range_filters_exclude_missing_values() {
        let unranked = university("Unranked College", "Nowhere", None, None);
        let query = UniversityQuery {
            max_ranking: Some(50),
            ..Default::default()
        };
        assert!(!query.matches(&unranked));

        let ranked = university("Ranked", "Somewhere", Some(20), Some(0.3));
        let query = UniversityQuery {
            min_ranking: Some(10),
            max_ranking: Some(20),
            min_acceptance_rate: Some(0.2),
            max_acceptance_rate: Some(0.3),
            ..Default::default()
        };
        assert!(query.matches(&ranked));
    }

    #[test]
    fn orders_unranked_last() {
        let mut list = vec![
            university("B", "x", None, None),
            university("A", "x", Some(10), None),
            university("C", "x", Some(2), None),
        ];
        list.sort_by(catalog_order);
        let names: Vec<_> = list.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["C", "A", "B"]);
    }
}
