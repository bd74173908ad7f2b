use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::access::AuthUser;
use crate::config::PageLimits;
use crate::error::Error;
use crate::models::UniversityQuery;
use crate::permissions::Permission;
use crate::server::{
    extract::{Path, Query},
    state::AppState,
};

/// Query string of the catalog search; acceptance rates are percentages
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityParams {
    search: Option<String>,
    country: Option<String>,
    state: Option<String>,
    #[serde(alias = "min_ranking")]
    min_ranking: Option<i32>,
    #[serde(alias = "max_ranking")]
    max_ranking: Option<i32>,
    #[serde(alias = "min_acceptance_rate")]
    min_acceptance_rate: Option<f64>,
    #[serde(alias = "max_acceptance_rate")]
    max_acceptance_rate: Option<f64>,
    #[serde(alias = "application_system")]
    application_system: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl UniversityParams {
    fn into_query(self, pages: &PageLimits) -> Result<UniversityQuery, Error> {
        let percent = |value: Option<f64>, name: &str| match value {
            Some(p) if !(0.0..=100.0).contains(&p) => Err(Error::bad_request(format!(
                "{name} must be between 0 and 100"
            ))),
            other => Ok(other.map(|p| p / 100.0)),
        };

        Ok(UniversityQuery {
            search: non_empty(self.search),
            country: non_empty(self.country),
            state: non_empty(self.state),
            min_ranking: self.min_ranking,
            max_ranking: self.max_ranking,
            min_acceptance_rate: percent(self.min_acceptance_rate, "minAcceptanceRate")?,
            max_acceptance_rate: percent(self.max_acceptance_rate, "maxAcceptanceRate")?,
            application_system: non_empty(self.application_system),
            limit: pages.clamp(self.limit),
            offset: self.offset.unwrap_or(0),
        })
    }
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<UniversityParams>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ReadUniversities)?;
    let query = params.into_query(&state.pages)?;

    let page = state.store.universities(&query).await?;
    Ok(Json(json!({
        "universities": page.items,
        "total": page.total,
        "limit": page.limit,
        "offset": page.offset,
        "has_more": page.has_more(),
    })))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ReadUniversities)?;
    let university = state
        .store
        .university(id)
        .await?
        .ok_or_else(|| Error::not_found("University not found"))?;
    Ok(Json(json!({ "university": university })))
}
