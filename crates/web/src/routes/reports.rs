//! Backend proxy handlers: report sections, schools and address search.
//!
//! Sections are requested blurred unless the session user is on a paid plan.
//! A section the backend cannot serve still answers 200 with
//! `{success: true, available: false}` so one broken chart never breaks a
//! report page.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::cookie::CookieJar;
use futures::future::join_all;
use mib_core::plans::ResolvedPlan;
use serde::{Deserialize, Serialize};

use crate::backend::{AddressSuggestion, ReportKind, Schools, Section};
use crate::error::{AppError, Result};
use crate::middleware::OptionalSession;
use crate::session::SessionRecord;
use crate::state::AppState;

/// Most sections a single batch request may ask for.
const MAX_SECTIONS_PER_REQUEST: usize = 20;

/// Shortest address query forwarded to the backend.
const MIN_ADDRESS_QUERY_LEN: usize = 3;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Query for the batch section endpoint.
#[derive(Debug, Deserialize)]
pub struct SectionsQuery {
    /// Comma-separated section names.
    #[serde(default)]
    pub sections: String,
}

/// Query for address search.
#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub success: bool,
    #[serde(flatten)]
    pub section: Section,
}

#[derive(Debug, Serialize)]
pub struct SectionsResponse {
    pub success: bool,
    pub sections: BTreeMap<String, Section>,
}

#[derive(Debug, Serialize)]
pub struct SchoolsResponse {
    pub success: bool,
    pub schools: Schools,
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub success: bool,
    pub results: Vec<AddressSuggestion>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Proxy one report section.
pub async fn section(
    State(state): State<AppState>,
    OptionalSession { jar, session }: OptionalSession,
    Path((kind, section, name)): Path<(String, String, String)>,
) -> Result<(CookieJar, Json<SectionResponse>)> {
    let kind = parse_kind(&kind)?;
    let blur = should_blur(session.as_ref());

    let section = state
        .backend()
        .fetch_section(kind, &section, &name, blur)
        .await;

    Ok((
        jar,
        Json(SectionResponse {
            success: true,
            section,
        }),
    ))
}

/// Proxy several sections of one report concurrently.
pub async fn sections(
    State(state): State<AppState>,
    OptionalSession { jar, session }: OptionalSession,
    Path((kind, name)): Path<(String, String)>,
    Query(query): Query<SectionsQuery>,
) -> Result<(CookieJar, Json<SectionsResponse>)> {
    let kind = parse_kind(&kind)?;
    let names = parse_section_list(&query.sections)?;
    let blur = should_blur(session.as_ref());

    let backend = state.backend();
    let fetched = join_all(
        names
            .iter()
            .map(|section| backend.fetch_section(kind, section, &name, blur)),
    )
    .await;

    let sections = names.into_iter().zip(fetched).collect();

    Ok((
        jar,
        Json(SectionsResponse {
            success: true,
            sections,
        }),
    ))
}

/// Private and public schools for a suburb.
pub async fn schools(
    State(state): State<AppState>,
    Path(suburb): Path<String>,
) -> Json<SchoolsResponse> {
    let schools = state.backend().fetch_schools(&suburb).await;
    Json(SchoolsResponse {
        success: true,
        schools,
    })
}

/// Address autocomplete.
pub async fn address_search(
    State(state): State<AppState>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<AddressResponse>> {
    let q = query.q.trim();
    if q.chars().count() < MIN_ADDRESS_QUERY_LEN {
        return Ok(Json(AddressResponse {
            success: true,
            results: Vec::new(),
        }));
    }

    let results = state.backend().address_search(q).await?;
    Ok(Json(AddressResponse {
        success: true,
        results,
    }))
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_kind(raw: &str) -> Result<ReportKind> {
    raw.parse::<ReportKind>().map_err(AppError::NotFound)
}

/// Anonymous visitors and free-tier users get blurred sections.
fn should_blur(session: Option<&SessionRecord>) -> bool {
    !session.is_some_and(|s| ResolvedPlan::from_plan_ids(&s.user.plan_ids).is_paid())
}

/// Split, trim and de-duplicate a comma-separated section list.
fn parse_section_list(raw: &str) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    if names.is_empty() {
        return Err(AppError::BadRequest("At least one section is required".to_string()));
    }
    if names.len() > MAX_SECTIONS_PER_REQUEST {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_SECTIONS_PER_REQUEST} sections per request"
        )));
    }
    Ok(names)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use chrono::Utc;

    use super::*;
    use crate::test_support::{self, TestApp};

    #[test]
    fn test_parse_section_list() {
        assert_eq!(
            parse_section_list(" prices, rent,,prices ").unwrap(),
            vec!["prices".to_string(), "rent".to_string()]
        );
        assert!(parse_section_list(" , ").is_err());

        let many: Vec<String> = (0..=MAX_SECTIONS_PER_REQUEST).map(|i| format!("s{i}")).collect();
        assert!(parse_section_list(&many.join(",")).is_err());
    }

    #[test]
    fn test_should_blur() {
        assert!(should_blur(None));

        let mut record = SessionRecord::new("s".into(), test_support::user(), Utc::now());
        assert!(should_blur(Some(&record)));

        record.user.plan_ids = vec!["pln_essentials-abc".to_string()];
        assert!(!should_blur(Some(&record)));
    }

    #[tokio::test]
    async fn test_anonymous_section_is_blurred() {
        let app = TestApp::start().await;
        let response = app.get("/api/reports/suburb/prices/Bondi", None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["success"], true);
        assert_eq!(response.body["available"], true);
        assert_eq!(response.body["data"]["blur"], "true");
    }

    #[tokio::test]
    async fn test_paid_section_is_not_blurred() {
        let app = TestApp::start().await;
        let cookie = app.login().await;
        let response = app
            .get("/api/reports/property/prices/12-Smith-St", Some(&cookie))
            .await;
        assert_eq!(response.body["data"]["blur"], "false");
    }

    #[tokio::test]
    async fn test_unavailable_section_is_still_200() {
        let app = TestApp::start().await;
        let response = app.get("/api/reports/suburb/broken/Bondi", None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["success"], true);
        assert_eq!(response.body["available"], false);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_404() {
        let app = TestApp::start().await;
        let response = app.get("/api/reports/house/prices/Bondi", None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_batch_sections() {
        let app = TestApp::start().await;
        let response = app
            .get("/api/reports/suburb/Bondi?sections=prices,broken,html", None)
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let sections = &response.body["sections"];
        assert_eq!(sections["prices"]["available"], true);
        assert_eq!(sections["broken"]["available"], false);
        assert!(sections["html"]["html"].as_str().unwrap().contains("<div"));
    }

    #[tokio::test]
    async fn test_batch_without_sections_is_400() {
        let app = TestApp::start().await;
        let response = app.get("/api/reports/suburb/Bondi", None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_schools() {
        let app = TestApp::start().await;
        let response = app.get("/api/schools/Bondi", None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["schools"]["private"]["available"], true);
        assert_eq!(response.body["schools"]["public"]["available"], true);
    }

    #[tokio::test]
    async fn test_address_search() {
        let app = TestApp::start().await;

        let response = app.get("/api/address-search?q=george", None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["results"][0]["label"], "1 George St, Sydney NSW 2000");

        let response = app.get("/api/address-search?q=ab", None).await;
        assert_eq!(response.body["results"], serde_json::json!([]));
    }
}
