//! Live tests for the public endpoints and the backend proxy.
//!
//! These tests require the web server running against a reachable backend.

use mib_integration_tests::{base_url, get_json, session_client};

#[tokio::test]
#[ignore = "Requires running web server"]
async fn test_health_and_readiness() {
    let client = session_client();
    let resp = client
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
#[ignore = "Requires running web server"]
async fn test_plan_catalog() {
    let client = session_client();
    let (status, body) = get_json(&client, "/api/plans").await.unwrap();
    assert_eq!(status, 200);

    let plans = body["plans"].as_array().unwrap();
    assert!(!plans.is_empty());
    assert!(plans.iter().all(|p| p["name"].is_string()));
}

#[tokio::test]
#[ignore = "Requires running web server and analytics backend"]
async fn test_anonymous_section_answers() {
    let client = session_client();
    let (status, body) = get_json(&client, "/api/reports/suburb/summary/Bondi")
        .await
        .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert!(body["available"].is_boolean());
}

#[tokio::test]
#[ignore = "Requires running web server"]
async fn test_short_address_query_is_empty() {
    let client = session_client();
    let (status, body) = get_json(&client, "/api/address-search?q=ab").await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["results"], serde_json::json!([]));
}
