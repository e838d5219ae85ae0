// src/tests/router_tests/system_tests.rs
use crate::router::handle;
use crate::tests::utils::{body_json, connected_state, listed, request, test_state, unreachable_store};
use http::Method;

#[test]
fn banner_is_json() {
    let state = test_state(unreachable_store(), vec![]);
    let resp = handle(request(Method::GET, "/", ""), &state).unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("Content-Type").and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    assert_eq!(
        body_json(resp)["message"],
        "Property Comparison API is running!"
    );
}

#[test]
fn health_reports_store_and_dataset() {
    let state = connected_state("health", vec![listed("1 A St", 100_000)]);
    let v = body_json(handle(request(Method::GET, "/health", ""), &state).unwrap());

    assert_eq!(v["status"], "healthy");
    assert_eq!(v["model_loaded"], false);
    assert_eq!(v["data_sources"]["primary_store"]["connected"], true);
    assert_eq!(v["data_sources"]["json_files"]["properties_loaded"], 1);
    assert_eq!(v["primary_data_source"], "primary_store");
}

#[test]
fn health_with_store_down() {
    let state = test_state(unreachable_store(), vec![]);
    let v = body_json(handle(request(Method::GET, "/health", ""), &state).unwrap());

    assert_eq!(v["data_sources"]["primary_store"]["connected"], false);
    assert_eq!(v["data_sources"]["json_files"]["available"], false);
    assert_eq!(v["primary_data_source"], "json_files");
}

#[test]
fn unknown_route_is_404() {
    let state = test_state(unreachable_store(), vec![]);
    let err = handle(request(Method::GET, "/nope", ""), &state).unwrap_err();
    assert_eq!(err.status(), 404);

    let resp = crate::responses::error_to_response(err);
    assert_eq!(resp.status(), 404);
    assert!(body_json(resp)["detail"].as_str().unwrap().contains("/nope"));
}
