// src/tests/router_tests/property_tests.rs
use crate::router::handle;
use crate::tests::utils::{body_json, connected_state, listed, request, test_state, unreachable_store};
use http::Method;
use serde_json::json;

#[test]
fn property_crud_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let state = connected_state("crud", vec![]);

    // Create
    let new_property = json!({
        "address": "789 Test Street, Test City, CA 90210",
        "property_type": "SFH",
        "lot_area": 7000,
        "bedrooms": 3,
        "bathrooms": 2,
        "year_built": 2015,
        "market_value": 850000
    });
    let resp = handle(
        request(Method::POST, "/properties", &new_property.to_string()),
        &state,
    )?;
    assert_eq!(resp.status(), 200);
    let created = body_json(resp);
    assert!(created["id"].as_str().unwrap().starts_with("custom_"));
    assert_eq!(created["id"].as_str().unwrap().len(), "custom_".len() + 8);
    assert_eq!(created["property"]["source"], "user_custom");
    assert_eq!(created["property"]["condition"], "fair");
    assert_eq!(created["property"]["city"], "Test City");

    // Duplicate
    let dup = handle(
        request(Method::POST, "/properties", &new_property.to_string()),
        &state,
    )
    .unwrap_err();
    assert_eq!(dup.status(), 400);

    // Read, with an encoded path segment and a different spelling
    let uri = "/properties/789%20test%20st%2C%20test%20city%2C%20ca%2090210";
    let found = body_json(handle(request(Method::GET, uri, ""), &state)?);
    assert_eq!(found["market_value"], 850_000);
    assert_eq!(found["served_by"], "primary_store");

    // Update
    let resp = handle(
        request(Method::PUT, uri, &json!({"market_value": 875000}).to_string()),
        &state,
    )?;
    assert_eq!(body_json(resp)["property"]["market_value"], 875_000);

    // Listing and stats see it
    let listing = body_json(handle(request(Method::GET, "/properties?limit=10", ""), &state)?);
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["source"], "primary_store");

    let sources = body_json(handle(
        request(Method::GET, "/properties/stats/sources", ""),
        &state,
    )?);
    assert_eq!(sources["custom_properties"]["count"], 1);
    assert_eq!(sources["json_properties"]["count"], 0);

    // Delete
    let resp = handle(request(Method::DELETE, uri, ""), &state)?;
    assert_eq!(resp.status(), 200);
    assert_eq!(handle(request(Method::GET, uri, ""), &state).unwrap_err().status(), 404);
    assert_eq!(handle(request(Method::DELETE, uri, ""), &state).unwrap_err().status(), 404);
    Ok(())
}

#[test]
fn create_without_address_is_rejected() {
    let state = connected_state("noaddr", vec![]);
    let err = handle(
        request(Method::POST, "/properties", &json!({"bedrooms": 3}).to_string()),
        &state,
    )
    .unwrap_err();
    assert_eq!(err.status(), 400);
}

#[test]
fn writes_need_the_primary_store() {
    let state = test_state(unreachable_store(), vec![listed("1 A St", 100_000)]);

    let post = handle(
        request(Method::POST, "/properties", &json!({"address": "2 B St"}).to_string()),
        &state,
    )
    .unwrap_err();
    assert_eq!(post.status(), 503);

    let put = handle(request(Method::PUT, "/properties/1%20A%20St", "{}"), &state).unwrap_err();
    assert_eq!(put.status(), 503);

    let delete = handle(request(Method::DELETE, "/properties/1%20A%20St", ""), &state).unwrap_err();
    assert_eq!(delete.status(), 503);
}

#[test]
fn reads_fall_back_to_dataset_files() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state(
        unreachable_store(),
        vec![listed("1 A St, Austin, TX", 100_000), listed("2 B St, Dallas, TX", 300_000)],
    );

    let one = body_json(handle(request(Method::GET, "/properties/1%20A%20Street%2C%20Austin%2C%20TX", ""), &state)?);
    assert_eq!(one["served_by"], "json_files");
    assert_eq!(one["market_value"], 100_000);

    let listing = body_json(handle(request(Method::GET, "/properties", ""), &state)?);
    assert_eq!(listing["source"], "json_files");
    assert_eq!(listing["count"], 2);

    let summary = body_json(handle(
        request(Method::GET, "/properties/stats/summary", ""),
        &state,
    )?);
    assert_eq!(summary["total_properties"], 2);
    assert_eq!(summary["average_market_value"], 200_000.0);
    assert_eq!(summary["source"], "json_files");

    let sources = body_json(handle(
        request(Method::GET, "/properties/stats/sources", ""),
        &state,
    )?);
    assert_eq!(sources["data_source"], "json_files");
    assert_eq!(sources["custom_properties"]["count"], 0);

    let missing = handle(request(Method::GET, "/properties/9%20Z%20St", ""), &state).unwrap_err();
    assert_eq!(missing.status(), 404);
    Ok(())
}

#[test]
fn no_data_source_is_503() {
    let state = test_state(unreachable_store(), vec![]);
    for uri in ["/properties", "/properties/search?query=x", "/properties/stats/summary"] {
        let err = handle(request(Method::GET, uri, ""), &state).unwrap_err();
        assert_eq!(err.status(), 503, "{uri}");
    }
}

#[test]
fn search_applies_first_filter_only() -> Result<(), Box<dyn std::error::Error>> {
    let state = connected_state("search", vec![]);
    for (address, ptype, value) in [
        ("1 Oak Ave, Austin, TX", "SFH", 400_000),
        ("2 Oak Ave, Dallas, TX", "Condo", 250_000),
        ("3 Pine Rd, Austin, TX", "Condo", 150_000),
    ] {
        let body = json!({"address": address, "property_type": ptype, "market_value": value});
        handle(request(Method::POST, "/properties", &body.to_string()), &state)?;
    }

    let search = |uri: &str| -> serde_json::Value {
        body_json(handle(request(Method::GET, uri, ""), &state).unwrap())
    };

    assert_eq!(search("/properties/search?query=oak+austin")["count"], 1);
    // Text query wins over the type filter.
    assert_eq!(search("/properties/search?query=oak&property_type=SFH")["count"], 2);
    assert_eq!(search("/properties/search?property_type=condo")["count"], 2);
    assert_eq!(search("/properties/search?min_price=200000&max_price=300000")["count"], 1);
    assert_eq!(search("/properties/search?limit=2")["count"], 2);

    let bad = handle(request(Method::GET, "/properties/search?limit=abc", ""), &state).unwrap_err();
    assert_eq!(bad.status(), 400);
    Ok(())
}

#[test]
fn export_returns_a_workbook() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state(unreachable_store(), vec![listed("1 A St", 100_000)]);
    let resp = handle(request(Method::GET, "/properties/export.xlsx", ""), &state)?;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("Content-Type").and_then(|v| v.to_str().ok()),
        Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
    );
    Ok(())
}
