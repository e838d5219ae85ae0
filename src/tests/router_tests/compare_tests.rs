// src/tests/router_tests/compare_tests.rs
use crate::router::handle;
use crate::tests::utils::{body_json, connected_state, listed, request, test_state, unreachable_store};
use http::Method;
use serde_json::json;

#[test]
fn compare_requires_both_addresses() {
    let state = test_state(unreachable_store(), vec![]);

    for body in [
        json!({"address1": "1 Elm St", "address2": ""}),
        json!({"address1": "   ", "address2": "2 Oak Ave"}),
        json!({}),
    ] {
        let req = request(Method::POST, "/compare-properties", &body.to_string());
        let err = handle(req, &state).unwrap_err();
        assert_eq!(err.status(), 400);
    }
}

#[test]
fn compare_rejects_malformed_json() {
    let state = test_state(unreachable_store(), vec![]);
    let req = request(Method::POST, "/compare-properties", "{address1:");
    assert_eq!(handle(req, &state).unwrap_err().status(), 400);
}

#[test]
fn compare_response_shape() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state(
        unreachable_store(),
        vec![listed("10 Lake View Dr", 600_000), listed("20 Hill Rd", 400_000)],
    );

    let body = json!({"address1": "10 Lake View Drive", "address2": "20 Hill Road"});
    let resp = handle(
        request(Method::POST, "/compare-properties", &body.to_string()),
        &state,
    )?;
    assert_eq!(resp.status(), 200);

    let v = body_json(resp);
    assert_eq!(v["property1"]["display_price"], 600_000);
    assert_eq!(v["property1"]["market_value"], 600_000);
    assert_eq!(v["property1"]["served_by"], "json_files");
    assert_eq!(v["price_difference"], 200_000);
    assert_eq!(v["percentage_difference"], 50.0);
    assert_eq!(v["higher_priced"], "10 Lake View Drive");
    assert_eq!(v["comparison_summary"]["price_difference_formatted"], "$200,000");
    assert_eq!(v["comparison_summary"]["percentage_difference_formatted"], "50.0%");
    assert_eq!(v["comparison_summary"]["lower_property"], "20 Hill Road");
    assert_eq!(v["chart"], serde_json::Value::Null);
    assert_eq!(v["chart_available"], false);
    Ok(())
}

#[test]
fn compare_with_store_down_uses_dataset_then_synthetic() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state(unreachable_store(), vec![listed("5 Known St", 500_000)]);

    let body = json!({"address1": "5 Known St", "address2": "6 Unknown St"});
    let v = body_json(handle(
        request(Method::POST, "/compare-properties", &body.to_string()),
        &state,
    )?);

    assert_eq!(v["property1"]["served_by"], "json_files");
    assert_eq!(v["property2"]["served_by"], "synthetic");
    assert_eq!(v["property2"]["source"], "synthetic");
    assert_eq!(v["property2"]["market_value"], serde_json::Value::Null);
    assert_eq!(v["property2"]["display_price"], v["property2"]["predicted_price"]);
    Ok(())
}

#[test]
fn synthetic_properties_are_persisted_only_on_request() -> Result<(), Box<dyn std::error::Error>> {
    let state = connected_state("persist", vec![]);

    let plain = json!({"address1": "1 Nowhere Ln", "address2": "2 Nowhere Ln"});
    handle(request(Method::POST, "/compare-properties", &plain.to_string()), &state)?;
    assert_eq!(state.store.count()?, 0);

    let persist = json!({
        "address1": "1 Nowhere Ln",
        "address2": "2 Nowhere Ln",
        "persist_synthetic": true
    });
    let first = body_json(handle(
        request(Method::POST, "/compare-properties", &persist.to_string()),
        &state,
    )?);
    assert_eq!(state.store.count()?, 2);

    let again = body_json(handle(
        request(Method::POST, "/compare-properties", &plain.to_string()),
        &state,
    )?);
    assert_eq!(again["property1"]["served_by"], "primary_store");
    assert_eq!(
        again["property1"]["predicted_price"],
        first["property1"]["predicted_price"]
    );
    Ok(())
}
