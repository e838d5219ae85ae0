use crate::catalog::Catalog;
use crate::db::PropertyStore;
use crate::domain::estimate::{HeuristicEstimator, PriceEstimator};
use crate::domain::property::{PropertyRecord, PropertyType, RecordSource};
use crate::state::AppState;
use astra::{Body, Request, Response};
use http::Method;
use serde_json::Value;
use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

/// Fresh SQLite file under the temp dir.
pub fn temp_db_path(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "router_{tag}_{}.sqlite",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

/// A store whose directory does not exist, so it never connects.
pub fn unreachable_store() -> PropertyStore {
    PropertyStore::connect("/nonexistent-dir/router-tests/props.sqlite")
}

pub fn listed(address: &str, value: i64) -> PropertyRecord {
    PropertyRecord {
        address: address.into(),
        property_type: PropertyType::Condo,
        building_area: 1200,
        bedrooms: 2,
        bathrooms: 2,
        market_value: Some(value),
        source: RecordSource::JsonFile,
        ..Default::default()
    }
}

/// App state with the heuristic estimator pinned to 2024 and no charts.
pub fn test_state(store: PropertyStore, catalog: Vec<PropertyRecord>) -> AppState {
    AppState::new(
        store,
        Catalog::new(catalog),
        PriceEstimator::heuristic(HeuristicEstimator::new(2024)),
        None,
        false,
    )
}

pub fn connected_state(tag: &str, catalog: Vec<PropertyRecord>) -> AppState {
    let store = PropertyStore::connect(temp_db_path(tag));
    assert!(store.is_connected());
    test_state(store, catalog)
}

pub fn request(method: Method, uri: &str, body: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn body_json(resp: Response) -> Value {
    let mut body = String::new();
    resp.into_body().reader().read_to_string(&mut body).unwrap();
    serde_json::from_str(&body).unwrap()
}
