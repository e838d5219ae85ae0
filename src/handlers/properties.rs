use super::parse_json;
use crate::domain::property::{Money, PropertyRecord, PropertyType, RecordSource};
use crate::errors::ServerError;
use crate::resolver::DataSource;
use crate::responses::{json_response, ResultResp};
use crate::spreadsheets::export_properties_xlsx;
use crate::state::AppState;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::str::FromStr;

const DEFAULT_LIMIT: usize = 50;
const MAX_PRICE: Money = 999_999_999;

#[derive(Serialize)]
struct Found<'a> {
    #[serde(flatten)]
    record: &'a PropertyRecord,
    served_by: DataSource,
}

#[derive(Serialize)]
struct Listing<'a> {
    properties: &'a [PropertyRecord],
    count: usize,
    source: DataSource,
}

fn no_source() -> ServerError {
    ServerError::Unavailable("No property data source available".into())
}

pub fn list(state: &AppState, query: &HashMap<String, String>) -> ResultResp {
    let limit = param(query, "limit", DEFAULT_LIMIT)?;

    let (properties, source) = from_store_or_catalog(
        state,
        |store| store.get_all_properties(limit),
        |catalog| catalog.all(limit),
    )?;

    json_response(
        200,
        &Listing {
            count: properties.len(),
            properties: &properties,
            source,
        },
    )
}

/// Filters are exclusive: text query, then property type, then price range.
pub fn search(state: &AppState, query: &HashMap<String, String>) -> ResultResp {
    let text = query.get("query").map(|s| s.trim()).unwrap_or("").to_string();
    let type_filter = query
        .get("property_type")
        .map(|s| s.trim())
        .unwrap_or("")
        .to_string();
    let min_price: Money = param(query, "min_price", 0)?;
    let max_price: Money = param(query, "max_price", MAX_PRICE)?;
    let limit = param(query, "limit", DEFAULT_LIMIT)?;
    let price_filtered = min_price > 0 || max_price < MAX_PRICE;

    let (mut properties, source) = from_store_or_catalog(
        state,
        |store| {
            if !text.is_empty() {
                store.search_properties(&text, limit)
            } else if !type_filter.is_empty() {
                store.get_properties_by_type(PropertyType::parse_loose(&type_filter), limit)
            } else if price_filtered {
                store.get_properties_by_price_range(min_price, max_price, limit)
            } else {
                store.get_all_properties(limit)
            }
        },
        |catalog| {
            if !text.is_empty() {
                catalog.search(&text)
            } else if !type_filter.is_empty() {
                catalog.by_type(PropertyType::parse_loose(&type_filter))
            } else if price_filtered {
                catalog.by_price_range(min_price, max_price)
            } else {
                catalog.all(limit)
            }
        },
    )?;
    properties.truncate(limit);

    json_response(
        200,
        &json!({
            "properties": properties,
            "count": properties.len(),
            "query": text,
            "source": source,
            "filters": {
                "property_type": type_filter,
                "min_price": min_price,
                "max_price": max_price,
            },
        }),
    )
}

pub fn get(state: &AppState, address: &str) -> ResultResp {
    if state.store.is_connected() {
        match state.store.get_property_by_address(address) {
            Ok(Some(record)) => {
                return json_response(
                    200,
                    &Found {
                        record: &record,
                        served_by: DataSource::PrimaryStore,
                    },
                )
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(address, error = %e, "store lookup failed"),
        }
    }

    match state.catalog.get_by_address(address) {
        Some(record) => json_response(
            200,
            &Found {
                record,
                served_by: DataSource::JsonFiles,
            },
        ),
        None => Err(ServerError::NotFound("Property not found".into())),
    }
}

pub fn create(state: &AppState, body: &[u8]) -> ResultResp {
    if !state.store.is_connected() {
        return Err(ServerError::Unavailable(
            "Primary store not available. Cannot add custom properties.".into(),
        ));
    }

    let mut record: PropertyRecord = parse_json(body)?;
    record.source = RecordSource::UserCustom;
    if record.id.as_deref().map_or(true, str::is_empty) {
        record.id = Some(format!("custom_{:08x}", rand::random::<u32>()));
    }

    let saved = state.store.add_property(record)?;

    json_response(
        200,
        &json!({
            "message": "Custom property added successfully",
            "address": saved.address,
            "id": saved.id,
            "property": saved,
        }),
    )
}

pub fn update(state: &AppState, address: &str, body: &[u8]) -> ResultResp {
    let patch: Map<String, Value> = parse_json(body)?;
    let updated = state.store.update_property(address, &patch)?;

    json_response(
        200,
        &json!({
            "message": "Property updated successfully",
            "address": updated.address,
            "property": updated,
        }),
    )
}

pub fn delete(state: &AppState, address: &str) -> ResultResp {
    state.store.delete_property(address)?;
    json_response(
        200,
        &json!({ "message": "Property deleted successfully", "address": address }),
    )
}

pub fn stats_summary(state: &AppState) -> ResultResp {
    let (stats, source) = from_store_or_catalog(
        state,
        |store| store.stats(),
        |catalog| catalog.stats(),
    )?;

    let mut body = serde_json::to_value(&stats)
        .map_err(|e| ServerError::Internal(format!("Failed to encode stats: {e}")))?;
    if let Value::Object(map) = &mut body {
        map.insert("source".into(), json!(source));
    }
    json_response(200, &body)
}

pub fn stats_sources(state: &AppState) -> ResultResp {
    if state.store.is_connected() {
        match state.store.source_breakdown() {
            Ok(b) => {
                return json_response(
                    200,
                    &json!({
                        "total_properties": b.total_properties,
                        "json_properties": {
                            "count": b.json_file,
                            "source": "Loaded from JSON files",
                            "editable": false,
                        },
                        "custom_properties": {
                            "count": b.user_custom,
                            "source": "Added by users",
                            "editable": true,
                        },
                        "other_properties": b.other,
                        "data_source": DataSource::PrimaryStore,
                    }),
                )
            }
            Err(e) => tracing::warn!(error = %e, "source breakdown failed, using dataset files"),
        }
    }

    if state.catalog.is_empty() {
        return Err(no_source());
    }

    let count = state.catalog.len();
    json_response(
        200,
        &json!({
            "total_properties": count,
            "json_properties": {
                "count": count,
                "source": "JSON files only",
                "editable": false,
            },
            "custom_properties": {
                "count": 0,
                "source": "Not available (primary store not connected)",
                "editable": false,
            },
            "other_properties": 0,
            "data_source": DataSource::JsonFiles,
        }),
    )
}

pub fn export_xlsx(state: &AppState) -> ResultResp {
    let (properties, _) = from_store_or_catalog(
        state,
        |store| store.get_all_properties(usize::MAX),
        |catalog| catalog.records().to_vec(),
    )?;
    export_properties_xlsx(&properties)
}

/// Ask the store first; on a disconnected store or a store error fall back
/// to the dataset catalog. Neither available is `Unavailable`.
fn from_store_or_catalog<T>(
    state: &AppState,
    from_store: impl FnOnce(&crate::db::PropertyStore) -> Result<T, ServerError>,
    from_catalog: impl FnOnce(&crate::catalog::Catalog) -> T,
) -> Result<(T, DataSource), ServerError> {
    if state.store.is_connected() {
        match from_store(&state.store) {
            Ok(value) => return Ok((value, DataSource::PrimaryStore)),
            Err(e) => tracing::warn!(error = %e, "store query failed, using dataset files"),
        }
    }

    if state.catalog.is_empty() {
        return Err(no_source());
    }
    Ok((from_catalog(&state.catalog), DataSource::JsonFiles))
}

fn param<T: FromStr>(query: &HashMap<String, String>, key: &str, default: T) -> Result<T, ServerError> {
    match query.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ServerError::BadRequest(format!("Invalid value for '{key}': {raw}"))),
    }
}
