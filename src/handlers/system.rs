use crate::responses::{json_response, ResultResp};
use crate::state::AppState;
use serde_json::json;

pub fn banner() -> ResultResp {
    json_response(200, &json!({ "message": "Property Comparison API is running!" }))
}

pub fn health(state: &AppState) -> ResultResp {
    let connected = state.store.is_connected();
    let stored = if connected {
        state.store.count().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not count stored properties");
            0
        })
    } else {
        0
    };

    json_response(
        200,
        &json!({
            "status": "healthy",
            "model_loaded": state.comparator.estimator().model_loaded(),
            "data_sources": {
                "primary_store": {
                    "connected": connected,
                    "properties_stored": stored,
                },
                "json_files": {
                    "available": !state.catalog.is_empty(),
                    "properties_loaded": state.catalog.len(),
                },
            },
            "primary_data_source": state.primary_source(),
        }),
    )
}
