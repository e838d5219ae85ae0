// src/catalog/import.rs

use super::Catalog;
use crate::db::PropertyStore;
use crate::domain::property::RecordSource;
use crate::errors::ServerError;

/// Copy every catalog record the store does not already hold, tagged as
/// coming from the dataset files. Returns how many were inserted.
pub fn import_catalog(store: &PropertyStore, catalog: &Catalog) -> Result<usize, ServerError> {
    let mut inserted = 0;

    for record in catalog.records() {
        if store.get_property_by_address(&record.address)?.is_some() {
            continue;
        }

        let mut record = record.clone();
        record.source = RecordSource::JsonFile;

        match store.add_property(record) {
            Ok(_) => inserted += 1,
            // Two catalog files for the same normalized address.
            Err(ServerError::BadRequest(msg)) => {
                tracing::warn!(detail = %msg, "skipping catalog record");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(inserted)
}

/// Startup sync of the catalog into the store. Never fails the caller.
pub fn sync_catalog(store: &PropertyStore, catalog: &Catalog) {
    if !store.is_connected() {
        tracing::warn!("property store not connected, skipping dataset sync");
        return;
    }

    match import_catalog(store, catalog) {
        Ok(n) => {
            let total = store.count().unwrap_or(-1);
            tracing::info!(synced = n, total, "dataset properties synced to store");
        }
        Err(e) => tracing::error!(error = %e, "dataset sync failed"),
    }
}
