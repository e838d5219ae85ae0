// src/db/properties.rs
//
// Address-keyed document store for canonical property records.

use crate::db::connection::{init_db, Database};
use crate::domain::address::{normalize, parse_address};
use crate::domain::property::{Money, PropertyRecord, PropertyType};
use crate::domain::stats::{round2, PropertyStats, SourceBreakdown};
use crate::errors::ServerError;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use serde_json::{Map, Value};
use std::path::PathBuf;

const SELECT_DOCUMENT: &str = "SELECT document FROM properties";
const ORDER_BY: &str = "ORDER BY created_at, address";

/// Handle to the primary store. Connectivity is decided once at startup; a
/// store that failed to connect stays disconnected for the process lifetime
/// and every operation reports `Unavailable`.
#[derive(Clone, Debug)]
pub struct PropertyStore {
    db: Option<Database>,
}

impl PropertyStore {
    /// Open the database and apply the schema. Never fails: errors are
    /// logged and produce a disconnected store.
    pub fn connect(path: impl Into<PathBuf>) -> Self {
        let db = Database::new(path);
        match init_db(&db) {
            Ok(()) => {
                tracing::info!(path = %db.path().display(), "connected to property store");
                Self { db: Some(db) }
            }
            Err(e) => {
                tracing::error!(
                    path = %db.path().display(),
                    error = %e,
                    "property store unavailable, falling back to dataset files"
                );
                Self { db: None }
            }
        }
    }

    pub fn disconnected() -> Self {
        Self { db: None }
    }

    pub fn is_connected(&self) -> bool {
        self.db.is_some()
    }

    fn db(&self) -> Result<&Database, ServerError> {
        self.db
            .as_ref()
            .ok_or_else(|| ServerError::Unavailable("primary property store is not connected".into()))
    }

    /// Insert a new record. Fills address components when the caller left
    /// them empty and stamps creation time.
    pub fn add_property(&self, mut record: PropertyRecord) -> Result<PropertyRecord, ServerError> {
        let db = self.db()?;

        record.address = record.address.trim().to_string();
        if record.address.is_empty() {
            return Err(ServerError::BadRequest("address is required".into()));
        }

        let parts = parse_address(&record.address);
        fill_if_empty(&mut record.city, parts.city);
        fill_if_empty(&mut record.state, parts.state);
        fill_if_empty(&mut record.zip_code, parts.zip_code);

        record.school_rating = clamp_school_rating(record.school_rating);

        let now = Utc::now();
        record.created_at = Some(now);
        record.updated_at = Some(now);

        db.with_conn(|conn| {
            insert_record(conn, &record).map_err(|e| {
                if is_constraint_violation(&e) {
                    ServerError::BadRequest(format!("property already exists: {}", record.address))
                } else {
                    ServerError::from(e)
                }
            })
        })?;

        tracing::info!(address = %record.address, source = record.source.as_str(), "property added");
        Ok(record)
    }

    pub fn get_property_by_address(
        &self,
        address: &str,
    ) -> Result<Option<PropertyRecord>, ServerError> {
        let key = normalize(address);
        self.db()?.with_conn(|conn| find_by_key(conn, &key))
    }

    /// Every whitespace-separated token of `query` must appear (case
    /// insensitive) in the address, city, state or neighborhood. An empty
    /// query lists everything.
    pub fn search_properties(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PropertyRecord>, ServerError> {
        let tokens: Vec<String> = query
            .split_whitespace()
            .map(|t| format!("%{}%", escape_like(&t.to_lowercase())))
            .collect();

        let clauses: Vec<String> = (1..=tokens.len())
            .map(|i| {
                format!(
                    "(lower(address) LIKE ?{i} ESCAPE '\\' \
                     OR lower(coalesce(city, '')) LIKE ?{i} ESCAPE '\\' \
                     OR lower(coalesce(state, '')) LIKE ?{i} ESCAPE '\\' \
                     OR lower(coalesce(neighborhood, '')) LIKE ?{i} ESCAPE '\\')"
                )
            })
            .collect();

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "{SELECT_DOCUMENT} {where_sql} {ORDER_BY} LIMIT {}",
            limit_param(limit)
        );

        self.db()?
            .with_conn(|conn| query_documents(conn, &sql, params_from_iter(tokens.iter())))
    }

    pub fn get_all_properties(&self, limit: usize) -> Result<Vec<PropertyRecord>, ServerError> {
        self.search_properties("", limit)
    }

    pub fn get_properties_by_type(
        &self,
        property_type: PropertyType,
        limit: usize,
    ) -> Result<Vec<PropertyRecord>, ServerError> {
        let sql = format!(
            "{SELECT_DOCUMENT} WHERE property_type = ?1 {ORDER_BY} LIMIT {}",
            limit_param(limit)
        );
        self.db()?
            .with_conn(|conn| query_documents(conn, &sql, params![property_type.as_str()]))
    }

    pub fn get_properties_by_price_range(
        &self,
        min_price: Money,
        max_price: Money,
        limit: usize,
    ) -> Result<Vec<PropertyRecord>, ServerError> {
        let sql = format!(
            "{SELECT_DOCUMENT} WHERE market_value BETWEEN ?1 AND ?2 {ORDER_BY} LIMIT {}",
            limit_param(limit)
        );
        self.db()?
            .with_conn(|conn| query_documents(conn, &sql, params![min_price, max_price]))
    }

    /// Merge top-level fields of `patch` into the stored document. The merged
    /// document must still be a valid record.
    pub fn update_property(
        &self,
        address: &str,
        patch: &Map<String, Value>,
    ) -> Result<PropertyRecord, ServerError> {
        let key = normalize(address);

        self.db()?.with_conn(|conn| {
            let existing = find_by_key(conn, &key)?
                .ok_or_else(|| ServerError::NotFound(format!("Property not found: {address}")))?;

            let mut doc = match serde_json::to_value(&existing) {
                Ok(Value::Object(map)) => map,
                Ok(_) => return Err(ServerError::Internal("record did not serialize to an object".into())),
                Err(e) => return Err(ServerError::Internal(e.to_string())),
            };
            for (field, value) in patch {
                let field = if field == "lot_size" { "lot_area" } else { field.as_str() };
                doc.insert(field.to_string(), value.clone());
            }

            let mut updated: PropertyRecord = serde_json::from_value(Value::Object(doc))
                .map_err(|e| ServerError::BadRequest(format!("invalid update: {e}")))?;
            if updated.address.trim().is_empty() {
                return Err(ServerError::BadRequest("address cannot be empty".into()));
            }
            updated.school_rating = clamp_school_rating(updated.school_rating);
            updated.created_at = existing.created_at;
            updated.updated_at = Some(Utc::now());

            let document = serde_json::to_string(&updated)
                .map_err(|e| ServerError::Internal(e.to_string()))?;

            conn.execute(
                r#"
                UPDATE properties SET
                    normalized_address = ?1, address = ?2, property_type = ?3, city = ?4,
                    state = ?5, zip_code = ?6, neighborhood = ?7, market_value = ?8,
                    source = ?9, document = ?10, updated_at = ?11
                WHERE normalized_address = ?12
                "#,
                params![
                    updated.normalized_address(),
                    &updated.address,
                    updated.property_type.as_str(),
                    &updated.city,
                    &updated.state,
                    &updated.zip_code,
                    &updated.neighborhood,
                    updated.market_value.unwrap_or(0),
                    updated.source.as_str(),
                    document,
                    updated.updated_at,
                    key,
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    ServerError::BadRequest(format!("property already exists: {}", updated.address))
                } else {
                    ServerError::from(e)
                }
            })?;

            tracing::info!(address = %updated.address, "property updated");
            Ok(updated)
        })
    }

    pub fn delete_property(&self, address: &str) -> Result<(), ServerError> {
        let key = normalize(address);
        let deleted = self.db()?.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM properties WHERE normalized_address = ?1", params![key])?)
        })?;

        if deleted == 0 {
            return Err(ServerError::NotFound(format!("Property not found: {address}")));
        }
        tracing::info!(address, "property deleted");
        Ok(())
    }

    pub fn count(&self) -> Result<i64, ServerError> {
        self.db()?.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM properties", [], |r| r.get(0))?)
        })
    }

    pub fn stats(&self) -> Result<PropertyStats, ServerError> {
        self.db()?.with_conn(|conn| {
            let (total, avg): (i64, Option<f64>) = conn.query_row(
                "SELECT COUNT(*), AVG(market_value) FROM properties",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?;

            let mut stmt = conn.prepare(
                "SELECT property_type, COUNT(*) FROM properties GROUP BY property_type",
            )?;
            let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;

            let mut stats = PropertyStats {
                total_properties: total,
                average_market_value: round2(avg.unwrap_or(0.0)),
                ..Default::default()
            };
            for row in rows {
                let (ptype, n) = row?;
                stats.property_types.insert(ptype, n);
            }
            Ok(stats)
        })
    }

    pub fn source_breakdown(&self) -> Result<SourceBreakdown, ServerError> {
        self.db()?.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT source, COUNT(*) FROM properties GROUP BY source")?;
            let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;

            let mut breakdown = SourceBreakdown::default();
            for row in rows {
                let (source, n) = row?;
                breakdown.total_properties += n;
                match source.as_str() {
                    "json_file" => breakdown.json_file += n,
                    "user_custom" => breakdown.user_custom += n,
                    _ => breakdown.other += n,
                }
            }
            Ok(breakdown)
        })
    }
}

fn insert_record(conn: &Connection, record: &PropertyRecord) -> rusqlite::Result<()> {
    // Serialization of a plain record cannot fail; surface it as a conversion error anyway.
    let document = serde_json::to_string(record)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    conn.execute(
        r#"
        INSERT INTO properties (
            normalized_address, address, property_type, city, state, zip_code,
            neighborhood, market_value, source, document, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            record.normalized_address(),
            &record.address,
            record.property_type.as_str(),
            &record.city,
            &record.state,
            &record.zip_code,
            &record.neighborhood,
            record.market_value.unwrap_or(0),
            record.source.as_str(),
            document,
            record.created_at,
            record.updated_at,
        ],
    )?;
    Ok(())
}

fn find_by_key(conn: &Connection, key: &str) -> Result<Option<PropertyRecord>, ServerError> {
    let document: Option<String> = conn
        .query_row(
            "SELECT document FROM properties WHERE normalized_address = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;

    document.map(|d| decode_document(&d)).transpose()
}

fn query_documents<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<PropertyRecord>, ServerError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(decode_document(&row?)?);
    }
    Ok(out)
}

fn decode_document(document: &str) -> Result<PropertyRecord, ServerError> {
    serde_json::from_str(document)
        .map_err(|e| ServerError::DbError(format!("corrupt property document: {e}")))
}

fn fill_if_empty(slot: &mut Option<String>, value: String) {
    let missing = slot.as_deref().map_or(true, |s| s.trim().is_empty());
    if missing && !value.is_empty() {
        *slot = Some(value);
    }
}

fn clamp_school_rating(rating: u8) -> u8 {
    rating.clamp(1, 10)
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::property::RecordSource;
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_store(tag: &str) -> PropertyStore {
        let path = std::env::temp_dir().join(format!(
            "store_{tag}_{}.sqlite",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let store = PropertyStore::connect(path);
        assert!(store.is_connected());
        store
    }

    fn sample(address: &str, ptype: PropertyType, value: Money) -> PropertyRecord {
        PropertyRecord {
            address: address.into(),
            property_type: ptype,
            market_value: Some(value),
            source: RecordSource::UserCustom,
            ..Default::default()
        }
    }

    #[test]
    fn add_then_get_is_case_and_whitespace_insensitive() {
        let store = temp_store("get");
        let added = store
            .add_property(sample("789 Test Street, Test City, CA 90210", PropertyType::Sfh, 850_000))
            .unwrap();
        assert_eq!(added.city.as_deref(), Some("Test City"));
        assert_eq!(added.state.as_deref(), Some("CA"));
        assert_eq!(added.zip_code.as_deref(), Some("90210"));

        let found = store
            .get_property_by_address("  789 test   st, test city, ca 90210")
            .unwrap()
            .expect("record should be found");
        assert_eq!(found.market_value, Some(850_000));
        assert!(found.created_at.is_some());
    }

    #[test]
    fn duplicate_address_is_rejected() {
        let store = temp_store("dup");
        store.add_property(sample("1 Elm St", PropertyType::Sfh, 1)).unwrap();
        let err = store
            .add_property(sample("1 ELM STREET", PropertyType::Sfh, 2))
            .unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)), "{err:?}");
    }

    #[test]
    fn search_requires_every_token() {
        let store = temp_store("search");
        store.add_property(sample("10 Oak Ave, Austin, TX", PropertyType::Sfh, 400_000)).unwrap();
        store.add_property(sample("20 Oak Ave, Dallas, TX", PropertyType::Condo, 300_000)).unwrap();
        store.add_property(sample("30 Pine Rd, Austin, TX", PropertyType::Condo, 200_000)).unwrap();

        assert_eq!(store.search_properties("oak", 50).unwrap().len(), 2);
        assert_eq!(store.search_properties("Oak austin", 50).unwrap().len(), 1);
        assert_eq!(store.search_properties("100%", 50).unwrap().len(), 0);
        assert_eq!(store.get_all_properties(2).unwrap().len(), 2);
        assert_eq!(store.get_properties_by_type(PropertyType::Condo, 50).unwrap().len(), 2);
        assert_eq!(
            store
                .get_properties_by_price_range(250_000, 450_000, 50)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn update_merges_fields_and_delete_removes() {
        let store = temp_store("update");
        store.add_property(sample("5 Lake Dr", PropertyType::Sfh, 500_000)).unwrap();

        let patch = json!({"market_value": 525000, "bedrooms": 4, "condition": "excellent"});
        let updated = store
            .update_property("5 lake drive", patch.as_object().unwrap())
            .unwrap();
        assert_eq!(updated.market_value, Some(525_000));
        assert_eq!(updated.bedrooms, 4);
        assert_eq!(updated.condition.as_str(), "excellent");

        let bad = json!({"bedrooms": "lots"});
        assert!(matches!(
            store.update_property("5 Lake Dr", bad.as_object().unwrap()),
            Err(ServerError::BadRequest(_))
        ));

        store.delete_property("5 Lake Dr").unwrap();
        assert!(store.get_property_by_address("5 Lake Dr").unwrap().is_none());
        assert!(matches!(
            store.delete_property("5 Lake Dr"),
            Err(ServerError::NotFound(_))
        ));
    }

    #[test]
    fn update_accepts_lot_size_alias() {
        let store = temp_store("lotsize");
        let mut record = sample("5 Lake Dr", PropertyType::Sfh, 500_000);
        record.lot_area = 4000;
        store.add_property(record).unwrap();

        let patch = json!({"lot_size": 6000});
        let updated = store
            .update_property("5 Lake Dr", patch.as_object().unwrap())
            .unwrap();
        assert_eq!(updated.lot_area, 6000);
        assert_eq!(
            store.get_property_by_address("5 Lake Dr").unwrap().unwrap().lot_area,
            6000
        );
    }

    #[test]
    fn school_rating_is_kept_within_one_to_ten() {
        let store = temp_store("school");
        let mut record = sample("9 Hill Rd", PropertyType::Sfh, 400_000);
        record.school_rating = 0;
        assert_eq!(store.add_property(record).unwrap().school_rating, 1);

        let patch = json!({"school_rating": 42});
        let updated = store
            .update_property("9 Hill Rd", patch.as_object().unwrap())
            .unwrap();
        assert_eq!(updated.school_rating, 10);
    }

    #[test]
    fn update_of_missing_property_is_not_found() {
        let store = temp_store("missing");
        let patch = Map::new();
        assert!(matches!(
            store.update_property("nowhere", &patch),
            Err(ServerError::NotFound(_))
        ));
    }

    #[test]
    fn stats_and_source_breakdown() {
        let store = temp_store("stats");
        store.add_property(sample("1 A St", PropertyType::Sfh, 300_000)).unwrap();
        store.add_property(sample("2 B St", PropertyType::Condo, 200_000)).unwrap();
        let mut from_file = sample("3 C St", PropertyType::Condo, 100_000);
        from_file.source = RecordSource::JsonFile;
        store.add_property(from_file).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_properties, 3);
        assert_eq!(stats.property_types.get("Condo"), Some(&2));
        assert_eq!(stats.average_market_value, 200_000.0);

        let sources = store.source_breakdown().unwrap();
        assert_eq!(sources.total_properties, 3);
        assert_eq!(sources.json_file, 1);
        assert_eq!(sources.user_custom, 2);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn disconnected_store_reports_unavailable() {
        let store = PropertyStore::connect("/nonexistent-dir/for/tests/props.sqlite");
        assert!(!store.is_connected());
        assert!(matches!(
            store.add_property(sample("1 A St", PropertyType::Sfh, 1)),
            Err(ServerError::Unavailable(_))
        ));
        assert!(matches!(
            store.get_property_by_address("1 A St"),
            Err(ServerError::Unavailable(_))
        ));
    }
}
