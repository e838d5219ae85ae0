// src/domain/standardize.rs

use crate::domain::property::{Condition, Money, PropertyRecord, PropertyType, RecordSource};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StandardizeError {
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Illustrative photos rotated across properties by address hash.
pub const PROPERTY_IMAGES: &[&str] = &[
    "https://images.pexels.com/photos/106399/pexels-photo-106399.jpeg",
    "https://images.pexels.com/photos/259588/pexels-photo-259588.jpeg",
    "https://images.pexels.com/photos/323780/pexels-photo-323780.jpeg",
    "https://images.pexels.com/photos/271624/pexels-photo-271624.jpeg",
    "https://images.pexels.com/photos/534151/pexels-photo-534151.jpeg",
    "https://images.pexels.com/photos/1396122/pexels-photo-1396122.jpeg",
    "https://images.pexels.com/photos/1571460/pexels-photo-1571460.jpeg",
    "https://images.pexels.com/photos/1918291/pexels-photo-1918291.jpeg",
    "https://images.pexels.com/photos/2079246/pexels-photo-2079246.jpeg",
    "https://images.pexels.com/photos/2121121/pexels-photo-2121121.jpeg",
    "https://images.pexels.com/photos/2635038/pexels-photo-2635038.jpeg",
    "https://images.pexels.com/photos/3075998/pexels-photo-3075998.jpeg",
    "https://images.pexels.com/photos/3288103/pexels-photo-3288103.jpeg",
    "https://images.pexels.com/photos/4050290/pexels-photo-4050290.jpeg",
    "https://images.pexels.com/photos/4172933/pexels-photo-4172933.jpeg",
    "https://images.pexels.com/photos/5824904/pexels-photo-5824904.jpeg",
    "https://images.pexels.com/photos/6186078/pexels-photo-6186078.jpeg",
    "https://images.pexels.com/photos/6782351/pexels-photo-6782351.jpeg",
    "https://images.pexels.com/photos/7031728/pexels-photo-7031728.jpeg",
    "https://images.pexels.com/photos/7578945/pexels-photo-7578945.jpeg",
    "https://images.pexels.com/photos/8031905/pexels-photo-8031905.jpeg",
    "https://images.pexels.com/photos/8293778/pexels-photo-8293778.jpeg",
    "https://images.pexels.com/photos/9146734/pexels-photo-9146734.jpeg",
    "https://images.pexels.com/photos/10129666/pexels-photo-10129666.jpeg",
];

/// (keywords, canonical tag). First matching rule wins.
const AMENITY_RULES: &[(&[&str], &str)] = &[
    (&["pool"], "pool"),
    (&["garage", "parking"], "garage"),
    (&["kitchen"], "updated_kitchen"),
    (&["hardwood"], "hardwood_floors"),
    (&["fireplace"], "fireplace"),
    (&["deck", "balcony"], "deck"),
];

const NEIGHBORHOOD_RULES: &[(&[&str], &str)] = &[
    (&["school"], "good_schools"),
    (&["park"], "near_park"),
    (&["shopping"], "shopping_center"),
    (&["transportation", "metro"], "public_transport"),
];

/// Stable 64-bit digest of a string (first 8 bytes of SHA-256).
pub fn stable_hash(s: &str) -> u64 {
    let digest = Sha256::digest(s.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Same address always maps to the same photo, across runs and processes.
pub fn image_for_address(address: &str) -> &'static str {
    let idx = (stable_hash(address) % PROPERTY_IMAGES.len() as u64) as usize;
    PROPERTY_IMAGES[idx]
}

pub fn classify_amenity(feature: &str) -> String {
    classify(feature, AMENITY_RULES).unwrap_or_else(|| slug(feature))
}

pub fn classify_neighborhood(amenity: &str) -> String {
    classify(amenity, NEIGHBORHOOD_RULES).unwrap_or_else(|| {
        // "Hospital - 1.2 miles" -> "hospital"
        let head = amenity.split(" - ").next().unwrap_or(amenity);
        slug(head)
    })
}

fn classify(text: &str, rules: &[(&[&str], &str)]) -> Option<String> {
    let lower = text.to_lowercase();
    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, tag)| tag.to_string())
}

fn slug(text: &str) -> String {
    text.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Convert a raw property document with loosely named fields into the
/// canonical record.
pub fn standardize(raw: &Value) -> Result<PropertyRecord, StandardizeError> {
    let obj = raw.as_object().ok_or_else(|| StandardizeError::NotAnObject(kind(raw)))?;

    let address = str_field(obj, &["address"]).unwrap_or_default();
    let property_type = str_field(obj, &["property_type"])
        .map(|t| PropertyType::parse_loose(&t))
        .unwrap_or_default();

    let lot_area = u32_field(obj, &["lot_area", "lot_size"]).unwrap_or(0);
    let building_area = u32_field(obj, &["building_area", "square_footage"]).unwrap_or(0);
    let square_footage = if building_area > 0 { building_area } else { lot_area };

    let mut amenities = BTreeSet::new();
    for feature in str_list(obj, "features")
        .into_iter()
        .chain(str_list(obj, "amenities"))
    {
        amenities.insert(classify_amenity(&feature));
    }

    let mut neighborhood_features = BTreeSet::new();
    for amenity in str_list(obj, "nearby_amenities")
        .into_iter()
        .chain(str_list(obj, "neighborhood_features"))
    {
        neighborhood_features.insert(classify_neighborhood(&amenity));
    }

    let garage = u32_field(obj, &["garage"]).unwrap_or(0);
    let has_pool = bool_field(obj, "has_pool") || amenities.contains("pool");
    let has_garage = bool_field(obj, "has_garage") || garage > 0 || amenities.contains("garage");

    let condition = str_field(obj, &["condition"])
        .map(Condition::from)
        .unwrap_or(Condition::Good);

    let source = match str_field(obj, &["source"]).as_deref() {
        Some("user_custom") => RecordSource::UserCustom,
        Some("synthetic") => RecordSource::Synthetic,
        _ => RecordSource::JsonFile,
    };

    let image_url = str_field(obj, &["image_url"])
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| image_for_address(&address).to_string());

    Ok(PropertyRecord {
        id: obj.get("id").and_then(id_string),
        title: str_field(obj, &["title"]),
        property_type,
        lot_area,
        building_area,
        square_footage,
        bedrooms: u32_field(obj, &["bedrooms"]).unwrap_or(0),
        bathrooms: u32_field(obj, &["bathrooms"]).unwrap_or(0),
        garage,
        year_built: i64_field(obj, &["year_built"]).map(|y| y as i32).unwrap_or(2000),
        has_pool,
        has_garage,
        school_rating: u32_field(obj, &["school_rating"])
            .map(|r| r.clamp(1, 10) as u8)
            .unwrap_or(5),
        condition,
        market_value: i64_field(obj, &["market_value"]).filter(|v| *v > 0),
        amenities,
        neighborhood_features,
        source,
        city: str_field(obj, &["city"]),
        state: str_field(obj, &["state"]),
        zip_code: str_field(obj, &["zip_code"]),
        neighborhood: str_field(obj, &["neighborhood"]),
        last_sold_price: i64_field(obj, &["last_sold_price"]),
        last_sold_date: str_field(obj, &["last_sold_date"]),
        property_tax: i64_field(obj, &["property_tax"]),
        hoa_fee: i64_field(obj, &["hoa_fee"]),
        image_url: Some(image_url),
        address,
        created_at: None,
        updated_at: None,
    })
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .next()
}

/// First key holding a non-zero number wins, so `building_area: 0` does not
/// hide a usable `square_footage`.
fn i64_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<Money> {
    let mut first = None;
    for k in keys {
        let value = obj.get(*k).and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().map(|f| f.round() as i64))
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        });
        match value {
            Some(n) if n != 0 => return Some(n),
            Some(n) => first = first.or(Some(n)),
            None => {}
        }
    }
    first
}

fn u32_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
    i64_field(obj, keys).map(|n| n.clamp(0, u32::MAX as i64) as u32)
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) > 0,
        _ => false,
    }
}

fn str_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_loose_fields_onto_canonical_schema() {
        let raw = json!({
            "address": "123 Main Street, San Francisco, CA",
            "property_type": "SFH",
            "lot_area": 6500,
            "bedrooms": 3,
            "bathrooms": 2,
            "year_built": 1998,
            "has_garage": true,
            "market_value": 1250000,
            "features": ["Swimming Pool", "Two-car Parking", "Walk-in Closet"],
            "nearby_amenities": ["Golden Gate Park - 0.4 miles", "Hospital - 1.2 miles"],
            "city": "San Francisco"
        });

        let rec = standardize(&raw).unwrap();
        assert_eq!(rec.property_type, PropertyType::Sfh);
        assert_eq!(rec.lot_area, 6500);
        assert_eq!(rec.square_footage, 6500);
        assert!(rec.has_pool);
        assert!(rec.has_garage);
        assert_eq!(rec.market_value, Some(1_250_000));
        assert_eq!(rec.city.as_deref(), Some("San Francisco"));

        let amenities: Vec<_> = rec.amenities.iter().map(String::as_str).collect();
        assert_eq!(amenities, vec!["garage", "pool", "walk_in_closet"]);

        let features: Vec<_> = rec.neighborhood_features.iter().map(String::as_str).collect();
        assert_eq!(features, vec!["hospital", "near_park"]);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let rec = standardize(&json!({"address": "1 Nowhere Rd"})).unwrap();
        assert_eq!(rec.bedrooms, 0);
        assert_eq!(rec.bathrooms, 0);
        assert_eq!(rec.year_built, 2000);
        assert_eq!(rec.market_value, None);
        assert_eq!(rec.condition, Condition::Good);
        assert_eq!(rec.source, RecordSource::JsonFile);
    }

    #[test]
    fn square_footage_prefers_nonzero_building_area() {
        let rec = standardize(&json!({
            "address": "2 Pier Ave",
            "property_type": "Condo",
            "building_area": 0,
            "square_footage": 1400
        }))
        .unwrap();
        assert_eq!(rec.property_type, PropertyType::Condo);
        assert_eq!(rec.building_area, 1400);
        assert_eq!(rec.square_footage, 1400);
    }

    #[test]
    fn neighborhood_keywords_are_classified() {
        assert_eq!(classify_neighborhood("Lincoln Elementary School"), "good_schools");
        assert_eq!(classify_neighborhood("Shopping center - 0.3 miles"), "shopping_center");
        assert_eq!(classify_neighborhood("Metro station"), "public_transport");
        assert_eq!(classify_neighborhood("Public transportation - 0.2 miles"), "public_transport");
    }

    #[test]
    fn amenity_keywords_are_classified() {
        assert_eq!(classify_amenity("Renovated Kitchen"), "updated_kitchen");
        assert_eq!(classify_amenity("Hardwood floors"), "hardwood_floors");
        assert_eq!(classify_amenity("Private balcony"), "deck");
        assert_eq!(classify_amenity("Wine-Cellar Room"), "wine_cellar_room");
    }

    #[test]
    fn image_assignment_is_deterministic() {
        let a = standardize(&json!({"address": "77 Sunset Blvd"})).unwrap();
        let b = standardize(&json!({"address": "77 Sunset Blvd", "bedrooms": 4})).unwrap();
        assert_eq!(a.image_url, b.image_url);
        assert_eq!(a.image_url.as_deref(), Some(image_for_address("77 Sunset Blvd")));
    }

    #[test]
    fn rejects_non_object_input() {
        assert!(standardize(&json!([1, 2, 3])).is_err());
    }
}
