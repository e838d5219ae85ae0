// src/catalog/convert.rs
//
// Merges the three raw exports (`JSON 1.txt` listings, `JSON 2.txt` details,
// `JSON 3.txt` images) into one property file per listing plus an index.
// Every generated default comes from an RNG seeded by the listing id, so a
// rerun over the same inputs produces the same files.

use super::{read_json, write_json, CatalogError, IndexEntry, PropertyIndex, INDEX_FILE, PROPERTIES_DIR};
use crate::domain::property::{format_thousands, Money};
use crate::domain::standardize::stable_hash;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

pub const LISTINGS_FILE: &str = "JSON 1.txt";
pub const DETAILS_FILE: &str = "JSON 2.txt";
pub const IMAGES_FILE: &str = "JSON 3.txt";

const STREET_NAMES: &[&str] = &[
    "Main Street",
    "Oak Avenue",
    "Pine Road",
    "Elm Street",
    "Cedar Lane",
    "Maple Drive",
    "Park Avenue",
    "First Street",
    "Second Avenue",
    "Broadway",
];

const DEFAULT_AMENITIES: &[&str] = &["updated_kitchen", "air_conditioning", "hardwood_floors"];

const AMENITY_RULES: &[(&[&str], &str)] = &[
    (&["pool", "swimming"], "pool"),
    (&["gym", "fitness"], "fitness_center"),
    (&["garage", "parking"], "garage"),
    (&["garden", "backyard"], "garden"),
    (&["smart"], "smart_home"),
    (&["security"], "security_system"),
    (&["terrace", "balcony"], "balcony"),
    (&["dock"], "private_dock"),
];

const CITY_FEATURES: &[(&str, &[&str])] = &[
    ("New York", &["subway_access", "restaurants", "shopping", "museums"]),
    ("San Francisco", &["tech_hub", "public_transport", "parks", "restaurants"]),
    ("Los Angeles", &["entertainment_district", "beaches", "highways", "dining"]),
    ("Miami", &["beach_access", "nightlife", "international_cuisine", "boating"]),
    ("Austin", &["music_scene", "food_trucks", "tech_companies", "outdoor_activities"]),
    ("Chicago", &["lakefront", "architecture", "public_transport", "cultural_events"]),
    ("Dallas", &["business_district", "shopping_centers", "good_schools", "family_friendly"]),
    ("Seattle", &["tech_hub", "coffee_culture", "mountains", "waterfront"]),
    ("Boston", &["historic_district", "universities", "walkable", "public_transport"]),
];

const DEFAULT_CITY_FEATURES: &[&str] = &["good_schools", "quiet_neighborhood", "family_friendly"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertSummary {
    pub processed: usize,
    pub files_written: usize,
    pub single_family: usize,
    pub condos: usize,
    pub average_price: Money,
}

/// Merge the raw exports under `dataset_dir` into `dataset_dir/properties`.
/// `today` anchors the generated last-sold dates.
pub fn convert_dataset(dataset_dir: &Path, today: NaiveDate) -> Result<ConvertSummary, CatalogError> {
    let listings = read_array(&dataset_dir.join(LISTINGS_FILE))?;
    if listings.is_empty() {
        return Err(CatalogError::Invalid(format!("{LISTINGS_FILE} has no listings")));
    }
    let details = read_optional_array(&dataset_dir.join(DETAILS_FILE));
    let images = read_optional_array(&dataset_dir.join(IMAGES_FILE));

    tracing::info!(
        listings = listings.len(),
        details = details.len(),
        images = images.len(),
        "converting raw dataset"
    );

    let out_dir = dataset_dir.join(PROPERTIES_DIR);
    fs::create_dir_all(&out_dir).map_err(|source| CatalogError::Write {
        path: out_dir.clone(),
        source,
    })?;

    let mut summary = ConvertSummary::default();
    let mut index = Vec::with_capacity(listings.len());
    let mut total_price: Money = 0;

    for (i, listing) in listings.iter().enumerate() {
        let id = listing
            .get("id")
            .cloned()
            .unwrap_or_else(|| Value::from(i as u64 + 1));
        let detail = find_by_id(&details, &id);
        let image = find_by_id(&images, &id);

        let property = build_property(&id, listing, detail, image, today);
        let file_name = file_name_for(str_of(&property, "address"));

        match write_json(&out_dir.join(&file_name), &property) {
            Ok(()) => summary.files_written += 1,
            Err(e) => tracing::warn!(error = %e, "could not write property file"),
        }

        let price = property.get("market_value").and_then(Value::as_i64).unwrap_or(0);
        total_price = total_price.saturating_add(price);
        if str_of(&property, "property_type") == "SFH" {
            summary.single_family += 1;
        } else {
            summary.condos += 1;
        }

        index.push(IndexEntry {
            id,
            address: str_of(&property, "address").to_string(),
            property_type: str_of(&property, "property_type").to_string(),
            market_value: price,
            bedrooms: property.get("bedrooms").and_then(Value::as_u64).unwrap_or(0) as u32,
            bathrooms: property.get("bathrooms").and_then(Value::as_u64).unwrap_or(0) as u32,
            image_url: str_of(&property, "image_url").to_string(),
        });

        tracing::debug!(file = %file_name, price, "converted listing");
        summary.processed += 1;
    }

    summary.average_price = total_price / summary.processed as Money;

    PropertyIndex {
        total_properties: index.len(),
        properties: index,
        last_updated: chrono::Utc::now().to_rfc3339(),
    }
    .write(&dataset_dir.join(INDEX_FILE))?;

    tracing::info!(
        processed = summary.processed,
        written = summary.files_written,
        sfh = summary.single_family,
        condo = summary.condos,
        average_price = summary.average_price,
        "dataset conversion finished"
    );
    Ok(summary)
}

fn build_property(
    id: &Value,
    listing: &Value,
    detail: Option<&Value>,
    image: Option<&Value>,
    today: NaiveDate,
) -> Value {
    let mut rng = StdRng::seed_from_u64(stable_hash(&format!("listing:{id}")));
    let empty = Value::Object(Map::new());
    let detail = detail.unwrap_or(&empty);

    let title = listing
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Property {id}"));
    let price = listing.get("price").and_then(Value::as_i64).unwrap_or(500_000);
    let location = listing
        .get("location")
        .and_then(Value::as_str)
        .unwrap_or("Unknown Location");

    let mut location_parts = location.split(", ");
    let city = location_parts.next().unwrap_or("Unknown City").to_string();
    let state = location_parts
        .next()
        .and_then(|s| s.split_whitespace().next())
        .unwrap_or("XX")
        .to_string();

    let street_number: u32 = rng.gen_range(100..=9999);
    let street = STREET_NAMES.choose(&mut rng).copied().unwrap_or("Main Street");
    let address = format!("{street_number} {street}, {city}, {state}");

    let bedrooms = detail.get("bedrooms").and_then(Value::as_u64).unwrap_or(2);
    let bathrooms = detail.get("bathrooms").and_then(Value::as_u64).unwrap_or(2);
    let size_sqft = detail.get("size_sqft").and_then(Value::as_u64).unwrap_or(1500);
    let raw_amenities: Vec<String> = detail
        .get("amenities")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    let title_lower = title.to_lowercase();
    let single_family = ["villa", "house", "townhouse"]
        .iter()
        .any(|k| title_lower.contains(k))
        || bedrooms >= 4;
    let (property_type, lot_size) = if single_family {
        ("SFH", rng.gen_range(3000..=10000))
    } else {
        ("Condo", 0u32)
    };

    let year_built: i32 = rng.gen_range(1980..=2023);
    let last_sold_date = today - Duration::days(rng.gen_range(30..=1095));
    let last_sold_price = (price as f64 * rng.gen_range(0.8..0.95)) as Money;
    let property_tax = price.saturating_mul(12) / 1000;
    let hoa_fee: Money = if single_family { 0 } else { rng.gen_range(0..=800) };

    let mut amenities: Vec<String> = raw_amenities.iter().map(|a| standard_amenity(a)).collect();
    if amenities.is_empty() {
        let n = rng.gen_range(1..=DEFAULT_AMENITIES.len());
        amenities = DEFAULT_AMENITIES
            .choose_multiple(&mut rng, n)
            .map(|s| s.to_string())
            .collect();
    }

    let neighborhood_features = CITY_FEATURES
        .iter()
        .find(|(name, _)| location.contains(name))
        .map(|(_, features)| *features)
        .unwrap_or(DEFAULT_CITY_FEATURES);

    let has_parking = raw_amenities.iter().any(|a| {
        let lower = a.to_lowercase();
        lower.contains("garage") || lower.contains("parking")
    });
    let garage: u32 = if has_parking { 1 } else { rng.gen_range(0..=2) };

    let condition = ["excellent", "good", "good", "fair"]
        .choose(&mut rng)
        .copied()
        .unwrap_or("good");

    let neighborhood = if title_lower.contains("downtown") {
        format!("{city} Central")
    } else {
        format!("{city} Residential")
    };

    let mut features = vec![
        title.clone(),
        format!("{bedrooms} bedrooms, {bathrooms} bathrooms"),
        format!("{} sq ft", format_thousands(size_sqft as i64)),
        format!("Built in {year_built}"),
    ];
    features.extend(raw_amenities.iter().take(3).cloned());

    let nearby_amenities = vec![
        format!("Shopping center - 0.{} miles", rng.gen_range(2..=8)),
        format!("Public transportation - 0.{} miles", rng.gen_range(1..=5)),
        format!("School - 0.{} miles", rng.gen_range(2..=6)),
        format!(
            "Hospital - {}.{} miles",
            rng.gen_range(1..=3),
            rng.gen_range(0..=9)
        ),
    ];

    json!({
        "id": id,
        "title": title,
        "address": address,
        "property_type": property_type,
        "lot_size": lot_size,
        "square_footage": size_sqft,
        "bedrooms": bedrooms,
        "bathrooms": bathrooms,
        "garage": garage,
        "year_built": year_built,
        "market_value": price,
        "last_sold_price": last_sold_price,
        "last_sold_date": last_sold_date.format("%Y-%m-%d").to_string(),
        "property_tax": property_tax,
        "hoa_fee": hoa_fee,
        "amenities": amenities,
        "neighborhood_features": neighborhood_features,
        "condition": condition,
        "city": city,
        "state": state,
        "neighborhood": neighborhood,
        "image_url": image
            .and_then(|i| i.get("image_url"))
            .and_then(Value::as_str)
            .unwrap_or(""),
        "features": features,
        "nearby_amenities": nearby_amenities,
    })
}

fn standard_amenity(raw: &str) -> String {
    let lower = raw.to_lowercase();
    AMENITY_RULES
        .iter()
        .find(|(keys, _)| keys.iter().any(|k| lower.contains(k)))
        .map(|(_, tag)| tag.to_string())
        .unwrap_or_else(|| lower.replace([' ', '-'], "_"))
}

/// `"123 Main Street, Austin, TX"` -> `"123_main_street_austin_tx.json"`.
fn file_name_for(address: &str) -> String {
    let clean: String = address
        .replace(' ', "_")
        .replace([',', '.'], "")
        .to_lowercase()
        .chars()
        .take(50)
        .collect();
    format!("{clean}.json")
}

fn find_by_id<'a>(items: &'a [Value], id: &Value) -> Option<&'a Value> {
    items.iter().find(|item| item.get("id") == Some(id))
}

fn str_of<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn read_array(path: &Path) -> Result<Vec<Value>, CatalogError> {
    match read_json(path)? {
        Value::Array(items) => Ok(items),
        _ => Err(CatalogError::Invalid(format!(
            "{} does not contain a JSON array",
            path.display()
        ))),
    }
}

fn read_optional_array(path: &Path) -> Vec<Value> {
    read_array(path).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "continuing without optional input");
        Vec::new()
    })
}
