// src/domain/property.rs

use crate::domain::address::normalize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Whole dollars.
pub type Money = i64;

/// `1234567` -> `"1,234,567"`.
pub fn format_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

/// The two property categories the estimator and model understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyType {
    #[default]
    Sfh,
    Condo,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Sfh => "SFH",
            PropertyType::Condo => "Condo",
        }
    }

    /// Lenient parse: anything that is not recognizably a condo or apartment is a
    /// single-family home.
    pub fn parse_loose(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        if lower.contains("condo") || lower.contains("apartment") {
            PropertyType::Condo
        } else {
            PropertyType::Sfh
        }
    }
}

impl From<String> for PropertyType {
    fn from(raw: String) -> Self {
        PropertyType::parse_loose(&raw)
    }
}

impl From<PropertyType> for String {
    fn from(t: PropertyType) -> Self {
        t.as_str().to_string()
    }
}

/// Physical condition as reported by the listing. Unknown labels are kept
/// verbatim so they survive a round trip through the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
    NeedsWork,
    Unrecognized(String),
}

impl Condition {
    /// Price multiplier expressed in percent (1.15 => 115).
    pub fn multiplier_percent(&self) -> i64 {
        match self {
            Condition::Excellent => 115,
            Condition::VeryGood => 108,
            Condition::Good => 102,
            Condition::Fair => 95,
            Condition::Poor => 80,
            Condition::NeedsWork => 70,
            Condition::Unrecognized(_) => 95,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Condition::Excellent => "excellent",
            Condition::VeryGood => "very good",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
            Condition::NeedsWork => "needs work",
            Condition::Unrecognized(raw) => raw,
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Fair
    }
}

impl From<String> for Condition {
    fn from(raw: String) -> Self {
        let key = raw
            .trim()
            .to_lowercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match key.as_str() {
            "excellent" => Condition::Excellent,
            "very good" => Condition::VeryGood,
            "good" => Condition::Good,
            "fair" => Condition::Fair,
            "poor" => Condition::Poor,
            "needs work" => Condition::NeedsWork,
            _ => Condition::Unrecognized(raw),
        }
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> Self {
        c.as_str().to_string()
    }
}

/// Where a record originally came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    #[default]
    JsonFile,
    UserCustom,
    Synthetic,
}

impl RecordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSource::JsonFile => "json_file",
            RecordSource::UserCustom => "user_custom",
            RecordSource::Synthetic => "synthetic",
        }
    }
}

/// Canonical property record used by estimation, comparison and storage.
///
/// Only one of `lot_area` / `building_area` is meaningful, selected by
/// `property_type`. `square_footage` is the generic area used when the
/// type-specific field is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub address: String,
    pub property_type: PropertyType,

    #[serde(alias = "lot_size")]
    pub lot_area: u32,
    pub building_area: u32,
    pub square_footage: u32,

    pub bedrooms: u32,
    pub bathrooms: u32,
    /// Garage spaces.
    pub garage: u32,
    pub year_built: i32,
    pub has_pool: bool,
    pub has_garage: bool,
    pub school_rating: u8,
    pub condition: Condition,

    /// Authoritative price. `None` or `Some(0)` means unknown.
    pub market_value: Option<Money>,

    pub amenities: BTreeSet<String>,
    pub neighborhood_features: BTreeSet<String>,
    pub source: RecordSource,

    // Location and listing extras
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sold_price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sold_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_tax: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoa_fee: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for PropertyRecord {
    fn default() -> Self {
        Self {
            id: None,
            title: None,
            address: String::new(),
            property_type: PropertyType::Sfh,
            lot_area: 0,
            building_area: 0,
            square_footage: 0,
            bedrooms: 0,
            bathrooms: 0,
            garage: 0,
            year_built: 2000,
            has_pool: false,
            has_garage: false,
            school_rating: 5,
            condition: Condition::default(),
            market_value: None,
            amenities: BTreeSet::new(),
            neighborhood_features: BTreeSet::new(),
            source: RecordSource::default(),
            city: None,
            state: None,
            zip_code: None,
            neighborhood: None,
            last_sold_price: None,
            last_sold_date: None,
            property_tax: None,
            hoa_fee: None,
            image_url: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl PropertyRecord {
    pub fn normalized_address(&self) -> String {
        normalize(&self.address)
    }

    /// Market value when it is actually known.
    pub fn known_market_value(&self) -> Option<Money> {
        self.market_value.filter(|v| *v > 0)
    }

    /// Area that drives pricing for this property type, falling back to the
    /// generic square footage when the type-specific field is empty.
    pub fn priced_area(&self) -> u32 {
        let specific = match self.property_type {
            PropertyType::Condo => self.building_area,
            PropertyType::Sfh => self.lot_area,
        };
        if specific > 0 {
            specific
        } else {
            self.square_footage
        }
    }

    pub fn has_pool_feature(&self) -> bool {
        self.has_pool || self.amenities.contains("pool")
    }

    pub fn has_garage_feature(&self) -> bool {
        self.has_garage || self.garage > 0 || self.amenities.contains("garage")
    }
}
