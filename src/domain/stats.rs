// src/domain/stats.rs

use crate::domain::property::PropertyRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregate view over a set of properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyStats {
    pub total_properties: i64,
    pub property_types: BTreeMap<String, i64>,
    pub average_market_value: f64,
}

impl PropertyStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a PropertyRecord>) -> Self {
        let mut stats = PropertyStats::default();
        let mut total_value: i64 = 0;

        for rec in records {
            stats.total_properties += 1;
            *stats
                .property_types
                .entry(rec.property_type.as_str().to_string())
                .or_insert(0) += 1;
            total_value += rec.market_value.unwrap_or(0);
        }

        if stats.total_properties > 0 {
            stats.average_market_value =
                round2(total_value as f64 / stats.total_properties as f64);
        }
        stats
    }
}

/// How many records came from the dataset versus user submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceBreakdown {
    pub total_properties: i64,
    pub json_file: i64,
    pub user_custom: i64,
    pub other: i64,
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
