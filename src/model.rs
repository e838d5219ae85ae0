// src/model.rs
//
// Optional remote price model. The service works without one; when a model
// URL is configured every estimate is first attempted against it.

use crate::domain::property::PropertyRecord;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("model request failed: {0}")]
    Request(String),
    #[error("model returned HTTP {0}")]
    Status(u16),
    #[error("malformed model output: {0}")]
    Malformed(String),
}

/// Fixed input schema the model was trained on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInput {
    pub property_type: String,
    pub lot_area: u32,
    pub building_area: u32,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub year_built: i32,
    pub has_pool: bool,
    pub has_garage: bool,
    pub school_rating: u8,
}

impl From<&PropertyRecord> for ModelInput {
    fn from(rec: &PropertyRecord) -> Self {
        Self {
            property_type: rec.property_type.as_str().to_string(),
            lot_area: rec.lot_area,
            building_area: rec.building_area,
            bedrooms: rec.bedrooms,
            bathrooms: rec.bathrooms,
            year_built: rec.year_built,
            has_pool: rec.has_pool_feature(),
            has_garage: rec.has_garage_feature(),
            school_rating: rec.school_rating,
        }
    }
}

pub trait PriceModel: Send + Sync {
    fn predict(&self, input: &ModelInput) -> Result<f64, EstimationError>;

    fn name(&self) -> &str;
}

/// Model served over HTTP: POSTs the input as JSON and reads back either a
/// bare number, `[n, ...]`, or `{"prediction": n}`.
pub struct HttpPriceModel {
    client: Client,
    url: String,
}

impl HttpPriceModel {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, EstimationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EstimationError::Request(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl PriceModel for HttpPriceModel {
    fn predict(&self, input: &ModelInput) -> Result<f64, EstimationError> {
        let resp = self
            .client
            .post(&self.url)
            .json(input)
            .send()
            .map_err(|e| EstimationError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EstimationError::Status(status.as_u16()));
        }

        let body: Value = resp
            .json()
            .map_err(|e| EstimationError::Malformed(e.to_string()))?;

        parse_prediction(&body)
    }

    fn name(&self) -> &str {
        &self.url
    }
}

pub fn parse_prediction(body: &Value) -> Result<f64, EstimationError> {
    let value = match body {
        Value::Number(n) => n.as_f64(),
        Value::Array(items) => items.first().and_then(Value::as_f64),
        Value::Object(map) => map.get("prediction").and_then(|p| match p {
            Value::Array(items) => items.first().and_then(Value::as_f64),
            other => other.as_f64(),
        }),
        _ => None,
    };

    value.ok_or_else(|| EstimationError::Malformed(body.to_string()))
}
