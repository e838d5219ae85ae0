// src/services/compare.rs

use crate::chart::ChartRenderer;
use crate::db::PropertyStore;
use crate::domain::estimate::PriceEstimator;
use crate::domain::property::{format_thousands, Money, PropertyRecord};
use crate::domain::stats::round2;
use crate::errors::ServerError;
use crate::resolver::{persist_synthetic, DataSource, PropertyResolver, Resolved};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompareRequest {
    #[serde(default)]
    pub address1: String,
    #[serde(default)]
    pub address2: String,
    #[serde(default)]
    pub persist_synthetic: bool,
}

/// One side of a comparison: the resolved record plus its prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyView {
    #[serde(flatten)]
    pub record: PropertyRecord,
    pub predicted_price: Money,
    pub display_price: Money,
    pub served_by: DataSource,
}

impl PropertyView {
    fn new(resolved: Resolved, predicted_price: Money) -> Self {
        let display_price = resolved.record.known_market_value().unwrap_or(predicted_price);
        Self {
            record: resolved.record,
            predicted_price,
            display_price,
            served_by: resolved.served_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub price_difference_formatted: String,
    pub percentage_difference_formatted: String,
    pub higher_property: String,
    pub lower_property: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub property1: PropertyView,
    pub property2: PropertyView,
    pub price_difference: Money,
    pub percentage_difference: f64,
    pub higher_priced: String,
    pub comparison_summary: ComparisonSummary,
    pub chart: Option<String>,
    pub chart_available: bool,
}

/// Resolves, prices and compares two addresses.
pub struct Comparator {
    resolver: PropertyResolver,
    estimator: PriceEstimator,
    charts: Option<Box<dyn ChartRenderer>>,
    store: PropertyStore,
}

impl Comparator {
    pub fn new(
        resolver: PropertyResolver,
        estimator: PriceEstimator,
        charts: Option<Box<dyn ChartRenderer>>,
        store: PropertyStore,
    ) -> Self {
        Self {
            resolver,
            estimator,
            charts,
            store,
        }
    }

    pub fn estimator(&self) -> &PriceEstimator {
        &self.estimator
    }

    pub fn compare(&self, req: &CompareRequest) -> Result<ComparisonResult, ServerError> {
        let address1 = req.address1.trim();
        let address2 = req.address2.trim();
        if address1.is_empty() || address2.is_empty() {
            return Err(ServerError::BadRequest(
                "Both address1 and address2 are required".into(),
            ));
        }

        let resolved1 = self.resolver.resolve(address1);
        let resolved2 = self.resolver.resolve(address2);

        if req.persist_synthetic {
            for resolved in [&resolved1, &resolved2] {
                if let Err(e) = persist_synthetic(&self.store, resolved) {
                    tracing::warn!(address = %resolved.record.address, error = %e, "could not persist synthetic property");
                }
            }
        }

        let predicted1 = self.estimator.estimate(&resolved1.record);
        let predicted2 = self.estimator.estimate(&resolved2.record);
        let property1 = PropertyView::new(resolved1, predicted1);
        let property2 = PropertyView::new(resolved2, predicted2);

        let p1 = property1.display_price;
        let p2 = property2.display_price;
        let price_difference = (p1 - p2).abs();
        let percentage = percentage_difference(p1, p2);

        let (higher, lower) = if p1 > p2 {
            (address1, address2)
        } else {
            (address2, address1)
        };

        let chart = self.render_chart(&property1, &property2);

        tracing::info!(
            address1,
            address2,
            source1 = property1.served_by.as_str(),
            source2 = property2.served_by.as_str(),
            price_difference,
            "properties compared"
        );

        Ok(ComparisonResult {
            price_difference,
            percentage_difference: round2(percentage),
            higher_priced: higher.to_string(),
            comparison_summary: ComparisonSummary {
                price_difference_formatted: format!("${}", format_thousands(price_difference)),
                percentage_difference_formatted: format!("{percentage:.1}%"),
                higher_property: higher.to_string(),
                lower_property: lower.to_string(),
            },
            chart_available: chart.is_some(),
            chart,
            property1,
            property2,
        })
    }

    fn render_chart(&self, left: &PropertyView, right: &PropertyView) -> Option<String> {
        let renderer = self.charts.as_ref()?;
        match renderer.render(left, right) {
            Ok(chart) => Some(chart),
            Err(e) => {
                tracing::warn!(error = %e, "chart rendering failed");
                None
            }
        }
    }
}

/// Difference relative to the cheaper property, in percent. Zero when the
/// cheaper one has no positive price.
pub fn percentage_difference(p1: Money, p2: Money) -> f64 {
    let min = p1.min(p2);
    if min <= 0 {
        return 0.0;
    }
    (p1 - p2).abs() as f64 / min as f64 * 100.0
}
