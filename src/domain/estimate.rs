// src/domain/estimate.rs

use crate::domain::property::{Money, PropertyRecord, PropertyType};
use crate::model::{EstimationError, ModelInput, PriceModel};

/// No estimate goes below this.
pub const MIN_PRICE: Money = 100_000;

/// Line items of the heuristic, before the condition multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub base: Money,
    pub room_bonus: Money,
    pub age_bonus: Money,
    pub pool_bonus: Money,
    pub garage_bonus: Money,
    pub school_bonus: Money,
    pub location_bonus: Money,
    pub condition_percent: i64,
}

impl PriceBreakdown {
    pub fn subtotal(&self) -> Money {
        self.base
            + self.room_bonus
            + self.age_bonus
            + self.pool_bonus
            + self.garage_bonus
            + self.school_bonus
            + self.location_bonus
    }

    pub fn total(&self) -> Money {
        apply_percent(self.subtotal(), self.condition_percent).max(MIN_PRICE)
    }
}

/// Deterministic pricing formula blending area, rooms, age, amenities,
/// schools, location and condition.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicEstimator {
    pub current_year: i32,
}

impl HeuristicEstimator {
    pub fn new(current_year: i32) -> Self {
        Self { current_year }
    }

    pub fn breakdown(&self, rec: &PropertyRecord) -> PriceBreakdown {
        let area = rec.priced_area() as Money;
        let base = match rec.property_type {
            PropertyType::Condo => area * 250,
            PropertyType::Sfh => area * 80,
        };

        let age = self.current_year.saturating_sub(rec.year_built);
        let age_bonus = if age < 5 {
            80_000
        } else if age < 15 {
            50_000
        } else if age < 30 {
            20_000
        } else {
            ((rec.year_built as Money - 1950) * 500).max(0)
        };

        PriceBreakdown {
            base,
            room_bonus: rec.bedrooms as Money * 35_000 + rec.bathrooms as Money * 25_000,
            age_bonus,
            pool_bonus: if rec.has_pool_feature() { 65_000 } else { 0 },
            garage_bonus: if rec.has_garage_feature() { 40_000 } else { 0 },
            school_bonus: (rec.school_rating as Money - 5) * 15_000,
            location_bonus: rec.neighborhood_features.len() as Money * 8_000,
            condition_percent: rec.condition.multiplier_percent(),
        }
    }

    pub fn estimate(&self, rec: &PropertyRecord) -> Money {
        distinguish_from_market(rec, self.breakdown(rec).total())
    }
}

/// Simple area-only price used when a loaded model fails.
pub fn area_only_estimate(rec: &PropertyRecord) -> Money {
    match rec.property_type {
        PropertyType::Sfh => rec.lot_area as Money * 100,
        PropertyType::Condo => rec.building_area as Money * 300,
    }
}

/// A prediction identical to a known market value is never reported: the
/// condition multiplier is applied once more and the result checked again.
fn distinguish_from_market(rec: &PropertyRecord, estimate: Money) -> Money {
    match rec.known_market_value() {
        Some(market) if market == estimate => {
            let adjusted = apply_percent(estimate, rec.condition.multiplier_percent());
            if adjusted == market {
                adjusted + 1
            } else {
                adjusted
            }
        }
        _ => estimate,
    }
}

/// `amount * percent / 100`, rounded half away from zero.
fn apply_percent(amount: Money, percent: i64) -> Money {
    let scaled = amount * percent;
    if scaled >= 0 {
        (scaled + 50) / 100
    } else {
        (scaled - 50) / 100
    }
}

/// Estimator used by the service: the model when one is loaded, the heuristic
/// otherwise. Never fails.
pub struct PriceEstimator {
    heuristic: HeuristicEstimator,
    model: Option<Box<dyn PriceModel>>,
}

impl PriceEstimator {
    pub fn heuristic(heuristic: HeuristicEstimator) -> Self {
        Self {
            heuristic,
            model: None,
        }
    }

    pub fn with_model(heuristic: HeuristicEstimator, model: Box<dyn PriceModel>) -> Self {
        Self {
            heuristic,
            model: Some(model),
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn estimate(&self, rec: &PropertyRecord) -> Money {
        let Some(model) = &self.model else {
            return self.heuristic.estimate(rec);
        };

        let input = ModelInput::from(rec);
        match model.predict(&input).and_then(validate_prediction) {
            Ok(price) => distinguish_from_market(rec, price),
            Err(e) => {
                tracing::warn!(
                    model = model.name(),
                    address = %rec.address,
                    input = ?input,
                    error = %e,
                    "model prediction failed, using area-only estimate"
                );
                distinguish_from_market(rec, area_only_estimate(rec))
            }
        }
    }
}

fn validate_prediction(raw: f64) -> Result<Money, EstimationError> {
    if !raw.is_finite() || raw < 0.0 {
        return Err(EstimationError::Malformed(format!("prediction {raw}")));
    }
    Ok(raw.round() as Money)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::property::Condition;

    fn reference_sfh() -> PropertyRecord {
        PropertyRecord {
            address: "100 Reference Way".into(),
            property_type: PropertyType::Sfh,
            lot_area: 8000,
            bedrooms: 4,
            bathrooms: 3,
            year_built: 2020,
            has_pool: true,
            has_garage: true,
            school_rating: 8,
            condition: Condition::Excellent,
            ..Default::default()
        }
    }

    struct FixedModel(Result<f64, ()>);

    impl PriceModel for FixedModel {
        fn predict(&self, _input: &ModelInput) -> Result<f64, EstimationError> {
            self.0
                .map_err(|_| EstimationError::Request("connection refused".into()))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn reference_single_family_estimate() {
        let est = HeuristicEstimator::new(2024);
        let breakdown = est.breakdown(&reference_sfh());
        assert_eq!(breakdown.base, 640_000);
        assert_eq!(breakdown.room_bonus, 215_000);
        assert_eq!(breakdown.age_bonus, 80_000);
        assert_eq!(breakdown.school_bonus, 45_000);
        assert_eq!(breakdown.subtotal(), 1_085_000);
        assert_eq!(est.estimate(&reference_sfh()), 1_247_750);
    }

    #[test]
    fn out_of_range_build_years_do_not_overflow() {
        let est = HeuristicEstimator::new(2024);
        let mut rec = reference_sfh();

        rec.year_built = i32::MIN;
        assert_eq!(est.breakdown(&rec).age_bonus, 0);

        rec.year_built = i32::MAX;
        assert_eq!(est.breakdown(&rec).age_bonus, 80_000);
    }

    #[test]
    fn age_bands() {
        let est = HeuristicEstimator::new(2024);
        let mut rec = reference_sfh();
        for (year, bonus) in [(2021, 80_000), (2012, 50_000), (2000, 20_000), (1980, 15_000), (1940, 0)] {
            rec.year_built = year;
            assert_eq!(est.breakdown(&rec).age_bonus, bonus, "year {year}");
        }
    }

    #[test]
    fn estimate_is_monotonic_in_condition() {
        let est = HeuristicEstimator::new(2024);
        let mut rec = reference_sfh();
        let prices: Vec<Money> = [
            Condition::Excellent,
            Condition::Good,
            Condition::Fair,
            Condition::Poor,
        ]
        .into_iter()
        .map(|c| {
            rec.condition = c;
            est.estimate(&rec)
        })
        .collect();

        assert!(prices.windows(2).all(|w| w[0] > w[1]), "{prices:?}");
    }

    #[test]
    fn floors_at_minimum_price() {
        let rec = PropertyRecord {
            property_type: PropertyType::Condo,
            building_area: 100,
            year_built: 1900,
            school_rating: 1,
            condition: Condition::Poor,
            ..Default::default()
        };
        assert_eq!(HeuristicEstimator::new(2024).estimate(&rec), MIN_PRICE);
    }

    #[test]
    fn neighborhood_features_add_location_bonus() {
        let est = HeuristicEstimator::new(2024);
        let mut rec = reference_sfh();
        let before = est.breakdown(&rec).subtotal();
        rec.neighborhood_features.insert("near_park".into());
        rec.neighborhood_features.insert("good_schools".into());
        assert_eq!(est.breakdown(&rec).subtotal(), before + 16_000);
    }

    #[test]
    fn prediction_never_equals_known_market_value() {
        let est = HeuristicEstimator::new(2024);
        let mut rec = reference_sfh();
        rec.market_value = Some(1_247_750);

        let predicted = est.estimate(&rec);
        assert_ne!(Some(predicted), rec.market_value);
        assert_eq!(predicted, apply_percent(1_247_750, 115));
    }

    #[test]
    fn prediction_differs_from_market_for_generic_inputs() {
        let est = HeuristicEstimator::new(2024);
        let mut rec = reference_sfh();
        rec.market_value = Some(900_000);
        assert_eq!(est.estimate(&rec), 1_247_750);
    }

    #[test]
    fn model_output_is_used_when_available() {
        let estimator = PriceEstimator::with_model(
            HeuristicEstimator::new(2024),
            Box::new(FixedModel(Ok(612_345.4))),
        );
        assert!(estimator.model_loaded());
        assert_eq!(estimator.estimate(&reference_sfh()), 612_345);
    }

    #[test]
    fn model_failure_falls_back_to_area_only() {
        let estimator = PriceEstimator::with_model(
            HeuristicEstimator::new(2024),
            Box::new(FixedModel(Err(()))),
        );
        assert_eq!(estimator.estimate(&reference_sfh()), 800_000);

        let condo = PropertyRecord {
            property_type: PropertyType::Condo,
            building_area: 1000,
            ..Default::default()
        };
        assert_eq!(estimator.estimate(&condo), 300_000);
    }

    #[test]
    fn malformed_model_output_falls_back() {
        let estimator = PriceEstimator::with_model(
            HeuristicEstimator::new(2024),
            Box::new(FixedModel(Ok(f64::NAN))),
        );
        assert_eq!(estimator.estimate(&reference_sfh()), 800_000);
    }
}
