// src/state.rs
//
// Everything a request handler needs, built once in `main`.

use crate::catalog::Catalog;
use crate::chart::{ChartRenderer, SvgChartRenderer};
use crate::cli::Config;
use crate::db::PropertyStore;
use crate::domain::estimate::{HeuristicEstimator, PriceEstimator};
use crate::model::HttpPriceModel;
use crate::resolver::PropertyResolver;
use crate::services::Comparator;
use chrono::Datelike;
use std::sync::Arc;
use std::time::Duration;

pub struct AppState {
    pub store: PropertyStore,
    pub catalog: Arc<Catalog>,
    pub comparator: Comparator,
}

impl AppState {
    pub fn new(
        store: PropertyStore,
        catalog: Catalog,
        estimator: PriceEstimator,
        charts: Option<Box<dyn ChartRenderer>>,
        fuzzy_match: bool,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let resolver = PropertyResolver::standard(store.clone(), catalog.clone(), fuzzy_match);
        let comparator = Comparator::new(resolver, estimator, charts, store.clone());
        Self {
            store,
            catalog,
            comparator,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let store = PropertyStore::connect(&cfg.db);
        let catalog = Catalog::load(&cfg.dataset);
        let current_year = chrono::Utc::now().year();
        let heuristic = HeuristicEstimator::new(current_year);

        let estimator = match &cfg.model_url {
            Some(url) => match HttpPriceModel::new(url.clone(), Duration::from_secs(cfg.model_timeout_secs)) {
                Ok(model) => {
                    tracing::info!(url = %url, "price model configured");
                    PriceEstimator::with_model(heuristic, Box::new(model))
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "could not create price model client, using heuristic pricing");
                    PriceEstimator::heuristic(heuristic)
                }
            },
            None => {
                tracing::info!("no price model configured, using heuristic pricing");
                PriceEstimator::heuristic(heuristic)
            }
        };

        let charts: Option<Box<dyn ChartRenderer>> = if cfg.charts {
            Some(Box::new(SvgChartRenderer::new(current_year)))
        } else {
            None
        };

        Self::new(store, catalog, estimator, charts, cfg.fuzzy_match)
    }

    /// Label for whichever source answers listing queries first.
    pub fn primary_source(&self) -> &'static str {
        if self.store.is_connected() {
            "primary_store"
        } else {
            "json_files"
        }
    }
}
