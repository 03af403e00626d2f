// 🧭 Country Service - entry points exposed to the CLI and the route layer
//
// Refresh runs go through a process-wide single-flight lock. Queries pass
// straight through to the store.

use crate::config::AppConfig;
use crate::country::CountryRecord;
use crate::engine::{ReconciliationEngine, RefreshReport};
use crate::error::{QueryError, RefreshError};
use crate::sources::{HttpCountrySource, HttpRateSource};
use crate::store::{CountryFilter, CountryStore, SqliteCountryStore};
use crate::summary::{SummaryReporter, SvgSummaryRenderer};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub total_countries: u64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct SummaryImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

pub struct CountryService {
    engine: ReconciliationEngine,
    store: Arc<dyn CountryStore>,
    reporter: Arc<dyn SummaryReporter>,
    refresh_lock: Mutex<()>,
}

impl CountryService {
    pub fn new(engine: ReconciliationEngine) -> Self {
        let store = Arc::clone(engine.store());
        let reporter = Arc::clone(engine.reporter());

        CountryService {
            engine,
            store,
            reporter,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Wire the SQLite store, HTTP sources and SVG renderer from config.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let store = SqliteCountryStore::open(&config.database.path).with_context(|| {
            format!("Failed to open database at {}", config.database.path.display())
        })?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("country-ledger/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let timeout = config.sources.timeout();
        let countries = HttpCountrySource::new(client.clone(), &config.sources.countries_url, timeout);
        let rates = HttpRateSource::new(client, &config.sources.rates_url, timeout);
        let reporter = SvgSummaryRenderer::new(&config.summary.cache_dir);

        info!(
            database = %config.database.path.display(),
            cache_dir = %config.summary.cache_dir.display(),
            "country service ready"
        );

        let engine = ReconciliationEngine::new(
            Arc::new(store),
            Arc::new(countries),
            Arc::new(rates),
            Arc::new(reporter),
        )
        .with_policy(config.refresh.invalid_records);

        Ok(Self::new(engine))
    }

    /// Run one reconciliation; concurrent callers wait their turn.
    pub async fn run_reconciliation(&self) -> Result<RefreshReport, RefreshError> {
        let _guard = self.refresh_lock.lock().await;
        self.engine.run().await
    }

    pub fn get_all(&self) -> Result<Vec<CountryRecord>, QueryError> {
        Ok(self.store.find_by_filter(&CountryFilter::default())?)
    }

    pub fn get_by_name(&self, name: &str) -> Result<CountryRecord, QueryError> {
        self.store
            .find_by_name(name)?
            .ok_or_else(|| QueryError::RecordNotFound {
                name: name.to_string(),
            })
    }

    pub fn get_by_filter(&self, filter: &CountryFilter) -> Result<Vec<CountryRecord>, QueryError> {
        Ok(self.store.find_by_filter(filter)?)
    }

    pub fn get_status(&self) -> Result<StatusReport, QueryError> {
        Ok(StatusReport {
            total_countries: self.store.count()?,
            last_refreshed_at: self.store.last_refreshed_at()?,
        })
    }

    pub fn delete_by_name(&self, name: &str) -> Result<(), QueryError> {
        if self.store.delete_by_name(name)? {
            info!(country = name, "country deleted");
            Ok(())
        } else {
            Err(QueryError::RecordNotFound {
                name: name.to_string(),
            })
        }
    }

    pub fn summary_image(&self) -> Result<SummaryImage, QueryError> {
        Ok(SummaryImage {
            bytes: self.reporter.load()?,
            content_type: self.reporter.content_type(),
        })
    }
}
