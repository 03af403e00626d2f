// Shared fakes for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use country_ledger::{
    CountryFilter, CountryRecord, CountrySource, CountryStore, ExternalCountry, NewCountry,
    RateSource, RatesPayload, RefreshSummary, ReportError, SourceError, SqliteCountryStore,
    StoreError, SummaryReporter,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ----------------------------------------------------------------------------
// Sources
// ----------------------------------------------------------------------------

/// Country source that serves a fixed JSON snapshot.
pub struct StaticCountries {
    snapshot: Mutex<Value>,
}

impl StaticCountries {
    pub fn new(snapshot: Value) -> Arc<Self> {
        Arc::new(StaticCountries {
            snapshot: Mutex::new(snapshot),
        })
    }

    /// Swap the snapshot served by later fetches
    pub fn replace(&self, snapshot: Value) {
        *self.snapshot.lock().unwrap() = snapshot;
    }
}

#[async_trait]
impl CountrySource for StaticCountries {
    fn endpoint(&self) -> &str {
        "countries.test"
    }

    async fn fetch_countries(&self) -> Result<Vec<ExternalCountry>, SourceError> {
        let snapshot = self.snapshot.lock().unwrap().clone();
        serde_json::from_value(snapshot).map_err(|e| SourceError::Decode(e.to_string()))
    }
}

/// Rate source that serves a fixed `rates` table.
pub struct StaticRates {
    rates: Value,
}

impl StaticRates {
    pub fn new(rates: Value) -> Arc<Self> {
        Arc::new(StaticRates { rates })
    }
}

#[async_trait]
impl RateSource for StaticRates {
    fn endpoint(&self) -> &str {
        "rates.test"
    }

    async fn fetch_rates(&self) -> Result<RatesPayload, SourceError> {
        serde_json::from_value(serde_json::json!({ "rates": self.rates }))
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

/// Source that always times out, for either feed.
pub struct DownSource;

#[async_trait]
impl CountrySource for DownSource {
    fn endpoint(&self) -> &str {
        "down.test"
    }

    async fn fetch_countries(&self) -> Result<Vec<ExternalCountry>, SourceError> {
        Err(SourceError::Timeout(Duration::from_secs(10)))
    }
}

#[async_trait]
impl RateSource for DownSource {
    fn endpoint(&self) -> &str {
        "down.test"
    }

    async fn fetch_rates(&self) -> Result<RatesPayload, SourceError> {
        Err(SourceError::Timeout(Duration::from_secs(10)))
    }
}

// ----------------------------------------------------------------------------
// Reporter
// ----------------------------------------------------------------------------

/// Reporter that records every summary it is handed.
#[derive(Default)]
pub struct RecordingReporter {
    pub summaries: Mutex<Vec<RefreshSummary>>,
    pub fail: AtomicBool,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let reporter = Self::default();
        reporter.fail.store(true, Ordering::SeqCst);
        Arc::new(reporter)
    }

    pub fn last(&self) -> Option<RefreshSummary> {
        self.summaries.lock().unwrap().last().cloned()
    }
}

impl SummaryReporter for RecordingReporter {
    fn render(&self, summary: &RefreshSummary) -> Result<PathBuf, ReportError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReportError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "cache directory is read-only",
            )));
        }
        self.summaries.lock().unwrap().push(summary.clone());
        Ok(PathBuf::from("summary.svg"))
    }

    fn load(&self) -> Result<Vec<u8>, ReportError> {
        Err(ReportError::NotFound)
    }

    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }
}

// ----------------------------------------------------------------------------
// Store
// ----------------------------------------------------------------------------

/// SQLite store whose batch writes can be made to fail on demand.
pub struct FlakyStore {
    inner: SqliteCountryStore,
    pub fail_inserts: AtomicBool,
    pub fail_updates: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(FlakyStore {
            inner: SqliteCountryStore::open_in_memory().unwrap(),
            fail_inserts: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
        })
    }
}

fn injected_failure() -> StoreError {
    StoreError::Sqlite(rusqlite::Error::InvalidQuery)
}

impl CountryStore for FlakyStore {
    fn find_by_name(&self, name: &str) -> Result<Option<CountryRecord>, StoreError> {
        self.inner.find_by_name(name)
    }

    fn find_by_filter(&self, filter: &CountryFilter) -> Result<Vec<CountryRecord>, StoreError> {
        self.inner.find_by_filter(filter)
    }

    fn bulk_insert(&self, records: &[NewCountry]) -> Result<usize, StoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        self.inner.bulk_insert(records)
    }

    fn bulk_update(&self, records: &[CountryRecord]) -> Result<usize, StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        self.inner.bulk_update(records)
    }

    fn delete_by_name(&self, name: &str) -> Result<bool, StoreError> {
        self.inner.delete_by_name(name)
    }

    fn count(&self) -> Result<u64, StoreError> {
        self.inner.count()
    }

    fn top_by_gdp(&self, n: usize) -> Result<Vec<String>, StoreError> {
        self.inner.top_by_gdp(n)
    }

    fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.inner.last_refreshed_at()
    }
}

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

pub fn sample_snapshot() -> Value {
    serde_json::json!([
        {
            "name": "Nigeria",
            "capital": "Abuja",
            "region": "Africa",
            "population": 206139587,
            "currencies": [{"code": "NGN", "name": "Nigerian naira"}],
            "flag": "https://flagcdn.com/ng.svg"
        },
        {
            "name": "Ghana",
            "capital": "Accra",
            "region": "Africa",
            "population": 31072940,
            "currencies": [{"code": "GHS"}],
            "flag": "https://flagcdn.com/gh.svg"
        },
        {
            "name": "France",
            "capital": "Paris",
            "region": "Europe",
            "population": 67391582,
            "currencies": [{"code": "EUR"}],
            "flag": "https://flagcdn.com/fr.svg"
        }
    ])
}

pub fn sample_rates() -> Value {
    serde_json::json!({ "USD": 1, "NGN": 1600.23, "GHS": 15.34, "EUR": 0.92 })
}
