// Country Ledger - Core Library
// Reconciles an external country snapshot and exchange rates into a local store.
// Shared by the CLI, the API server, and the tests.

pub mod config;
pub mod country;
pub mod engine;
pub mod error;
pub mod gdp;
pub mod logging;
pub mod rates;
pub mod service;
pub mod sources;
pub mod store;
pub mod summary;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use country::{name_key, CountryRecord, ExternalCountry, NewCountry};
pub use engine::{
    derive_country, ChangeSet, InvalidRecordPolicy, ReconciliationEngine, RefreshReport,
    RejectedRecord, SummaryStatus,
};
pub use error::{BatchKind, QueryError, RefreshError};
pub use gdp::{estimate, ExchangeRate};
pub use rates::{RateCache, RatesPayload};
pub use service::{CountryService, StatusReport, SummaryImage};
pub use sources::{
    CountrySource, HttpCountrySource, HttpRateSource, RateSource, SourceError, SourceKind,
};
pub use store::{setup_database, CountryFilter, CountryStore, GdpSort, SqliteCountryStore, StoreError};
pub use summary::{RefreshSummary, ReportError, SummaryReporter, SvgSummaryRenderer};
pub use validation::{validate, validate_entry, ValidCandidate, ValidationError, ValidationResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
