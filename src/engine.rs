// ⚖️ Reconciliation Engine - fetch, classify, derive, commit, summarize
//
// One run:
//   1. fetch the country snapshot        (failure => ExternalSourceUnavailable)
//   2. fetch the rate table once         (failure => ExternalSourceUnavailable)
//   3. classify each entry as insert or update, validate, derive fields
//   4. commit the insert batch, then the update batch (two atomic units)
//   5. recompute aggregates and hand them to the summary reporter
//
// Steps 1-3 never write. A summary failure does not undo the commit.

use crate::country::{name_key, CountryRecord, ExternalCountry, NewCountry};
use crate::error::{BatchKind, RefreshError};
use crate::gdp;
use crate::rates::RateCache;
use crate::sources::{CountrySource, RateSource, SourceError, SourceKind};
use crate::store::{CountryStore, StoreError};
use crate::summary::{RefreshSummary, SummaryReporter, TOP_N};
use crate::validation::{validate_entry, ValidCandidate, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// ============================================================================
// POLICY & REPORT TYPES
// ============================================================================

/// What to do with a snapshot entry that fails validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRecordPolicy {
    /// Drop the entry, record why, and keep going
    #[default]
    Skip,
    /// Stop the run before anything is committed
    Abort,
}

impl FromStr for InvalidRecordPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(InvalidRecordPolicy::Skip),
            "abort" => Ok(InvalidRecordPolicy::Abort),
            _ => Err(format!("Invalid record policy: {} (expected skip or abort)", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub name: String,
    pub field: &'static str,
    pub reason: &'static str,
}

impl RejectedRecord {
    fn new(name: String, error: ValidationError) -> Self {
        RejectedRecord {
            name,
            field: error.field(),
            reason: error.reason(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryStatus {
    Rendered { artifact: PathBuf },
    Failed { reason: String },
}

impl SummaryStatus {
    pub fn is_rendered(&self) -> bool {
        matches!(self, SummaryStatus::Rendered { .. })
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    /// Latest refresh timestamp in the store after the commit
    pub refreshed_at: Option<DateTime<Utc>>,
    pub inserted: usize,
    pub updated: usize,
    pub rejected: Vec<RejectedRecord>,
    pub summary: SummaryStatus,
}

/// Work planned by the classify step, not yet committed
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub inserts: Vec<NewCountry>,
    pub updates: Vec<CountryRecord>,
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Insert(usize),
    Update(usize),
}

// ============================================================================
// DERIVE STEP
// ============================================================================

/// Build the derived country for a validated entry.
///
/// No currency code: null rate, zero GDP. Code present but not in the rate
/// cache: code kept, null rate, zero GDP.
pub fn derive_country(
    candidate: ValidCandidate,
    entry: &ExternalCountry,
    rates: &RateCache,
) -> NewCountry {
    let rate = candidate
        .currency_code
        .as_deref()
        .and_then(|code| rates.resolve(code));

    NewCountry {
        estimated_gdp: gdp::estimate(candidate.population, rate),
        exchange_rate: rate.map(|r| r.value()),
        name: candidate.name,
        capital: entry.capital.clone(),
        region: entry.region.clone(),
        population: candidate.population,
        currency_code: candidate.currency_code,
        flag_url: entry.flag.clone(),
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine {
    store: Arc<dyn CountryStore>,
    countries: Arc<dyn CountrySource>,
    rates: Arc<dyn RateSource>,
    reporter: Arc<dyn SummaryReporter>,
    policy: InvalidRecordPolicy,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn CountryStore>,
        countries: Arc<dyn CountrySource>,
        rates: Arc<dyn RateSource>,
        reporter: Arc<dyn SummaryReporter>,
    ) -> Self {
        ReconciliationEngine {
            store,
            countries,
            rates,
            reporter,
            policy: InvalidRecordPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: InvalidRecordPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<dyn CountryStore> {
        &self.store
    }

    pub fn reporter(&self) -> &Arc<dyn SummaryReporter> {
        &self.reporter
    }

    /// Execute one reconciliation run.
    ///
    /// Overlapping runs are not coordinated here; callers that need it must
    /// serialize runs themselves.
    pub async fn run(&self) -> Result<RefreshReport, RefreshError> {
        info!(policy = ?self.policy, "starting reconciliation run");

        let snapshot = self
            .countries
            .fetch_countries()
            .await
            .map_err(|e| unavailable(SourceKind::Countries, self.countries.endpoint(), e))?;
        info!(
            entries = snapshot.len(),
            source = self.countries.endpoint(),
            "fetched country snapshot"
        );

        let payload = self
            .rates
            .fetch_rates()
            .await
            .map_err(|e| unavailable(SourceKind::ExchangeRates, self.rates.endpoint(), e))?;
        let rates = RateCache::from_payload(payload);
        info!(
            currencies = rates.len(),
            fetched_at = %rates.fetched_at(),
            source = self.rates.endpoint(),
            "fetched exchange rates"
        );

        let changes = self.classify(&snapshot, &rates).map_err(|e| {
            error!(error = %e, "classification aborted, nothing committed");
            e
        })?;
        info!(
            inserts = changes.inserts.len(),
            updates = changes.updates.len(),
            rejected = changes.rejected.len(),
            "classified snapshot"
        );

        let (inserted, updated) = self.commit(&changes)?;
        let (refreshed_at, summary) = self.summarize();

        info!(inserted, updated, rejected = changes.rejected.len(), "reconciliation run complete");

        Ok(RefreshReport {
            refreshed_at,
            inserted,
            updated,
            rejected: changes.rejected,
            summary,
        })
    }

    /// Classify, validate and derive every snapshot entry.
    ///
    /// Names repeated within one snapshot collapse to a single change; the
    /// last occurrence wins.
    pub fn classify(
        &self,
        snapshot: &[ExternalCountry],
        rates: &RateCache,
    ) -> Result<ChangeSet, RefreshError> {
        let mut changes = ChangeSet::default();
        let mut planned: HashMap<String, Slot> = HashMap::new();

        for entry in snapshot {
            let candidate = match validate_entry(entry) {
                Ok(candidate) => candidate,
                Err(error) => {
                    let name = entry.display_name();
                    match self.policy {
                        InvalidRecordPolicy::Abort => {
                            return Err(RefreshError::ValidationFailed { name, error });
                        }
                        InvalidRecordPolicy::Skip => {
                            warn!(country = %name, field = error.field(), "skipping invalid record: {}", error);
                            changes.rejected.push(RejectedRecord::new(name, error));
                            continue;
                        }
                    }
                }
            };

            let key = name_key(&candidate.name);
            let fresh = derive_country(candidate, entry, rates);

            match planned.get(&key).copied() {
                Some(Slot::Insert(index)) => {
                    warn!(country = %fresh.name, "duplicate name in snapshot, keeping last entry");
                    changes.inserts[index] = fresh;
                }
                Some(Slot::Update(index)) => {
                    warn!(country = %fresh.name, "duplicate name in snapshot, keeping last entry");
                    let merged = changes.updates[index].refreshed_from(fresh);
                    changes.updates[index] = merged;
                }
                None => match self.store.find_by_name(&fresh.name)? {
                    Some(existing) => {
                        debug!(country = %fresh.name, id = %existing.id, "classified as update");
                        planned.insert(key, Slot::Update(changes.updates.len()));
                        changes.updates.push(existing.refreshed_from(fresh));
                    }
                    None => {
                        debug!(country = %fresh.name, "classified as insert");
                        planned.insert(key, Slot::Insert(changes.inserts.len()));
                        changes.inserts.push(fresh);
                    }
                },
            }
        }

        Ok(changes)
    }

    /// Commit inserts then updates, each as its own transaction.
    fn commit(&self, changes: &ChangeSet) -> Result<(usize, usize), RefreshError> {
        let inserted = if changes.inserts.is_empty() {
            0
        } else {
            self.store.bulk_insert(&changes.inserts).map_err(|cause| {
                error!(error = %cause, "insert batch rolled back");
                RefreshError::StoreCommitFailed {
                    batch: BatchKind::Insert,
                    cause,
                }
            })?
        };

        let updated = if changes.updates.is_empty() {
            0
        } else {
            self.store.bulk_update(&changes.updates).map_err(|cause| {
                error!(
                    error = %cause,
                    inserted,
                    "update batch rolled back; committed inserts remain applied"
                );
                RefreshError::StoreCommitFailed {
                    batch: BatchKind::Update,
                    cause,
                }
            })?
        };

        Ok((inserted, updated))
    }

    /// Recompute aggregates and render them. Never fails the run.
    fn summarize(&self) -> (Option<DateTime<Utc>>, SummaryStatus) {
        let summary = match self.collect_summary() {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "could not read summary aggregates");
                return (
                    None,
                    SummaryStatus::Failed {
                        reason: e.to_string(),
                    },
                );
            }
        };

        let status = match self.reporter.render(&summary) {
            Ok(artifact) => {
                debug!(artifact = %artifact.display(), "summary rendered");
                SummaryStatus::Rendered { artifact }
            }
            Err(e) => {
                warn!(error = %e, "summary rendering failed; commit stands");
                SummaryStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        (summary.last_refresh, status)
    }

    pub fn collect_summary(&self) -> Result<RefreshSummary, StoreError> {
        Ok(RefreshSummary {
            country_count: self.store.count()?,
            top_five: self.store.top_by_gdp(TOP_N)?,
            last_refresh: self.store.last_refreshed_at()?,
        })
    }
}

fn unavailable(origin: SourceKind, endpoint: &str, error: SourceError) -> RefreshError {
    error!(source = %origin, endpoint, error = %error, "external source unavailable");
    RefreshError::ExternalSourceUnavailable {
        origin,
        endpoint: endpoint.to_string(),
        detail: error.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
