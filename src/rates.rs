// 💱 Rate Cache - one exchange-rate snapshot per reconciliation run
//
// Built from exactly one fetch and passed by reference into the derive step.
// Never shared across runs.

use crate::gdp::ExchangeRate;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Body returned by the exchange-rate source: `{ "rates": { "NGN": 1600.5, ... } }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatesPayload {
    #[serde(default)]
    pub rates: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct RateCache {
    rates: HashMap<String, ExchangeRate>,
    fetched_at: DateTime<Utc>,
}

impl RateCache {
    /// Keep only usable rates; zero, negative and non-numeric entries are dropped
    /// so they resolve as absent.
    pub fn from_payload(payload: RatesPayload) -> Self {
        let rates = payload
            .rates
            .into_iter()
            .filter_map(|(code, value)| {
                value
                    .as_f64()
                    .and_then(ExchangeRate::new)
                    .map(|rate| (code, rate))
            })
            .collect();

        RateCache {
            rates,
            fetched_at: Utc::now(),
        }
    }

    pub fn from_rates<I, S>(rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        RateCache::from_payload(RatesPayload {
            rates: rates
                .into_iter()
                .map(|(code, rate)| (code.into(), Value::from(rate)))
                .collect(),
        })
    }

    /// Look up the rate for a currency code (exact match).
    pub fn resolve(&self, currency_code: &str) -> Option<ExchangeRate> {
        self.rates.get(currency_code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_known_and_unknown_codes() {
        let cache = RateCache::from_rates([("NGN", 1600.5), ("GHS", 15.2)]);

        assert_eq!(cache.resolve("NGN").map(ExchangeRate::value), Some(1600.5));
        assert!(cache.resolve("XXX").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_unusable_rates_resolve_as_absent() {
        let payload: RatesPayload = serde_json::from_value(json!({
            "result": "success",
            "rates": {"USD": 1, "ZER": 0, "NEG": -4.2, "TXT": "1.5", "NUL": null}
        }))
        .unwrap();

        let cache = RateCache::from_payload(payload);

        assert_eq!(cache.resolve("USD").map(ExchangeRate::value), Some(1.0));
        assert!(cache.resolve("ZER").is_none());
        assert!(cache.resolve("NEG").is_none());
        assert!(cache.resolve("TXT").is_none());
        assert!(cache.resolve("NUL").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_rates_key_is_empty_cache() {
        let payload: RatesPayload = serde_json::from_value(json!({"result": "error"})).unwrap();
        assert!(RateCache::from_payload(payload).is_empty());
    }
}
