// 🌍 Country records - persisted entity, snapshot entries, and the pure merge step
//
// Stored records carry a store-assigned identity; snapshot entries are the raw,
// loosely-typed rows returned by the external country source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// PERSISTED ENTITY
// ============================================================================

/// A country as persisted in the store.
///
/// Optional attributes are `None` (serialized as `null`), never empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    /// Opaque identity assigned by the store on insert, immutable thereafter
    pub id: String,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: u64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: f64,
    pub flag_url: Option<String>,
    /// Set by the store whenever the record is inserted or updated
    pub last_refreshed_at: DateTime<Utc>,
}

impl CountryRecord {
    /// Build the updated version of this record from freshly derived fields.
    ///
    /// Identity is preserved; every other attribute comes from `fresh`.
    /// `last_refreshed_at` is left untouched here because the store stamps it
    /// on commit.
    pub fn refreshed_from(&self, fresh: NewCountry) -> CountryRecord {
        CountryRecord {
            id: self.id.clone(),
            name: fresh.name,
            capital: fresh.capital,
            region: fresh.region,
            population: fresh.population,
            currency_code: fresh.currency_code,
            exchange_rate: fresh.exchange_rate,
            estimated_gdp: fresh.estimated_gdp,
            flag_url: fresh.flag_url,
            last_refreshed_at: self.last_refreshed_at,
        }
    }

    /// Case-insensitive uniqueness key
    pub fn key(&self) -> String {
        name_key(&self.name)
    }
}

/// A fully derived country that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCountry {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: u64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: f64,
    pub flag_url: Option<String>,
}

/// Normalized form of a country name used for case-insensitive matching.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ============================================================================
// EXTERNAL SNAPSHOT ENTRY
// ============================================================================

/// One entry of the external country snapshot.
///
/// `name`, `population` and `currencies` stay as raw JSON so that a wrongly
/// typed field is rejected by validation for that entry alone instead of
/// failing the decode of the whole snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalCountry {
    #[serde(default)]
    pub name: Value,

    #[serde(default, deserialize_with = "lenient_string")]
    pub capital: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub region: Option<String>,

    #[serde(default)]
    pub population: Value,

    #[serde(default)]
    pub currencies: Value,

    #[serde(default, deserialize_with = "lenient_string")]
    pub flag: Option<String>,
}

impl ExternalCountry {
    /// Code of the first listed currency.
    ///
    /// Returns `Value::Null` when the list is absent, empty, or its first
    /// entry carries no code. Any other value is passed through untouched so
    /// validation can reject it.
    pub fn first_currency_code(&self) -> Value {
        self.currencies
            .as_array()
            .and_then(|list| list.first())
            .and_then(|currency| currency.get("code"))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Name for log lines and rejection reports, even when it is not a string
    pub fn display_name(&self) -> String {
        match &self.name {
            Value::String(s) => s.clone(),
            Value::Null => "<missing>".to_string(),
            other => other.to_string(),
        }
    }
}

/// Non-string and blank values collapse to `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}
