// 🗄️ Country Store - persisted country records (SQLite + WAL)
//
// bulk_insert and bulk_update are each one transaction: either every record
// in the batch is applied or none is.

use crate::country::{name_key, CountryRecord, NewCountry};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("population {0} does not fit in the store")]
    PopulationOutOfRange(u64),

    #[error("no stored country with id {0}")]
    UnknownId(String),
}

// ============================================================================
// QUERY FILTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GdpSort {
    GdpDesc,
    GdpAsc,
}

impl FromStr for GdpSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gdp_desc" => Ok(GdpSort::GdpDesc),
            "gdp_asc" => Ok(GdpSort::GdpAsc),
            _ => Err(format!("Invalid sort: {} (expected gdp_desc or gdp_asc)", s)),
        }
    }
}

/// Region and currency match case-insensitively and combine with AND.
/// Without a sort, records come back ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryFilter {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<GdpSort>,
}

// ============================================================================
// STORE CONTRACT
// ============================================================================

pub trait CountryStore: Send + Sync {
    /// Case-insensitive lookup by name
    fn find_by_name(&self, name: &str) -> Result<Option<CountryRecord>, StoreError>;

    fn find_by_filter(&self, filter: &CountryFilter) -> Result<Vec<CountryRecord>, StoreError>;

    /// Insert every record or none; returns the number inserted
    fn bulk_insert(&self, records: &[NewCountry]) -> Result<usize, StoreError>;

    /// Update every record (matched by id) or none; returns the number updated
    fn bulk_update(&self, records: &[CountryRecord]) -> Result<usize, StoreError>;

    /// Returns false when no record matched
    fn delete_by_name(&self, name: &str) -> Result<bool, StoreError>;

    fn count(&self) -> Result<u64, StoreError>;

    /// Names of the `n` records with the highest estimated GDP, descending
    fn top_by_gdp(&self, n: usize) -> Result<Vec<String>, StoreError>;

    fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>, StoreError>;
}

// ============================================================================
// SQLITE IMPLEMENTATION
// ============================================================================

const COLUMNS: &str = "id, name, capital, region, population, currency_code,
                       exchange_rate, estimated_gdp, flag_url, last_refreshed_at";

pub struct SqliteCountryStore {
    conn: Mutex<Connection>,
}

impl SqliteCountryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        setup_database(&conn)?;
        Ok(SqliteCountryStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    // Enable WAL mode for crash recovery (in-memory databases report "memory")
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;

    // name_key holds the lower-cased name and enforces one record per country
    conn.execute(
        "CREATE TABLE IF NOT EXISTS countries (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            name_key TEXT UNIQUE NOT NULL,
            capital TEXT,
            region TEXT,
            population INTEGER NOT NULL CHECK (population >= 0),
            currency_code TEXT,
            exchange_rate REAL,
            estimated_gdp REAL NOT NULL DEFAULT 0,
            flag_url TEXT,
            last_refreshed_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_countries_region ON countries(region)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_countries_currency ON countries(currency_code)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_countries_gdp ON countries(estimated_gdp)",
        [],
    )?;

    Ok(())
}

impl CountryStore for SqliteCountryStore {
    fn find_by_name(&self, name: &str) -> Result<Option<CountryRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM countries WHERE name_key = ?1",
            COLUMNS
        ))?;

        let mut rows = stmt.query_map([name_key(name)], row_to_record)?;
        Ok(rows.next().transpose()?)
    }

    fn find_by_filter(&self, filter: &CountryFilter) -> Result<Vec<CountryRecord>, StoreError> {
        let mut conditions = Vec::new();
        let mut values: Vec<&str> = Vec::new();

        if let Some(region) = filter.region.as_deref() {
            values.push(region);
            conditions.push(format!("region = ?{} COLLATE NOCASE", values.len()));
        }

        if let Some(currency) = filter.currency.as_deref() {
            values.push(currency);
            conditions.push(format!("currency_code = ?{} COLLATE NOCASE", values.len()));
        }

        let mut sql = format!("SELECT {} FROM countries", COLUMNS);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        sql.push_str(match filter.sort {
            Some(GdpSort::GdpDesc) => " ORDER BY estimated_gdp DESC, name_key ASC",
            Some(GdpSort::GdpAsc) => " ORDER BY estimated_gdp ASC, name_key ASC",
            None => " ORDER BY name_key ASC",
        });

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn bulk_insert(&self, records: &[NewCountry]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let stamp = encode_timestamp(Utc::now());

        {
            let mut stmt = tx.prepare(
                "INSERT INTO countries (
                    id, name, name_key, capital, region, population,
                    currency_code, exchange_rate, estimated_gdp, flag_url, last_refreshed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;

            for record in records {
                stmt.execute(params![
                    uuid::Uuid::new_v4().to_string(),
                    record.name,
                    name_key(&record.name),
                    record.capital,
                    record.region,
                    population_column(record.population)?,
                    record.currency_code,
                    record.exchange_rate,
                    record.estimated_gdp,
                    record.flag_url,
                    stamp,
                ])?;
            }
        }

        // Dropping the transaction on any early return above rolls it back
        tx.commit()?;
        Ok(records.len())
    }

    fn bulk_update(&self, records: &[CountryRecord]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let stamp = encode_timestamp(Utc::now());

        {
            let mut stmt = tx.prepare(
                "UPDATE countries
                 SET name = ?1, name_key = ?2, capital = ?3, region = ?4, population = ?5,
                     currency_code = ?6, exchange_rate = ?7, estimated_gdp = ?8,
                     flag_url = ?9, last_refreshed_at = ?10
                 WHERE id = ?11",
            )?;

            for record in records {
                let changed = stmt.execute(params![
                    record.name,
                    name_key(&record.name),
                    record.capital,
                    record.region,
                    population_column(record.population)?,
                    record.currency_code,
                    record.exchange_rate,
                    record.estimated_gdp,
                    record.flag_url,
                    stamp,
                    record.id,
                ])?;

                if changed == 0 {
                    return Err(StoreError::UnknownId(record.id.clone()));
                }
            }
        }

        tx.commit()?;
        Ok(records.len())
    }

    fn delete_by_name(&self, name: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM countries WHERE name_key = ?1",
            [name_key(name)],
        )?;
        Ok(deleted > 0)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM countries", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn top_by_gdp(&self, n: usize) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM countries
             ORDER BY estimated_gdp DESC, name_key ASC
             LIMIT ?1",
        )?;

        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let names = stmt
            .query_map([limit], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(names)
    }

    fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let conn = self.lock()?;
        let latest: Option<String> = conn.query_row(
            "SELECT MAX(last_refreshed_at) FROM countries",
            [],
            |row| row.get(0),
        )?;

        latest
            .map(|s| decode_timestamp(&s, 0))
            .transpose()
            .map_err(StoreError::from)
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<CountryRecord> {
    let population: i64 = row.get(4)?;
    let population = u64::try_from(population)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Integer, Box::new(e)))?;
    let refreshed: String = row.get(9)?;

    Ok(CountryRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        capital: row.get(2)?,
        region: row.get(3)?,
        population,
        currency_code: row.get(5)?,
        exchange_rate: row.get(6)?,
        estimated_gdp: row.get(7)?,
        flag_url: row.get(8)?,
        last_refreshed_at: decode_timestamp(&refreshed, 9)?,
    })
}

fn population_column(population: u64) -> Result<i64, StoreError> {
    i64::try_from(population).map_err(|_| StoreError::PopulationOutOfRange(population))
}

/// Fixed-width RFC 3339 so that lexical order in SQL matches time order
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

// ============================================================================
// TESTS
// ============================================================================
