//! Durable Number Sequences
//!
//! Every business number draws its sequence from the counters table,
//! one row per scope. The upsert increments and returns atomically, so
//! two concurrent callers always see distinct values. Sequences are
//! monotonic, not gapless: a caller that fails after drawing a value
//! simply leaves a gap.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct CounterStore {
    pool: PgPool,
}

impl CounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Draw the next value for `scope`, creating the row at 1 on first
    /// use.
    pub async fn next(&self, scope: &str) -> Result<i64> {
        let (value,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO counters (scope, value) VALUES ($1, 1)
            ON CONFLICT (scope) DO UPDATE SET value = counters.value + 1
            RETURNING value
            "#,
        )
        .bind(scope)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to advance counter {}", scope))?;

        Ok(value)
    }
}

/// Per-day request number sequence.
pub fn request_scope(date: NaiveDate) -> String {
    format!("request:{}", date.format("%d%m%y"))
}

/// Per-day report number sequence.
pub fn report_scope(date: NaiveDate) -> String {
    format!("report:{}", date.format("%d%m%y"))
}

/// Per-year worksheet sequence.
pub fn worksheet_scope(year: i32) -> String {
    format!("worksheet:{}", year)
}

/// Per-series-per-year quotation sequence. Initials do not take part;
/// QG-AR-001-25 and QG-002-25 share one series.
pub fn quotation_scope(prefix: &str, year: i32) -> String {
    format!("quotation:{}-{:02}", prefix, year % 100)
}

/// Per-year enquiry sequence.
pub fn enquiry_scope(year: i32) -> String {
    format!("enquiry:{}", year)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_scope_keys() {
        assert_eq!(request_scope(d(2025, 12, 12)), "request:121225");
        assert_eq!(report_scope(d(2026, 1, 5)), "report:050126");
        assert_eq!(worksheet_scope(2026), "worksheet:2026");
        assert_eq!(quotation_scope("QG", 2025), "quotation:QG-25");
        assert_eq!(enquiry_scope(2026), "enquiry:2026");
    }

    #[test]
    fn test_scopes_partition_by_period() {
        // A new day or year starts a fresh series
        assert_ne!(request_scope(d(2025, 12, 12)), request_scope(d(2025, 12, 13)));
        assert_ne!(quotation_scope("QG", 2025), quotation_scope("QG", 2026));
        assert_ne!(quotation_scope("QG", 2025), quotation_scope("QL", 2025));
    }
}
