//! Demo payments dataset.
//!
//! Builds the `transactions` table and fills it with weighted-random
//! rows spread over the last 60 days, so date questions ("yesterday",
//! "last month") have data to hit. Seeding is the only writer in the
//! crate; the analyst core opens the same file read-only.

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rusqlite::{params, Connection};
use std::path::Path;

pub const DEFAULT_ROWS: usize = 2_000;

const CREATE_TRANSACTIONS: &str = "
    CREATE TABLE IF NOT EXISTS transactions (
        id TEXT PRIMARY KEY,
        amount_cents INTEGER NOT NULL,
        currency TEXT NOT NULL,
        status TEXT NOT NULL,
        payment_method TEXT NOT NULL,
        country_code TEXT NOT NULL,
        customer_email TEXT NOT NULL,
        description TEXT NOT NULL,
        created_at DATETIME NOT NULL
    );
";

const CURRENCIES: &[(&str, f64)] = &[("USD", 0.60), ("EUR", 0.30), ("GBP", 0.10)];

const STATUSES: &[(&str, f64)] = &[
    ("succeeded", 0.85),
    ("failed", 0.10),
    ("pending", 0.03),
    ("refunded", 0.02),
];

const METHODS: &[(&str, f64)] = &[
    ("card", 0.70),
    ("paypal", 0.10),
    ("sofort", 0.10),
    ("ideal", 0.05),
    ("apple_pay", 0.05),
];

const COUNTRIES: &[(&str, f64)] = &[
    ("US", 0.50),
    ("DE", 0.20),
    ("FR", 0.10),
    ("GB", 0.10),
    ("BR", 0.05),
    ("JP", 0.05),
];

const MAIL_NAMES: &[&str] = &[
    "ana", "ben", "carla", "dmitri", "elif", "frank", "gita", "hana", "ivan", "june",
];

const MAIL_DOMAINS: &[&str] = &["example.com", "example.org", "mail.test", "inbox.test"];

const BUZZ_ADJECTIVES: &[&str] = &[
    "scalable", "seamless", "dynamic", "global", "turn-key", "frictionless",
];

const BUZZ_NOUNS: &[&str] = &[
    "platforms",
    "integrations",
    "channels",
    "paradigms",
    "deliverables",
    "marketplaces",
];

/// Populate the demo database. Returns the number of rows inserted; zero
/// means the table already had data and was left alone.
pub fn seed(path: &Path, rows: usize) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    conn.execute_batch(CREATE_TRANSACTIONS)
        .context("Failed to create transactions table")?;

    let existing: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
    if existing > 0 {
        return Ok(0);
    }

    let mut rng = thread_rng();
    let currency_dist = WeightedIndex::new(CURRENCIES.iter().map(|(_, w)| *w))?;
    let status_dist = WeightedIndex::new(STATUSES.iter().map(|(_, w)| *w))?;
    let method_dist = WeightedIndex::new(METHODS.iter().map(|(_, w)| *w))?;
    let country_dist = WeightedIndex::new(COUNTRIES.iter().map(|(_, w)| *w))?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO transactions
             (id, amount_cents, currency, status, payment_method, country_code,
              customer_email, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;

        for _ in 0..rows {
            let currency = CURRENCIES[currency_dist.sample(&mut rng)].0;
            let status = STATUSES[status_dist.sample(&mut rng)].0;
            let mut method = METHODS[method_dist.sample(&mut rng)].0;
            let country = COUNTRIES[country_dist.sample(&mut rng)].0;

            // German traffic skews towards sofort.
            if country == "DE" && rng.gen_bool(0.5) {
                method = "sofort";
            }

            let amount_cents: i64 = rng.gen_range(500..=50_000);
            let created_at = Utc::now() - ChronoDuration::days(rng.gen_range(0..=60));

            stmt.execute(params![
                transaction_id(&mut rng),
                amount_cents,
                currency,
                status,
                method,
                country,
                customer_email(&mut rng),
                description(&mut rng),
                created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ])?;
        }
    }
    tx.commit()?;

    Ok(rows)
}

/// Stripe-looking id: `tx_` plus 16 hex chars.
fn transaction_id(rng: &mut impl Rng) -> String {
    let bytes: [u8; 8] = rng.gen();
    format!("tx_{}", hex::encode(bytes))
}

fn customer_email(rng: &mut impl Rng) -> String {
    format!(
        "{}{}@{}",
        MAIL_NAMES[rng.gen_range(0..MAIL_NAMES.len())],
        rng.gen_range(1..100),
        MAIL_DOMAINS[rng.gen_range(0..MAIL_DOMAINS.len())],
    )
}

fn description(rng: &mut impl Rng) -> String {
    format!(
        "Payment for {} {}",
        BUZZ_ADJECTIVES[rng.gen_range(0..BUZZ_ADJECTIVES.len())],
        BUZZ_NOUNS[rng.gen_range(0..BUZZ_NOUNS.len())],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn seeds_the_requested_number_of_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payments.db");

        let inserted = seed(&path, 200).unwrap();
        assert_eq!(inserted, 200);

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 200);
    }

    #[test]
    fn second_run_leaves_existing_data_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payments.db");

        assert_eq!(seed(&path, 50).unwrap(), 50);
        assert_eq!(seed(&path, 50).unwrap(), 0);

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 50);
    }

    #[test]
    fn rows_look_like_payments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payments.db");
        seed(&path, 100).unwrap();

        let conn = Connection::open(&path).unwrap();
        let mut stmt = conn
            .prepare("SELECT id, amount_cents, status, created_at FROM transactions")
            .unwrap();
        let mut rows = stmt.query([]).unwrap();

        while let Some(row) = rows.next().unwrap() {
            let id: String = row.get(0).unwrap();
            assert!(id.starts_with("tx_"), "{id}");
            assert_eq!(id.len(), 19, "{id}");

            let amount: i64 = row.get(1).unwrap();
            assert!((500..=50_000).contains(&amount));

            let status: String = row.get(2).unwrap();
            assert!(["succeeded", "failed", "pending", "refunded"].contains(&status.as_str()));

            let created_at: String = row.get(3).unwrap();
            let parsed = NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S");
            assert!(parsed.is_ok(), "{created_at}");
        }
    }
}
