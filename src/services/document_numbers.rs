//! Human-facing document numbers: `<PREFIX>-<MM>/<YY>/<NNNNN>`.
//!
//! The five-digit tail is random. Uniqueness comes from the database index on
//! each number column; [`insert_numbered`] retries an insert with a fresh
//! number when it loses a collision.

use std::fmt;
use std::future::Future;

use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use tracing::warn;

use crate::errors::ServiceError;

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(TN|LN|SN|DN)-\d{2}/\d{2}/\d{5}$").expect("valid pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentPrefix {
    /// Service call ticket
    Ticket,
    Lease,
    Sale,
    Delivery,
}

impl DocumentPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentPrefix::Ticket => "TN",
            DocumentPrefix::Lease => "LN",
            DocumentPrefix::Sale => "SN",
            DocumentPrefix::Delivery => "DN",
        }
    }

    fn document(&self) -> &'static str {
        match self {
            DocumentPrefix::Ticket => "ticket",
            DocumentPrefix::Lease => "lease",
            DocumentPrefix::Sale => "sale",
            DocumentPrefix::Delivery => "delivery",
        }
    }
}

impl fmt::Display for DocumentPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn generate_with<R: Rng + ?Sized>(prefix: DocumentPrefix, on: NaiveDate, rng: &mut R) -> String {
    format!(
        "{}-{:02}/{:02}/{}",
        prefix,
        on.month(),
        on.year().rem_euclid(100),
        rng.gen_range(10000..=99999)
    )
}

/// A fresh number dated today
pub fn generate(prefix: DocumentPrefix) -> String {
    generate_with(prefix, Utc::now().date_naive(), &mut rand::thread_rng())
}

pub fn is_well_formed(number: &str) -> bool {
    NUMBER_PATTERN.is_match(number)
}

/// Runs `attempt` with a document number until it stops failing on a unique
/// violation.
///
/// A caller-supplied `preset` number is tried once; a collision on it is a
/// `Conflict`. Otherwise up to `max_attempts` generated numbers are tried.
/// Each attempt must be a whole transaction, since a failed statement can
/// poison the transaction it ran in.
pub async fn insert_numbered<T, F, Fut>(
    prefix: DocumentPrefix,
    preset: Option<String>,
    max_attempts: u32,
    mut attempt: F,
) -> Result<T, ServiceError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    if let Some(number) = preset {
        if !is_well_formed(&number) {
            return Err(ServiceError::ValidationError(format!(
                "Invalid {} number: {}",
                prefix.document(),
                number
            )));
        }
        return match attempt(number.clone()).await {
            Err(e) if e.is_unique_violation() => Err(ServiceError::Conflict(format!(
                "{} number {} already exists",
                prefix.document(),
                number
            ))),
            other => other,
        };
    }

    for round in 1..=max_attempts.max(1) {
        let number = generate(prefix);
        match attempt(number.clone()).await {
            Err(e) if e.is_unique_violation() => {
                metrics::counter!("bititec_numbering.collisions", 1);
                warn!(%number, round, "document number collision, retrying");
            }
            other => return other,
        }
    }

    Err(ServiceError::Conflict(format!(
        "Could not allocate a unique {} number after {} attempts",
        prefix.document(),
        max_attempts
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sea_orm::DbErr;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn number_carries_month_and_two_digit_year() {
        let mut rng = StdRng::seed_from_u64(7);
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let number = generate_with(DocumentPrefix::Sale, date, &mut rng);
        assert!(number.starts_with("SN-03/26/"));
        assert!(is_well_formed(&number));
    }

    proptest! {
        #[test]
        fn generated_numbers_are_well_formed(seed in any::<u64>(), days in 0i64..40_000) {
            let date = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + chrono::Duration::days(days);
            let mut rng = StdRng::seed_from_u64(seed);
            for prefix in [DocumentPrefix::Ticket, DocumentPrefix::Lease, DocumentPrefix::Sale, DocumentPrefix::Delivery] {
                let number = generate_with(prefix, date, &mut rng);
                prop_assert!(is_well_formed(&number), "{}", number);
            }
        }
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(!is_well_formed("SN-3/26/12345"));
        assert!(!is_well_formed("XX-03/26/12345"));
        assert!(!is_well_formed("SN-03/26/1234"));
    }

    fn collision() -> ServiceError {
        ServiceError::DatabaseError(DbErr::Custom(
            "UNIQUE constraint failed: sales.sale_no".into(),
        ))
    }

    #[tokio::test]
    async fn retries_until_a_number_sticks() {
        let calls = AtomicU32::new(0);
        let number = insert_numbered(DocumentPrefix::Delivery, None, 5, |n| {
            let round = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if round < 2 {
                    Err(collision())
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(number.starts_with("DN-"));
    }

    #[tokio::test]
    async fn exhausted_attempts_are_a_conflict() {
        let err = insert_numbered(DocumentPrefix::Lease, None, 3, |_| async {
            Err::<(), _>(collision())
        })
        .await
        .unwrap_err();
        assert_matches!(err, ServiceError::Conflict(_));
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let err = insert_numbered(DocumentPrefix::Ticket, None, 5, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ServiceError::ValidationError("bad".into())) }
        })
        .await
        .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_preset_number_is_a_conflict() {
        let err = insert_numbered(
            DocumentPrefix::Sale,
            Some("SN-01/26/12345".into()),
            5,
            |_| async { Err::<(), _>(collision()) },
        )
        .await
        .unwrap_err();
        assert_matches!(err, ServiceError::Conflict(msg) if msg.contains("SN-01/26/12345"));
    }
}
