//! Banked-unit ledger rules: creating entries from surplus and consuming
//! entries against a deficit. Everything here works on candidate sets passed
//! in by the caller; no entry is ever fetched or stored from this module.

use crate::core::unit_slack;
use crate::domain::model::{
    AppliedEntry, ApplyBankedResult, BankEntry, BankSurplusRequest,
};
use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::{validate_non_negative, validate_positive, validate_positive_number};
use chrono::{DateTime, Months, Utc};
use uuid::Uuid;

/// `date` plus whole calendar years. Feb 29 lands on Feb 28 in non-leap years.
pub fn add_years(date: DateTime<Utc>, years: u32) -> Result<DateTime<Utc>> {
    years
        .checked_mul(12)
        .and_then(|months| date.checked_add_months(Months::new(months)))
        .ok_or_else(|| {
            LedgerError::validation(
                "banking_validity_years",
                years,
                "Expiry date is out of the representable range",
            )
        })
}

/// Units still available on entries that have not expired at `at`.
pub fn banked_balance<'a, I>(entries: I, at: DateTime<Utc>) -> f64
where
    I: IntoIterator<Item = &'a BankEntry>,
{
    entries
        .into_iter()
        .filter(|entry| !entry.is_expired(at))
        .map(|entry| entry.remaining_units)
        .sum()
}

/// Builds the entry for a surplus deposit. `existing` is the ship's current
/// set of entries; only those unexpired at the banking date count towards
/// `max_banking_capacity`.
pub fn bank_surplus(
    ship_id: &str,
    request: &BankSurplusRequest,
    existing: &[BankEntry],
) -> Result<BankEntry> {
    validate_positive("surplus_units", request.surplus_units)?;
    validate_positive_number("banking_validity_years", request.banking_validity_years, 1)?;

    if let Some(capacity) = request.max_banking_capacity {
        validate_non_negative("max_banking_capacity", capacity)?;

        let current = banked_balance(
            existing.iter().filter(|entry| entry.ship_id == ship_id),
            request.banking_date,
        );
        if current + request.surplus_units > capacity + unit_slack(capacity) {
            return Err(LedgerError::CapacityExceeded {
                ship_id: ship_id.to_string(),
                requested: request.surplus_units,
                current,
                capacity,
            });
        }
    }

    let expiry_date = add_years(request.banking_date, request.banking_validity_years)?;

    Ok(BankEntry {
        id: Uuid::new_v4().to_string(),
        ship_id: ship_id.to_string(),
        units: request.surplus_units,
        remaining_units: request.surplus_units,
        banked_at: request.banking_date,
        expiry_date,
    })
}

/// Covers `deficit` from `available`, earliest expiry first. Expired and
/// exhausted entries are skipped; an entry may be left partially consumed.
pub fn apply_banked(
    deficit: f64,
    application_date: DateTime<Utc>,
    available: &[BankEntry],
) -> Result<ApplyBankedResult> {
    validate_positive("deficit", deficit)?;

    let mut usable: Vec<&BankEntry> = available
        .iter()
        .filter(|entry| entry.is_usable(application_date))
        .collect();
    usable.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then(a.banked_at.cmp(&b.banked_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut remaining_deficit = deficit;
    let mut applied_units = 0.0;
    let mut entries_consumed = Vec::new();

    for entry in usable {
        if remaining_deficit <= 0.0 {
            break;
        }
        let take = entry.remaining_units.min(remaining_deficit);
        remaining_deficit -= take;
        applied_units += take;
        entries_consumed.push(AppliedEntry {
            id: entry.id.clone(),
            units_applied: take,
            remaining_units: entry.remaining_units - take,
        });
    }

    Ok(ApplyBankedResult {
        applied_units,
        remaining_deficit,
        entries_consumed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn entry(id: &str, units: f64, banked_at: DateTime<Utc>, expiry: DateTime<Utc>) -> BankEntry {
        BankEntry {
            id: id.to_string(),
            ship_id: "S1".to_string(),
            units,
            remaining_units: units,
            banked_at,
            expiry_date: expiry,
        }
    }

    fn request(units: f64, on: DateTime<Utc>, capacity: Option<f64>) -> BankSurplusRequest {
        BankSurplusRequest {
            surplus_units: units,
            banking_date: on,
            max_banking_capacity: capacity,
            banking_validity_years: 2,
        }
    }

    #[test]
    fn test_bank_surplus_sets_expiry() {
        let banked = bank_surplus("S1", &request(100.0, date(2024, 1, 1), None), &[]).unwrap();
        assert_eq!(banked.units, 100.0);
        assert_eq!(banked.remaining_units, 100.0);
        assert_eq!(banked.banked_at, date(2024, 1, 1));
        assert_eq!(banked.expiry_date, date(2026, 1, 1));
    }

    #[test]
    fn test_bank_surplus_rejects_non_positive() {
        for units in [0.0, -5.0, f64::NAN] {
            let err = bank_surplus("S1", &request(units, date(2024, 1, 1), None), &[]).unwrap_err();
            assert!(matches!(err, LedgerError::Validation { .. }));
        }

        let mut zero_years = request(10.0, date(2024, 1, 1), None);
        zero_years.banking_validity_years = 0;
        assert!(bank_surplus("S1", &zero_years, &[]).is_err());
    }

    #[test]
    fn test_capacity_counts_only_unexpired_entries() {
        let existing = vec![
            entry("old", 80.0, date(2021, 1, 1), date(2023, 1, 1)),
            entry("live", 50.0, date(2023, 6, 1), date(2025, 6, 1)),
        ];

        // 50 live + 50 new fits in 100; the expired 80 is ignored
        assert!(bank_surplus("S1", &request(50.0, date(2024, 1, 1), Some(100.0)), &existing).is_ok());

        let err = bank_surplus("S1", &request(51.0, date(2024, 1, 1), Some(100.0)), &existing)
            .unwrap_err();
        match err {
            LedgerError::CapacityExceeded {
                current, capacity, ..
            } => {
                assert_eq!(current, 50.0);
                assert_eq!(capacity, 100.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_capacity_can_be_filled_exactly_with_fractions() {
        let existing = vec![
            entry("a", 0.1, date(2024, 1, 1), date(2026, 1, 1)),
            entry("b", 0.2, date(2024, 1, 2), date(2026, 1, 2)),
        ];
        // 0.1 + 0.2 + 0.3 is 0.6000000000000001 in f64
        let banked = bank_surplus("S1", &request(0.3, date(2024, 2, 1), Some(0.6)), &existing);
        assert!(banked.is_ok());

        let over = bank_surplus("S1", &request(0.31, date(2024, 2, 1), Some(0.6)), &existing);
        assert!(matches!(over, Err(LedgerError::CapacityExceeded { .. })));
    }

    #[test]
    fn test_capacity_ignores_other_ships() {
        let mut other = entry("x", 90.0, date(2024, 1, 1), date(2026, 1, 1));
        other.ship_id = "S2".to_string();
        assert!(bank_surplus("S1", &request(100.0, date(2024, 2, 1), Some(100.0)), &[other]).is_ok());
    }

    #[test]
    fn test_partial_application() {
        let banked = bank_surplus("S1", &request(100.0, date(2024, 1, 1), None), &[]).unwrap();
        let result = apply_banked(60.0, date(2024, 6, 1), &[banked.clone()]).unwrap();

        assert_eq!(result.applied_units, 60.0);
        assert_eq!(result.remaining_deficit, 0.0);
        assert_eq!(result.entries_consumed.len(), 1);
        assert_eq!(result.entries_consumed[0].id, banked.id);
        assert_eq!(result.entries_consumed[0].units_applied, 60.0);
        assert_eq!(result.entries_consumed[0].remaining_units, 40.0);
    }

    #[test]
    fn test_expired_entries_are_unusable() {
        let expired = entry("a", 100.0, date(2022, 1, 1), date(2024, 1, 1));
        let result = apply_banked(30.0, date(2024, 1, 2), &[expired]).unwrap();
        assert_eq!(result.applied_units, 0.0);
        assert_eq!(result.remaining_deficit, 30.0);
        assert!(result.entries_consumed.is_empty());
    }

    #[test]
    fn test_entry_usable_on_its_expiry_date() {
        let last_day = entry("a", 10.0, date(2022, 1, 1), date(2024, 1, 1));
        let result = apply_banked(5.0, date(2024, 1, 1), &[last_day]).unwrap();
        assert_eq!(result.applied_units, 5.0);
    }

    #[test]
    fn test_earliest_expiry_first() {
        let b = entry("b", 50.0, date(2024, 1, 1), date(2026, 1, 1));
        let a = entry("a", 50.0, date(2023, 1, 1), date(2025, 1, 1));
        let result = apply_banked(30.0, date(2024, 6, 1), &[b, a]).unwrap();

        assert_eq!(result.entries_consumed.len(), 1);
        assert_eq!(result.entries_consumed[0].id, "a");
        assert_eq!(result.entries_consumed[0].remaining_units, 20.0);
    }

    #[test]
    fn test_spans_entries_and_reports_shortfall() {
        let a = entry("a", 50.0, date(2023, 1, 1), date(2025, 1, 1));
        let mut b = entry("b", 50.0, date(2024, 1, 1), date(2026, 1, 1));
        b.remaining_units = 20.0;
        let result = apply_banked(100.0, date(2024, 6, 1), &[a, b]).unwrap();

        assert_eq!(result.applied_units, 70.0);
        assert_eq!(result.remaining_deficit, 30.0);
        let ids: Vec<_> = result.entries_consumed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(result.entries_consumed.iter().all(|e| e.remaining_units == 0.0));
    }

    #[test]
    fn test_rejects_non_positive_deficit() {
        assert!(apply_banked(0.0, date(2024, 1, 1), &[]).is_err());
        assert!(apply_banked(-10.0, date(2024, 1, 1), &[]).is_err());
    }

    #[test]
    fn test_add_years_leap_day() {
        assert_eq!(add_years(date(2024, 2, 29), 1).unwrap(), date(2025, 2, 28));
        assert_eq!(add_years(date(2024, 2, 29), 4).unwrap(), date(2028, 2, 29));
    }
}
