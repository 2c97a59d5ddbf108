/// Per-number enrichment logic shared by every pipeline mode
///
/// This module provides the pieces the batch loop is built from:
/// 1. Retry a single lookup, reducing it to a record plus a "used default" flag
/// 2. Run the configured lookups for one number and merge their records
/// 3. Track success/failure counts per lookup
/// 4. Validate input numbers as US phone numbers (log-only)
use crate::models::{LookupRecord, PhoneNumber};
use crate::services::{LookupOutcome, LookupService};
use crate::token::ClientTokenSource;
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use serde::Serialize;
use std::time::Duration;

/// A lookup reduced to its final record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLookup {
    pub record: LookupRecord,
    /// True when every attempt failed and the sentinel record was used.
    pub used_default: bool,
    pub attempts: u32,
}

/// Success/failure tallies for one lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LookupStats {
    pub name: String,
    pub successful: u64,
    pub failed: u64,
}

impl LookupStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, resolved: &ResolvedLookup) {
        if resolved.used_default {
            self.failed += 1;
        } else {
            self.successful += 1;
        }
    }
}

/// A lookup together with its attempt budget.
pub struct LookupStep {
    pub service: LookupService,
    pub max_attempts: u32,
}

impl LookupStep {
    pub fn new(service: LookupService, max_attempts: u32) -> Self {
        Self {
            service,
            max_attempts: max_attempts.max(1),
        }
    }
}

/// Runs `step` until it succeeds or its attempts are exhausted.
///
/// A fresh client token is drawn for every attempt and `retry_delay`
/// separates consecutive attempts. Exhaustion yields the lookup's
/// sentinel record; it is never an error.
pub async fn fetch_with_retries(
    step: &LookupStep,
    phone: &str,
    tokens: &dyn ClientTokenSource,
    retry_delay: Duration,
) -> ResolvedLookup {
    let name = step.service.name();

    for attempt in 1..=step.max_attempts {
        let token = tokens.next_token();
        match step.service.fetch(phone, &token).await {
            LookupOutcome::Success(record) => {
                return ResolvedLookup {
                    record,
                    used_default: false,
                    attempts: attempt,
                };
            }
            LookupOutcome::Failure(reason) => {
                tracing::warn!(
                    "[{} Error] Attempt {}/{} failed for {}: {}",
                    name,
                    attempt,
                    step.max_attempts,
                    phone,
                    reason
                );
            }
        }

        if attempt < step.max_attempts && !retry_delay.is_zero() {
            tokio::time::sleep(retry_delay).await;
        }
    }

    ResolvedLookup {
        record: step.service.default_record(phone),
        used_default: true,
        attempts: step.max_attempts,
    }
}

/// Runs every step for `phone` in order and merges the results.
///
/// Later steps overwrite fields of earlier ones; `Phone` always holds the
/// input identifier. `stats` must hold one entry per step.
pub async fn enrich_phone(
    steps: &[LookupStep],
    stats: &mut [LookupStats],
    phone: &PhoneNumber,
    tokens: &dyn ClientTokenSource,
    retry_delay: Duration,
) -> LookupRecord {
    let mut merged = LookupRecord::new(phone);

    for (step, tally) in steps.iter().zip(stats.iter_mut()) {
        let resolved = fetch_with_retries(step, phone, tokens, retry_delay).await;
        tally.record(&resolved);
        merged.merge(resolved.record);
    }

    merged.set(crate::models::FIELD_PHONE, phone.as_str());
    merged
}

/// Validate and normalize a US phone number
///
/// Uses phonenumber library (port of Google's libphonenumber) to:
/// - Parse the number with the US region
/// - Check it is a valid US number
/// - Return normalized E.164 format (+16502530000)
///
/// Returns: (is_valid, normalized_phone_or_error_msg)
pub fn validate_us_phone(raw: &str) -> (bool, String) {
    let digits = raw.chars().filter(|c| c.is_ascii_digit()).count();
    if raw.trim().is_empty() || digits < 10 {
        return (false, "Phone too short".to_string());
    }

    match phonenumber::parse(Some(CountryId::US), raw) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::trace!("Valid US phone: {} -> {}", raw, formatted);
                (true, formatted)
            } else {
                (false, "Invalid US phone number".to_string())
            }
        }
        Err(e) => (false, format!("Parse error: {:?}", e)),
    }
}
