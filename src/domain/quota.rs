//! Daily send quota ledger
//!
//! Each restaurant carries `email_quota_used`, `email_quota_limit` and
//! `email_quota_reset_at`. The counter is zeroed once "now" reaches the reset
//! instant, which then moves to the start of the following local day.

use super::restaurant::Restaurant;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Read-only view of the ledger fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderQuota {
    pub limit: i64,
    pub used: i64,
    pub resets_at: DateTime<Utc>,
}

/// Start of the calendar day following `now`, in the timezone `tz`
pub fn next_reset_after<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let today = now.with_timezone(tz).date_naive();
    let tomorrow = today.succ_opt().unwrap_or(today);
    let midnight = tomorrow.and_time(NaiveTime::MIN);

    // Midnight can fall inside a DST gap; the first valid instant after it is used then.
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| now + Duration::days(1))
}

impl Restaurant {
    /// The reset instant has been reached
    pub fn quota_needs_reset(&self, now: DateTime<Utc>) -> bool {
        now >= self.email_quota_reset_at
    }

    /// Apply the daily reset in memory. Returns whether anything changed.
    pub fn reset_quota_if_due<Tz: TimeZone>(&mut self, now: DateTime<Utc>, tz: &Tz) -> bool {
        if !self.quota_needs_reset(now) {
            return false;
        }
        self.email_quota_used = 0;
        self.email_quota_reset_at = next_reset_after(now, tz);
        true
    }

    /// Sends left today (may be negative if the limit was lowered)
    pub fn quota_remaining(&self) -> i64 {
        self.email_quota_limit - self.email_quota_used
    }

    pub fn quota_exhausted(&self) -> bool {
        self.email_quota_used >= self.email_quota_limit
    }

    pub fn quota(&self) -> ProviderQuota {
        ProviderQuota {
            limit: self.email_quota_limit,
            used: self.email_quota_used,
            resets_at: self.email_quota_reset_at,
        }
    }
}

/// How many of `requested` recipients fit in `remaining` quota
pub fn clamp_to_quota(requested: usize, remaining: i64) -> usize {
    if remaining <= 0 {
        return 0;
    }
    usize::try_from(remaining).map_or(requested, |r| requested.min(r))
}
