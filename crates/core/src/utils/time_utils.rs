//! Group-local calendar math.
//!
//! Every deadline in the engine is defined in terms of a group's IANA time
//! zone: "today", the midnight at which a proposed date arrives, the start
//! and end of a goal. This module is the single source of truth for mapping
//! a local calendar date to the UTC instant of that date's midnight.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::constants::TZ_CONVERGENCE_ITERATIONS;

/// Parses an IANA zone identifier. `None` for unrecognized identifiers;
/// callers treat that as a retryable configuration error, not a fatal one.
pub fn parse_zone(zone: &str) -> Option<Tz> {
    zone.parse::<Tz>().ok()
}

/// Returns the UTC instant at which `date` begins in `zone`.
///
/// Works by iterative convergence rather than offset lookup so that zones
/// with non-integer or historically varying offsets resolve correctly:
/// start from the local midnight interpreted as UTC, render that guess back
/// through the zone, and correct by the observed discrepancy. The loop is
/// bounded; for zones where midnight falls in a DST gap the final guess is
/// the stable instant the zone actually observes.
pub fn local_midnight_utc_tz(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let target = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let mut guess = Utc.from_utc_datetime(&target);

    for _ in 0..TZ_CONVERGENCE_ITERATIONS {
        let rendered = guess.with_timezone(&tz).naive_local();
        let discrepancy = target - rendered;
        if discrepancy == Duration::zero() {
            break;
        }
        guess += discrepancy;
    }

    guess
}

/// Zone-identifier variant of [`local_midnight_utc_tz`].
pub fn local_midnight_utc(date: NaiveDate, zone: &str) -> Option<DateTime<Utc>> {
    parse_zone(zone).map(|tz| local_midnight_utc_tz(date, tz))
}

/// The calendar date it currently is in `tz`, as of `now`.
pub fn local_today_tz(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Zone-identifier variant of [`local_today_tz`].
pub fn local_today(now: DateTime<Utc>, zone: &str) -> Option<NaiveDate> {
    parse_zone(zone).map(|tz| local_today_tz(now, tz))
}
