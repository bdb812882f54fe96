use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

/// Parse an IANA timezone name, falling back to UTC on anything
/// unrecognized. Company rows carry free-text timezone strings; a typo must
/// degrade, not crash a batch.
pub fn parse_tz(tz: &str) -> Tz {
    tz.parse().unwrap_or(Tz::UTC)
}

/// The instant `now` as seen on a company's wall clock.
pub fn to_local(now: DateTime<Utc>, tz: &str) -> DateTime<Tz> {
    now.with_timezone(&parse_tz(tz))
}

/// Local time-of-day as "HH:MM", the form quiet-hours windows compare
/// against.
pub fn local_hhmm(now: DateTime<Utc>, tz: &str) -> String {
    to_local(now, tz).format("%H:%M").to_string()
}

/// Local hour of day (0-23), used for the digest-hour gate.
pub fn local_hour(now: DateTime<Utc>, tz: &str) -> u32 {
    to_local(now, tz).hour()
}

/// The business-day bucket: the calendar date in the company's timezone.
/// Used in the run-ledger key so "once per day" means once per local day.
pub fn business_day(now: DateTime<Utc>, tz: &str) -> NaiveDate {
    to_local(now, tz).date_naive()
}

/// Business day as "YYYY-MM-DD", the stored form of the ledger key.
pub fn business_day_str(now: DateTime<Utc>, tz: &str) -> String {
    business_day(now, tz).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        assert_eq!(parse_tz("Not/AZone"), Tz::UTC);
        assert_eq!(parse_tz(""), Tz::UTC);
    }

    #[test]
    fn local_clock_shifts_with_zone() {
        // 2025-06-01 20:00 UTC is 01:30 on June 2 in Kolkata (+05:30).
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap();
        assert_eq!(local_hhmm(now, "Asia/Kolkata"), "01:30");
        assert_eq!(local_hour(now, "Asia/Kolkata"), 1);
        assert_eq!(local_hhmm(now, "UTC"), "20:00");
    }

    #[test]
    fn business_day_is_the_local_date() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap();
        // Already June 2 in Kolkata, still June 1 in New York.
        assert_eq!(business_day_str(now, "Asia/Kolkata"), "2025-06-02");
        assert_eq!(business_day_str(now, "America/New_York"), "2025-06-01");
    }
}
