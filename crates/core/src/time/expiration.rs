use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};

const DEFAULT_EXPIRATIONS: usize = 3;
const DEFAULT_MAX_ATTEMPTS: usize = 52;

/// How many weekly expirations to collect and how far to look for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationWindow {
    /// Successful chain fetches required.
    pub expirations: usize,
    /// Weekly candidates tried before giving up.
    pub max_attempts: usize,
}

impl Default for ExpirationWindow {
    fn default() -> Self {
        Self {
            expirations: DEFAULT_EXPIRATIONS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ExpirationWindow {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("OPTFINDER_EXPIRATIONS") {
            if let Ok(n) = s.parse::<usize>() {
                out.expirations = n;
            }
        }

        if let Ok(s) = std::env::var("OPTFINDER_MAX_ATTEMPTS") {
            if let Ok(n) = s.parse::<usize>() {
                out.max_attempts = n;
            }
        }

        out
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.expirations >= 1,
            "expiration window must collect at least one expiration"
        );
        anyhow::ensure!(
            self.max_attempts >= self.expirations,
            "max attempts ({}) must be >= expirations ({})",
            self.max_attempts,
            self.expirations
        );
        Ok(())
    }
}

/// The target date itself when it is a Friday, otherwise the following Friday.
pub fn first_expiration(target_date: NaiveDate) -> NaiveDate {
    let from_monday = target_date.weekday().num_days_from_monday() as i64;
    let friday = Weekday::Fri.num_days_from_monday() as i64;
    target_date + Duration::days((friday - from_monday).rem_euclid(7))
}

pub fn next_expiration(expiration: NaiveDate) -> NaiveDate {
    expiration + Duration::weeks(1)
}

/// Whole days from `now` until midnight (UTC) of the expiration date, floored and clamped at 0.
pub fn remaining_days(expiration: NaiveDate, now: DateTime<Utc>) -> i64 {
    let expires_at = expiration.and_time(NaiveTime::MIN);
    let secs = (expires_at - now.naive_utc()).num_seconds();
    secs.div_euclid(86_400).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn friday_target_is_kept() {
        // 2020-08-21 is a Friday.
        assert_eq!(first_expiration(date(2020, 8, 21)), date(2020, 8, 21));
    }

    #[test]
    fn other_weekdays_roll_forward_to_friday() {
        // Saturday rolls over the weekend.
        assert_eq!(first_expiration(date(2020, 8, 22)), date(2020, 8, 28));
        // Monday and Thursday stay in the same week.
        assert_eq!(first_expiration(date(2020, 8, 17)), date(2020, 8, 21));
        assert_eq!(first_expiration(date(2020, 8, 20)), date(2020, 8, 21));
    }

    #[test]
    fn next_expiration_advances_one_week() {
        assert_eq!(next_expiration(date(2020, 8, 28)), date(2020, 9, 4));
    }

    #[test]
    fn remaining_days_floor_partial_days() {
        // Monday 15:00 UTC to Friday 00:00 is 3 days and 9 hours.
        let now = Utc.with_ymd_and_hms(2020, 8, 17, 15, 0, 0).unwrap();
        assert_eq!(remaining_days(date(2020, 8, 21), now), 3);
    }

    #[test]
    fn remaining_days_clamp_after_expiry() {
        let now = Utc.with_ymd_and_hms(2020, 8, 24, 9, 0, 0).unwrap();
        assert_eq!(remaining_days(date(2020, 8, 21), now), 0);
        // Expiry day itself, after midnight.
        let now = Utc.with_ymd_and_hms(2020, 8, 21, 9, 0, 0).unwrap();
        assert_eq!(remaining_days(date(2020, 8, 21), now), 0);
    }

    #[test]
    fn window_requires_room_for_all_expirations() {
        assert!(ExpirationWindow::default().validate().is_ok());
        let tight = ExpirationWindow {
            expirations: 3,
            max_attempts: 2,
        };
        assert!(tight.validate().is_err());
    }
}
