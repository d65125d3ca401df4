//! Market enum and the KR/US trading-calendar predicates that every other
//! component (gating, scheduler, broker adapter) calls into rather than
//! re-deriving.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    Kr,
    Us,
}

impl Market {
    pub fn opposite(self) -> Market {
        match self {
            Market::Kr => Market::Us,
            Market::Us => Market::Kr,
        }
    }

    fn tz(self) -> Tz {
        match self {
            Market::Kr => chrono_tz::Asia::Seoul,
            Market::Us => chrono_tz::America::New_York,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Kr => write!(f, "KR"),
            Market::Us => write!(f, "US"),
        }
    }
}

impl FromStr for Market {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "KR" => Ok(Market::Kr),
            "US" => Ok(Market::Us),
            other => anyhow::bail!("invalid market: {other}"),
        }
    }
}

/// "KR markets are identified by numeric ticker" — the single predicate
/// every other component calls, per DESIGN NOTES.
pub fn is_kr_symbol(symbol: &str) -> bool {
    !symbol.is_empty() && symbol.chars().all(|c| c.is_ascii_digit())
}

/// Zero-pad a Korean ticker to 6 digits. No-op for already-normalized or
/// non-numeric (US) symbols.
pub fn normalize_kr_symbol(symbol: &str) -> String {
    if is_kr_symbol(symbol) {
        format!("{symbol:0>6}")
    } else {
        symbol.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Regular,
    Extended,
}

/// Whether `market` is open for trading at `now` (UTC), honoring weekends,
/// the regular/extended windows, and (for US) the holiday calendar.
/// `session` selects whether the extended window counts as "open".
pub fn is_market_open(
    market: Market,
    now: chrono::DateTime<chrono::Utc>,
    session: SessionKind,
) -> bool {
    let local = now.with_timezone(&market.tz());
    let weekday = local.weekday();
    if weekday == Weekday::Sat || weekday == Weekday::Sun {
        return false;
    }

    if market == Market::Us && is_us_market_holiday(local.date_naive()) {
        return false;
    }

    let time = local.time();
    let (open, close) = match (market, session) {
        (Market::Kr, SessionKind::Regular) => (
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
        ),
        (Market::Kr, SessionKind::Extended) => (
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        ),
        (Market::Us, SessionKind::Regular) => (
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        ),
        (Market::Us, SessionKind::Extended) => (
            NaiveTime::from_hms_opt(4, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        ),
    };

    time >= open && time <= close && time.hour() < 24
}

/// Korean after-hours window: 15:40-18:00 KST on a weekday.
pub fn is_kr_after_hours_window(now: chrono::DateTime<chrono::Utc>) -> bool {
    let local = now.with_timezone(&Market::Kr.tz());
    let weekday = local.weekday();
    if weekday == Weekday::Sat || weekday == Weekday::Sun {
        return false;
    }
    let time = local.time();
    time >= NaiveTime::from_hms_opt(15, 40, 0).unwrap()
        && time <= NaiveTime::from_hms_opt(18, 0, 0).unwrap()
}

/// Hard-coded US market holiday calendar (NYSE/NASDAQ), observed-day rules
/// for Independence Day applied.
pub fn is_us_market_holiday(date: NaiveDate) -> bool {
    let year = date.year();

    let nth_weekday_of_month = |year: i32, month: u32, weekday: Weekday, n: u32| -> NaiveDate {
        let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
        let first_weekday = first.weekday();
        let offset = (7 + weekday.num_days_from_monday() as i64
            - first_weekday.num_days_from_monday() as i64)
            % 7;
        first + chrono::Duration::days(offset + 7 * (n as i64 - 1))
    };

    let last_weekday_of_month = |year: i32, month: u32, weekday: Weekday| -> NaiveDate {
        let next_month_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap()
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1).unwrap()
        };
        let mut d = next_month_first.pred_opt().unwrap();
        while d.weekday() != weekday {
            d = d.pred_opt().unwrap();
        }
        d
    };

    let new_year = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    let mlk = nth_weekday_of_month(year, 1, Weekday::Mon, 3);
    let good_friday = easter_sunday(year) - chrono::Duration::days(2);
    let memorial = last_weekday_of_month(year, 5, Weekday::Mon);
    let juneteenth = NaiveDate::from_ymd_opt(year, 6, 19).unwrap();
    let independence = observed(NaiveDate::from_ymd_opt(year, 7, 4).unwrap());
    let labor = nth_weekday_of_month(year, 9, Weekday::Mon, 1);
    let thanksgiving = nth_weekday_of_month(year, 11, Weekday::Thu, 4);
    let christmas = observed(NaiveDate::from_ymd_opt(year, 12, 25).unwrap());

    let mut holidays = vec![
        new_year,
        mlk,
        good_friday,
        memorial,
        independence,
        labor,
        thanksgiving,
        christmas,
    ];
    if year >= 2022 {
        holidays.push(juneteenth);
    }

    holidays.contains(&date)
}

/// If `date` falls on a weekend, return the observed weekday (Sat -> Fri,
/// Sun -> Mon), else `date` itself.
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - chrono::Duration::days(1),
        Weekday::Sun => date + chrono::Duration::days(1),
        _ => date,
    }
}

/// Anonymous Gregorian algorithm for the date of Easter Sunday.
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn kr_symbol_detection() {
        assert!(is_kr_symbol("5930"));
        assert!(!is_kr_symbol("AAPL"));
        assert!(!is_kr_symbol(""));
    }

    #[test]
    fn kr_symbol_normalization_pads_to_six_digits() {
        assert_eq!(normalize_kr_symbol("5930"), "005930");
        assert_eq!(normalize_kr_symbol("005930"), "005930");
        assert_eq!(normalize_kr_symbol("AAPL"), "AAPL");
    }

    #[test]
    fn us_market_closed_on_weekend() {
        let saturday = chrono::Utc.with_ymd_and_hms(2026, 7, 25, 15, 0, 0).unwrap();
        assert!(!is_market_open(Market::Us, saturday, SessionKind::Regular));
    }

    #[test]
    fn us_market_closed_on_independence_day() {
        assert!(is_us_market_holiday(
            NaiveDate::from_ymd_opt(2026, 7, 3).unwrap()
        )); // July 4 2026 is a Saturday, observed Friday
    }

    #[test]
    fn juneteenth_only_holiday_from_2022() {
        assert!(!is_us_market_holiday(
            NaiveDate::from_ymd_opt(2021, 6, 19).unwrap()
        ));
        assert!(is_us_market_holiday(
            NaiveDate::from_ymd_opt(2023, 6, 19).unwrap()
        ));
    }
}
