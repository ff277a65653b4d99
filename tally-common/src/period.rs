use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::ops::RangeInclusive;
use std::str::FromStr;

const DAYS_PER_WEEK: i64 = 7;

// A monthly reset day can roll over into the following month (e.g. day 31 of February lands in
// March), so the candidate for the month before last is the earliest one that can be required
const MAX_MONTHLY_LOOKBACK: i32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[serde(rename_all = "lowercase")]
#[diesel(sql_type = Text)]
pub enum Period {
    Monthly,
    Weekly,
    Yearly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Monthly => "monthly",
            Period::Weekly => "weekly",
            Period::Yearly => "yearly",
        }
    }

    /// The values `reset_day` may take for this period. Weekly reset days count from Sunday (0).
    pub fn reset_day_range(&self) -> RangeInclusive<i32> {
        match self {
            Period::Monthly => 1..=31,
            Period::Weekly => 0..=6,
            Period::Yearly => 1..=366,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct InvalidPeriod(pub String);

impl std::error::Error for InvalidPeriod {}

impl fmt::Display for InvalidPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid period '{}'. Expected one of: monthly, weekly, yearly",
            self.0
        )
    }
}

impl FromStr for Period {
    type Err = InvalidPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Period::Monthly),
            "weekly" => Ok(Period::Weekly),
            "yearly" => Ok(Period::Yearly),
            other => Err(InvalidPeriod(String::from(other))),
        }
    }
}

impl ToSql<Text, Pg> for Period {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for Period {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let text = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        Ok(text.parse()?)
    }
}

/// Computes the start of the window that is open at `now` for a newly created budget: the most
/// recent instant at or before `now` that satisfies the period's day rule.
///
/// Monthly and weekly anchors keep the time of day of `now`. Yearly anchors start at midnight of
/// the selected day of the year. A monthly `reset_day` past the end of a month rolls over into the
/// next month rather than being clamped.
pub fn initial_anchor(period: Period, reset_day: i32, now: DateTime<Utc>) -> DateTime<Utc> {
    let anchor = match period {
        Period::Monthly => initial_monthly_anchor(reset_day, now),
        Period::Weekly => Some(initial_weekly_anchor(reset_day, now)),
        Period::Yearly => initial_yearly_anchor(reset_day, now),
    };

    // Only unrepresentable dates (far outside chrono's range) end up here
    anchor.unwrap_or(now)
}

// Steps back from the rolled-over date in the current month, so day 31 computed on April 10 gives
// April 1 (May 1 minus a month) rather than March 31
fn initial_monthly_anchor(reset_day: i32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let this_month = day_of_month_with_rollover(now.year(), now.month(), reset_day)?
        .and_time(now.naive_utc().time());
    let this_month = Utc.from_utc_datetime(&this_month);

    for months_back in 0..=MAX_MONTHLY_LOOKBACK {
        let candidate = add_months_with_rollover(this_month, -months_back)?;

        if candidate <= now {
            return Some(candidate);
        }
    }

    None
}

fn initial_weekly_anchor(reset_day: i32, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = i64::from(now.weekday().num_days_from_sunday());
    let days_back = (today - i64::from(reset_day)).rem_euclid(DAYS_PER_WEEK);

    now - Duration::days(days_back)
}

fn initial_yearly_anchor(reset_day: i32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let this_year = day_of_year_with_rollover(now.year(), reset_day)?;

    if this_year <= now.naive_utc() {
        return Some(Utc.from_utc_datetime(&this_year));
    }

    let last_year = day_of_year_with_rollover(now.year() - 1, reset_day)?;
    Some(Utc.from_utc_datetime(&last_year))
}

/// The instant at which the window opened at `anchor` closes. Weekly windows also require the
/// reset weekday to be reached (see [`is_due`]), so for them this is the earliest possible close.
pub fn next_boundary(period: Period, anchor: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match period {
        Period::Monthly => add_months_with_rollover(anchor, 1),
        Period::Weekly => anchor.checked_add_signed(Duration::days(DAYS_PER_WEEK)),
        Period::Yearly => add_months_with_rollover(anchor, 12),
    }
}

/// Whether the window opened at `anchor` has closed as of `now`.
///
/// Weekly windows close only once at least seven days have passed *and* `now` falls on the reset
/// weekday. A check that misses the reset weekday defers the reset to the next check that lands
/// on it.
pub fn is_due(period: Period, reset_day: i32, anchor: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match period {
        Period::Monthly | Period::Yearly => {
            next_boundary(period, anchor).is_some_and(|boundary| now >= boundary)
        }
        Period::Weekly => {
            let week_elapsed = now - anchor >= Duration::days(DAYS_PER_WEEK);
            let is_reset_weekday = now.weekday().num_days_from_sunday() as i32 == reset_day;

            week_elapsed && is_reset_weekday
        }
    }
}

/// Shifts `instant` by `months` calendar months, keeping the day of the month and the time of
/// day. Days past the end of the target month overflow into the month after it, so January 31
/// plus one month is March 3 (or March 2 in a leap year).
pub fn add_months_with_rollover(instant: DateTime<Utc>, months: i32) -> Option<DateTime<Utc>> {
    let naive = instant.naive_utc();
    let (year, month) = shift_month(naive.year(), naive.month(), months);
    let date = day_of_month_with_rollover(year, month, naive.day() as i32)?;

    Some(Utc.from_utc_datetime(&date.and_time(naive.time())))
}

fn shift_month(year: i32, month: u32, months: i32) -> (i32, u32) {
    let zero_based = year * 12 + (month as i32 - 1) + months;
    (zero_based.div_euclid(12), zero_based.rem_euclid(12) as u32 + 1)
}

fn day_of_month_with_rollover(year: i32, month: u32, day: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_signed(Duration::days(i64::from(day) - 1))
}

fn day_of_year_with_rollover(year: i32, day: i32) -> Option<NaiveDateTime> {
    Some(day_of_month_with_rollover(year, 1, day)?.and_time(NaiveTime::MIN))
}
