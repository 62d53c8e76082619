//! Issuance-time selection for the two KMA endpoints.
//!
//! Everything here works on naive civil time in KST; convert with
//! [`to_kst`] first.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Timelike, Utc};

use crate::{
    codes::CATEGORY_SKY,
    model::{BaseDateTime, ForecastItem},
};

/// UTC+09:00, the service's civil time.
pub const KST: FixedOffset = match FixedOffset::east_opt(9 * 3600) {
    Some(offset) => offset,
    None => panic!("UTC+09:00 is a valid offset"),
};

/// Nowcast data for hour H is published around H:10.
const NOWCAST_READY_MINUTE: u32 = 10;

/// Forecast data for H:30 is published around H:45.
const FORECAST_READY_MINUTE: u32 = 45;

pub fn to_kst(now: DateTime<Utc>) -> NaiveDateTime {
    now.with_timezone(&KST).naive_local()
}

/// Latest nowcast issuance available at `now`. `base_time` is always `HH00`.
pub fn nowcast_base(now: NaiveDateTime) -> BaseDateTime {
    let issued = if now.minute() >= NOWCAST_READY_MINUTE {
        now
    } else {
        now - Duration::hours(1)
    };

    BaseDateTime {
        base_date: issued.format("%Y%m%d").to_string(),
        base_time: issued.format("%H00").to_string(),
    }
}

/// Latest short-term forecast issuance available at `now`. `base_time` is
/// always `HH30`.
pub fn fcst_base(now: NaiveDateTime) -> BaseDateTime {
    let minute = i64::from(now.minute());
    let subtract = if now.minute() >= FORECAST_READY_MINUTE {
        minute - 30
    } else {
        minute + 30
    };
    let issued = now - Duration::minutes(subtract);

    BaseDateTime {
        base_date: issued.format("%Y%m%d").to_string(),
        base_time: issued.format("%H30").to_string(),
    }
}

/// `(YYYYMMDD, HHMM)` strings for `now`, as compared against `fcstDate` /
/// `fcstTime`.
pub fn date_time_keys(now: NaiveDateTime) -> (String, String) {
    (now.format("%Y%m%d").to_string(), now.format("%H%M").to_string())
}

/// Pick the `SKY` value for the first slot at or after `now_time` on
/// `now_date`, or for the latest slot of that day when every slot is in the
/// past.
pub fn select_sky_for_now(
    series: &[ForecastItem],
    now_date: &str,
    now_time: &str,
) -> Option<String> {
    let today: Vec<&ForecastItem> = series.iter().filter(|i| i.fcst_date == now_date).collect();

    let times: BTreeSet<u32> = today.iter().filter_map(|i| parse_hhmm(&i.fcst_time)).collect();
    let now = parse_hhmm(now_time)?;
    let target = times.range(now..).next().or_else(|| times.last()).copied()?;

    today
        .iter()
        .find(|i| i.category == CATEGORY_SKY && parse_hhmm(&i.fcst_time) == Some(target))
        .map(|i| i.fcst_value.clone())
}

fn parse_hhmm(value: &str) -> Option<u32> {
    value.trim().parse().ok()
}
