use std::sync::OnceLock;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Weekday};
use regex::Regex;

/// A month-ish duration, used wherever an "m" unit appears.
const DAYS_PER_MONTH: i64 = 30;

fn duration_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)([hdwm])$").unwrap())
}

/// Parse a compact relative-duration token: `Nh`, `Nd`, `Nw`, or `Nm`
/// (months counted as 30 days). Returns `None` for anything else.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let caps = duration_token_re().captures(input.trim())?;
    let n: i64 = caps[1].parse().ok()?;
    duration_from_unit(n, &caps[2])
}

/// Checked duration construction: counts past chrono's bounds yield `None`
/// instead of panicking.
fn duration_from_unit(n: i64, unit: &str) -> Option<Duration> {
    match unit {
        "h" => Duration::try_hours(n),
        "d" => Duration::try_days(n),
        "w" => Duration::try_weeks(n),
        "m" => Duration::try_days(n.checked_mul(DAYS_PER_MONTH)?),
        _ => None,
    }
}

/// Resolve a free-form date expression to an absolute local timestamp.
///
/// Recognized forms, tried in order:
/// 1. `today` / `tomorrow` / `yesterday` — end of that calendar day
/// 2. `next <weekday>` — end of the next occurrence strictly after today
/// 3. bare weekday name — same next-occurrence rule
/// 4. `in N <unit>` (hour/day/week/month) — now + N units, no snapping
/// 5. duration token (`3d`, `12h`, `2w`, `1m`) — now + duration, no snapping
/// 6. `YYYY-MM-DD` — that day at 23:59:59 local
///
/// Anything else is unparsable and yields `None`. Never errors.
pub fn resolve_date(input: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let norm = input.trim().to_lowercase();
    if norm.is_empty() {
        return None;
    }
    let today = now.date_naive();

    match norm.as_str() {
        "today" => return end_of_day(today),
        "tomorrow" => return end_of_day(today + Duration::days(1)),
        "yesterday" => return end_of_day(today - Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = norm.strip_prefix("next ")
        && let Ok(weekday) = rest.trim().parse::<Weekday>()
    {
        return end_of_day(next_occurrence(today, weekday));
    }

    if let Ok(weekday) = norm.parse::<Weekday>() {
        return end_of_day(next_occurrence(today, weekday));
    }

    if let Some(duration) = parse_spelled_duration(&norm) {
        return now.checked_add_signed(duration);
    }

    if let Some(duration) = parse_duration(&norm) {
        return now.checked_add_signed(duration);
    }

    let date = NaiveDate::parse_from_str(&norm, "%Y-%m-%d").ok()?;
    Local
        .from_local_datetime(&date.and_hms_opt(23, 59, 59)?)
        .earliest()
}

/// `in N <unit>` with a spelled-out unit
fn parse_spelled_duration(norm: &str) -> Option<Duration> {
    let tokens: Vec<&str> = norm.split_whitespace().collect();
    let [keyword, count, unit] = tokens.as_slice() else {
        return None;
    };
    if *keyword != "in" {
        return None;
    }
    let n: i64 = count.parse().ok()?;
    let unit = match *unit {
        "hour" | "hours" => "h",
        "day" | "days" => "d",
        "week" | "weeks" => "w",
        "month" | "months" => "m",
        _ => return None,
    };
    duration_from_unit(n, unit)
}

/// The next calendar date falling on `target`, strictly after `today`.
/// If today is already that weekday, advances a full week.
fn next_occurrence(today: NaiveDate, target: Weekday) -> NaiveDate {
    use chrono::Datelike;
    let ahead = (target.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    let ahead = if ahead == 0 { 7 } else { ahead };
    today + Duration::days(ahead)
}

/// 23:59:59.999 local on the given calendar day
fn end_of_day(date: NaiveDate) -> Option<DateTime<Local>> {
    Local
        .from_local_datetime(&date.and_hms_milli_opt(23, 59, 59, 999)?)
        .earliest()
}
