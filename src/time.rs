use chrono::{DateTime, Utc};

const DAYS_PER_MONTH: f64 = 365.25 / 12.0;

/// Human-relative label for `then` as seen from `now`, e.g. "3 hours ago".
pub fn from_now(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let millis = (now - then).num_milliseconds();
    let span = relative_span(millis.unsigned_abs() as f64 / 1000.0);
    if millis >= 0 {
        format!("{} ago", span)
    } else {
        format!("in {}", span)
    }
}

fn relative_span(seconds: f64) -> String {
    let seconds_rounded = seconds.round();
    if seconds_rounded <= 44.0 {
        return "a few seconds".to_string();
    }
    if seconds_rounded <= 89.0 {
        return "a minute".to_string();
    }

    let minutes = (seconds / 60.0).round();
    if minutes <= 44.0 {
        return format!("{} minutes", minutes);
    }
    if minutes <= 89.0 {
        return "an hour".to_string();
    }

    let hours = (seconds / 3600.0).round();
    if hours <= 21.0 {
        return format!("{} hours", hours);
    }
    if hours <= 35.0 {
        return "a day".to_string();
    }

    let days = (seconds / 86400.0).round();
    if days <= 25.0 {
        return format!("{} days", days);
    }
    if days <= 45.0 {
        return "a month".to_string();
    }

    let months = (seconds / 86400.0 / DAYS_PER_MONTH).round();
    if months <= 10.0 {
        return format!("{} months", months);
    }
    if months <= 17.0 {
        return "a year".to_string();
    }

    let years = (seconds / 86400.0 / 365.25).round().max(2.0);
    format!("{} years", years)
}
