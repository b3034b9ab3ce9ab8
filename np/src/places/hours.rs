//! Opening-hours check
//!
//! Hours arrive as free text from the generator ("09:00-18:00", "10 - 16",
//! "Closed", "by appointment"). Only an explicit closure without any time
//! range counts as closed; missing or unreadable hours count as open.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};
use placestore::OpeningHours;
use regex::Regex;

static TIME_RANGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})(?:[:.h](\d{2}))?\s*(?:-|–|—|to|until)\s*(\d{1,2})(?:[:.h](\d{2}))?").ok()
});

/// Saturday and Sunday use the weekend schedule
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The schedule line that applies on `date`
pub fn hours_for(hours: &OpeningHours, date: NaiveDate) -> Option<&str> {
    let line = if is_weekend(date) {
        hours.weekend.as_deref()
    } else {
        hours.weekday.as_deref()
    };
    line.map(str::trim).filter(|l| !l.is_empty())
}

/// Whether a single schedule line describes an open day
pub fn line_is_open(line: &str) -> bool {
    let lower = line.to_lowercase();
    if has_time_range(&lower) {
        return true;
    }
    !(lower.contains("closed") || lower.contains("zatvoreno") || lower.contains("geschlossen"))
}

fn has_time_range(line: &str) -> bool {
    let Some(pattern) = TIME_RANGE.as_ref() else {
        return false;
    };
    pattern.captures_iter(line).any(|caps| {
        let hour = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        matches!((hour(1), hour(3)), (Some(open), Some(close)) if open <= 24 && close <= 24)
    })
}

/// Open on the day before `date`
///
/// Posts describe the previous day, so that is the day the place had to be open.
pub fn open_yesterday(hours: &OpeningHours, date: NaiveDate) -> bool {
    let yesterday = date - TimeDelta::days(1);
    hours_for(hours, yesterday).is_none_or(line_is_open)
}
