//! Deterministic resolution of partial and relative date expressions.
//!
//! The analyzer asks the model to resolve dates itself, but the model does
//! not always comply. These functions apply the same rules locally against an
//! explicit reference date, so a `proposed_datetime` never carries leftover
//! phrases like "el viernes" or "the 5th".
//!
//! Rules:
//! - a bare day of month means this month if the day has not passed yet
//!   (today counts as not passed), otherwise the next month that has it;
//! - a weekday plus a day of month ("domingo 25") starts from that
//!   resolution and walks forward month by month until the weekday matches;
//!   if no month in the window matches, the weekday wins and the next
//!   occurrence of that weekday is used;
//! - a bare weekday is its next occurrence strictly after today;
//! - "20/8" is day then month; a written year is kept as is, otherwise the
//!   date is this year unless already passed;
//! - "las 12 de la noche" is midnight at the end of the named day;
//! - a date found without a time is placed at 09:00.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use regex::{Captures, Regex};

/// Hour used when an expression names a day but no time.
pub const DEFAULT_HOUR: u32 = 9;

const WEEKDAY_SEARCH_MONTHS: u32 = 28;

const WEEKDAYS: &str = "lunes|martes|miércoles|miercoles|jueves|viernes|sábado|sabado|domingo|\
monday|tuesday|wednesday|thursday|friday|saturday|sunday";

const MONTHS: &str = "enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|\
octubre|noviembre|diciembre|january|february|march|april|may|june|july|august|september|\
october|november|december";

static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:de\s+|of\s+)?({MONTHS})\b(?:(?:\s+de|,)?\s+(\d{{4}})\b)?"
    ))
    .expect("valid regex")
});

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b({MONTHS})\s+(?:the\s+)?(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("valid regex")
});

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b").expect("valid regex")
});

static WEEKDAY_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b({WEEKDAYS}),?\s+(?:the\s+|el\s+|día\s+|dia\s+)?(\d{{1,2}})(?:st|nd|rd|th)?\b"
    ))
    .expect("valid regex")
});

static DAY_OF_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:el|the|día|dia)\s+(\d{1,2})(?:st|nd|rd|th)?\b").expect("valid regex")
});

static ORDINAL_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").expect("valid regex"));

static DAY_AFTER_TOMORROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bpasado\s+mañana\b|\bday\s+after\s+tomorrow\b").expect("valid regex")
});

static TOMORROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmañana\b|\btomorrow\b").expect("valid regex"));

static TODAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhoy\b|\btoday\b").expect("valid regex"));

static WEEKDAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b({WEEKDAYS})\b")).expect("valid regex"));

static TIME_MERIDIEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*(am|pm|a\.m\.|p\.m\.)(?:[^\p{L}]|$)")
        .expect("valid regex")
});

static TIME_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:a\s+las|a\s+la|sobre\s+las|hacia\s+las|at)\s+(\d{1,2})(?::(\d{2}))?(?:\s*(?:h|hrs|horas)\b)?(?:\s+(?:de\s+la|por\s+la|in\s+the)\s+(mañana|tarde|noche|morning|afternoon|evening))?",
    )
    .expect("valid regex")
});

static TIME_CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").expect("valid regex"));

static TIME_H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})\s?h\b").expect("valid regex"));

/// Resolve a bare day of month ("el 25") against `today`.
pub fn resolve_day_of_month(today: NaiveDate, day: u32) -> Option<NaiveDate> {
    if !(1..=31).contains(&day) {
        return None;
    }

    let start = if day >= today.day() { 0 } else { 1 };
    (start..start + 12).find_map(|offset| {
        let (year, month) = add_months(today.year(), today.month(), offset);
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

/// Resolve a weekday-qualified day of month ("Sunday the 15th").
pub fn resolve_weekday_day(today: NaiveDate, weekday: Weekday, day: u32) -> Option<NaiveDate> {
    let first = resolve_day_of_month(today, day)?;

    let matched = (0..WEEKDAY_SEARCH_MONTHS)
        .filter_map(|offset| {
            let (year, month) = add_months(first.year(), first.month(), offset);
            NaiveDate::from_ymd_opt(year, month, day)
        })
        .find(|date| date.weekday() == weekday);

    Some(matched.unwrap_or_else(|| weekday_on_or_after(today, weekday)))
}

/// Resolve "25 de julio" / "July 25": this year unless already passed.
pub fn resolve_month_day(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    (0..8).find_map(|offset| {
        NaiveDate::from_ymd_opt(today.year() + offset, month, day).filter(|date| *date >= today)
    })
}

/// A day and month with an optional explicit year. Without a year this is
/// [`resolve_month_day`]; with one, the date is taken as written.
fn resolve_dated(today: NaiveDate, year: Option<i32>, month: u32, day: u32) -> Option<NaiveDate> {
    match year {
        Some(year) => NaiveDate::from_ymd_opt(year, month, day),
        None => resolve_month_day(today, month, day),
    }
}

/// Next occurrence of `weekday` strictly after `today`.
pub fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    weekday_on_or_after(today + Duration::days(1), weekday)
}

fn weekday_on_or_after(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() - from.weekday().num_days_from_monday()) % 7;
    from + Duration::days(i64::from(ahead))
}

fn add_months(year: i32, month: u32, offset: u32) -> (i32, u32) {
    let index = (month - 1) + offset;
    (year + (index / 12) as i32, index % 12 + 1)
}

/// Parse the ISO forms a model is likely to emit, truncated to the minute.
/// Offsets and a trailing `Z` are accepted and dropped; a bare date gets
/// [`DEFAULT_HOUR`].
pub fn parse_iso_minute(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return truncate_to_minute(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M:%S%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return truncate_to_minute(dt.naive_local());
        }
    }

    let naive = s.strip_suffix('Z').unwrap_or(s);
    for fmt in [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return truncate_to_minute(dt);
        }
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(DEFAULT_HOUR, 0, 0))
}

fn truncate_to_minute(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    NaiveTime::from_hms_opt(dt.hour(), dt.minute(), 0).map(|time| NaiveDateTime::new(dt.date(), time))
}

/// Find the first date expression in `text` and resolve it against `now`.
///
/// Expressions are tried by precision: numeric date, explicit month, weekday plus day,
/// bare day of month, relative day words, bare weekday.
pub fn resolve_expression(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let lowered = text.to_lowercase();
    let today = now.date();

    let date = find_numeric_date(&lowered, today)
        .or_else(|| find_month_day(&lowered, today))
        .or_else(|| find_weekday_day(&lowered, today))
        .or_else(|| find_day_of_month(&lowered, today))
        .or_else(|| find_relative_day(&lowered, today))
        .or_else(|| find_weekday(&lowered, today))?;

    match find_time(&lowered) {
        // "las 12 de la noche" is the midnight that ends the named day.
        Some(ClockTime { time, next_day: true }) => {
            Some(NaiveDateTime::new(date + Duration::days(1), time))
        }
        Some(ClockTime { time, .. }) => Some(NaiveDateTime::new(date, time)),
        None => date.and_hms_opt(DEFAULT_HOUR, 0, 0),
    }
}

struct ClockTime {
    time: NaiveTime,
    next_day: bool,
}

impl From<NaiveTime> for ClockTime {
    fn from(time: NaiveTime) -> Self {
        Self { time, next_day: false }
    }
}

fn find_numeric_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    NUMERIC_DATE.captures_iter(text).find_map(|caps| {
        let day = number(&caps, 1)?;
        let month = number(&caps, 2)?;
        let year = caps.get(3).and_then(|m| {
            let year: i32 = m.as_str().parse().ok()?;
            Some(if m.as_str().len() == 2 { 2000 + year } else { year })
        });
        resolve_dated(today, year, month, day)
    })
}

fn find_month_day(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let day_first = DAY_MONTH.captures_iter(text).find_map(|caps| {
        let day = number(&caps, 1)?;
        let month = month_from_name(caps.get(2)?.as_str())?;
        resolve_dated(today, year(&caps, 3), month, day)
    });

    day_first.or_else(|| {
        MONTH_DAY.captures_iter(text).find_map(|caps| {
            let month = month_from_name(caps.get(1)?.as_str())?;
            let day = number(&caps, 2)?;
            if caps.get(3).is_none() && rules_out_day(&text[caps.get(0)?.end()..]) {
                return None;
            }
            resolve_dated(today, year(&caps, 3), month, day)
        })
    })
}

fn find_weekday_day(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    WEEKDAY_DAY.captures_iter(text).find_map(|caps| {
        if rules_out_day(&text[caps.get(0)?.end()..]) {
            return None;
        }
        let weekday = weekday_from_name(caps.get(1)?.as_str())?;
        let day = number(&caps, 2)?;
        resolve_weekday_day(today, weekday, day)
    })
}

fn find_day_of_month(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    [&*DAY_OF_MONTH, &*ORDINAL_DAY].into_iter().find_map(|re| {
        re.captures_iter(text).find_map(|caps| {
            if rules_out_day(&text[caps.get(0)?.end()..]) {
                return None;
            }
            resolve_day_of_month(today, number(&caps, 1)?)
        })
    })
}

fn find_relative_day(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if DAY_AFTER_TOMORROW.is_match(text) {
        return Some(today + Duration::days(2));
    }

    // "por la mañana" / "de la mañana" is a time of day, not tomorrow.
    let tomorrow = TOMORROW.find_iter(text).any(|m| {
        let before = text[..m.start()].trim_end();
        !(before.ends_with(" la") || before == "la")
    });
    if tomorrow {
        return Some(today + Duration::days(1));
    }

    TODAY.is_match(text).then_some(today)
}

fn find_weekday(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    WEEKDAY
        .captures_iter(text)
        .find_map(|caps| weekday_from_name(caps.get(1)?.as_str()))
        .map(|weekday| next_weekday(today, weekday))
}

fn find_time(text: &str) -> Option<ClockTime> {
    let meridiem = TIME_MERIDIEM.captures_iter(text).find_map(|caps| {
        let hour = number(&caps, 1)?;
        let minute = number(&caps, 2).unwrap_or(0);
        let pm = caps.get(3)?.as_str().starts_with('p');
        let hour = match (pm, hour) {
            (true, h) if h < 12 => h + 12,
            (false, 12) => 0,
            (_, h) => h,
        };
        NaiveTime::from_hms_opt(hour, minute, 0)
    });
    if let Some(time) = meridiem {
        return Some(time.into());
    }

    let spoken = TIME_WORDS.captures_iter(text).find_map(|caps| {
        let hour = number(&caps, 1)?;
        let minute = number(&caps, 2).unwrap_or(0);
        let part = caps.get(3).map(|m| m.as_str());
        if hour == 12 && part == Some("noche") {
            return Some(ClockTime {
                time: NaiveTime::from_hms_opt(0, minute, 0)?,
                next_day: true,
            });
        }
        let afternoon = matches!(part, Some("tarde" | "noche" | "afternoon" | "evening"));
        let hour = if afternoon && hour < 12 { hour + 12 } else { hour };
        NaiveTime::from_hms_opt(hour, minute, 0).map(ClockTime::from)
    });
    if spoken.is_some() {
        return spoken;
    }

    TIME_CLOCK
        .captures_iter(text)
        .find_map(|caps| NaiveTime::from_hms_opt(number(&caps, 1)?, number(&caps, 2)?, 0))
        .or_else(|| {
            TIME_H
                .captures_iter(text)
                .find_map(|caps| NaiveTime::from_hms_opt(number(&caps, 1)?, 0, 0))
        })
        .map(ClockTime::from)
}

/// True when the text right after a number says it was not a day of month:
/// an hour ("10:00", "10 am") or part of a numeric date ("20/8").
fn rules_out_day(rest: &str) -> bool {
    if rest.starts_with(':') || rest.starts_with('/') {
        return true;
    }
    let rest = rest.trim_start();
    if ["am", "pm", "a.m.", "p.m.", "hrs", "horas"]
        .iter()
        .any(|suffix| starts_with_word(rest, suffix))
    {
        return true;
    }
    starts_with_word(rest, "h")
}

fn starts_with_word(text: &str, word: &str) -> bool {
    text.strip_prefix(word)
        .is_some_and(|after| !after.chars().next().is_some_and(char::is_alphabetic))
}

fn number(caps: &Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

fn year(caps: &Captures<'_>, index: usize) -> Option<i32> {
    caps.get(index)?.as_str().parse().ok()
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    let weekday = match name {
        "lunes" | "monday" => Weekday::Mon,
        "martes" | "tuesday" => Weekday::Tue,
        "miércoles" | "miercoles" | "wednesday" => Weekday::Wed,
        "jueves" | "thursday" => Weekday::Thu,
        "viernes" | "friday" => Weekday::Fri,
        "sábado" | "sabado" | "saturday" => Weekday::Sat,
        "domingo" | "sunday" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

fn month_from_name(name: &str) -> Option<u32> {
    let month = match name {
        "enero" | "january" => 1,
        "febrero" | "february" => 2,
        "marzo" | "march" => 3,
        "abril" | "april" => 4,
        "mayo" | "may" => 5,
        "junio" | "june" => 6,
        "julio" | "july" => 7,
        "agosto" | "august" => 8,
        "septiembre" | "setiembre" | "september" => 9,
        "octubre" | "october" => 10,
        "noviembre" | "november" => 11,
        "diciembre" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// Spanish weekday name, used in the analysis prompt.
pub fn spanish_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "lunes",
        Weekday::Tue => "martes",
        Weekday::Wed => "miércoles",
        Weekday::Thu => "jueves",
        Weekday::Fri => "viernes",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    // Tuesday
    fn reference() -> NaiveDateTime {
        at(2025, 6, 10, 12, 0)
    }

    #[test]
    fn reference_is_a_tuesday() {
        assert_eq!(reference().date().weekday(), Weekday::Tue);
    }

    #[test]
    fn day_of_month_not_yet_passed_stays_in_month() {
        assert_eq!(resolve_day_of_month(date(2025, 6, 10), 25), Some(date(2025, 6, 25)));
        assert_eq!(resolve_day_of_month(date(2025, 6, 10), 10), Some(date(2025, 6, 10)));
    }

    #[test]
    fn day_of_month_already_passed_moves_to_next_month() {
        assert_eq!(resolve_day_of_month(date(2025, 6, 10), 5), Some(date(2025, 7, 5)));
        assert_eq!(resolve_day_of_month(date(2025, 12, 20), 3), Some(date(2026, 1, 3)));
    }

    #[test]
    fn day_of_month_skips_months_without_that_day() {
        assert_eq!(resolve_day_of_month(date(2025, 6, 10), 31), Some(date(2025, 7, 31)));
        assert_eq!(resolve_day_of_month(date(2025, 1, 31), 30), Some(date(2025, 3, 30)));
        assert_eq!(resolve_day_of_month(date(2025, 6, 10), 0), None);
        assert_eq!(resolve_day_of_month(date(2025, 6, 10), 32), None);
    }

    #[test]
    fn weekday_day_matching_current_month() {
        // 2025-06-15 is a Sunday.
        assert_eq!(
            resolve_weekday_day(date(2025, 6, 10), Weekday::Sun, 15),
            Some(date(2025, 6, 15))
        );
    }

    #[test]
    fn weekday_day_walks_forward_to_first_matching_month() {
        // The next 25th that falls on a Sunday after 2025-06-10 is 2026-01-25.
        assert_eq!(
            resolve_weekday_day(date(2025, 6, 10), Weekday::Sun, 25),
            Some(date(2026, 1, 25))
        );
    }

    #[test]
    fn bare_weekday_is_strictly_after_today() {
        assert_eq!(next_weekday(date(2025, 6, 10), Weekday::Tue), date(2025, 6, 17));
        assert_eq!(next_weekday(date(2025, 6, 10), Weekday::Fri), date(2025, 6, 13));
    }

    #[test]
    fn month_day_rolls_to_next_year_when_passed() {
        assert_eq!(resolve_month_day(date(2025, 6, 10), 7, 25), Some(date(2025, 7, 25)));
        assert_eq!(resolve_month_day(date(2025, 6, 10), 3, 1), Some(date(2026, 3, 1)));
    }

    #[test]
    fn iso_forms_are_accepted() {
        let expected = Some(at(2025, 7, 5, 15, 0));
        assert_eq!(parse_iso_minute("2025-07-05T15:00"), expected);
        assert_eq!(parse_iso_minute(" 2025-07-05T15:00:59 "), expected);
        assert_eq!(parse_iso_minute("2025-07-05 15:00"), expected);
        assert_eq!(parse_iso_minute("2025-07-05T15:00:00Z"), expected);
        assert_eq!(parse_iso_minute("2025-07-05T15:00+02:00"), expected);
        assert_eq!(parse_iso_minute("next Friday"), None);
        assert_eq!(parse_iso_minute(""), None);
    }

    #[test]
    fn english_day_of_month_with_pm_time() {
        assert_eq!(
            resolve_expression("let's meet the 5th at 3pm", reference()),
            Some(at(2025, 7, 5, 15, 0))
        );
    }

    #[test]
    fn english_weekday_qualified_without_time() {
        assert_eq!(
            resolve_expression("How about Sunday the 15th?", reference()),
            Some(at(2025, 6, 15, DEFAULT_HOUR, 0))
        );
    }

    #[test]
    fn spanish_expressions() {
        assert_eq!(
            resolve_expression("¿Nos vemos el 25 a las 10:30?", reference()),
            Some(at(2025, 6, 25, 10, 30))
        );
        assert_eq!(
            resolve_expression("Quedamos el domingo 15 a las 5 de la tarde", reference()),
            Some(at(2025, 6, 15, 17, 0))
        );
        assert_eq!(
            resolve_expression("Reunión el 25 de julio a las 16h", reference()),
            Some(at(2025, 7, 25, 16, 0))
        );
    }

    #[test]
    fn relative_days() {
        assert_eq!(
            resolve_expression("Te llamo mañana a las 11", reference()),
            Some(at(2025, 6, 11, 11, 0))
        );
        assert_eq!(
            resolve_expression("pasado mañana 18:00", reference()),
            Some(at(2025, 6, 12, 18, 0))
        );
        assert_eq!(
            resolve_expression("can we talk today at 4 pm", reference()),
            Some(at(2025, 6, 10, 16, 0))
        );
    }

    #[test]
    fn morning_is_not_tomorrow() {
        assert_eq!(
            resolve_expression("El viernes a las 9 de la mañana", reference()),
            Some(at(2025, 6, 13, 9, 0))
        );
        assert_eq!(resolve_expression("Te escribo por la mañana", reference()), None);
    }

    #[test]
    fn hour_after_weekday_is_not_a_day_of_month() {
        assert_eq!(
            resolve_expression("Monday 10 am works for me", reference()),
            Some(at(2025, 6, 16, 10, 0))
        );
        assert_eq!(
            resolve_expression("el lunes 10:00", reference()),
            Some(at(2025, 6, 16, 10, 0))
        );
    }

    #[test]
    fn date_only_iso_gets_default_hour() {
        assert_eq!(parse_iso_minute("2025-07-05"), Some(at(2025, 7, 5, DEFAULT_HOUR, 0)));
        assert_eq!(parse_iso_minute("2025-02-30"), None);
    }

    #[test]
    fn numeric_day_month_dates() {
        assert_eq!(
            resolve_expression("Nos vemos el 20/8 a las 10:00", reference()),
            Some(at(2025, 8, 20, 10, 0))
        );
        // Already passed this year.
        assert_eq!(
            resolve_expression("el 3/2 a las 9", reference()),
            Some(at(2026, 2, 3, 9, 0))
        );
        assert_eq!(
            resolve_expression("el 20/08/2027", reference()),
            Some(at(2027, 8, 20, DEFAULT_HOUR, 0))
        );
        assert_eq!(
            resolve_expression("el 5/7/26 a las 16h", reference()),
            Some(at(2026, 7, 5, 16, 0))
        );
    }

    #[test]
    fn impossible_numeric_date_is_not_read_as_bare_day() {
        assert_eq!(resolve_expression("el 20/13", reference()), None);
    }

    #[test]
    fn explicit_year_is_honoured() {
        assert_eq!(
            resolve_expression("Reunión el 25 de diciembre de 2026 a las 10:00", reference()),
            Some(at(2026, 12, 25, 10, 0))
        );
        assert_eq!(
            resolve_expression("See you December 25, 2026 at 10 am", reference()),
            Some(at(2026, 12, 25, 10, 0))
        );
        assert_eq!(
            resolve_expression("el 1 de marzo de 2025", reference()),
            Some(at(2025, 3, 1, DEFAULT_HOUR, 0))
        );
    }

    #[test]
    fn twelve_at_night_is_midnight_after_the_day() {
        assert_eq!(
            resolve_expression("El viernes a las 12 de la noche", reference()),
            Some(at(2025, 6, 14, 0, 0))
        );
        assert_eq!(
            resolve_expression("El viernes a las 10 de la noche", reference()),
            Some(at(2025, 6, 13, 22, 0))
        );
    }

    #[test]
    fn no_expression_yields_none() {
        assert_eq!(resolve_expression("Gracias por la factura", reference()), None);
        assert_eq!(resolve_expression("", reference()), None);
    }
}
