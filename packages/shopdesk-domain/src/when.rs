//! Reads Spanish date and time phrases ("mañana a las 15:30", "el viernes 4 de la tarde",
//! "15/03", "en 2 horas") relative to a reference instant.

use regex::{Captures, Regex};
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time};

use crate::text;

const WEEKDAYS: [&str; 7] =
	["lunes", "martes", "miercoles", "jueves", "viernes", "sabado", "domingo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct When {
	pub at: OffsetDateTime,
	/// False when only a day was given and `default_hour` filled in the time.
	pub has_time: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayPart {
	Morning,
	Noon,
	Afternoon,
	Evening,
}
impl DayPart {
	fn default_clock(self) -> Clock {
		let hour = match self {
			Self::Morning => 10,
			Self::Noon => 12,
			Self::Afternoon => 15,
			Self::Evening => 19,
		};

		Clock { hour, minute: 0, meridiem: true, next_day: false }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Clock {
	hour: u8,
	minute: u8,
	/// Set when am/pm or a part of day already fixed the half of the day.
	meridiem: bool,
	/// Midnight closing the named day ("a las 12 de la noche").
	next_day: bool,
}
impl Clock {
	fn day(self, date: Date) -> Option<Date> {
		if self.next_day { date.next_day() } else { Some(date) }
	}
}

struct InvalidDate;

/// Returns `None` when the text carries no usable date or time.
///
/// The result is not clamped to the future: "hoy a las 9" read at 11:00 yields 09:00 today and the
/// caller decides what to do with it.
pub fn parse_when(text: &str, now: OffsetDateTime, default_hour: u8) -> Option<When> {
	let folded = text::fold(text);

	if let Some(at) = relative_instant(&folded, now) {
		return Some(When { at, has_time: true });
	}

	let (rest, day_part) = strip_day_part(&folded);
	let date = find_date(&rest, now.date()).ok()?;
	let clock = match find_clock(&rest) {
		Some(clock) => Some(apply_day_part(clock, day_part)),
		None => day_part.map(DayPart::default_clock),
	};

	match (date, clock) {
		(None, None) => None,
		(Some(date), Some(clock)) =>
			Some(When { at: at(clock.day(date)?, clock.hour, clock.minute, now)?, has_time: true }),
		(Some(date), None) => Some(When { at: at(date, default_hour, 0, now)?, has_time: false }),
		(None, Some(clock)) => {
			let today = at(clock.day(now.date())?, clock.hour, clock.minute, now)?;
			let at = if today > now {
				today
			} else {
				at(clock.day(now.date().next_day()?)?, clock.hour, clock.minute, now)?
			};

			Some(When { at, has_time: true })
		},
	}
}

fn at(date: Date, hour: u8, minute: u8, now: OffsetDateTime) -> Option<OffsetDateTime> {
	let time = Time::from_hms(hour, minute, 0).ok()?;

	Some(PrimitiveDateTime::new(date, time).assume_offset(now.offset()))
}

fn re(pattern: &str) -> Option<Regex> {
	Regex::new(pattern).ok()
}

fn number(caps: &Captures<'_>, idx: usize) -> Option<i64> {
	caps.get(idx)?.as_str().parse().ok()
}

fn relative_instant(folded: &str, now: OffsetDateTime) -> Option<OffsetDateTime> {
	let caps = re(r"\b(?:en|dentro de) (\d{1,3}|una|un|media) (horas?|minutos?)\b")?
		.captures(folded)?;
	let unit_is_hour = caps[2].starts_with("hora");
	let offset = match &caps[1] {
		"media" if unit_is_hour => Duration::minutes(30),
		"media" => return None,
		"una" | "un" if unit_is_hour => Duration::hours(1),
		"una" | "un" => Duration::minutes(1),
		_ => {
			let amount = number(&caps, 1)?;

			if unit_is_hour { Duration::hours(amount) } else { Duration::minutes(amount) }
		},
	};

	now.checked_add(offset)
}

fn strip_day_part(folded: &str) -> (String, Option<DayPart>) {
	let phrases = [
		("manana", DayPart::Morning),
		("tarde", DayPart::Afternoon),
		("noche", DayPart::Evening),
	];

	for (word, part) in phrases {
		let Some(pattern) = re(&format!(r"\b(?:de|por|en) la {word}\b")) else {
			continue;
		};

		if pattern.is_match(folded) {
			return (pattern.replace_all(folded, " ").into_owned(), Some(part));
		}
	}

	if let Some(pattern) = re(r"\b(?:al )?medio ?dia\b")
		&& pattern.is_match(folded)
	{
		return (pattern.replace_all(folded, " ").into_owned(), Some(DayPart::Noon));
	}

	(folded.to_string(), None)
}

fn find_date(rest: &str, today: Date) -> Result<Option<Date>, InvalidDate> {
	let Some(iso) = re(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b") else {
		return Ok(None);
	};

	if let Some(caps) = iso.captures(rest) {
		return calendar_date(number(&caps, 1), number(&caps, 2), number(&caps, 3)).map(Some);
	}

	if let Some(caps) =
		re(r"\b(\d{1,2})[/-](\d{1,2})(?:[/-](\d{2,4}))?\b").and_then(|re| re.captures(rest))
	{
		let year = match number(&caps, 3) {
			Some(year) if year < 100 => Some(2_000 + year),
			Some(year) => Some(year),
			None => None,
		};
		let day = number(&caps, 1);
		let month = number(&caps, 2);

		if let Some(year) = year {
			return calendar_date(Some(year), month, day).map(Some);
		}

		let this_year = calendar_date(Some(i64::from(today.year())), month, day)?;

		if this_year >= today {
			return Ok(Some(this_year));
		}

		return calendar_date(Some(i64::from(today.year()) + 1), month, day).map(Some);
	}

	if contains(rest, r"\bpasado manana\b") {
		return Ok(add_days(today, 2));
	}
	if contains(rest, r"\bmanana\b") {
		return Ok(add_days(today, 1));
	}
	if contains(rest, r"\bhoy\b") {
		return Ok(Some(today));
	}

	if let Some(caps) =
		re(r"\b(?:en|dentro de) (\d{1,3}) dias?\b").and_then(|re| re.captures(rest))
	{
		return Ok(number(&caps, 1).and_then(|days| add_days(today, days)));
	}

	for (idx, name) in WEEKDAYS.iter().enumerate() {
		if contains(rest, &format!(r"\b{name}\b")) {
			let current = i64::from(today.weekday().number_days_from_monday());
			let mut ahead = (idx as i64 - current).rem_euclid(7);

			if ahead == 0 {
				ahead = 7;
			}

			return Ok(add_days(today, ahead));
		}
	}

	Ok(None)
}

fn find_clock(rest: &str) -> Option<Clock> {
	if let Some(caps) =
		re(r"\b(\d{1,2})(?::(\d{2}))?\s?([ap])\.?m\b").and_then(|re| re.captures(rest))
	{
		let hour = u8::try_from(number(&caps, 1)?).ok()?;
		let minute = minute(&caps, 2)?;

		if !(1..=12).contains(&hour) {
			return None;
		}

		let hour = match (&caps[3], hour) {
			("a", 12) => 0,
			("a", hour) => hour,
			("p", 12) => 12,
			(_, hour) => hour + 12,
		};

		return valid(hour, minute, true);
	}

	for pattern in [
		r"\ba las? (\d{1,2})(?::(\d{2}))?\b",
		r"\b(\d{1,2}):(\d{2})\b",
		r"\b(\d{1,2}) ?(?:h|hs|hrs)\b",
	] {
		if let Some(caps) = re(pattern).and_then(|re| re.captures(rest)) {
			let hour = u8::try_from(number(&caps, 1)?).ok()?;

			return valid(hour, minute(&caps, 2)?, false);
		}
	}

	None
}

fn minute(caps: &Captures<'_>, idx: usize) -> Option<u8> {
	match caps.get(idx) {
		Some(raw) => raw.as_str().parse().ok(),
		None => Some(0),
	}
}

fn valid(hour: u8, minute: u8, meridiem: bool) -> Option<Clock> {
	(hour < 24 && minute < 60).then_some(Clock { hour, minute, meridiem, next_day: false })
}

/// Bare early hours ("a las 4") are read as afternoon, since callbacks happen in business hours.
fn apply_day_part(clock: Clock, day_part: Option<DayPart>) -> Clock {
	if clock.meridiem {
		return clock;
	}

	if day_part == Some(DayPart::Evening) && clock.hour == 12 {
		return Clock { hour: 0, minute: clock.minute, meridiem: true, next_day: true };
	}

	let hour = match day_part {
		Some(DayPart::Afternoon | DayPart::Evening) if clock.hour < 12 => clock.hour + 12,
		Some(_) => clock.hour,
		None if (1..=7).contains(&clock.hour) => clock.hour + 12,
		None => clock.hour,
	};

	Clock { hour, minute: clock.minute, meridiem: true, next_day: false }
}

fn calendar_date(
	year: Option<i64>,
	month: Option<i64>,
	day: Option<i64>,
) -> Result<Date, InvalidDate> {
	let year = year.and_then(|year| i32::try_from(year).ok()).ok_or(InvalidDate)?;
	let month = month
		.and_then(|month| u8::try_from(month).ok())
		.and_then(|month| Month::try_from(month).ok())
		.ok_or(InvalidDate)?;
	let day = day.and_then(|day| u8::try_from(day).ok()).ok_or(InvalidDate)?;

	Date::from_calendar_date(year, month, day).map_err(|_| InvalidDate)
}

fn add_days(date: Date, days: i64) -> Option<Date> {
	date.checked_add(Duration::days(days))
}

fn contains(haystack: &str, pattern: &str) -> bool {
	re(pattern).map(|re| re.is_match(haystack)).unwrap_or(false)
}
