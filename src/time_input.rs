//! Free-text time entry, normalized to `HH:MM`.
//!
//! Users type times the way they think of them: `9`, `930`, `9:30`, `0930`,
//! `14.15`. Everything that is not a digit is dropped and the remaining
//! digits are read as hours and minutes.

use lazy_static::lazy_static;
use regex::Regex;

const MAX_HOUR: u32 = 23;
const MAX_MINUTE: u32 = 59;

lazy_static! {
    static ref NON_DIGIT: Regex = Regex::new(r"\D+").expect("valid regex");
}

/// Formats a loosely typed time as `HH:MM`.
///
/// One or two digits are hours, three digits are `H` + `MM`, four digits are
/// `HH` + `MM`. Extra digits past the fourth are ignored. Hours are clamped
/// to 23 and minutes to 59. Returns `None` when the input has no digits.
pub fn format_time_from_input(input: &str) -> Option<String> {
    let digits = NON_DIGIT.replace_all(input, "");
    let digits: String = digits.chars().take(4).collect();

    let (hours, minutes) = match digits.len() {
        0 => return None,
        1 | 2 => (&digits[..], "0"),
        3 => (&digits[..1], &digits[1..]),
        _ => (&digits[..2], &digits[2..]),
    };

    let hours = hours.parse::<u32>().ok()?.min(MAX_HOUR);
    let minutes = minutes.parse::<u32>().ok()?.min(MAX_MINUTE);

    Some(format!("{hours:02}:{minutes:02}"))
}

/// Parses an already formatted `HH:MM` string into minutes past midnight.
pub fn minutes_of_day(time: &str) -> Option<u32> {
    let (hours, minutes) = time.split_once(':')?;
    let hours = hours.parse::<u32>().ok()?;
    let minutes = minutes.parse::<u32>().ok()?;
    (hours <= MAX_HOUR && minutes <= MAX_MINUTE).then_some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_inputs_are_hours() {
        assert_eq!(format_time_from_input("9").as_deref(), Some("09:00"));
        assert_eq!(format_time_from_input("14").as_deref(), Some("14:00"));
    }

    #[test]
    fn test_three_and_four_digit_inputs() {
        assert_eq!(format_time_from_input("930").as_deref(), Some("09:30"));
        assert_eq!(format_time_from_input("0930").as_deref(), Some("09:30"));
        assert_eq!(format_time_from_input("1745").as_deref(), Some("17:45"));
    }

    #[test]
    fn test_clamping() {
        assert_eq!(format_time_from_input("25").as_deref(), Some("23:00"));
        assert_eq!(format_time_from_input("999").as_deref(), Some("09:59"));
        assert_eq!(format_time_from_input("2875").as_deref(), Some("23:59"));
    }

    #[test]
    fn test_separators_are_stripped() {
        assert_eq!(format_time_from_input("9:30").as_deref(), Some("09:30"));
        assert_eq!(format_time_from_input(" 14.15 ").as_deref(), Some("14:15"));
        assert_eq!(format_time_from_input("08h05").as_deref(), Some("08:05"));
    }

    #[test]
    fn test_extra_digits_ignored() {
        assert_eq!(format_time_from_input("123456").as_deref(), Some("12:34"));
    }

    #[test]
    fn test_no_digits() {
        assert_eq!(format_time_from_input(""), None);
        assert_eq!(format_time_from_input("noon"), None);
    }

    #[test]
    fn test_minutes_of_day() {
        assert_eq!(minutes_of_day("09:30"), Some(570));
        assert_eq!(minutes_of_day("00:00"), Some(0));
        assert_eq!(minutes_of_day("24:00"), None);
        assert_eq!(minutes_of_day("nope"), None);
    }
}
