//! Date formatting for citations.

use chrono::{Datelike, Local, NaiveDate};

/// English ordinal suffix for a day of the month
pub fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&day) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Format a date as `1st January 2024`
pub fn format_long_date(date: NaiveDate) -> String {
    let day = date.day();
    format!("{}{} {}", day, ordinal_suffix(day), date.format("%B %Y"))
}

/// Today's date in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Append ` (Accessed: <date>)` to a reference list citation
pub fn append_access_date(citation: &str, accessed: NaiveDate) -> String {
    format!("{} (Accessed: {})", citation, format_long_date(accessed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_suffix() {
        assert_eq!(ordinal_suffix(1), "st");
        assert_eq!(ordinal_suffix(2), "nd");
        assert_eq!(ordinal_suffix(3), "rd");
        assert_eq!(ordinal_suffix(4), "th");
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(12), "th");
        assert_eq!(ordinal_suffix(13), "th");
        assert_eq!(ordinal_suffix(20), "th");
        assert_eq!(ordinal_suffix(21), "st");
        assert_eq!(ordinal_suffix(22), "nd");
        assert_eq!(ordinal_suffix(23), "rd");
        assert_eq!(ordinal_suffix(31), "st");
    }

    #[test]
    fn test_format_long_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert_eq!(format_long_date(date), "2nd March 2024");

        let date = NaiveDate::from_ymd_opt(2023, 12, 13).unwrap();
        assert_eq!(format_long_date(date), "13th December 2023");
    }

    #[test]
    fn test_append_access_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 21).unwrap();
        assert_eq!(
            append_access_date("Smith, J. (2020) 'Title'.", date),
            "Smith, J. (2020) 'Title'. (Accessed: 21st January 2024)"
        );
    }
}
