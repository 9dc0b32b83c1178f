//! Date arithmetic and formatting for lifecycle data

use chrono::{DateTime, Datelike, Local, Timelike, Utc};

/// `2024-06-03T09:15:00Z`
pub(crate) fn iso8601(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// `06/03/2024`, in UTC
pub(crate) fn mmddyyyy(at: DateTime<Utc>) -> String {
    at.format("%m/%d/%Y").to_string()
}

pub(crate) fn hour_of_day(now: &DateTime<Local>) -> u32 {
    now.hour()
}

/// Sunday = 1 ... Saturday = 7
pub(crate) fn day_of_week(now: &DateTime<Local>) -> u32 {
    now.weekday().number_from_sunday()
}

/// Whole days elapsed from `then` to `now` on the local wall clock, floored
pub(crate) fn days_between(then: DateTime<Utc>, now: &DateTime<Local>) -> i64 {
    let then = then.with_timezone(&Local);
    (now.naive_local() - then.naive_local()).num_days().max(0)
}

/// Whether `now` falls on a later local calendar day than `prior`
pub(crate) fn is_new_day(prior: Option<DateTime<Utc>>, now: &DateTime<Local>) -> bool {
    match prior {
        Some(prior) => {
            let prior = prior.with_timezone(&Local);
            (now.year(), now.month(), now.day()) > (prior.year(), prior.month(), prior.day())
        }
        None => true,
    }
}

/// Whether `now` falls in a later local calendar month than `prior`
pub(crate) fn is_new_month(prior: Option<DateTime<Utc>>, now: &DateTime<Local>) -> bool {
    match prior {
        Some(prior) => {
            let prior = prior.with_timezone(&Local);
            (now.year(), now.month()) > (prior.year(), prior.month())
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn local(day: u32, hour: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 6, day, hour, 0, 0)
            .single()
            .expect("unambiguous local time")
    }

    #[test]
    fn test_formats() {
        let at = Utc.with_ymd_and_hms(2024, 6, 3, 9, 15, 0).unwrap();
        assert_eq!(iso8601(at), "2024-06-03T09:15:00Z");
        assert_eq!(mmddyyyy(at), "06/03/2024");
    }

    #[test]
    fn test_day_of_week_starts_sunday() {
        // 2024-06-02 was a Sunday
        assert_eq!(day_of_week(&local(2, 10)), 1);
        assert_eq!(day_of_week(&local(8, 10)), 7);
        assert_eq!(hour_of_day(&local(8, 10)), 10);
    }

    #[test]
    fn test_days_between_floors() {
        let then = local(3, 12).with_timezone(&Utc);
        assert_eq!(days_between(then, &local(5, 12)), 2);
        assert_eq!(days_between(then, &local(5, 11)), 1);
        assert_eq!(days_between(then, &local(3, 23)), 0);
        assert_eq!(days_between(then + Duration::days(1), &local(3, 12)), 0);
    }

    #[test]
    fn test_calendar_boundaries() {
        let morning = local(3, 8).with_timezone(&Utc);
        assert!(!is_new_day(Some(morning), &local(3, 20)));
        assert!(is_new_day(Some(morning), &local(4, 1)));
        assert!(is_new_day(None, &local(4, 1)));

        assert!(!is_new_month(Some(morning), &local(30, 1)));
        let may = Local
            .with_ymd_and_hms(2024, 5, 31, 12, 0, 0)
            .single()
            .expect("unambiguous local time")
            .with_timezone(&Utc);
        assert!(is_new_month(Some(may), &local(1, 12)));
    }
}
