use chrono::{DateTime, Datelike, Utc};

use crate::date_util::{end_of_month, previous_month, start_of_month};

/// A closed calendar-month range of instants, `[start, end]`, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    year: i32,
    month: u32,
}

impl MonthWindow {
    /// The month containing `now`.
    pub fn containing(now: DateTime<Utc>) -> Self {
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    /// The month immediately before this one.
    pub fn previous(&self) -> Self {
        let first = start_of_month(self.year, self.month);
        let (year, month) = previous_month(&first);
        Self { year, month }
    }

    /// First instant of the month (00:00:00.000 on day 1).
    pub fn start(&self) -> DateTime<Utc> {
        start_of_month(self.year, self.month)
    }

    /// Last instant of the month (23:59:59.999 on the last day).
    pub fn end(&self) -> DateTime<Utc> {
        end_of_month(self.year, self.month)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start() && t <= self.end()
    }

    /// Canonical `YYYY-MM` key.
    pub fn to_key(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_util::to_iso;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_march_2024_windows() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let this_month = MonthWindow::containing(now);
        let last_month = this_month.previous();

        assert_eq!(to_iso(&this_month.start()), "2024-03-01T00:00:00.000Z");
        assert_eq!(to_iso(&this_month.end()), "2024-03-31T23:59:59.999Z");
        // Leap year February
        assert_eq!(to_iso(&last_month.start()), "2024-02-01T00:00:00.000Z");
        assert_eq!(to_iso(&last_month.end()), "2024-02-29T23:59:59.999Z");
    }

    #[test]
    fn test_previous_crosses_year() {
        let now = Utc.with_ymd_and_hms(2025, 1, 3, 8, 30, 0).unwrap();
        let w = MonthWindow::containing(now).previous();
        assert_eq!(w.to_key(), "2024-12");
        assert_eq!(to_iso(&w.end()), "2024-12-31T23:59:59.999Z");
    }

    #[test]
    fn test_windows_disjoint_and_contiguous() {
        // Every day across several years, including leap days and month edges.
        let mut now = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let stop = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        while now < stop {
            let this_month = MonthWindow::containing(now);
            let last_month = this_month.previous();
            assert!(last_month.end() < this_month.start(), "overlap at {now}");
            assert_eq!(
                last_month.end() + Duration::milliseconds(1),
                this_month.start(),
                "gap at {now}"
            );
            assert!(this_month.contains(now));
            assert!(!last_month.contains(now));
            now += Duration::hours(13);
        }
    }

    #[test]
    fn test_contains_is_inclusive() {
        let w = MonthWindow::containing(Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap());
        assert!(w.contains(w.start()));
        assert!(w.contains(w.end()));
        assert!(!w.contains(w.end() + Duration::milliseconds(1)));
        assert!(!w.contains(w.start() - Duration::milliseconds(1)));
    }
}
