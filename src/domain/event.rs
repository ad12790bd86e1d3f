use chrono::{NaiveDate, NaiveDateTime};

/// When an event begins: a bare date for all-day events, a local
/// date-time otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum EventStart {
    AllDay(NaiveDate),
    Timed(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub summary: String,
    pub start: EventStart,
}

impl CalendarEvent {
    /// All-day events render as `Mon Jan 2`, timed events as
    /// `Monday Jan 2 at 3:04pm`.
    pub fn display_date(&self) -> String {
        match &self.start {
            EventStart::AllDay(date) => date.format("%a %b %-d").to_string(),
            EventStart::Timed(dt) => dt.format("%A %b %-d at %-I:%M%P").to_string(),
        }
    }

    /// The line injected into the dashboard's event list.
    pub fn display_line(&self) -> String {
        format!("{} ({})", self.summary, self.display_date())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_all_day_event_format() {
        let event = CalendarEvent {
            summary: "Trash pickup".to_string(),
            start: EventStart::AllDay(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
        };
        assert_eq!(event.display_date(), "Tue Jan 2");
        assert_eq!(event.display_line(), "Trash pickup (Tue Jan 2)");
    }

    #[test]
    fn test_timed_event_format() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(15, 4, 0).unwrap());
        let event = CalendarEvent {
            summary: "Dentist".to_string(),
            start: EventStart::Timed(start),
        };
        assert_eq!(event.display_date(), "Tuesday Jan 2 at 3:04pm");
    }

    #[test]
    fn test_morning_event_is_twelve_hour() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 6)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        let event = CalendarEvent {
            summary: "Standup".to_string(),
            start: EventStart::Timed(start),
        };
        assert_eq!(event.display_date(), "Saturday Jan 6 at 9:30am");
    }
}
