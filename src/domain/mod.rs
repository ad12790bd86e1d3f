pub mod event;
pub mod forecast;
pub mod word;

pub use event::{CalendarEvent, EventStart};
pub use forecast::{Current, Daily, DailyData, Forecast};
pub use word::WordOfTheDay;
