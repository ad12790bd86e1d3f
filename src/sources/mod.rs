pub mod calendar;
pub mod dictionary;
pub mod photo;
pub mod traits;
pub mod weather;

pub use calendar::{CalendarSource, CredentialProvider, InstalledFlowProvider};
pub use dictionary::DictionarySource;
pub use photo::PhotoSource;
pub use traits::DashboardSource;
pub use weather::WeatherSource;
