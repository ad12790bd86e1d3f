//! planner — a personal dashboard generator.
//!
//! Periodically pulls weather, a word of the day, calendar events, and a
//! random background photo, then rewrites marker-delimited fields of a
//! static HTML/CSS dashboard in place.

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod patch;
pub mod scheduler;
pub mod sources;
