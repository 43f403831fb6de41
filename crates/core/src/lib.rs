#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod playthrough;
pub mod scoring;
pub mod streak;
pub mod time;

pub use time::{Clock, LocalCalendar};
