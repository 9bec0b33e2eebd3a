//! Streaming parser for pentabarf-style conference schedule documents.

mod cursor;
mod error;
mod parser;
mod structs;
mod time;

#[cfg(feature = "ics")]
mod ics;

pub use error::{ParseError, Result};
pub use parser::{parse_schedule, ScheduleParser};
pub use structs::{
    Attachment, Day, DetailedEvent, Event, EventDetails, Link, Person, Track, TrackType,
};

#[cfg(feature = "ics")]
pub use self::ics::schedule_to_ics;
