use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One conference day, held as read-only context for the events nested
/// beneath it. `start`/`end` bound the day at 08:30 and 19:00 local time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Day {
    pub index: u32,
    pub date: NaiveDate,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// Track categories used by the schedule dialect. Any source text that does
/// not match a known literal maps to `Other`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TrackType {
    #[default]
    Other,
    MainTrack,
    DevRoom,
    LightningTalk,
    Certification,
}

impl TrackType {
    /// Total lookup from the dialect's literal track-type names.
    /// Matching is case-sensitive; a miss falls back to `Other`.
    pub fn from_schedule_name(name: &str) -> TrackType {
        match name {
            "maintrack" => TrackType::MainTrack,
            "devroom" => TrackType::DevRoom,
            "lightningtalk" => TrackType::LightningTalk,
            "certification" => TrackType::Certification,
            _ => TrackType::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: TrackType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Person {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Attachment {
    pub event_id: i64,
    pub url: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Link {
    pub event_id: i64,
    pub url: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Event {
    pub id: i64,
    pub day: Day,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub room_name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub start: Option<DateTime<Tz>>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub end: Option<DateTime<Tz>>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub slug: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub title: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub sub_title: Option<String>,
    pub track: Track,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub abstract_text: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    /// Left empty by the parser; a later presentation stage fills it in.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub persons_summary: Option<String>,
}

/// The repeated sub-collections of one event, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventDetails {
    pub persons: Vec<Person>,
    pub attachments: Vec<Attachment>,
    pub links: Vec<Link>,
}

/// One event paired with its sub-collections; the unit the parser yields.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DetailedEvent {
    pub event: Event,
    pub details: EventDetails,
}
