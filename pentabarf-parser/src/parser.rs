use std::io::BufRead;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;

use crate::cursor::{Node, StartTag, XmlCursor};
use crate::error::{ParseError, Result};
use crate::structs::{
    Attachment, Day, DetailedEvent, Event, EventDetails, Link, Person, Track, TrackType,
};
use crate::time::{local_instant, time_to_seconds};

/// Wall-clock bounds of a conference day, fed through the time codec.
const DAY_START: &str = "08:30";
const DAY_END: &str = "19:00";

/// Returns the lazy event sequence of a schedule document.
///
/// Events are decoded one at a time as the iterator is pulled; dropping it
/// early stops parsing without reading the rest of the stream. The first
/// malformed structure ends the sequence with an error and no further items.
pub fn parse_schedule<R: BufRead>(input: R, timezone: Tz) -> ScheduleParser<R> {
    ScheduleParser::new(input, timezone)
}

/// Streaming parser for the nested `schedule`/`day`/`room`/`event` dialect.
pub struct ScheduleParser<R: BufRead> {
    cursor: XmlCursor<R>,
    timezone: Tz,
    in_schedule: bool,
    day: Option<Day>,
    room: Option<Room>,
    finished: bool,
}

/// Room context carried while scanning a room's events.
struct Room {
    day: Day,
    name: Option<String>,
}

impl<R: BufRead> ScheduleParser<R> {
    pub fn new(input: R, timezone: Tz) -> ScheduleParser<R> {
        ScheduleParser {
            cursor: XmlCursor::new(input),
            timezone,
            in_schedule: false,
            day: None,
            room: None,
            finished: false,
        }
    }

    /// Resumes scanning from the stored nesting context and runs until the
    /// next event is decoded or the schedule ends.
    fn advance(&mut self) -> Result<Option<DetailedEvent>> {
        loop {
            if let Some(room) = &self.room {
                if self.cursor.next_is_end_of("room")? {
                    self.room = None;
                    continue;
                }
                match self.cursor.next_node()? {
                    Node::Start(tag) if tag.name == "event" => {
                        let day = room.day.clone();
                        let room_name = room.name.clone();
                        return self.parse_event(&tag, day, room_name).map(Some);
                    }
                    Node::Start(_) => self.cursor.skip_to_end()?,
                    Node::Text(_) | Node::End(_) => {}
                    Node::Eof => return Err(ParseError::UnexpectedDocumentEnd),
                }
                continue;
            }

            if self.day.is_some() {
                if self.cursor.next_is_end_of("day")? {
                    self.day = None;
                    continue;
                }
                match self.cursor.next_node()? {
                    Node::Start(tag) if tag.name == "room" => {
                        if let Some(day) = &self.day {
                            self.room = Some(Room {
                                day: day.clone(),
                                name: tag.attribute("name").map(str::to_owned),
                            });
                        }
                    }
                    Node::Start(_) => self.cursor.skip_to_end()?,
                    Node::Text(_) | Node::End(_) => {}
                    Node::Eof => return Err(ParseError::UnexpectedDocumentEnd),
                }
                continue;
            }

            if self.in_schedule {
                if self.cursor.next_is_end_of("schedule")? {
                    // One schedule per document; trailing content stays unread.
                    self.in_schedule = false;
                    return Ok(None);
                }
                match self.cursor.next_node()? {
                    Node::Start(tag) if tag.name == "day" => {
                        self.day = Some(self.parse_day(&tag)?);
                    }
                    Node::Start(_) => self.cursor.skip_to_end()?,
                    Node::Text(_) | Node::End(_) => {}
                    Node::Eof => return Err(ParseError::UnexpectedDocumentEnd),
                }
                continue;
            }

            // Top level: look for the schedule element.
            match self.cursor.next_node()? {
                Node::Start(tag) if tag.name == "schedule" => self.in_schedule = true,
                Node::Start(_) => self.cursor.skip_to_end()?,
                Node::Text(_) | Node::End(_) => {}
                Node::Eof => return Ok(None),
            }
        }
    }

    fn parse_day(&self, tag: &StartTag) -> Result<Day> {
        let index = parsed_attribute(tag, "day", "index")?;
        let date: NaiveDate = parsed_attribute(tag, "day", "date")?;
        Ok(Day {
            index,
            date,
            start: self.instant(date, DAY_START)?,
            end: self.instant(date, DAY_END)?,
        })
    }

    /// Decodes one `<event>` element into a finished record. Field values
    /// accumulate locally while scanning children and are finalized at the
    /// end tag; nothing partial ever escapes.
    fn parse_event(
        &mut self,
        tag: &StartTag,
        day: Day,
        room_name: Option<String>,
    ) -> Result<DetailedEvent> {
        let id = parsed_attribute(tag, "event", "id")?;

        let mut start = None;
        let mut duration_seconds = None;
        let mut slug = None;
        let mut title = None;
        let mut sub_title = None;
        let mut abstract_text = None;
        let mut description = None;
        let mut track_name = String::new();
        let mut track_kind = TrackType::Other;
        let mut details = EventDetails::default();

        while !self.cursor.next_is_end_of("event")? {
            match self.cursor.next_node()? {
                Node::Start(child) => match child.name.as_str() {
                    "start" => {
                        let text = self.cursor.read_text()?;
                        if !text.is_empty() {
                            start = Some(self.instant(day.date, &text)?);
                        }
                    }
                    "duration" => {
                        let text = self.cursor.read_text()?;
                        if !text.is_empty() {
                            duration_seconds = Some(time_to_seconds(&text));
                        }
                    }
                    "slug" => slug = Some(self.cursor.read_text()?),
                    "title" => title = Some(self.cursor.read_text()?),
                    "subtitle" => sub_title = Some(self.cursor.read_text()?),
                    "abstract" => abstract_text = Some(self.cursor.read_text()?),
                    "description" => description = Some(self.cursor.read_text()?),
                    "track" => track_name = self.cursor.read_text()?,
                    "type" => {
                        track_kind = TrackType::from_schedule_name(&self.cursor.read_text()?);
                    }
                    "persons" => self.parse_persons(&mut details.persons)?,
                    "attachments" => self.parse_attachments(id, &mut details.attachments)?,
                    "links" => self.parse_links(id, &mut details.links)?,
                    _ => self.cursor.skip_to_end()?,
                },
                Node::Text(_) | Node::End(_) => {}
                Node::Eof => return Err(ParseError::UnexpectedDocumentEnd),
            }
        }

        // End time only exists when both sides do; one alone says nothing.
        let end = match (start, duration_seconds) {
            (Some(start), Some(seconds)) => Some(start + Duration::seconds(i64::from(seconds))),
            _ => None,
        };

        let event = Event {
            id,
            day,
            room_name,
            start,
            end,
            slug,
            title,
            sub_title,
            track: Track {
                name: track_name,
                kind: track_kind,
            },
            abstract_text,
            description,
            persons_summary: None,
        };

        Ok(DetailedEvent { event, details })
    }

    fn parse_persons(&mut self, persons: &mut Vec<Person>) -> Result<()> {
        while !self.cursor.next_is_end_of("persons")? {
            match self.cursor.next_node()? {
                Node::Start(child) if child.name == "person" => {
                    let id = parsed_attribute(&child, "person", "id")?;
                    let name = self.cursor.read_text()?;
                    persons.push(Person { id, name });
                }
                Node::Start(_) => self.cursor.skip_to_end()?,
                Node::Text(_) | Node::End(_) => {}
                Node::Eof => return Err(ParseError::UnexpectedDocumentEnd),
            }
        }
        Ok(())
    }

    fn parse_attachments(&mut self, event_id: i64, attachments: &mut Vec<Attachment>) -> Result<()> {
        while !self.cursor.next_is_end_of("attachments")? {
            match self.cursor.next_node()? {
                Node::Start(child) if child.name == "attachment" => {
                    let url = required_attribute(&child, "attachment", "href")?.to_owned();
                    let kind = child.attribute("type").map(str::to_owned);
                    let text = self.cursor.read_text()?;
                    // A blank description borrows the attachment type instead.
                    let description = if text.trim().is_empty() {
                        kind.as_deref().map(capitalize)
                    } else {
                        Some(text)
                    };
                    attachments.push(Attachment {
                        event_id,
                        url,
                        description,
                    });
                }
                Node::Start(_) => self.cursor.skip_to_end()?,
                Node::Text(_) | Node::End(_) => {}
                Node::Eof => return Err(ParseError::UnexpectedDocumentEnd),
            }
        }
        Ok(())
    }

    fn parse_links(&mut self, event_id: i64, links: &mut Vec<Link>) -> Result<()> {
        while !self.cursor.next_is_end_of("links")? {
            match self.cursor.next_node()? {
                Node::Start(child) if child.name == "link" => {
                    let url = required_attribute(&child, "link", "href")?.to_owned();
                    let text = self.cursor.read_text()?;
                    let description = if text.is_empty() { None } else { Some(text) };
                    links.push(Link {
                        event_id,
                        url,
                        description,
                    });
                }
                Node::Start(_) => self.cursor.skip_to_end()?,
                Node::Text(_) | Node::End(_) => {}
                Node::Eof => return Err(ParseError::UnexpectedDocumentEnd),
            }
        }
        Ok(())
    }

    fn instant(&self, date: NaiveDate, text: &str) -> Result<DateTime<Tz>> {
        local_instant(date, time_to_seconds(text), self.timezone)
            .ok_or_else(|| ParseError::InvalidTime(text.to_owned()))
    }
}

impl<R: BufRead> Iterator for ScheduleParser<R> {
    type Item = Result<DetailedEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.advance() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

fn required_attribute<'a>(
    tag: &'a StartTag,
    element: &'static str,
    attribute: &'static str,
) -> Result<&'a str> {
    tag.attribute(attribute)
        .ok_or(ParseError::MissingAttribute { element, attribute })
}

fn parsed_attribute<T: FromStr>(
    tag: &StartTag,
    element: &'static str,
    attribute: &'static str,
) -> Result<T> {
    let value = required_attribute(tag, element, attribute)?;
    value.parse().map_err(|_| ParseError::InvalidAttribute {
        element,
        attribute,
        value: value.to_owned(),
    })
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Brussels;

    const SCHEDULE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<schedule>
  <conference>
    <title>FOSDEM 2024</title>
    <venue>ULB</venue>
  </conference>
  <day index="1" date="2024-02-03">
    <room name="Janson">
      <event id="101">
        <start>10:00</start>
        <duration>01:30</duration>
        <slug>welcome</slug>
        <title>Welcome to the conference</title>
        <subtitle>Opening session</subtitle>
        <track>Main</track>
        <type>maintrack</type>
        <abstract>Opening words.</abstract>
        <description>A longer description.</description>
        <persons>
          <person id="7">Alice Example</person>
          <person id="9">Bob Sample</person>
        </persons>
        <attachments>
          <attachment type="slides" href="https://example.org/slides.pdf"></attachment>
          <attachment type="paper" href="https://example.org/paper.pdf">Full paper</attachment>
        </attachments>
        <links>
          <link href="https://example.org/video">Video recording</link>
          <link href="https://example.org/chat"/>
        </links>
      </event>
      <event id="102">
        <start>12:00</start>
        <title>Keynote of sorts</title>
        <type>keynote</type>
      </event>
    </room>
    <room>
      <event id="103">
        <title>Nameless room</title>
        <unknown><nested/>junk</unknown>
      </event>
    </room>
  </day>
  <day index="2" date="2024-02-04">
    <room name="K.1.105">
      <event id="201">
        <start></start>
        <duration>00:30</duration>
        <title>Empty start text</title>
      </event>
    </room>
  </day>
</schedule>"#;

    const MISSING_EVENT_ID: &str = r#"<schedule>
  <day index="1" date="2024-02-03">
    <room name="A">
      <event id="1"><title>fine</title></event>
      <event><title>broken</title></event>
    </room>
  </day>
</schedule>"#;

    fn parse_all(xml: &str) -> Vec<DetailedEvent> {
        parse_schedule(xml.as_bytes(), Brussels)
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn yields_every_event_in_document_order() {
        let events = parse_all(SCHEDULE);
        let ids: Vec<i64> = events.iter().map(|e| e.event.id).collect();
        assert_eq!(ids, [101, 102, 103, 201]);
    }

    #[test]
    fn day_bounds_are_local_wall_clock_times() {
        let events = parse_all(SCHEDULE);
        let day = &events[0].event.day;
        assert_eq!(day.index, 1);
        assert_eq!(day.date, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
        assert_eq!(day.start.to_rfc3339(), "2024-02-03T08:30:00+01:00");
        assert_eq!(day.end.to_rfc3339(), "2024-02-03T19:00:00+01:00");
        assert!(day.start < day.end);

        let second_day = &events[3].event.day;
        assert_eq!(second_day.index, 2);
        assert_eq!(second_day.start.to_rfc3339(), "2024-02-04T08:30:00+01:00");
    }

    #[test]
    fn end_time_is_start_plus_duration() {
        let events = parse_all(SCHEDULE);
        let event = &events[0].event;
        assert_eq!(
            event.start.unwrap().to_rfc3339(),
            "2024-02-03T10:00:00+01:00"
        );
        assert_eq!(event.end.unwrap().to_rfc3339(), "2024-02-03T11:30:00+01:00");
    }

    #[test]
    fn end_time_needs_both_start_and_duration() {
        let events = parse_all(SCHEDULE);
        // Start without duration.
        assert!(events[1].event.start.is_some());
        assert!(events[1].event.end.is_none());
        // Neither start nor duration.
        assert!(events[2].event.start.is_none());
        assert!(events[2].event.end.is_none());
        // Empty start text with a duration still yields no end.
        assert!(events[3].event.start.is_none());
        assert!(events[3].event.end.is_none());
    }

    #[test]
    fn plain_text_fields_pass_through() {
        let events = parse_all(SCHEDULE);
        let event = &events[0].event;
        assert_eq!(event.slug.as_deref(), Some("welcome"));
        assert_eq!(event.title.as_deref(), Some("Welcome to the conference"));
        assert_eq!(event.sub_title.as_deref(), Some("Opening session"));
        assert_eq!(event.abstract_text.as_deref(), Some("Opening words."));
        assert_eq!(event.description.as_deref(), Some("A longer description."));
        assert!(event.persons_summary.is_none());
    }

    #[test]
    fn track_type_falls_back_silently() {
        let events = parse_all(SCHEDULE);
        assert_eq!(events[0].event.track.name, "Main");
        assert_eq!(events[0].event.track.kind, TrackType::MainTrack);
        // "keynote" is not a known type.
        assert_eq!(events[1].event.track.kind, TrackType::Other);
        // Absent track text yields the empty string, not a missing field.
        assert_eq!(events[2].event.track.name, "");
        assert_eq!(events[2].event.track.kind, TrackType::Other);
    }

    #[test]
    fn persons_keep_document_order() {
        let events = parse_all(SCHEDULE);
        let persons = &events[0].details.persons;
        assert_eq!(persons.len(), 2);
        assert_eq!(persons[0], Person { id: 7, name: "Alice Example".into() });
        assert_eq!(persons[1], Person { id: 9, name: "Bob Sample".into() });
        assert!(events[1].details.persons.is_empty());
    }

    #[test]
    fn blank_attachment_description_borrows_the_type() {
        let events = parse_all(SCHEDULE);
        let attachments = &events[0].details.attachments;
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].event_id, 101);
        assert_eq!(attachments[0].url, "https://example.org/slides.pdf");
        assert_eq!(attachments[0].description.as_deref(), Some("Slides"));
        // Non-blank text wins over the type attribute.
        assert_eq!(attachments[1].description.as_deref(), Some("Full paper"));
    }

    #[test]
    fn link_descriptions_have_no_fallback() {
        let events = parse_all(SCHEDULE);
        let links = &events[0].details.links;
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://example.org/video");
        assert_eq!(links[0].description.as_deref(), Some("Video recording"));
        assert_eq!(links[1].url, "https://example.org/chat");
        assert_eq!(links[1].description, None);
    }

    #[test]
    fn nameless_rooms_still_parse() {
        let events = parse_all(SCHEDULE);
        assert_eq!(events[0].event.room_name.as_deref(), Some("Janson"));
        assert_eq!(events[2].event.room_name, None);
    }

    #[test]
    fn document_without_schedule_is_empty() {
        let events = parse_all("<feed><day index=\"1\" date=\"2024-02-03\"/></feed>");
        assert!(events.is_empty());
    }

    #[test]
    fn missing_event_id_is_fatal() {
        let mut parser = parse_schedule(MISSING_EVENT_ID.as_bytes(), Brussels);
        assert_eq!(parser.next().unwrap().unwrap().event.id, 1);
        assert!(matches!(
            parser.next(),
            Some(Err(ParseError::MissingAttribute {
                element: "event",
                attribute: "id",
            }))
        ));
        // The sequence is fused after an error.
        assert!(parser.next().is_none());
    }

    #[test]
    fn missing_day_attributes_are_fatal() {
        let mut parser = parse_schedule(
            "<schedule><day date=\"2024-02-03\"/></schedule>".as_bytes(),
            Brussels,
        );
        assert!(matches!(
            parser.next(),
            Some(Err(ParseError::MissingAttribute {
                element: "day",
                attribute: "index",
            }))
        ));

        let mut parser =
            parse_schedule("<schedule><day index=\"x\" date=\"2024-02-03\"/></schedule>".as_bytes(), Brussels);
        assert!(matches!(
            parser.next(),
            Some(Err(ParseError::InvalidAttribute { .. }))
        ));
    }

    #[test]
    fn missing_link_href_is_fatal() {
        let xml = r#"<schedule><day index="1" date="2024-02-03"><room name="A">
            <event id="1"><links><link>text</link></links></event>
        </room></day></schedule>"#;
        let mut parser = parse_schedule(xml.as_bytes(), Brussels);
        assert!(matches!(
            parser.next(),
            Some(Err(ParseError::MissingAttribute {
                element: "link",
                attribute: "href",
            }))
        ));
    }

    #[test]
    fn stopping_early_leaves_later_content_unread() {
        // The second event is malformed, but pulling only the first element
        // never reaches it.
        let mut parser = parse_schedule(MISSING_EVENT_ID.as_bytes(), Brussels);
        let first = parser.next().unwrap().unwrap();
        assert_eq!(first.event.id, 1);
        drop(parser);
    }
}
