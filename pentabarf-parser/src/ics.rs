use std::borrow::Cow;

use ics::properties::{
    Categories, Description, DtEnd, DtStart, Location, Organizer, RRule, Summary, TzName,
};
use ics::{Daylight, ICalendar, Standard, TimeZone};

use crate::DetailedEvent;

const DT_FORMAT: &str = "%Y%m%dT%H%M%S";

impl DetailedEvent {
    #[must_use]
    pub fn to_ics(&self) -> ics::Event<'_> {
        let event = &self.event;

        // Events without times still show up, pinned to the day bounds.
        let start = event
            .start
            .unwrap_or(event.day.start)
            .format(DT_FORMAT)
            .to_string();
        let end = event
            .end
            .unwrap_or(event.day.end)
            .format(DT_FORMAT)
            .to_string();

        let uid = format!("{}_{}", start, event.id);
        let mut ics_event = ics::Event::new(uid, start.clone());

        ics_event.push(DtStart::new(start));
        ics_event.push(DtEnd::new(end));

        if let Some(title) = &event.title {
            ics_event.push(Summary::new(title.as_str()));
        }

        if let Some(room) = &event.room_name {
            ics_event.push(Location::new(room.as_str()));
        }

        if !event.track.name.is_empty() {
            ics_event.push(Categories::new(event.track.name.as_str()));
        }

        if let Some(text) = event.abstract_text.as_ref().or(event.description.as_ref()) {
            ics_event.push(Description::new(text.as_str()));
        }

        if !self.details.persons.is_empty() {
            let organizer = self
                .details
                .persons
                .iter()
                .map(|person| person.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            ics_event.push(Organizer::new(organizer));
        }

        ics_event
    }
}

#[must_use]
pub fn schedule_to_ics<'a, S: Into<Cow<'a, str>>>(
    name: S,
    events: &'a [DetailedEvent],
) -> ICalendar<'a> {
    let mut cet_standard = Standard::new("19701025T030000", "+0200", "+0100");
    cet_standard.push(TzName::new("CET"));
    cet_standard.push(RRule::new("FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU"));

    let mut cest_daylight = Daylight::new("19700329T020000", "+0100", "+0200");
    cest_daylight.push(TzName::new("CEST"));
    cest_daylight.push(RRule::new("FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU"));

    let mut timezone = TimeZone::daylight("Europe/Brussels", cest_daylight);
    timezone.add_standard(cet_standard);

    let mut icalendar = ICalendar::new("2.0", name);
    icalendar.add_timezone(timezone);

    for event in events {
        icalendar.add_event(event.to_ics());
    }

    icalendar
}
