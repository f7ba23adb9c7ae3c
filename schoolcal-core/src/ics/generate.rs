//! Calendar feed generation.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use icalendar::{Calendar, Component, EventLike, Property};

use crate::event::Event;

static PRODID: &str = "-//schoolcal//schoolcal feed//EN";

/// Renders the event list as a single VCALENDAR document.
///
/// Holds only calendar-level metadata; the events come from the store on
/// every call, so the feed can never drift from what is stored.
#[derive(Debug, Clone)]
pub struct FeedProjector {
    calendar_name: String,
    timezone: String,
}

impl FeedProjector {
    pub fn new(calendar_name: impl Into<String>, timezone: impl Into<String>) -> Self {
        FeedProjector {
            calendar_name: calendar_name.into(),
            timezone: timezone.into(),
        }
    }

    pub fn calendar_name(&self) -> &str {
        &self.calendar_name
    }

    /// Render one VEVENT per event, in store order
    pub fn render(&self, events: &[Event]) -> String {
        let mut cal = Calendar::new();

        cal.append_property(Property::new("NAME", &self.calendar_name));
        // X-WR-CALNAME - Human-readable calendar name (de facto standard)
        cal.append_property(Property::new("X-WR-CALNAME", &self.calendar_name));
        cal.append_property(Property::new("TIMEZONE-ID", &self.timezone));
        cal.append_property(Property::new("X-WR-TIMEZONE", &self.timezone));

        let dtstamp = format_utc(&Utc::now());
        for event in events {
            cal.push(to_ics_event(event, &dtstamp));
        }

        let cal = cal.done();
        strip_ics_bloat(&cal.to_string())
    }

    /// Write the rendered feed to `out`
    pub fn serialize<W: Write>(&self, events: &[Event], out: &mut W) -> io::Result<()> {
        out.write_all(self.render(events).as_bytes())
    }
}

fn to_ics_event(event: &Event, dtstamp: &str) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&event.id);
    ics_event.summary(&event.summary);
    ics_event.add_property("DTSTAMP", dtstamp);

    ics_event.add_property("DTSTART", format_utc(&event.start));
    ics_event.add_property("DTEND", format_utc(&event.end));

    if let Some(ref desc) = event.description {
        ics_event.description(desc);
    }

    if let Some(ref loc) = event.location {
        ics_event.location(loc);
    }

    if let Some(ref url) = event.url {
        ics_event.add_property("URL", url);
    }

    ics_event.add_property("CATEGORIES", event.category.as_ics_str());

    ics_event.done()
}

fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Clean up ICS output from the icalendar crate
/// - Replace PRODID with our own
/// - Remove CALSCALE:GREGORIAN (it's the default)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}
