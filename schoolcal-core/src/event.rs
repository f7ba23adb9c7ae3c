//! Event types and input normalisation.
//!
//! `Event` is what gets stored and served. `EventDraft` and `EventPatch` are
//! the loosely-typed request bodies: every field arrives as an optional string
//! and is validated, sanitised and parsed here before it reaches the store.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Naive date-time layouts accepted in addition to RFC 3339.
/// These are read as wall-clock time in the configured zone.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A stored calendar event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Stable identifier. Empty only for legacy documents, filled in at load.
    #[serde(default)]
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub location: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub category: Category,
}

/// The fixed set of event categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Exam,
    Project,
    #[default]
    Other,
}

impl Category {
    /// Resolve a user-supplied type string. Unknown or missing values are `Other`.
    pub fn resolve(input: Option<&str>) -> Self {
        let Some(input) = input else {
            return Category::Other;
        };

        match input.trim().to_ascii_lowercase().as_str() {
            "homework" | "work" => Category::Work,
            "exam" => Category::Exam,
            "project" => Category::Project,
            _ => Category::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Exam => "exam",
            Category::Project => "project",
            Category::Other => "other",
        }
    }

    /// Value used for the CATEGORIES property in the feed
    pub fn as_ics_str(&self) -> &'static str {
        match self {
            Category::Work => "WORK",
            Category::Exam => "EXAM",
            Category::Project => "PROJECT",
            Category::Other => "OTHER",
        }
    }
}

// Stored documents may carry any string (or null) in `type`; resolve instead of failing.
impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(Category::resolve(value.as_deref()))
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

pub fn new_event_id() -> String {
    Uuid::new_v4().to_string()
}

/// Collapse every run of line breaks into a single space and trim the result.
pub fn clean_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut in_break = false;

    for c in text.chars() {
        if c == '\n' || c == '\r' {
            if !in_break {
                cleaned.push(' ');
                in_break = true;
            }
        } else {
            cleaned.push(c);
            in_break = false;
        }
    }

    cleaned.trim().to_string()
}

/// Sanitise an optional field; blank results count as absent.
fn clean_optional(value: Option<&str>) -> Option<String> {
    value.map(clean_text).filter(|s| !s.is_empty())
}

/// Treat `None` and `""` alike.
fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Parse a timestamp from request input.
///
/// RFC 3339 strings carry their own offset. Naive date-times and bare dates
/// are interpreted in `tz`.
pub fn parse_timestamp(input: &str, tz: &Tz) -> StoreResult<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return localize(naive, tz, input);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return localize(midnight, tz, input);
        }
    }

    Err(StoreError::Validation(format!("Invalid timestamp: {input}")))
}

fn localize(naive: NaiveDateTime, tz: &Tz, input: &str) -> StoreResult<DateTime<Utc>> {
    // Ambiguous wall-clock times (DST fall-back) take the earlier instant
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            StoreError::Validation(format!("Timestamp does not exist in {}: {input}", tz.name()))
        })
}

/// Request body for creating an event
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventDraft {
    pub start: Option<String>,
    pub end: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<String>,
}

impl EventDraft {
    pub fn new(start: &str, end: &str, summary: &str) -> Self {
        EventDraft {
            start: Some(start.to_string()),
            end: Some(end.to_string()),
            summary: Some(summary.to_string()),
            ..Default::default()
        }
    }

    /// Validate and normalise into a new event with a fresh id.
    pub fn into_event(self, tz: &Tz) -> StoreResult<Event> {
        let (Some(start), Some(end), Some(summary)) = (
            supplied(&self.start),
            supplied(&self.end),
            supplied(&self.summary),
        ) else {
            return Err(StoreError::Validation(
                "Missing required fields: start, end, summary".into(),
            ));
        };

        let summary = clean_text(summary);
        if summary.is_empty() {
            return Err(StoreError::Validation("Summary must not be blank".into()));
        }

        Ok(Event {
            id: new_event_id(),
            start: parse_timestamp(start, tz)?,
            end: parse_timestamp(end, tz)?,
            summary,
            description: clean_optional(self.description.as_deref()),
            location: clean_optional(self.location.as_deref()),
            url: clean_optional(self.url.as_deref()),
            category: Category::resolve(self.category.as_deref()),
        })
    }
}

/// Request body for updating an event.
///
/// Missing, null and empty-string fields are all "not supplied" and leave the
/// stored value alone. A field that is blank after sanitising is ignored too,
/// so an optional field cannot be cleared through a patch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub start: Option<String>,
    pub end: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<String>,
}

impl EventPatch {
    /// Merge the supplied fields into `event`. On error `event` is untouched.
    pub fn apply(&self, event: &mut Event, tz: &Tz) -> StoreResult<()> {
        let start = supplied(&self.start)
            .map(|s| parse_timestamp(s, tz))
            .transpose()?;
        let end = supplied(&self.end)
            .map(|s| parse_timestamp(s, tz))
            .transpose()?;

        if let Some(start) = start {
            event.start = start;
        }
        if let Some(end) = end {
            event.end = end;
        }
        if let Some(summary) = clean_optional(supplied(&self.summary)) {
            event.summary = summary;
        }
        if let Some(description) = clean_optional(supplied(&self.description)) {
            event.description = Some(description);
        }
        if let Some(location) = clean_optional(supplied(&self.location)) {
            event.location = Some(location);
        }
        if let Some(url) = clean_optional(supplied(&self.url)) {
            event.url = Some(url);
        }
        if let Some(category) = supplied(&self.category) {
            event.category = Category::resolve(Some(category));
        }

        Ok(())
    }
}
