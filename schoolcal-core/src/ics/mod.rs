//! iCalendar feed output.
//!
//! The feed is a pure projection of the event list according to RFC 5545.

mod generate;

pub use generate::FeedProjector;
