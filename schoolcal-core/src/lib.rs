//! Core types for schoolcal.
//!
//! This crate provides everything the server needs apart from HTTP:
//! - `Event` and the request types used to create and patch events
//! - `EventStore`, the authoritative, file-backed event list
//! - `ics` module for rendering the calendar feed
//! - `Settings` for layered configuration

pub mod config;
pub mod error;
pub mod event;
pub mod ics;
pub mod store;

pub use chrono_tz::Tz;
pub use config::Settings;
pub use error::{StoreError, StoreResult};
pub use event::*;
pub use ics::FeedProjector;
pub use store::{EventKey, EventStore};
