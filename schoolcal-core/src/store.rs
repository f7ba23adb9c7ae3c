//! The file-backed event store.
//!
//! The in-memory list is authoritative. Every mutation runs under one lock:
//! the change is applied to a copy, the whole copy is written to disk, and only
//! then does it replace the live list. A failed write leaves both the file and
//! the live list as they were.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::event::{Event, EventDraft, EventPatch, new_event_id};

/// How a request addresses an event.
///
/// A path segment that parses as a non-negative integer is a position in the
/// list; anything else is matched against event ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKey {
    Index(usize),
    Id(String),
}

impl EventKey {
    fn position(&self, events: &[Event]) -> Option<usize> {
        match self {
            EventKey::Index(index) => (*index < events.len()).then_some(*index),
            EventKey::Id(id) => events.iter().position(|e| &e.id == id),
        }
    }
}

impl From<&str> for EventKey {
    fn from(raw: &str) -> Self {
        match raw.parse::<usize>() {
            Ok(index) => EventKey::Index(index),
            Err(_) => EventKey::Id(raw.to_string()),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventKey::Index(index) => write!(f, "#{}", index),
            EventKey::Id(id) => write!(f, "{}", id),
        }
    }
}

pub struct EventStore {
    path: PathBuf,
    tz: Tz,
    events: Mutex<Vec<Event>>,
}

impl EventStore {
    /// Load the event document at `path`, creating an empty one if it doesn't exist.
    ///
    /// Events without an id (written by older versions) get one, and the
    /// document is rewritten so the ids stick.
    pub fn load(path: impl Into<PathBuf>, tz: Tz) -> StoreResult<Self> {
        let path = path.into();

        let events = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut events: Vec<Event> = serde_json::from_str(&content)?;

            let mut assigned = 0;
            for event in events.iter_mut().filter(|e| e.id.is_empty()) {
                event.id = new_event_id();
                assigned += 1;
            }

            if assigned > 0 {
                write_document(&path, &events)?;
                info!(path = %path.display(), assigned, "Assigned ids to legacy events");
            }

            events
        } else {
            if let Some(parent) = parent_dir(&path) {
                fs::create_dir_all(parent)?;
            }
            write_document(&path, &[])?;
            info!(path = %path.display(), "Created empty event document");
            Vec::new()
        };

        debug!(path = %path.display(), count = events.len(), "Event store loaded");

        Ok(EventStore {
            path,
            tz,
            events: Mutex::new(events),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of all events in order
    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }

    pub async fn get(&self, key: &EventKey) -> StoreResult<Event> {
        let events = self.events.lock().await;
        let index = key
            .position(&events)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(events[index].clone())
    }

    /// Validate a draft and append it as a new event.
    pub async fn append(&self, draft: EventDraft) -> StoreResult<Event> {
        let event = draft.into_event(&self.tz)?;

        let mut events = self.events.lock().await;
        let mut next = events.clone();
        next.push(event.clone());
        self.commit(&mut events, next).await?;

        Ok(event)
    }

    /// Merge the supplied fields into an event, keeping its position.
    pub async fn update(&self, key: &EventKey, patch: EventPatch) -> StoreResult<Event> {
        let mut events = self.events.lock().await;
        let index = key
            .position(&events)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        let mut next = events.clone();
        patch.apply(&mut next[index], &self.tz)?;
        let merged = next[index].clone();
        self.commit(&mut events, next).await?;

        Ok(merged)
    }

    /// Remove an event, preserving the order of the rest.
    pub async fn remove(&self, key: &EventKey) -> StoreResult<Event> {
        let mut events = self.events.lock().await;
        let index = key
            .position(&events)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        let mut next = events.clone();
        let removed = next.remove(index);
        self.commit(&mut events, next).await?;

        Ok(removed)
    }

    /// Write `next` on the blocking pool, then swap it in as the live list.
    async fn commit(&self, live: &mut Vec<Event>, next: Vec<Event>) -> StoreResult<()> {
        let path = self.path.clone();
        let next = tokio::task::spawn_blocking(move || {
            write_document(&path, &next)?;
            Ok::<_, StoreError>(next)
        })
        .await
        .map_err(|e| StoreError::Persist(e.to_string()))??;
        *live = next;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Write the whole document to a sibling temp file, then rename it into place.
fn write_document(path: &Path, events: &[Event]) -> StoreResult<()> {
    let content = serde_json::to_string_pretty(events)
        .map_err(|e| StoreError::Persist(e.to_string()))?;

    let dir = parent_dir(path).unwrap_or(Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path)
        .map_err(|e| StoreError::Persist(e.to_string()))?;

    Ok(())
}
