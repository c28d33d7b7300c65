//! The persistent calendar document.
//!
//! A [`CalendarDocument`] is loaded once per run, only ever grows, and is
//! written back in full by [`CalendarDocument::persist`]. The identity set is
//! kept in lockstep with the component list so a repeated add is a no-op.
//! Components read from the file that can't be modeled are kept as written,
//! and their UIDs count as taken.

use std::collections::HashSet;
use std::path::Path;

use chrono_tz::Tz;

use crate::error::{NotiflowError, NotiflowResult};
use crate::event::{Component, Event, Task};
use crate::ics::{RawComponent, generate_ics, parse_document};

/// Calendar-level properties written into the VCALENDAR header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMetadata {
    pub product_id: String,
    /// Display name (`X-WR-CALNAME`).
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CalendarDocument {
    metadata: CalendarMetadata,
    components: Vec<Component>,
    preserved: Vec<RawComponent>,
    existing_uids: HashSet<String>,
}

impl CalendarDocument {
    pub fn new(metadata: CalendarMetadata) -> Self {
        CalendarDocument {
            metadata,
            components: Vec::new(),
            preserved: Vec::new(),
            existing_uids: HashSet::new(),
        }
    }

    /// Load the document stored at `path`.
    ///
    /// A missing file gives a fresh document. So does a file that can't be
    /// read or parsed, after a warning; the next persist replaces it.
    pub fn load(path: &Path, metadata: CalendarMetadata, tz: Tz) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no calendar file yet, starting fresh");
            return Self::new(metadata);
        }

        let loaded = std::fs::read_to_string(path)
            .map_err(|e| NotiflowError::StorageCorrupt(e.to_string()))
            .and_then(|content| Self::from_ics(&content, metadata.clone(), tz));

        match loaded {
            Ok(document) => {
                tracing::debug!(
                    path = %path.display(),
                    components = document.len(),
                    preserved = document.preserved.len(),
                    "loaded calendar"
                );
                document
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "calendar file unreadable, starting fresh");
                Self::new(metadata)
            }
        }
    }

    /// Rebuild a document from .ics content.
    ///
    /// Only the first component of each UID is modeled; later ones, and
    /// anything else that can't be modeled, are preserved as written.
    pub fn from_ics(content: &str, metadata: CalendarMetadata, tz: Tz) -> NotiflowResult<Self> {
        let mut document = Self::new(metadata);
        for parsed in parse_document(content, tz)? {
            if let Some(component) = parsed.component {
                if document.add(component) {
                    continue;
                }
                tracing::warn!(
                    uid = parsed.raw.uid.as_deref().unwrap_or(""),
                    "duplicate uid in calendar file, keeping the later copy as written"
                );
            }
            document.preserve(parsed.raw);
        }
        Ok(document)
    }

    fn preserve(&mut self, raw: RawComponent) {
        if let Some(uid) = &raw.uid {
            self.existing_uids.insert(uid.clone());
        }
        self.preserved.push(raw);
    }

    /// Insert a component unless its UID is already present.
    ///
    /// Returns `false` (and changes nothing) for a duplicate.
    pub fn add(&mut self, component: Component) -> bool {
        if self.existing_uids.contains(component.uid()) {
            return false;
        }
        self.existing_uids.insert(component.uid().to_string());
        self.components.push(component);
        true
    }

    /// Write the whole document to `path`, replacing what was there.
    pub fn persist(&self, path: &Path) -> NotiflowResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = self.to_ics()?;

        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");

        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, path)?;

        tracing::info!(
            path = %path.display(),
            components = self.len(),
            preserved = self.preserved.len(),
            "calendar saved"
        );
        Ok(())
    }

    pub fn to_ics(&self) -> NotiflowResult<String> {
        generate_ics(&self.metadata, &self.components, &self.preserved)
    }

    pub fn metadata(&self) -> &CalendarMetadata {
        &self.metadata
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.existing_uids.contains(uid)
    }

    pub fn uids(&self) -> &HashSet<String> {
        &self.existing_uids
    }

    /// Components kept as written because they can't be modeled.
    pub fn preserved(&self) -> &[RawComponent] {
        &self.preserved
    }

    /// Components in insertion order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.components.iter().filter_map(|c| match c {
            Component::Event(event) => Some(event),
            Component::Task(_) => None,
        })
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.components.iter().filter_map(|c| match c {
            Component::Task(task) => Some(task),
            Component::Event(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
